use clap::Parser;
use tltd::cli::commands::Cli;
use tltd::cli::handlers;

fn main() {
    tltd::logging::init();
    let cli = Cli::parse();
    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
