use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "td",
    about = concat!("tltd v", env!("CARGO_PKG_VERSION"), " - Inbox, this week, Later"),
    version,
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Quick add to Inbox: `td Title \\ description`. Text starting with
    /// a command name needs `--` first: `td -- list of groceries`
    #[arg(trailing_var_arg = true, value_name = "TEXT")]
    pub text: Vec<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Use a different data file
    #[arg(short = 'f', long = "file", global = true)]
    pub file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a task (to Inbox unless told otherwise)
    Add(AddArgs),
    /// Show the tasks in a basket
    List(ListArgs),
    /// Show baskets with open task counts
    Baskets,
    /// Toggle a task's completion
    Done(IdArg),
    /// Move a task to another basket
    Mv(MvArgs),
    /// Delete a task and its subtasks
    Rm(IdArg),
    /// Move open tasks from past weeks into Inbox
    Rollover,
    /// Show entries from the recovery log
    Recovery(RecoveryArgs),
}

#[derive(Args)]
pub struct AddArgs {
    /// Title, optionally followed by ` \\ description`
    #[arg(required = true)]
    pub text: Vec<String>,
    /// Target basket: Inbox, Later, a date (YYYY-MM-DD) or a day name
    #[arg(long = "to", default_value = "Inbox")]
    pub basket: String,
    /// Add as a subtask of this task (id or unique id prefix)
    #[arg(long)]
    pub under: Option<String>,
}

#[derive(Args)]
pub struct ListArgs {
    /// Basket to show (default: Inbox)
    pub basket: Option<String>,
    /// Include completed tasks
    #[arg(long, short = 'a')]
    pub all: bool,
}

#[derive(Args)]
pub struct IdArg {
    /// Task id or unique id prefix
    pub id: String,
}

#[derive(Args)]
pub struct MvArgs {
    /// Task id or unique id prefix
    pub id: String,
    /// Destination basket
    pub basket: String,
}

#[derive(Args)]
pub struct RecoveryArgs {
    /// Show at most this many entries
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,
}
