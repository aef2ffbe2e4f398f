use std::error::Error;

use tracing::debug;

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::recovery::read_recovery_entries;
use crate::io::storage::{JsonStorage, TaskStorage};
use crate::model::basket::{INBOX, LATER, is_date_basket};
use crate::ops::session::{Session, Settings, parse_quick_add};
use crate::store::TodoData;
use crate::util::calendar::Week;

type CmdResult = Result<(), Box<dyn Error>>;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> CmdResult {
    let json = cli.json;
    let config = config_io::load_config()?;
    let path = config_io::resolve_data_file(&config, cli.file.as_deref());
    debug!(path = %path.display(), "using data file");
    let storage = JsonStorage::new(path);
    let settings = Settings::from(&config);

    match cli.command {
        None if cli.text.is_empty() => {
            Err("nothing to add. Usage: td <task title> [\\\\ description]".into())
        }
        None => cmd_quick_add(&mut Session::open(storage, settings)?, &cli.text, json),
        Some(Commands::Add(args)) => cmd_add(&mut Session::open(storage, settings)?, args, json),
        Some(Commands::List(args)) => cmd_list(&Session::open(storage, settings)?, args, json),
        Some(Commands::Baskets) => cmd_baskets(&Session::open(storage, settings)?, json),
        Some(Commands::Done(args)) => cmd_done(&mut Session::open(storage, settings)?, args, json),
        Some(Commands::Mv(args)) => cmd_mv(&mut Session::open(storage, settings)?, args, json),
        Some(Commands::Rm(args)) => cmd_rm(&mut Session::open(storage, settings)?, args, json),
        Some(Commands::Rollover) => cmd_rollover(&mut Session::open(storage, settings)?, json),
        // reads the log only; opening a session could roll the week and save
        Some(Commands::Recovery(args)) => cmd_recovery(&storage, args, json),
    }
}

// ---------------------------------------------------------------------------
// Resolution helpers
// ---------------------------------------------------------------------------

/// Accept `Inbox`/`Later` in any case, a date key, or a day name of `week`.
fn resolve_basket(input: &str, week: &Week) -> Result<String, Box<dyn Error>> {
    if input.eq_ignore_ascii_case(INBOX) {
        return Ok(INBOX.to_string());
    }
    if input.eq_ignore_ascii_case(LATER) {
        return Ok(LATER.to_string());
    }
    if is_date_basket(input) {
        return Ok(input.to_string());
    }
    week.key_for_day(input)
        .ok_or_else(|| format!("unknown basket: {}", input).into())
}

/// Accept a full id or a prefix that matches exactly one task.
fn resolve_id(data: &TodoData, input: &str) -> Result<String, Box<dyn Error>> {
    if data.contains(input) {
        return Ok(input.to_string());
    }
    let matches: Vec<&str> = data.task_ids().filter(|id| id.starts_with(input)).collect();
    match matches.as_slice() {
        [] => Err(format!("task not found: {}", input).into()),
        [id] => Ok(id.to_string()),
        many => Err(format!(
            "ambiguous id prefix '{}' matches {} tasks",
            input,
            many.len()
        )
        .into()),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

fn report_added<S: TaskStorage>(session: &Session<S>, id: &str, basket: &str, json: bool) -> CmdResult {
    let task = session
        .data()
        .find_task(id)
        .ok_or_else(|| format!("task not found: {}", id))?;
    if json {
        return print_json(&task_to_json(task, true));
    }
    println!("Added to {}: {}", basket_label(basket), task.title);
    if !task.description.is_empty() {
        println!("  Description: {}", task.description);
    }
    Ok(())
}

fn cmd_quick_add<S: TaskStorage>(session: &mut Session<S>, words: &[String], json: bool) -> CmdResult {
    let text = words.join(" ");
    let id = session.quick_add(&text)?;
    report_added(session, &id, INBOX, json)
}

fn cmd_add<S: TaskStorage>(session: &mut Session<S>, args: AddArgs, json: bool) -> CmdResult {
    let basket = resolve_basket(&args.basket, &session.week())?;
    let parent = args
        .under
        .as_deref()
        .map(|p| resolve_id(session.data(), p))
        .transpose()?;
    let (title, description) = parse_quick_add(&args.text.join(" "));
    let id = session.add_task(&basket, &title, &description, parent.as_deref())?;
    let basket = session
        .data()
        .find_task_location(&id)
        .map(|loc| loc.basket)
        .unwrap_or(basket);
    report_added(session, &id, &basket, json)
}

fn cmd_done<S: TaskStorage>(session: &mut Session<S>, args: IdArg, json: bool) -> CmdResult {
    let id = resolve_id(session.data(), &args.id)?;
    let completed = session.toggle_complete(&id)?;
    let title = session
        .data()
        .find_task(&id)
        .map(|t| t.title.clone())
        .unwrap_or_default();
    if json {
        return print_json(&serde_json::json!({ "id": id, "completed": completed }));
    }
    if completed {
        println!("Completed: {}", title);
    } else {
        println!("Reopened: {}", title);
    }
    Ok(())
}

fn cmd_mv<S: TaskStorage>(session: &mut Session<S>, args: MvArgs, json: bool) -> CmdResult {
    let id = resolve_id(session.data(), &args.id)?;
    let basket = resolve_basket(&args.basket, &session.week())?;
    session.move_to_basket(&id, &basket)?;
    if json {
        return print_json(&serde_json::json!({ "id": id, "basket": basket }));
    }
    let title = session
        .data()
        .find_task(&id)
        .map(|t| t.title.clone())
        .unwrap_or_default();
    println!("Moved to {}: {}", basket_label(&basket), title);
    Ok(())
}

fn cmd_rm<S: TaskStorage>(session: &mut Session<S>, args: IdArg, json: bool) -> CmdResult {
    let id = resolve_id(session.data(), &args.id)?;
    let removed = session.delete(&id)?;
    let count = removed.subtree_len();
    if json {
        return print_json(&serde_json::json!({ "id": id, "removed": count }));
    }
    if count > 1 {
        println!("Deleted: {} (and {} subtasks)", removed.title, count - 1);
    } else {
        println!("Deleted: {}", removed.title);
    }
    Ok(())
}

fn cmd_rollover<S: TaskStorage>(session: &mut Session<S>, json: bool) -> CmdResult {
    let moved = session.rolled_on_open() + session.roll_week()?;
    if json {
        return print_json(&serde_json::json!({ "moved": moved }));
    }
    match moved {
        0 => println!("Nothing to roll over"),
        1 => println!("Moved 1 task to Inbox"),
        n => println!("Moved {} tasks to Inbox", n),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_list<S: TaskStorage>(session: &Session<S>, args: ListArgs, json: bool) -> CmdResult {
    let basket = match args.basket.as_deref() {
        Some(b) => resolve_basket(b, &session.week())?,
        None => INBOX.to_string(),
    };
    let tasks = session.data().tasks(&basket);
    if json {
        return print_json(&basket_tasks_json(&basket, tasks, args.all));
    }
    print!("{}", format_basket(&basket, tasks, args.all));
    Ok(())
}

fn cmd_baskets<S: TaskStorage>(session: &Session<S>, json: bool) -> CmdResult {
    let week = session.week();
    if json {
        return print_json(&baskets_json(session.data(), &week));
    }
    print!("{}", format_baskets(session.data(), &week));
    Ok(())
}

fn cmd_recovery(storage: &JsonStorage, args: RecoveryArgs, json: bool) -> CmdResult {
    let entries = read_recovery_entries(storage.data_dir(), args.limit);
    if json {
        let items: Vec<_> = entries.iter().map(recovery_entry_json).collect();
        return print_json(&items);
    }
    if entries.is_empty() {
        println!("No recovery entries.");
        return Ok(());
    }
    for entry in &entries {
        print!("{}", format_recovery_entry(entry));
        println!();
    }
    Ok(())
}
