use serde::Serialize;

use crate::io::recovery::RecoveryEntry;
use crate::model::basket::{INBOX, LATER};
use crate::model::task::Task;
use crate::ops::listing::{hidden_child_count, visible_rows};
use crate::store::TodoData;
use crate::util::calendar::{Week, date_to_day_name};
use crate::util::text::preview_line;

/// Characters of a description shown under its task.
const DESCRIPTION_PREVIEW_CHARS: usize = 60;

const SEPARATOR: &str = "───────────";

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskJson {
    pub id: String,
    pub title: String,
    pub completed: bool,
    pub collapsed: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TaskJson>,
}

#[derive(Serialize)]
pub struct BasketTasksJson {
    pub basket: String,
    pub tasks: Vec<TaskJson>,
}

#[derive(Serialize)]
pub struct BasketJson {
    pub key: String,
    pub label: String,
    pub open: usize,
    pub total: usize,
}

#[derive(Serialize)]
pub struct BasketsJson {
    pub week: String,
    pub week_open: usize,
    pub week_completed: usize,
    pub baskets: Vec<BasketJson>,
}

#[derive(Serialize)]
pub struct RecoveryEntryJson {
    pub timestamp: String,
    pub category: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<(String, String)>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub body: String,
}

/// JSON view of a task. Completed children are left out unless
/// `show_completed` is set.
pub fn task_to_json(task: &Task, show_completed: bool) -> TaskJson {
    TaskJson {
        id: task.id.clone(),
        title: task.title.clone(),
        completed: task.completed,
        collapsed: task.collapsed,
        description: task.description.clone(),
        created_at: task.created_at.clone(),
        children: task
            .children
            .iter()
            .filter(|c| show_completed || !c.completed)
            .map(|c| task_to_json(c, show_completed))
            .collect(),
    }
}

pub fn basket_tasks_json(basket: &str, tasks: &[Task], show_completed: bool) -> BasketTasksJson {
    BasketTasksJson {
        basket: basket.to_string(),
        tasks: tasks
            .iter()
            .filter(|t| show_completed || !t.completed)
            .map(|t| task_to_json(t, show_completed))
            .collect(),
    }
}

pub fn baskets_json(data: &TodoData, week: &Week) -> BasketsJson {
    let (week_open, week_completed) = data.week_task_counts_for(week);
    let keys = std::iter::once(INBOX.to_string())
        .chain(week.keys())
        .chain(std::iter::once(LATER.to_string()));
    BasketsJson {
        week: week.header_label(),
        week_open,
        week_completed,
        baskets: keys
            .map(|key| BasketJson {
                label: basket_label(&key),
                open: data.basket_count(&key, false),
                total: data.basket_count(&key, true),
                key,
            })
            .collect(),
    }
}

pub fn recovery_entry_json(entry: &RecoveryEntry) -> RecoveryEntryJson {
    RecoveryEntryJson {
        timestamp: entry
            .timestamp
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        category: entry.category.to_string(),
        description: entry.description.clone(),
        fields: entry.fields.clone(),
        body: entry.body.clone(),
    }
}

// ---------------------------------------------------------------------------
// Text output
// ---------------------------------------------------------------------------

/// First 8 characters of an id, enough to type back in.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// Human name for a basket key: day names for dates.
pub fn basket_label(key: &str) -> String {
    date_to_day_name(key)
        .map(|day| format!("{} {}", day, key))
        .unwrap_or_else(|| key.to_string())
}

/// One task line: `<id>  <indent><fold> <check> <title>[ (hidden)]`.
pub fn format_task_line(task: &Task, level: usize, show_completed: bool) -> String {
    let indent = "  ".repeat(level);
    let fold = match (task.children.is_empty(), task.collapsed) {
        (true, _) => ' ',
        (false, false) => '▼',
        (false, true) => '▶',
    };
    let check = if task.completed { '☑' } else { '☐' };
    let hidden = if !task.children.is_empty() && task.collapsed {
        format!(" ({})", hidden_child_count(task, show_completed))
    } else {
        String::new()
    };
    let mut line = format!(
        "{:<8}  {}{} {} {}{}",
        short_id(&task.id),
        indent,
        fold,
        check,
        task.title,
        hidden
    );
    if !task.description.is_empty() {
        line.push_str(&format!(
            "\n{:<8}  {}    {}",
            "",
            indent,
            preview_line(&task.description, DESCRIPTION_PREVIEW_CHARS)
        ));
    }
    line
}

/// A basket as an indented tree, with a heading line.
pub fn format_basket(basket: &str, tasks: &[Task], show_completed: bool) -> String {
    let mut out = format!("[{}]\n", basket_label(basket));
    let rows = visible_rows(tasks, show_completed);
    if rows.is_empty() {
        out.push_str("No tasks\n");
        return out;
    }
    for row in rows {
        out.push_str(&format_task_line(row.task, row.level, show_completed));
        out.push('\n');
    }
    out
}

/// The basket pane: Inbox, the week with its header, Later.
pub fn format_baskets(data: &TodoData, week: &Week) -> String {
    let (open, completed) = data.week_task_counts_for(week);
    let mut out = String::new();
    out.push_str(&format!("{} ({})\n", INBOX, data.basket_count(INBOX, false)));
    out.push_str(SEPARATOR);
    out.push('\n');
    out.push_str(&format!("{} ({}/{})\n", week.header_label(), open, completed));
    for key in week.keys() {
        out.push_str(&format!(
            "{} ({})\n",
            basket_label(&key),
            data.basket_count(&key, false)
        ));
    }
    out.push_str(SEPARATOR);
    out.push('\n');
    out.push_str(&format!("{} ({})\n", LATER, data.basket_count(LATER, false)));
    out
}

pub fn format_recovery_entry(entry: &RecoveryEntry) -> String {
    let mut out = format!(
        "{}  {}: {}\n",
        entry
            .timestamp
            .to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        entry.category,
        entry.description
    );
    for (key, value) in &entry.fields {
        out.push_str(&format!("  {}: {}\n", key, value));
    }
    if !entry.body.is_empty() {
        for line in entry.body.lines() {
            out.push_str(&format!("    {}\n", line));
        }
    }
    out
}
