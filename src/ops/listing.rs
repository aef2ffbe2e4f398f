use crate::model::task::Task;

/// One visible line of a basket: a task and its nesting level.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    pub task: &'a Task,
    pub level: usize,
}

/// Flatten a basket into the rows a viewer would show, pre-order.
///
/// Completed tasks (and everything under them) are hidden unless
/// `show_completed` is set. Children of a collapsed task are hidden.
pub fn visible_rows(tasks: &[Task], show_completed: bool) -> Vec<Row<'_>> {
    let mut rows = Vec::new();
    push_rows(tasks, 0, show_completed, &mut rows);
    rows
}

fn push_rows<'a>(tasks: &'a [Task], level: usize, show_completed: bool, rows: &mut Vec<Row<'a>>) {
    for task in tasks {
        if task.completed && !show_completed {
            continue;
        }
        rows.push(Row { task, level });
        if !task.collapsed {
            push_rows(&task.children, level + 1, show_completed, rows);
        }
    }
}

/// Direct children a collapsed task is hiding, as shown in its `(n)` hint.
pub fn hidden_child_count(task: &Task, show_completed: bool) -> usize {
    task.children
        .iter()
        .filter(|c| show_completed || !c.completed)
        .count()
}
