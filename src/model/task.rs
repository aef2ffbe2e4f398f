use std::fmt;

use chrono::Local;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::util::text::clip_chars;

/// Maximum title length in code points.
pub const MAX_TITLE_CHARS: usize = 512;
/// Maximum description length in code points.
pub const MAX_DESCRIPTION_CHARS: usize = 4096;

/// A task and its subtree.
///
/// Children are owned outright: moving or deleting a task always takes the
/// whole subtree with it. There is no parent back-reference; the store keeps
/// a side-table for that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Stable identifier, unique across the whole store
    pub id: String,
    /// Task title (clipped to [`MAX_TITLE_CHARS`] on load)
    #[serde(deserialize_with = "clipped_title")]
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    /// Children hidden in the view; meaningless without children
    #[serde(default)]
    pub collapsed: bool,
    /// Subtasks, in display order
    #[serde(default)]
    pub children: Vec<Task>,
    /// Creation time, set once
    #[serde(default = "timestamp_now")]
    pub created_at: String,
    /// Free-form notes (clipped to [`MAX_DESCRIPTION_CHARS`] on load)
    #[serde(default, deserialize_with = "clipped_description")]
    pub description: String,
}

impl Task {
    /// Create a task with a fresh id and the current timestamp.
    pub fn new(title: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), title)
    }

    /// Create a task with a caller-chosen id.
    pub fn with_id(id: impl Into<String>, title: impl Into<String>) -> Self {
        Task {
            id: id.into(),
            title: title.into(),
            completed: false,
            collapsed: false,
            children: Vec::new(),
            created_at: timestamp_now(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_completed(mut self, completed: bool) -> Self {
        self.completed = completed;
        self
    }

    /// Append a child. Id uniqueness is the store's job, not checked here.
    pub fn add_child(&mut self, task: Task) {
        self.children.push(task);
    }

    /// Remove the first direct child with the given id. Grandchildren are
    /// not searched.
    pub fn remove_child(&mut self, task_id: &str) -> Option<Task> {
        let idx = self.children.iter().position(|c| c.id == task_id)?;
        Some(self.children.remove(idx))
    }

    /// Depth-first search of this task and its descendants.
    pub fn find_task(&self, task_id: &str) -> Option<&Task> {
        if self.id == task_id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find_task(task_id))
    }

    pub fn find_task_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        if self.id == task_id {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|c| c.find_task_mut(task_id))
    }

    /// Direct parent of `task_id` within this subtree. None when `task_id`
    /// is this task or is absent.
    pub fn find_parent(&self, task_id: &str) -> Option<&Task> {
        for child in &self.children {
            if child.id == task_id {
                return Some(self);
            }
            if let Some(parent) = child.find_parent(task_id) {
                return Some(parent);
            }
        }
        None
    }

    /// Number of tasks in this subtree, including self.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Task::subtree_len).sum::<usize>()
    }

    /// Levels in this subtree: 1 for a leaf.
    pub fn height(&self) -> usize {
        1 + self.children.iter().map(Task::height).max().unwrap_or(0)
    }

    /// Visit every task in this subtree, pre-order, with its depth relative
    /// to this task.
    pub fn walk(&self, f: &mut dyn FnMut(&Task, usize)) {
        walk_at(self, 0, f);
    }

    /// Ids of every task in this subtree, pre-order.
    pub fn subtree_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        self.walk(&mut |t, _| ids.push(t.id.clone()));
        ids
    }
}

fn walk_at(task: &Task, depth: usize, f: &mut dyn FnMut(&Task, usize)) {
    f(task, depth);
    for child in &task.children {
        walk_at(child, depth + 1, f);
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short_id: String = self.id.chars().take(8).collect();
        write!(
            f,
            "Task(id={}, title='{}', completed={}, children={})",
            short_id,
            self.title,
            self.completed,
            self.children.len()
        )
    }
}

/// Current local time in ISO-8601 with microseconds.
pub fn timestamp_now() -> String {
    Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

fn clipped_title<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let title = String::deserialize(deserializer)?;
    Ok(clip_chars(title, MAX_TITLE_CHARS))
}

fn clipped_description<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let description = String::deserialize(deserializer)?;
    Ok(clip_chars(description, MAX_DESCRIPTION_CHARS))
}
