use tracing::debug;

use super::{Slot, StoreError, TodoData};
use crate::model::task::Task;

/// Direction for [`TodoData::shift`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Up,
    Down,
}

/// Mutable access to one task's own fields. The children list is not
/// reachable through it, so the index cannot go stale.
pub struct TaskEdit<'a> {
    task: &'a mut Task,
}

impl TaskEdit<'_> {
    pub fn task(&self) -> &Task {
        self.task
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.task.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.task.description = description.into();
    }

    pub fn set_completed(&mut self, completed: bool) {
        self.task.completed = completed;
    }

    /// Flip `completed` and return the new value.
    pub fn toggle_completed(&mut self) -> bool {
        self.task.completed = !self.task.completed;
        self.task.completed
    }

    pub fn set_collapsed(&mut self, collapsed: bool) {
        self.task.collapsed = collapsed;
    }

    pub fn toggle_collapsed(&mut self) -> bool {
        self.task.collapsed = !self.task.collapsed;
        self.task.collapsed
    }

    /// Collapse or expand this task and every descendant that has children.
    /// Leaves are left alone. Returns how many flags changed.
    pub fn set_collapsed_recursive(&mut self, collapsed: bool) -> usize {
        set_collapsed_recursive(self.task, collapsed)
    }
}

fn set_collapsed_recursive(task: &mut Task, collapsed: bool) -> usize {
    let mut changed = 0;
    if !task.children.is_empty() && task.collapsed != collapsed {
        task.collapsed = collapsed;
        changed += 1;
    }
    for child in task.children.iter_mut() {
        changed += set_collapsed_recursive(child, collapsed);
    }
    changed
}

impl TodoData {
    /// Edit handle for a task's own fields.
    pub fn edit(&mut self, task_id: &str) -> Option<TaskEdit<'_>> {
        self.task_mut(task_id).map(|task| TaskEdit { task })
    }

    /// The list a task sits in: its basket's roots or its parent's children.
    pub fn siblings(&self, task_id: &str) -> Option<&[Task]> {
        match self.index.get(task_id)? {
            Slot::Root(basket) => Some(self.tasks(basket)),
            Slot::Child(parent) => self.find_task(parent).map(|p| p.children.as_slice()),
        }
    }

    /// `(index, sibling count)` of a task within its list.
    pub fn sibling_position(&self, task_id: &str) -> Option<(usize, usize)> {
        let siblings = self.siblings(task_id)?;
        let position = siblings.iter().position(|t| t.id == task_id)?;
        Some((position, siblings.len()))
    }

    /// Nesting level of a task; 0 at a basket root.
    pub fn depth(&self, task_id: &str) -> Option<usize> {
        self.ancestry(task_id).map(|(_, chain)| chain.len() - 1)
    }

    /// Levels in the subtree rooted at `task_id`; 1 for a leaf.
    pub fn subtree_height(&self, task_id: &str) -> Option<usize> {
        self.find_task(task_id).map(Task::height)
    }

    /// Make a task the last child of its previous sibling, which is then
    /// expanded so the task stays visible. Returns the new parent's id.
    pub fn nest_under_previous_sibling(&mut self, task_id: &str) -> Result<String, StoreError> {
        let (position, _) = self
            .sibling_position(task_id)
            .ok_or_else(|| StoreError::NotFound(task_id.to_string()))?;
        if position == 0 {
            return Err(StoreError::InvalidPosition(format!(
                "{} has no previous sibling",
                task_id
            )));
        }
        let new_parent = self
            .siblings(task_id)
            .and_then(|s| s.get(position - 1))
            .map(|t| t.id.clone())
            .ok_or_else(|| StoreError::NotFound(task_id.to_string()))?;

        self.relocate(task_id, Slot::Child(new_parent.clone()), None)?;
        if let Some(parent) = self.task_mut(&new_parent) {
            parent.collapsed = false;
        }
        debug!(task_id, parent_id = %new_parent, "task nested");
        Ok(new_parent)
    }

    /// Move a child task up one level, directly after its former parent.
    pub fn unnest(&mut self, task_id: &str) -> Result<(), StoreError> {
        let parent_id = match self.index.get(task_id) {
            None => return Err(StoreError::NotFound(task_id.to_string())),
            Some(Slot::Root(_)) => {
                return Err(StoreError::InvalidPosition(format!(
                    "{} is already at the top level",
                    task_id
                )));
            }
            Some(Slot::Child(parent)) => parent.clone(),
        };
        let grandparent_slot = self
            .index
            .get(&parent_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(parent_id.clone()))?;
        let (parent_position, _) = self
            .sibling_position(&parent_id)
            .ok_or_else(|| StoreError::NotFound(parent_id.clone()))?;

        self.relocate(task_id, grandparent_slot, Some(parent_position + 1))?;
        debug!(task_id, former_parent = %parent_id, "task unnested");
        Ok(())
    }

    /// Swap a task with its neighbour above or below.
    pub fn shift(&mut self, task_id: &str, direction: Shift) -> Result<(), StoreError> {
        let slot = self
            .index
            .get(task_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(task_id.to_string()))?;
        let siblings = self
            .siblings_mut(&slot)
            .ok_or_else(|| StoreError::NotFound(task_id.to_string()))?;
        let position = siblings
            .iter()
            .position(|t| t.id == task_id)
            .ok_or_else(|| StoreError::NotFound(task_id.to_string()))?;
        let other = match direction {
            Shift::Up => position.checked_sub(1),
            Shift::Down => Some(position + 1).filter(|&i| i < siblings.len()),
        }
        .ok_or_else(|| {
            StoreError::InvalidPosition(format!("{} cannot move {:?}", task_id, direction))
        })?;
        siblings.swap(position, other);
        debug!(task_id, ?direction, "task shifted");
        Ok(())
    }

    /// Collapse or expand every task with children in a basket. Returns how
    /// many flags changed.
    pub fn set_collapsed_all(&mut self, basket: &str, collapsed: bool) -> usize {
        self.baskets.get_mut(basket).map_or(0, |tasks| {
            tasks
                .iter_mut()
                .map(|t| set_collapsed_recursive(t, collapsed))
                .sum()
        })
    }
}
