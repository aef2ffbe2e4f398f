use indexmap::IndexSet;

use crate::store::TodoData;

/// Tasks picked for a bulk action, in the order they were marked. Never
/// persisted.
#[derive(Debug, Clone, Default)]
pub struct Marks {
    ids: IndexSet<String>,
}

impl Marks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark or unmark a task. Returns true when it is now marked.
    pub fn toggle(&mut self, task_id: &str) -> bool {
        if self.ids.shift_remove(task_id) {
            false
        } else {
            self.ids.insert(task_id.to_string());
            true
        }
    }

    pub fn is_marked(&self, task_id: &str) -> bool {
        self.ids.contains(task_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Marked ids that still exist in `data`, in marking order.
    pub fn live_ids(&self, data: &TodoData) -> Vec<String> {
        self.ids
            .iter()
            .filter(|id| data.contains(id))
            .cloned()
            .collect()
    }

    /// Like [`Marks::live_ids`], minus any task whose ancestor is also
    /// marked. Acting on the ancestor already covers it.
    pub fn outermost_ids(&self, data: &TodoData) -> Vec<String> {
        let live = self.live_ids(data);
        live.iter()
            .filter(|id| !self.has_marked_ancestor(data, id))
            .cloned()
            .collect()
    }

    fn has_marked_ancestor(&self, data: &TodoData, task_id: &str) -> bool {
        let mut current = data
            .find_task_location(task_id)
            .and_then(|loc| loc.parent_id);
        while let Some(parent) = current {
            if self.is_marked(&parent) {
                return true;
            }
            current = data
                .find_task_location(&parent)
                .and_then(|loc| loc.parent_id);
        }
        false
    }
}
