//! The task store: every basket's tree plus an id index over all of it.
//!
//! `TodoData` owns the tasks. The index is a side-table mapping each id to
//! the slot it hangs in (a basket root or a parent task), so parents can be
//! found without back-references in [`Task`]. Only methods in this module
//! tree touch `baskets`, which keeps the two in step.

mod snapshot;
mod structure;
mod week;

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::model::basket::{INBOX, LATER, is_date_basket, is_valid_basket};
use crate::model::task::Task;
use crate::util::calendar::Week;

pub use snapshot::Snapshot;
pub use structure::{Shift, TaskEdit};

/// Error type for store operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("invalid basket: {0}")]
    InvalidBasket(String),
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("parent task not found: {0}")]
    ParentNotFound(String),
    #[error("task id already in use: {0}")]
    DuplicateId(String),
    #[error("cannot move task {0} beneath itself")]
    WouldCreateCycle(String),
    #[error("invalid position: {0}")]
    InvalidPosition(String),
}

/// Where a task hangs: at the root of a basket or under a parent task.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Root(String),
    Child(String),
}

/// Basket and direct parent of a task, as reported by
/// [`TodoData::find_task_location`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskLocation {
    pub basket: String,
    pub parent_id: Option<String>,
}

/// All baskets and their task trees.
#[derive(Debug, Clone)]
pub struct TodoData {
    baskets: IndexMap<String, Vec<Task>>,
    index: HashMap<String, Slot>,
}

impl Default for TodoData {
    fn default() -> Self {
        Self::new()
    }
}

impl TodoData {
    /// Empty store seeded with Inbox, the current week's dates, and Later.
    pub fn new() -> Self {
        Self::new_for_week(&Week::current())
    }

    pub fn new_for_week(week: &Week) -> Self {
        let mut baskets = IndexMap::new();
        baskets.insert(INBOX.to_string(), Vec::new());
        for key in week.keys() {
            baskets.insert(key, Vec::new());
        }
        baskets.insert(LATER.to_string(), Vec::new());
        TodoData {
            baskets,
            index: HashMap::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    /// Basket keys in display order: Inbox, date keys ascending, Later.
    pub fn basket_keys(&self) -> Vec<&str> {
        let mut dates: Vec<&str> = self
            .baskets
            .keys()
            .map(String::as_str)
            .filter(|k| is_date_basket(k))
            .collect();
        dates.sort_unstable();

        let mut keys = Vec::with_capacity(dates.len() + 2);
        keys.push(INBOX);
        keys.extend(dates);
        keys.push(LATER);
        keys
    }

    pub fn has_basket(&self, basket: &str) -> bool {
        self.baskets.contains_key(basket)
    }

    /// Root tasks of a basket. Empty for an unknown basket.
    pub fn tasks(&self, basket: &str) -> &[Task] {
        self.baskets.get(basket).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of tasks in the store, at every depth.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.index.contains_key(task_id)
    }

    /// Every task id in the store, in no particular order.
    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.index.keys().map(String::as_str)
    }

    /// Look up a task anywhere in the store.
    ///
    /// The index gives the parent chain; each step scans one sibling list,
    /// so the cost grows with depth and list width, not store size.
    pub fn find_task(&self, task_id: &str) -> Option<&Task> {
        let (basket, chain) = self.ancestry(task_id)?;
        let mut list = self.baskets.get(basket)?.as_slice();
        let mut found = None;
        for step in chain {
            let task = list.iter().find(|t| t.id == step)?;
            list = &task.children;
            found = Some(task);
        }
        found
    }

    /// Basket and direct parent of a task.
    pub fn find_task_location(&self, task_id: &str) -> Option<TaskLocation> {
        let (basket, _) = self.ancestry(task_id)?;
        let parent_id = match self.index.get(task_id)? {
            Slot::Root(_) => None,
            Slot::Child(parent) => Some(parent.clone()),
        };
        Some(TaskLocation {
            basket: basket.to_string(),
            parent_id,
        })
    }

    /// Count tasks in a basket at every depth. Each task's own `completed`
    /// flag decides whether it counts; its children are judged separately.
    pub fn basket_count(&self, basket: &str, include_completed: bool) -> usize {
        count_matching(self.tasks(basket), &|t: &Task| {
            include_completed || !t.completed
        })
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Add `task` (with its subtree) to a basket root, or as the last child
    /// of `parent_id`.
    ///
    /// With a parent, the task lands in whichever basket the parent lives
    /// in; `basket` must still be a valid key.
    pub fn add_task(
        &mut self,
        basket: &str,
        task: Task,
        parent_id: Option<&str>,
    ) -> Result<(), StoreError> {
        if !is_valid_basket(basket) {
            return Err(StoreError::InvalidBasket(basket.to_string()));
        }
        self.check_new_ids(&task)?;

        let id = task.id.clone();
        match parent_id {
            Some(pid) => {
                let entries = slots_for(&task, Slot::Child(pid.to_string()));
                let parent = self
                    .task_mut(pid)
                    .ok_or_else(|| StoreError::ParentNotFound(pid.to_string()))?;
                parent.children.push(task);
                self.index.extend(entries);
            }
            None => {
                let entries = slots_for(&task, Slot::Root(basket.to_string()));
                self.baskets.entry(basket.to_string()).or_default().push(task);
                self.index.extend(entries);
            }
        }
        debug!(task_id = %id, basket, parent_id, "task added");
        Ok(())
    }

    /// Move a task and its subtree to the root of `to_basket`, or to the end
    /// of `to_parent_id`'s children.
    ///
    /// The destination is checked before anything is detached, so a failed
    /// move leaves the store untouched.
    pub fn move_task(
        &mut self,
        task_id: &str,
        to_basket: &str,
        to_parent_id: Option<&str>,
    ) -> Result<(), StoreError> {
        if !is_valid_basket(to_basket) {
            return Err(StoreError::InvalidBasket(to_basket.to_string()));
        }
        if !self.contains(task_id) {
            return Err(StoreError::NotFound(task_id.to_string()));
        }
        let slot = match to_parent_id {
            Some(pid) => {
                let (_, chain) = self
                    .ancestry(pid)
                    .ok_or_else(|| StoreError::ParentNotFound(pid.to_string()))?;
                if chain.contains(&task_id) {
                    return Err(StoreError::WouldCreateCycle(task_id.to_string()));
                }
                Slot::Child(pid.to_string())
            }
            None => Slot::Root(to_basket.to_string()),
        };
        self.relocate(task_id, slot, None)?;
        debug!(task_id, to_basket, to_parent_id, "task moved");
        Ok(())
    }

    /// Remove a task and its whole subtree, returning it.
    pub fn delete_task(&mut self, task_id: &str) -> Result<Task, StoreError> {
        let (task, _, _) = self
            .detach(task_id)
            .ok_or_else(|| StoreError::NotFound(task_id.to_string()))?;
        let index = &mut self.index;
        task.walk(&mut |t, _| {
            index.remove(&t.id);
        });
        debug!(task_id, removed = task.subtree_len(), "task deleted");
        Ok(task)
    }

    // -----------------------------------------------------------------------
    // Internals shared with the submodules
    // -----------------------------------------------------------------------

    /// Basket of `task_id` and the ids from its root ancestor down to it.
    fn ancestry(&self, task_id: &str) -> Option<(&str, Vec<&str>)> {
        let mut chain = Vec::new();
        let mut current = self.index.get_key_value(task_id)?.0.as_str();
        loop {
            chain.push(current);
            match self.index.get(current)? {
                Slot::Root(basket) => {
                    chain.reverse();
                    return Some((basket.as_str(), chain));
                }
                Slot::Child(parent) => {
                    // a corrupted index could loop forever
                    if chain.len() > self.index.len() {
                        return None;
                    }
                    current = parent.as_str();
                }
            }
        }
    }

    fn task_mut(&mut self, task_id: &str) -> Option<&mut Task> {
        let (basket, chain) = self.ancestry(task_id)?;
        let basket = basket.to_string();
        let chain: Vec<String> = chain.into_iter().map(str::to_string).collect();

        let (last, path) = chain.split_last()?;
        let mut list = self.baskets.get_mut(&basket)?;
        for step in path {
            let task = list.iter_mut().find(|t| t.id == *step)?;
            list = &mut task.children;
        }
        list.iter_mut().find(|t| t.id == *last)
    }

    fn siblings_mut(&mut self, slot: &Slot) -> Option<&mut Vec<Task>> {
        match slot {
            Slot::Root(basket) => self.baskets.get_mut(basket),
            Slot::Child(parent_id) => self.task_mut(parent_id).map(|t| &mut t.children),
        }
    }

    /// Take a task out of its sibling list. Index entries are left for the
    /// caller to update.
    fn detach(&mut self, task_id: &str) -> Option<(Task, Slot, usize)> {
        let slot = self.index.get(task_id)?.clone();
        let siblings = self.siblings_mut(&slot)?;
        let position = siblings.iter().position(|t| t.id == task_id)?;
        let task = siblings.remove(position);
        Some((task, slot, position))
    }

    /// Insert a task into `slot` at `position` (end when None or past the
    /// end). Hands the task back if the slot does not resolve.
    fn attach(&mut self, task: Task, slot: Slot, position: Option<usize>) -> Result<(), Task> {
        let id = task.id.clone();
        let siblings = match &slot {
            Slot::Root(basket) => self.baskets.entry(basket.clone()).or_default(),
            Slot::Child(parent_id) => match self.task_mut(parent_id) {
                Some(parent) => &mut parent.children,
                None => return Err(task),
            },
        };
        match position {
            Some(pos) if pos <= siblings.len() => siblings.insert(pos, task),
            _ => siblings.push(task),
        }
        self.index.insert(id, slot);
        Ok(())
    }

    /// Detach then attach, restoring the original position if the target
    /// slot has gone away in between.
    fn relocate(
        &mut self,
        task_id: &str,
        slot: Slot,
        position: Option<usize>,
    ) -> Result<(), StoreError> {
        let (task, old_slot, old_position) = self
            .detach(task_id)
            .ok_or_else(|| StoreError::NotFound(task_id.to_string()))?;
        let target = match &slot {
            Slot::Root(basket) => basket.clone(),
            Slot::Child(parent) => parent.clone(),
        };
        if let Err(task) = self.attach(task, slot, position) {
            if let Err(task) = self.attach(task, old_slot, Some(old_position)) {
                warn!(task_id = %task.id, "task lost its slot during move, parking in Inbox");
                let _ = self.attach(task, Slot::Root(INBOX.to_string()), None);
            }
            return Err(StoreError::ParentNotFound(target));
        }
        Ok(())
    }

    fn check_new_ids(&self, task: &Task) -> Result<(), StoreError> {
        let mut seen = HashSet::new();
        let mut clash = None;
        task.walk(&mut |t, _| {
            if clash.is_none() && (self.index.contains_key(&t.id) || !seen.insert(t.id.clone())) {
                clash = Some(t.id.clone());
            }
        });
        match clash {
            Some(id) => Err(StoreError::DuplicateId(id)),
            None => Ok(()),
        }
    }

    /// Recompute the index from the trees.
    fn rebuild_index(&mut self) {
        self.index.clear();
        for (basket, tasks) in &self.baskets {
            for task in tasks {
                index_into(&mut self.index, task, Slot::Root(basket.clone()));
            }
        }
    }

    /// Give a fresh id to every task whose id was already seen earlier in
    /// basket order. Returns how many were changed.
    fn reassign_duplicate_ids(&mut self) -> usize {
        let mut seen = HashSet::new();
        let mut reassigned = 0;
        for tasks in self.baskets.values_mut() {
            for task in tasks.iter_mut() {
                reassign_duplicates(task, &mut seen, &mut reassigned);
            }
        }
        reassigned
    }
}

fn index_into(index: &mut HashMap<String, Slot>, task: &Task, slot: Slot) {
    index.insert(task.id.clone(), slot);
    for child in &task.children {
        index_into(index, child, Slot::Child(task.id.clone()));
    }
}

/// Index entries for a subtree that is about to be inserted at `slot`.
fn slots_for(task: &Task, slot: Slot) -> Vec<(String, Slot)> {
    let mut entries = HashMap::new();
    index_into(&mut entries, task, slot);
    entries.into_iter().collect()
}

fn reassign_duplicates(task: &mut Task, seen: &mut HashSet<String>, reassigned: &mut usize) {
    if !seen.insert(task.id.clone()) {
        let fresh = Uuid::new_v4().to_string();
        warn!(old_id = %task.id, new_id = %fresh, "duplicate task id, assigned a fresh one");
        task.id = fresh.clone();
        seen.insert(fresh);
        *reassigned += 1;
    }
    for child in task.children.iter_mut() {
        reassign_duplicates(child, seen, reassigned);
    }
}

fn count_matching(tasks: &[Task], pred: &dyn Fn(&Task) -> bool) -> usize {
    tasks
        .iter()
        .map(|t| usize::from(pred(t)) + count_matching(&t.children, pred))
        .sum()
}
