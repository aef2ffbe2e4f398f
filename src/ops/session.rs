//! The application controller.
//!
//! A [`Session`] owns the loaded store and runs every user-level action the
//! same way: snapshot the store, apply the change, write it through to
//! storage. Snapshots go on the undo history only when the change
//! succeeded; a failed action puts the store back as it was.

use chrono::Local;
use tracing::{debug, info};

use crate::io::storage::{StorageError, TaskStorage};
use crate::model::basket::INBOX;
use crate::model::config::Config;
use crate::model::task::{MAX_DESCRIPTION_CHARS, MAX_TITLE_CHARS, Task};
use crate::ops::history::History;
use crate::ops::marks::Marks;
use crate::store::{Shift, Snapshot, StoreError, TodoData};
use crate::util::calendar::Week;
use crate::util::text::char_len;

/// Separator between title and description in quick-add text.
pub const QUICK_ADD_SEPARATOR: &str = " \\\\ ";

/// Error type for session actions
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("task title cannot be empty")]
    EmptyTitle,
    #[error("{field} too long: {len} characters (max {max})")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
    #[error("maximum nesting depth ({0}) reached")]
    MaxDepth(usize),
    #[error("no tasks marked")]
    NoMarks,
}

/// Tunables a session runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub transition_hour: u32,
    pub history_limit: usize,
    pub max_nesting_depth: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings::from(&Config::default())
    }
}

impl From<&Config> for Settings {
    fn from(config: &Config) -> Self {
        Settings {
            transition_hour: config.transition_hour,
            history_limit: config.history_limit,
            max_nesting_depth: config.max_nesting_depth,
        }
    }
}

impl Settings {
    /// The week that is current right now under these settings.
    pub fn current_week(&self) -> Week {
        Week::current_at(Local::now().naive_local(), self.transition_hour)
    }
}

/// Split quick-add text into title and description at the first
/// ` \\ `. Both halves are trimmed.
pub fn parse_quick_add(text: &str) -> (String, String) {
    match text.split_once(QUICK_ADD_SEPARATOR) {
        Some((title, description)) => (title.trim().to_string(), description.trim().to_string()),
        None => (text.trim().to_string(), String::new()),
    }
}

pub struct Session<S: TaskStorage> {
    data: TodoData,
    storage: S,
    history: History,
    marks: Marks,
    settings: Settings,
    week: Week,
    rolled_on_open: usize,
}

impl<S: TaskStorage> Session<S> {
    /// Load from storage and roll the week forward if it has turned.
    pub fn open(storage: S, settings: Settings) -> Result<Self, SessionError> {
        let week = settings.current_week();
        Self::open_in_week(storage, settings, week)
    }

    /// Like [`Session::open`] with a fixed notion of "this week".
    pub fn open_in_week(storage: S, settings: Settings, week: Week) -> Result<Self, SessionError> {
        let data = storage.load_in_week(&week)?;
        let mut session = Session {
            data,
            storage,
            history: History::with_limit(settings.history_limit),
            marks: Marks::new(),
            settings,
            week,
            rolled_on_open: 0,
        };
        session.rolled_on_open = session.roll_week_to(week)?;
        Ok(session)
    }

    pub fn data(&self) -> &TodoData {
        &self.data
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn week(&self) -> Week {
        self.week
    }

    /// Tasks the rollover at open time moved into Inbox.
    pub fn rolled_on_open(&self) -> usize {
        self.rolled_on_open
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn marks(&self) -> &Marks {
        &self.marks
    }

    // -----------------------------------------------------------------------
    // Plumbing
    // -----------------------------------------------------------------------

    fn save(&self) -> Result<(), SessionError> {
        self.storage.save(&self.data)?;
        Ok(())
    }

    /// Run one undoable change.
    fn mutate<T>(
        &mut self,
        action: impl FnOnce(&mut TodoData) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        let before = self.data.to_snapshot();
        match action(&mut self.data) {
            Ok(value) => {
                self.history.push(before);
                self.save()?;
                Ok(value)
            }
            Err(e) => {
                self.restore(before);
                Err(e)
            }
        }
    }

    /// Replace the store with `snapshot`, rolled forward to the session's
    /// week. History may predate a rollover.
    fn restore(&mut self, snapshot: Snapshot) {
        self.data = TodoData::from_snapshot_in_week(snapshot, &self.week);
        let moved = self.data.perform_week_transition(&self.week);
        if moved > 0 {
            debug!(moved, "restored snapshot rolled into the current week");
        }
    }

    fn check_title(title: &str) -> Result<(), SessionError> {
        if title.trim().is_empty() {
            return Err(SessionError::EmptyTitle);
        }
        check_len("title", title, MAX_TITLE_CHARS)
    }

    /// 1-based level the deepest task of `task_id`'s subtree would reach
    /// if `task_id` sat at `new_depth`.
    fn deepest_level_at(&self, task_id: &str, new_depth: usize) -> usize {
        new_depth + self.data.subtree_height(task_id).unwrap_or(1)
    }

    // -----------------------------------------------------------------------
    // Adding and editing
    // -----------------------------------------------------------------------

    /// Add a task to a basket root or under `parent_id`. Returns its id.
    pub fn add_task(
        &mut self,
        basket: &str,
        title: &str,
        description: &str,
        parent_id: Option<&str>,
    ) -> Result<String, SessionError> {
        let title = title.trim();
        Self::check_title(title)?;
        check_len("description", description, MAX_DESCRIPTION_CHARS)?;
        if let Some(pid) = parent_id {
            let parent_depth = self
                .data
                .depth(pid)
                .ok_or_else(|| StoreError::ParentNotFound(pid.to_string()))?;
            if parent_depth + 2 > self.settings.max_nesting_depth {
                return Err(SessionError::MaxDepth(self.settings.max_nesting_depth));
            }
        }

        let task = Task::new(title).with_description(description);
        let id = task.id.clone();
        self.mutate(|data| Ok(data.add_task(basket, task, parent_id)?))?;
        Ok(id)
    }

    /// Add to Inbox from `title \\ description` text.
    pub fn quick_add(&mut self, text: &str) -> Result<String, SessionError> {
        let (title, description) = parse_quick_add(text);
        self.add_task(INBOX, &title, &description, None)
    }

    pub fn edit_title(&mut self, task_id: &str, title: &str) -> Result<(), SessionError> {
        let title = title.trim();
        Self::check_title(title)?;
        self.mutate(|data| {
            data.edit(task_id)
                .ok_or_else(|| StoreError::NotFound(task_id.to_string()))?
                .set_title(title);
            Ok(())
        })
    }

    pub fn edit_description(&mut self, task_id: &str, description: &str) -> Result<(), SessionError> {
        check_len("description", description, MAX_DESCRIPTION_CHARS)?;
        self.mutate(|data| {
            data.edit(task_id)
                .ok_or_else(|| StoreError::NotFound(task_id.to_string()))?
                .set_description(description.trim_end());
            Ok(())
        })
    }

    // -----------------------------------------------------------------------
    // Flags
    // -----------------------------------------------------------------------

    /// Flip completion. Returns the new state.
    pub fn toggle_complete(&mut self, task_id: &str) -> Result<bool, SessionError> {
        self.mutate(|data| {
            Ok(data
                .edit(task_id)
                .ok_or_else(|| StoreError::NotFound(task_id.to_string()))?
                .toggle_completed())
        })
    }

    pub fn toggle_collapse(&mut self, task_id: &str) -> Result<bool, SessionError> {
        self.mutate(|data| {
            Ok(data
                .edit(task_id)
                .ok_or_else(|| StoreError::NotFound(task_id.to_string()))?
                .toggle_collapsed())
        })
    }

    /// Collapse a task. A leaf or an already collapsed task collapses its
    /// parent instead. Returns the id that was collapsed, or None when
    /// there was nothing to do.
    pub fn collapse(&mut self, task_id: &str) -> Result<Option<String>, SessionError> {
        let task = self
            .data
            .find_task(task_id)
            .ok_or_else(|| StoreError::NotFound(task_id.to_string()))?;
        let target = if !task.children.is_empty() && !task.collapsed {
            Some(task_id.to_string())
        } else {
            self.data
                .find_task_location(task_id)
                .and_then(|loc| loc.parent_id)
                .filter(|pid| self.data.find_task(pid).is_some_and(|p| !p.collapsed))
        };
        let Some(target) = target else {
            return Ok(None);
        };
        self.mutate(|data| {
            data.edit(&target)
                .ok_or_else(|| StoreError::NotFound(target.clone()))?
                .set_collapsed(true);
            Ok(())
        })?;
        Ok(Some(target))
    }

    /// Expand a collapsed task that has children. Returns whether anything
    /// changed.
    pub fn expand(&mut self, task_id: &str) -> Result<bool, SessionError> {
        let task = self
            .data
            .find_task(task_id)
            .ok_or_else(|| StoreError::NotFound(task_id.to_string()))?;
        if task.children.is_empty() || !task.collapsed {
            return Ok(false);
        }
        self.mutate(|data| {
            data.edit(task_id)
                .ok_or_else(|| StoreError::NotFound(task_id.to_string()))?
                .set_collapsed(false);
            Ok(())
        })?;
        Ok(true)
    }

    /// Collapse a task and every descendant with children.
    pub fn collapse_subtree(&mut self, task_id: &str) -> Result<usize, SessionError> {
        self.set_subtree_collapsed(task_id, true)
    }

    pub fn expand_subtree(&mut self, task_id: &str) -> Result<usize, SessionError> {
        self.set_subtree_collapsed(task_id, false)
    }

    fn set_subtree_collapsed(&mut self, task_id: &str, collapsed: bool) -> Result<usize, SessionError> {
        self.mutate(|data| {
            Ok(data
                .edit(task_id)
                .ok_or_else(|| StoreError::NotFound(task_id.to_string()))?
                .set_collapsed_recursive(collapsed))
        })
    }

    /// Collapse every task with children in a basket.
    pub fn collapse_all(&mut self, basket: &str) -> Result<usize, SessionError> {
        self.mutate(|data| Ok(data.set_collapsed_all(basket, true)))
    }

    pub fn expand_all(&mut self, basket: &str) -> Result<usize, SessionError> {
        self.mutate(|data| Ok(data.set_collapsed_all(basket, false)))
    }

    // -----------------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------------

    pub fn delete(&mut self, task_id: &str) -> Result<Task, SessionError> {
        let removed = self.mutate(|data| Ok(data.delete_task(task_id)?))?;
        self.marks.clear();
        Ok(removed)
    }

    pub fn move_to_basket(&mut self, task_id: &str, basket: &str) -> Result<(), SessionError> {
        self.mutate(|data| Ok(data.move_task(task_id, basket, None)?))
    }

    /// Nest under the previous sibling, as long as the deepest task of the
    /// moved subtree stays within the depth limit. Returns the new parent.
    pub fn nest(&mut self, task_id: &str) -> Result<String, SessionError> {
        let depth = self
            .data
            .depth(task_id)
            .ok_or_else(|| StoreError::NotFound(task_id.to_string()))?;
        if self.deepest_level_at(task_id, depth + 1) > self.settings.max_nesting_depth {
            return Err(SessionError::MaxDepth(self.settings.max_nesting_depth));
        }
        self.mutate(|data| Ok(data.nest_under_previous_sibling(task_id)?))
    }

    pub fn unnest(&mut self, task_id: &str) -> Result<(), SessionError> {
        self.mutate(|data| Ok(data.unnest(task_id)?))
    }

    /// Swap with the sibling above. A first child moves out of its parent
    /// instead.
    pub fn move_up(&mut self, task_id: &str) -> Result<(), SessionError> {
        self.reorder(task_id, Shift::Up)
    }

    /// Swap with the sibling below. A last child moves out of its parent
    /// instead.
    pub fn move_down(&mut self, task_id: &str) -> Result<(), SessionError> {
        self.reorder(task_id, Shift::Down)
    }

    fn reorder(&mut self, task_id: &str, direction: Shift) -> Result<(), SessionError> {
        let (position, count) = self
            .data
            .sibling_position(task_id)
            .ok_or_else(|| StoreError::NotFound(task_id.to_string()))?;
        let at_edge = match direction {
            Shift::Up => position == 0,
            Shift::Down => position + 1 == count,
        };
        let nested = self
            .data
            .find_task_location(task_id)
            .is_some_and(|loc| loc.parent_id.is_some());
        if at_edge && nested {
            self.unnest(task_id)
        } else {
            self.mutate(|data| Ok(data.shift(task_id, direction)?))
        }
    }

    // -----------------------------------------------------------------------
    // Marks and bulk actions
    // -----------------------------------------------------------------------

    /// Mark or unmark a task. Returns true when it is now marked.
    pub fn toggle_mark(&mut self, task_id: &str) -> Result<bool, SessionError> {
        if !self.data.contains(task_id) {
            return Err(StoreError::NotFound(task_id.to_string()).into());
        }
        Ok(self.marks.toggle(task_id))
    }

    pub fn clear_marks(&mut self) {
        self.marks.clear();
    }

    /// Marked tasks that still exist, in marking order.
    pub fn marked_tasks(&self) -> Vec<&Task> {
        self.marks
            .live_ids(&self.data)
            .iter()
            .filter_map(|id| self.data.find_task(id))
            .collect()
    }

    fn take_marks(&self, outermost: bool) -> Result<Vec<String>, SessionError> {
        let ids = if outermost {
            self.marks.outermost_ids(&self.data)
        } else {
            self.marks.live_ids(&self.data)
        };
        if ids.is_empty() {
            return Err(SessionError::NoMarks);
        }
        Ok(ids)
    }

    /// Flip completion on every marked task as one undo step.
    pub fn bulk_toggle_complete(&mut self) -> Result<usize, SessionError> {
        let ids = self.take_marks(false)?;
        let count = self.mutate(|data| {
            for id in &ids {
                data.edit(id)
                    .ok_or_else(|| StoreError::NotFound(id.clone()))?
                    .toggle_completed();
            }
            Ok(ids.len())
        })?;
        self.marks.clear();
        Ok(count)
    }

    /// Delete every marked task as one undo step.
    pub fn bulk_delete(&mut self) -> Result<usize, SessionError> {
        let ids = self.take_marks(true)?;
        let count = self.mutate(|data| {
            for id in &ids {
                data.delete_task(id)?;
            }
            Ok(ids.len())
        })?;
        self.marks.clear();
        Ok(count)
    }

    /// Move every marked task to the root of `basket` as one undo step.
    pub fn bulk_move(&mut self, basket: &str) -> Result<usize, SessionError> {
        let ids = self.take_marks(true)?;
        let count = self.mutate(|data| {
            for id in &ids {
                data.move_task(id, basket, None)?;
            }
            Ok(ids.len())
        })?;
        self.marks.clear();
        Ok(count)
    }

    // -----------------------------------------------------------------------
    // Undo and week rollover
    // -----------------------------------------------------------------------

    /// Restore the most recent snapshot. Returns the steps still left.
    pub fn undo(&mut self) -> Result<usize, SessionError> {
        let snapshot = self.history.pop().ok_or(SessionError::NothingToUndo)?;
        self.restore(snapshot);
        self.marks.clear();
        self.save()?;
        info!(remaining = self.history.len(), "undo");
        Ok(self.history.len())
    }

    /// Bring the store up to the current week. Returns tasks moved to Inbox.
    pub fn roll_week(&mut self) -> Result<usize, SessionError> {
        let week = self.settings.current_week();
        self.roll_week_to(week)
    }

    /// Roll the store forward to `week`, saving when anything moved. Not an
    /// undo step; older snapshots are rolled again when restored.
    pub fn roll_week_to(&mut self, week: Week) -> Result<usize, SessionError> {
        self.week = week;
        let moved = self.data.perform_week_transition(&week);
        if moved > 0 {
            self.save()?;
        }
        debug!(moved, "week checked");
        Ok(moved)
    }
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), SessionError> {
    let len = char_len(value);
    if len > max {
        return Err(SessionError::TooLong { field, len, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::storage::MemoryStorage;
    use crate::model::basket::LATER;
    use crate::util::calendar::parse_date_key;
    use pretty_assertions::assert_eq;

    fn week() -> Week {
        Week::containing(parse_date_key("2026-01-21").unwrap())
    }

    fn session() -> Session<MemoryStorage> {
        Session::open_in_week(MemoryStorage::new(), Settings::default(), week()).unwrap()
    }

    fn titles(session: &Session<MemoryStorage>, basket: &str) -> Vec<String> {
        session
            .data()
            .tasks(basket)
            .iter()
            .map(|t| t.title.clone())
            .collect()
    }

    #[test]
    fn quick_add_splits_description() {
        assert_eq!(
            parse_quick_add("Buy milk \\\\ two litres"),
            ("Buy milk".to_string(), "two litres".to_string())
        );
        assert_eq!(
            parse_quick_add("  plain  "),
            ("plain".to_string(), String::new())
        );
        assert_eq!(
            parse_quick_add("a \\\\ b \\\\ c"),
            ("a".to_string(), "b \\\\ c".to_string())
        );
    }

    #[test]
    fn add_saves_and_is_undoable() {
        let mut s = session();
        let id = s.quick_add("Write report \\\\ by Friday").unwrap();
        let task = s.data().find_task(&id).unwrap();
        assert_eq!(task.description, "by Friday");
        assert_eq!(s.storage().save_count(), 1);
        assert_eq!(s.history_len(), 1);

        assert_eq!(s.undo().unwrap(), 0);
        assert!(s.data().find_task(&id).is_none());
        assert_eq!(s.storage().save_count(), 2);
        assert!(matches!(s.undo(), Err(SessionError::NothingToUndo)));
    }

    #[test]
    fn invalid_input_is_rejected_without_history() {
        let mut s = session();
        assert!(matches!(
            s.add_task(INBOX, "   ", "", None),
            Err(SessionError::EmptyTitle)
        ));
        let long = "x".repeat(MAX_TITLE_CHARS + 1);
        assert!(matches!(
            s.add_task(INBOX, &long, "", None),
            Err(SessionError::TooLong { field: "title", .. })
        ));
        assert!(matches!(
            s.add_task("Nowhere", "ok", "", None),
            Err(SessionError::Store(StoreError::InvalidBasket(_)))
        ));
        assert_eq!(s.history_len(), 0);
        assert_eq!(s.storage().save_count(), 0);
    }

    #[test]
    fn edits_apply_and_validate() {
        let mut s = session();
        let id = s.add_task(INBOX, "Draft", "", None).unwrap();
        s.edit_title(&id, "  Final  ").unwrap();
        s.edit_description(&id, "line one\nline two\n").unwrap();
        let task = s.data().find_task(&id).unwrap();
        assert_eq!(task.title, "Final");
        assert_eq!(task.description, "line one\nline two");
        assert!(s.edit_title(&id, "").is_err());
        assert!(s.edit_title("missing", "x").is_err());
        assert_eq!(s.history_len(), 3);
    }

    #[test]
    fn toggles_flip_flags() {
        let mut s = session();
        let id = s.add_task(INBOX, "Task", "", None).unwrap();
        assert!(s.toggle_complete(&id).unwrap());
        assert!(!s.toggle_complete(&id).unwrap());
        assert!(s.toggle_collapse(&id).unwrap());
    }

    #[test]
    fn collapse_falls_back_to_parent() {
        let mut s = session();
        let parent = s.add_task(INBOX, "Parent", "", None).unwrap();
        let child = s.add_task(INBOX, "Child", "", Some(&parent)).unwrap();

        assert_eq!(s.collapse(&child).unwrap(), Some(parent.clone()));
        assert!(s.data().find_task(&parent).unwrap().collapsed);
        assert_eq!(s.collapse(&parent).unwrap(), None);

        assert!(s.expand(&parent).unwrap());
        assert!(!s.expand(&parent).unwrap());
        assert!(!s.expand(&child).unwrap());
    }

    #[test]
    fn collapse_all_in_basket() {
        let mut s = session();
        let a = s.add_task(INBOX, "A", "", None).unwrap();
        let b = s.add_task(INBOX, "B", "", Some(&a)).unwrap();
        s.add_task(INBOX, "C", "", Some(&b)).unwrap();
        assert_eq!(s.collapse_all(INBOX).unwrap(), 2);
        assert_eq!(s.expand_subtree(&a).unwrap(), 2);
        assert_eq!(s.collapse_subtree(&b).unwrap(), 1);
        assert_eq!(s.expand_all(INBOX).unwrap(), 1);
    }

    #[test]
    fn nest_respects_depth_limit() {
        let storage = MemoryStorage::new();
        let settings = Settings {
            max_nesting_depth: 3,
            ..Settings::default()
        };
        let mut s = Session::open_in_week(storage, settings, week()).unwrap();
        let a = s.add_task(INBOX, "A", "", None).unwrap();
        let b = s.add_task(INBOX, "B", "", None).unwrap();
        let c = s.add_task(INBOX, "C", "", Some(&b)).unwrap();
        let d = s.add_task(INBOX, "D", "", Some(&c)).unwrap();

        // b's subtree is three levels tall; under a it would need four
        assert!(matches!(s.nest(&b), Err(SessionError::MaxDepth(3))));
        assert!(matches!(
            s.add_task(INBOX, "E", "", Some(&d)),
            Err(SessionError::MaxDepth(3))
        ));

        s.unnest(&c).unwrap();
        assert_eq!(s.nest(&b).unwrap(), a);
        assert_eq!(s.data().depth(&b), Some(1));
    }

    #[test]
    fn move_up_at_top_unnests() {
        let mut s = session();
        let parent = s.add_task(INBOX, "Parent", "", None).unwrap();
        let first = s.add_task(INBOX, "First", "", Some(&parent)).unwrap();
        let second = s.add_task(INBOX, "Second", "", Some(&parent)).unwrap();
        s.add_task(INBOX, "After", "", None).unwrap();

        s.move_up(&second).unwrap();
        assert_eq!(s.data().sibling_position(&second), Some((0, 2)));

        s.move_down(&first).unwrap();
        assert_eq!(titles(&s, INBOX), vec!["Parent", "First", "After"]);

        s.move_up(&second).unwrap();
        assert_eq!(titles(&s, INBOX), vec!["Parent", "Second", "First", "After"]);

        assert!(s.move_up(&parent).is_err());
    }

    #[test]
    fn bulk_actions_are_single_undo_steps() {
        let mut s = session();
        let a = s.add_task(INBOX, "A", "", None).unwrap();
        let b = s.add_task(INBOX, "B", "", None).unwrap();
        let kid = s.add_task(INBOX, "Kid", "", Some(&b)).unwrap();
        let before = s.history_len();

        s.toggle_mark(&a).unwrap();
        s.toggle_mark(&b).unwrap();
        s.toggle_mark(&kid).unwrap();
        assert_eq!(s.marked_tasks().len(), 3);
        assert_eq!(s.bulk_move(LATER).unwrap(), 2);
        assert_eq!(titles(&s, LATER), vec!["A", "B"]);
        assert!(s.marks().is_empty());
        assert_eq!(s.history_len(), before + 1);

        s.undo().unwrap();
        assert_eq!(titles(&s, INBOX), vec!["A", "B"]);

        s.toggle_mark(&a).unwrap();
        s.toggle_mark(&kid).unwrap();
        assert_eq!(s.bulk_toggle_complete().unwrap(), 2);
        assert!(s.data().find_task(&a).unwrap().completed);
        assert!(s.data().find_task(&kid).unwrap().completed);

        s.toggle_mark(&b).unwrap();
        s.toggle_mark(&kid).unwrap();
        assert_eq!(s.bulk_delete().unwrap(), 1);
        assert!(!s.data().contains(&kid));
        assert!(matches!(s.bulk_delete(), Err(SessionError::NoMarks)));
    }

    #[test]
    fn marks_of_deleted_tasks_are_ignored() {
        let mut s = session();
        let a = s.add_task(INBOX, "A", "", None).unwrap();
        s.toggle_mark(&a).unwrap();
        s.delete(&a).unwrap();
        assert!(s.marked_tasks().is_empty());
        assert!(s.toggle_mark("missing").is_err());
    }

    #[test]
    fn failed_save_is_reported_but_undo_survives() {
        let mut s = session();
        s.storage().set_failing(true);
        assert!(matches!(
            s.add_task(INBOX, "A", "", None),
            Err(SessionError::Storage(_))
        ));
        assert_eq!(s.data().len(), 1);
        assert_eq!(s.history_len(), 1);
    }

    #[test]
    fn history_is_bounded() {
        let settings = Settings {
            history_limit: 2,
            ..Settings::default()
        };
        let mut s = Session::open_in_week(MemoryStorage::new(), settings, week()).unwrap();
        for title in ["a", "b", "c"] {
            s.add_task(INBOX, title, "", None).unwrap();
        }
        assert_eq!(s.history_len(), 2);
        s.undo().unwrap();
        s.undo().unwrap();
        assert_eq!(titles(&s, INBOX), vec!["a"]);
    }

    #[test]
    fn opening_rolls_the_week() {
        let last_week = week().previous();
        let mut old = TodoData::new_for_week(&last_week);
        old.add_task("2026-01-13", Task::with_id("t", "Stale"), None)
            .unwrap();
        let storage = MemoryStorage::with_snapshot(old.to_snapshot());

        let s = Session::open_in_week(storage, Settings::default(), week()).unwrap();
        assert_eq!(titles(&s, INBOX), vec!["Stale"]);
        assert_eq!(s.rolled_on_open(), 1);
        assert_eq!(s.storage().save_count(), 1);
        assert_eq!(s.history_len(), 0);
        assert!(!s.data().has_basket("2026-01-13"));
    }

    #[test]
    fn undo_after_rollover_stays_in_the_new_week() {
        let last_week = week().previous();
        let mut s = Session::open_in_week(MemoryStorage::new(), Settings::default(), last_week)
            .unwrap();
        let a = s.add_task("2026-01-14", "A", "", None).unwrap();
        s.add_task(INBOX, "B", "", None).unwrap();
        assert_eq!(s.roll_week_to(week()).unwrap(), 1);

        s.undo().unwrap();
        assert_eq!(titles(&s, INBOX), vec!["A"]);
        assert_eq!(s.data().find_task_location(&a).unwrap().basket, INBOX);
        let dates: Vec<&str> = s
            .data()
            .basket_keys()
            .into_iter()
            .filter(|k| *k != INBOX && *k != LATER)
            .collect();
        assert_eq!(dates, week().keys().iter().map(String::as_str).collect::<Vec<_>>());
        let saved = s.storage().saved().unwrap();
        assert!(saved.get("2026-01-14").is_none());
    }
}
