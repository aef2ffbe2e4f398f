use tracing::{debug, info};

use super::{Slot, TodoData};
use crate::model::basket::{INBOX, is_date_basket};
use crate::model::task::Task;
use crate::util::calendar::Week;

impl TodoData {
    /// Roll stale date baskets into the current week. See
    /// [`TodoData::perform_week_transition`].
    pub fn check_and_perform_week_transition(&mut self) -> usize {
        self.perform_week_transition(&Week::current())
    }

    /// Empty every date basket outside `week`.
    ///
    /// Stale baskets are handled oldest first. Their incomplete root tasks
    /// (with subtrees) are appended to Inbox; completed root tasks stay
    /// where they are as an archive, and a stale basket with nothing left
    /// is removed. `week`'s seven baskets are created if missing. Returns
    /// the number of root tasks moved.
    pub fn perform_week_transition(&mut self, week: &Week) -> usize {
        let current = week.keys();
        let mut stale: Vec<String> = self
            .baskets
            .keys()
            .filter(|k| is_date_basket(k) && !current.contains(*k))
            .cloned()
            .collect();
        stale.sort();

        let mut moved = 0;
        for key in stale {
            let Some(tasks) = self.baskets.shift_remove(&key) else {
                continue;
            };
            let (done, open): (Vec<Task>, Vec<Task>) = tasks.into_iter().partition(|t| t.completed);
            if !open.is_empty() {
                debug!(basket = %key, tasks = open.len(), "rolling open tasks into Inbox");
            }
            moved += open.len();
            for task in &open {
                self.index
                    .insert(task.id.clone(), Slot::Root(INBOX.to_string()));
            }
            self.baskets
                .entry(INBOX.to_string())
                .or_default()
                .extend(open);
            if !done.is_empty() {
                self.baskets.insert(key, done);
            }
        }

        for key in current {
            self.baskets.entry(key).or_default();
        }
        if moved > 0 {
            info!(moved, week_of = %week.monday(), "week rollover");
        }
        moved
    }

    /// `(open, completed)` counts over the current week's baskets.
    pub fn week_task_counts(&self) -> (usize, usize) {
        self.week_task_counts_for(&Week::current())
    }

    /// `(open, completed)` counts over `week`'s seven baskets, at every
    /// depth.
    pub fn week_task_counts_for(&self, week: &Week) -> (usize, usize) {
        let mut open = 0;
        let mut completed = 0;
        for key in week.keys() {
            for task in self.tasks(&key) {
                task.walk(&mut |t, _| {
                    if t.completed {
                        completed += 1;
                    } else {
                        open += 1;
                    }
                });
            }
        }
        (open, completed)
    }
}
