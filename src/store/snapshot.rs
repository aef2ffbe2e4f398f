use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::TodoData;
use crate::model::basket::{INBOX, LATER, is_date_basket, is_legacy_day_basket};
use crate::model::task::Task;
use crate::util::calendar::Week;

/// The persisted shape of a store: basket key to root tasks, nothing else.
///
/// Used both for the JSON file and for undo history, which is why it is a
/// plain value type with no index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    baskets: IndexMap<String, Vec<Task>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Pretty-printed JSON, two-space indent, non-ASCII kept as-is.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn insert(&mut self, basket: impl Into<String>, tasks: Vec<Task>) {
        self.baskets.insert(basket.into(), tasks);
    }

    pub fn get(&self, basket: &str) -> Option<&[Task]> {
        self.baskets.get(basket).map(Vec::as_slice)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.baskets.keys().map(String::as_str)
    }

    /// True when the data still uses weekday names as basket keys.
    pub fn is_legacy(&self) -> bool {
        self.keys().any(is_legacy_day_basket)
    }
}

impl TodoData {
    /// Copy of the trees in display order.
    pub fn to_snapshot(&self) -> Snapshot {
        let baskets = self
            .basket_keys()
            .into_iter()
            .map(|key| (key.to_string(), self.tasks(key).to_vec()))
            .collect();
        Snapshot { baskets }
    }

    /// Rebuild a store against the current week.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self::from_snapshot_in_week(snapshot, &Week::current())
    }

    /// Rebuild a store from a snapshot.
    ///
    /// Inbox, Later and date keys load as they are. Weekday-named keys from
    /// the old format are mapped onto `week`'s dates. Other keys are dropped
    /// with a warning. The result is always seeded with `week`'s seven
    /// baskets, and duplicate ids get fresh ones before the index is built.
    pub fn from_snapshot_in_week(snapshot: Snapshot, week: &Week) -> Self {
        let legacy = snapshot.is_legacy();
        let mut data = TodoData::new_for_week(week);

        for (key, tasks) in snapshot.baskets {
            let target = if key == INBOX || key == LATER || is_date_basket(&key) {
                Some(key)
            } else if is_legacy_day_basket(&key) {
                week.key_for_day(&key)
            } else {
                warn!(basket = %key, tasks = tasks.len(), "dropping unknown basket");
                None
            };
            if let Some(target) = target {
                data.baskets.entry(target).or_default().extend(tasks);
            }
        }

        if legacy {
            info!(week_of = %week.monday(), "migrated weekday baskets to dates");
        }
        let reassigned = data.reassign_duplicate_ids();
        if reassigned > 0 {
            warn!(reassigned, "loaded data contained duplicate task ids");
        }
        data.rebuild_index();
        data
    }
}
