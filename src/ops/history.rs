use crate::store::Snapshot;

/// Default number of undo steps kept.
pub const HISTORY_LIMIT: usize = 50;

/// Bounded stack of full-store snapshots, newest last.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: Vec<Snapshot>,
    limit: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self::with_limit(HISTORY_LIMIT)
    }

    /// A limit of 0 keeps nothing, which turns undo off.
    pub fn with_limit(limit: usize) -> Self {
        History {
            snapshots: Vec::new(),
            limit,
        }
    }

    /// Push a snapshot, dropping the oldest ones beyond the limit.
    pub fn push(&mut self, snapshot: Snapshot) {
        self.snapshots.push(snapshot);
        if self.snapshots.len() > self.limit {
            self.snapshots.drain(..self.snapshots.len() - self.limit);
        }
    }

    pub fn pop(&mut self) -> Option<Snapshot> {
        self.snapshots.pop()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}
