use std::sync::Arc;

use crate::Layer;

/// Immutable view of the layer collection at one point in history.
///
/// The layer slice is shared between clones, so taking or restoring a
/// snapshot never copies layers. Nothing hands out mutable access to it.
#[derive(Debug, Clone)]
pub struct Snapshot {
    layers: Arc<[Layer]>,
    /// Logical clock value, strictly increasing across pushes.
    pub timestamp: u64,
    /// Wall-clock creation time (unix seconds).
    pub created_at: i64,
}

impl Snapshot {
    fn new(layers: Vec<Layer>, timestamp: u64) -> Self {
        Self {
            layers: layers.into(),
            timestamp,
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn to_vec(&self) -> Vec<Layer> {
        self.layers.to_vec()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == id)
    }

    /// True when both snapshots point at the same shared layer slice.
    pub fn shares_layers_with(&self, other: &Snapshot) -> bool {
        Arc::ptr_eq(&self.layers, &other.layers)
    }
}

/// Snapshots compare by content; timestamps are bookkeeping.
impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.layers == other.layers
    }
}

/// Undo/redo stack of full layer-set snapshots.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    past: Vec<Snapshot>,
    present: Snapshot,
    future: Vec<Snapshot>,
    clock: u64,
    limit: Option<usize>,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl HistoryStore {
    pub fn new(initial: Vec<Layer>) -> Self {
        Self {
            past: Vec::new(),
            present: Snapshot::new(initial, 0),
            future: Vec::new(),
            clock: 0,
            limit: None,
        }
    }

    /// Caps the number of undo steps kept; the oldest entries are dropped first.
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self.enforce_limit();
        self
    }

    /// Commits `next` as the present. Always clears the redo stack, even when
    /// `next` equals the current present.
    pub fn push_state(&mut self, next: Vec<Layer>) {
        self.clock += 1;
        let previous = std::mem::replace(&mut self.present, Snapshot::new(next, self.clock));
        self.past.push(previous);
        self.future.clear();
        self.enforce_limit();
        tracing::trace!(
            timestamp = self.clock,
            past = self.past.len(),
            layers = self.present.len(),
            "history push"
        );
    }

    /// Returns `false` (and changes nothing) when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.past.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.present, previous);
        self.future.push(current);
        true
    }

    /// Returns `false` (and changes nothing) when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.future.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.present, next);
        self.past.push(current);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn present(&self) -> &Snapshot {
        &self.present
    }

    pub fn layers(&self) -> &[Layer] {
        self.present.layers()
    }

    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    /// Logical timestamp of the present snapshot.
    pub fn timestamp(&self) -> u64 {
        self.present.timestamp
    }

    /// Timestamps of every retained snapshot: past, present, then future.
    pub fn timestamps(&self) -> impl Iterator<Item = u64> + '_ {
        self.past
            .iter()
            .chain(std::iter::once(&self.present))
            .chain(self.future.iter())
            .map(|snapshot| snapshot.timestamp)
    }

    /// Replaces the whole history with a single present (project load).
    pub fn reset(&mut self, layers: Vec<Layer>) {
        self.clock += 1;
        self.past.clear();
        self.future.clear();
        self.present = Snapshot::new(layers, self.clock);
    }

    fn enforce_limit(&mut self) {
        if let Some(limit) = self.limit {
            if self.past.len() > limit {
                let excess = self.past.len() - limit;
                self.past.drain(..excess);
            }
        }
    }
}
