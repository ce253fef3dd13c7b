//! Snapshot-based undo/redo history.
//!
//! [`HistoryManager`] keeps a linear, ordered sequence of graph snapshots
//! plus a cursor. Recording truncates any redo tail; undo/redo move the
//! cursor and hand back the snapshot to restore. While a restore is in
//! progress the `replaying` flag suppresses recording, so an undo can never
//! corrupt history by registering itself as a new forward step.

use crate::graph::GraphSnapshot;

/// Undo/redo state derived values, emitted to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryState {
    /// True if there is a snapshot before the cursor.
    pub can_undo: bool,
    /// True if there is a snapshot after the cursor.
    pub can_redo: bool,
}

/// Linear snapshot history over graph states.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    snapshots: Vec<GraphSnapshot>,
    cursor: usize,
    replaying: bool,
}

impl HistoryManager {
    /// Creates a history seeded with the initial snapshot.
    #[must_use]
    pub fn new(initial: GraphSnapshot) -> Self {
        Self {
            snapshots: vec![initial],
            cursor: 0,
            replaying: false,
        }
    }

    /// Records a snapshot after an externally-visible mutation.
    ///
    /// Truncates any snapshots after the cursor, appends, and advances.
    /// A no-op while a restore is replaying.
    pub fn record(&mut self, snapshot: GraphSnapshot) {
        if self.replaying {
            return;
        }
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push(snapshot);
        self.cursor = self.snapshots.len() - 1;
    }

    /// Moves the cursor back one step and returns the snapshot to restore.
    ///
    /// Returns `None` at the beginning of history.
    pub fn undo(&mut self) -> Option<GraphSnapshot> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.snapshots[self.cursor].clone())
    }

    /// Moves the cursor forward one step and returns the snapshot to restore.
    ///
    /// Returns `None` at the end of history.
    pub fn redo(&mut self) -> Option<GraphSnapshot> {
        if self.cursor + 1 >= self.snapshots.len() {
            return None;
        }
        self.cursor += 1;
        Some(self.snapshots[self.cursor].clone())
    }

    /// Returns true if undo is possible.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Returns true if redo is possible.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Returns the derived history state for observers.
    #[must_use]
    pub fn state(&self) -> HistoryState {
        HistoryState {
            can_undo: self.can_undo(),
            can_redo: self.can_redo(),
        }
    }

    /// Sets the replay guard.
    ///
    /// Must be set for the duration of a snapshot restore and cleared
    /// afterwards.
    pub fn set_replaying(&mut self, replaying: bool) {
        self.replaying = replaying;
    }

    /// Returns true if a restore is currently replaying.
    #[must_use]
    pub fn is_replaying(&self) -> bool {
        self.replaying
    }

    /// Returns the number of snapshots held. Always at least one: the
    /// initial state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, NodeKind};

    fn snapshot_with(labels: &[&str]) -> GraphSnapshot {
        let nodes = labels
            .iter()
            .map(|label| Node::new(NodeKind::Action, Some("email_send".into()), *label))
            .collect();
        GraphSnapshot::new(nodes, Vec::new())
    }

    #[test]
    fn initial_history_has_nothing_to_undo() {
        let history = HistoryManager::new(GraphSnapshot::default());
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn undo_walks_back_to_initial_state() {
        let mut history = HistoryManager::new(GraphSnapshot::default());
        history.record(snapshot_with(&["A"]));
        history.record(snapshot_with(&["A", "B"]));

        let one = history.undo().expect("first undo");
        assert_eq!(one.nodes.len(), 1);

        let zero = history.undo().expect("second undo");
        assert!(zero.nodes.is_empty());

        assert!(history.undo().is_none());
        assert!(!history.can_undo());
    }

    #[test]
    fn redo_restores_forward_states() {
        let mut history = HistoryManager::new(GraphSnapshot::default());
        history.record(snapshot_with(&["A"]));
        history.record(snapshot_with(&["A", "B"]));

        history.undo();
        history.undo();

        let one = history.redo().expect("first redo");
        assert_eq!(one.nodes.len(), 1);
        let two = history.redo().expect("second redo");
        assert_eq!(two.nodes.len(), 2);
        assert!(history.redo().is_none());
    }

    #[test]
    fn record_truncates_redo_tail() {
        let mut history = HistoryManager::new(GraphSnapshot::default());
        history.record(snapshot_with(&["A"]));
        history.record(snapshot_with(&["A", "B"]));

        history.undo();
        history.record(snapshot_with(&["A", "C"]));

        // The ["A", "B"] branch is gone.
        assert!(!history.can_redo());
        assert_eq!(history.len(), 3);
        let back = history.undo().expect("undo");
        assert_eq!(back.nodes.len(), 1);
        assert_eq!(back.nodes[0].label, "A");
    }

    #[test]
    fn record_is_ignored_while_replaying() {
        let mut history = HistoryManager::new(GraphSnapshot::default());
        history.record(snapshot_with(&["A"]));

        history.set_replaying(true);
        history.record(snapshot_with(&["A", "B"]));
        history.set_replaying(false);

        assert_eq!(history.len(), 2);
        assert!(!history.can_redo());
    }
}
