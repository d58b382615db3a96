use std::collections::VecDeque;

use crate::canvas::layer_stack::LayerStack;

/// Number of undo steps kept when settings don't say otherwise.
pub const DEFAULT_UNDO_CAPACITY: usize = 50;

/// Full copy of a layer stack taken before an operation.
///
/// Tiles are shared copy-on-write with the live stack, so capture costs
/// one `Arc` bump per allocated tile and the snapshot never observes later
/// edits.
#[derive(Clone, Debug)]
pub struct Snapshot {
    stack: LayerStack,
    label: String,
}

impl Snapshot {
    pub fn capture(stack: &LayerStack, label: impl Into<String>) -> Self {
        Self {
            stack: stack.clone(),
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn stack(&self) -> &LayerStack {
        &self.stack
    }

    pub fn into_stack(self) -> LayerStack {
        self.stack
    }
}

/// Bounded undo/redo over whole-stack snapshots.
#[derive(Debug)]
pub struct UndoManager {
    undo_stack: VecDeque<Snapshot>,
    redo_stack: VecDeque<Snapshot>,
    capacity: usize,
}

impl Default for UndoManager {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoManager {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_UNDO_CAPACITY)
    }

    /// A capacity of zero is bumped to 1.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record the current state before a mutation. Clears redo.
    pub fn checkpoint(&mut self, stack: &LayerStack) {
        self.checkpoint_labeled(stack, "Edit");
    }

    pub fn checkpoint_labeled(&mut self, stack: &LayerStack, label: impl Into<String>) {
        self.commit(Snapshot::capture(stack, label));
    }

    /// Push a snapshot captured earlier, once the mutation it guards succeeded.
    pub fn commit(&mut self, snapshot: Snapshot) {
        log::debug!("checkpoint '{}'", snapshot.label);
        Self::push_bounded(&mut self.undo_stack, snapshot, self.capacity);
        self.redo_stack.clear();
    }

    fn push_bounded(stack: &mut VecDeque<Snapshot>, snapshot: Snapshot, capacity: usize) {
        stack.push_back(snapshot);
        while stack.len() > capacity {
            if let Some(evicted) = stack.pop_front() {
                log::debug!("history full, dropping '{}'", evicted.label);
            }
        }
    }

    /// Restore the most recent checkpoint. Returns false if there is none.
    pub fn undo(&mut self, stack: &mut LayerStack) -> bool {
        let Some(mut snapshot) = self.undo_stack.pop_back() else {
            return false;
        };
        std::mem::swap(stack, &mut snapshot.stack);
        log::debug!("undo '{}'", snapshot.label);
        Self::push_bounded(&mut self.redo_stack, snapshot, self.capacity);
        true
    }

    /// Re-apply the most recently undone state. Returns false if there is none.
    pub fn redo(&mut self, stack: &mut LayerStack) -> bool {
        let Some(mut snapshot) = self.redo_stack.pop_back() else {
            return false;
        };
        std::mem::swap(stack, &mut snapshot.stack);
        log::debug!("redo '{}'", snapshot.label);
        Self::push_bounded(&mut self.undo_stack, snapshot, self.capacity);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Description of the operation `undo()` would revert.
    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.back().map(Snapshot::label)
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.redo_stack.back().map(Snapshot::label)
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::color::Pixel;

    #[test]
    fn empty_history_reports_false() {
        let mut history = UndoManager::new();
        let mut stack = LayerStack::new(4, 4);
        assert!(!history.undo(&mut stack));
        assert!(!history.redo(&mut stack));
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn labels_follow_the_operation() {
        let mut history = UndoManager::new();
        let mut stack = LayerStack::with_tile_size(4, 4, 4);
        history.checkpoint_labeled(&stack, "Add Layer");
        stack.add_layer("a");
        assert_eq!(history.undo_label(), Some("Add Layer"));

        assert!(history.undo(&mut stack));
        assert!(stack.is_empty());
        assert_eq!(history.undo_label(), None);
        assert_eq!(history.redo_label(), Some("Add Layer"));

        assert!(history.redo(&mut stack));
        assert_eq!(stack.len(), 1);
        assert_eq!(history.undo_label(), Some("Add Layer"));
    }

    #[test]
    fn checkpoint_clears_redo() {
        let mut history = UndoManager::new();
        let mut stack = LayerStack::with_tile_size(4, 4, 4);
        stack.add_layer("a");
        history.checkpoint(&stack);
        stack.layer_mut(0).unwrap().pixels_mut().fill(Pixel::WHITE).unwrap();
        history.undo(&mut stack);
        assert!(history.can_redo());
        history.checkpoint(&stack);
        assert!(!history.can_redo());
    }

    #[test]
    fn zero_capacity_keeps_one_step() {
        let mut history = UndoManager::with_capacity(0);
        let stack = LayerStack::new(1, 1);
        history.checkpoint(&stack);
        history.checkpoint(&stack);
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.undo_len(), 1);
    }
}
