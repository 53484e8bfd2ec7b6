use std::collections::VecDeque;

use formforge_core::tree::FieldTree;

/// Bounded undo/redo stacks of whole tree values. Trees share structure, so
/// an entry costs little more than the nodes its edit touched.
pub struct History {
    undo_stack: VecDeque<FieldTree>,
    redo_stack: VecDeque<FieldTree>,
    max_depth: usize,
}

impl History {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: VecDeque::new(),
            max_depth,
        }
    }

    /// Records the tree as it was before a fresh edit.
    pub fn record(&mut self, previous: FieldTree) {
        self.undo_stack.push_back(previous);
        // Enforce depth limit by dropping oldest entry
        while self.undo_stack.len() > self.max_depth {
            self.undo_stack.pop_front();
        }
        self.redo_stack.clear();
    }

    /// Swaps `current` for the most recent undo entry.
    pub fn undo(&mut self, current: FieldTree) -> Option<FieldTree> {
        let previous = self.undo_stack.pop_back()?;
        self.redo_stack.push_back(current);
        Some(previous)
    }

    pub fn redo(&mut self, current: FieldTree) -> Option<FieldTree> {
        let next = self.redo_stack.pop_back()?;
        self.undo_stack.push_back(current);
        Some(next)
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }
}
