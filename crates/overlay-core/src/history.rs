//! Linear undo/redo history over annotation snapshots
//!
//! Snapshots are reference counted, so undo and redo move pointers between
//! the stacks instead of copying annotation lists.

use crate::annotation::Annotation;
use std::sync::Arc;

/// Immutable copy of the full annotation list at one point in time
pub type Snapshot = Arc<Vec<Annotation>>;

#[derive(Debug, Clone, Default)]
pub struct History {
    /// Oldest first
    past: Vec<Snapshot>,
    present: Snapshot,
    /// Top of the stack (last element) is the nearest redo target
    future: Vec<Snapshot>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `next` as the new present. Discards every redo entry.
    pub fn commit(&mut self, next: Vec<Annotation>) -> Snapshot {
        let next = Arc::new(next);
        let previous = std::mem::replace(&mut self.present, Arc::clone(&next));
        self.past.push(previous);
        self.future.clear();
        next
    }

    /// Step back one commit. Returns the restored snapshot, or `None` when
    /// there is nothing to undo.
    pub fn undo(&mut self) -> Option<Snapshot> {
        let previous = self.past.pop()?;
        let current = std::mem::replace(&mut self.present, Arc::clone(&previous));
        self.future.push(current);
        Some(previous)
    }

    pub fn redo(&mut self) -> Option<Snapshot> {
        let next = self.future.pop()?;
        let current = std::mem::replace(&mut self.present, Arc::clone(&next));
        self.past.push(current);
        Some(next)
    }

    pub fn present(&self) -> &Snapshot {
        &self.present
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
        self.present = Snapshot::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnnotationDefaults;

    fn list(n: usize) -> Vec<Annotation> {
        (0..n)
            .map(|i| {
                Annotation::with_defaults(i as f64, 0.0, 1, &AnnotationDefaults::default())
            })
            .collect()
    }

    #[test]
    fn test_new_history_is_empty() {
        let h = History::new();
        assert!(!h.can_undo());
        assert!(!h.can_redo());
        assert!(h.present().is_empty());
    }

    #[test]
    fn test_undo_redo_moves_present() {
        let mut h = History::new();
        let one = list(1);
        h.commit(one.clone());
        assert_eq!(h.present().len(), 1);

        let restored = h.undo().unwrap();
        assert!(restored.is_empty());
        assert!(h.can_redo());

        let again = h.redo().unwrap();
        assert_eq!(*again, one);
        assert!(!h.can_redo());
    }

    #[test]
    fn test_commit_after_undo_truncates_future() {
        let mut h = History::new();
        h.commit(list(1));
        h.commit(list(2));
        h.undo();
        h.undo();
        assert_eq!(h.future_len(), 2);

        h.commit(list(3));
        assert_eq!(h.future_len(), 0);
        assert!(h.redo().is_none());
        assert_eq!(h.past_len(), 1);
    }

    #[test]
    fn test_empty_stacks_are_noops() {
        let mut h = History::new();
        assert!(h.undo().is_none());
        assert!(h.redo().is_none());
        assert!(h.present().is_empty());
    }

    #[test]
    fn test_undo_shares_snapshot_instead_of_copying() {
        let mut h = History::new();
        let first = h.commit(list(2));
        h.commit(list(3));
        let restored = h.undo().unwrap();
        assert!(Arc::ptr_eq(&first, &restored));
    }
}
