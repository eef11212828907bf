//! Batching and dirty tracking
//!
//! Synchronous recomputation is cheap to trigger and expensive to repeat.
//! Components mark work as dirty while a batch is open and perform a single
//! pass when the outermost batch closes:
//!
//! ```rust
//! use selectra_core::batch::{BatchDepth, Dirty};
//!
//! let mut depth = BatchDepth::new();
//! let mut inserted: Dirty<Vec<&str>> = Dirty::new();
//!
//! depth.start();
//! inserted.mark().push("a");
//! inserted.mark().push("b");
//! assert!(depth.end());
//!
//! // One flush for both insertions
//! assert_eq!(inserted.take(), Some(vec!["a", "b"]));
//! assert_eq!(inserted.take(), None);
//! ```

/// Nesting counter for deferred work
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchDepth {
    depth: u32,
}

impl BatchDepth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a (possibly nested) batch
    pub fn start(&mut self) {
        self.depth += 1;
    }

    /// Close a batch. Returns `true` when the outermost batch closed and
    /// pending work should be flushed.
    pub fn end(&mut self) -> bool {
        match self.depth {
            0 => false,
            1 => {
                self.depth = 0;
                true
            }
            _ => {
                self.depth -= 1;
                false
            }
        }
    }

    /// Whether a batch is currently open
    pub fn is_batching(&self) -> bool {
        self.depth > 0
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }
}

/// Accumulated pending work, present only while dirty
#[derive(Clone, Debug)]
pub struct Dirty<T> {
    pending: Option<T>,
    /// Number of completed flushes
    flushes: u64,
}

impl<T> Dirty<T> {
    pub fn new() -> Self {
        Self {
            pending: None,
            flushes: 0,
        }
    }

    /// Whether work is pending
    pub fn is_dirty(&self) -> bool {
        self.pending.is_some()
    }

    /// Mark dirty, merging into the existing accumulator via `merge`
    pub fn mark_with(&mut self, value: T, merge: impl FnOnce(&mut T, T)) {
        match self.pending.as_mut() {
            Some(existing) => merge(existing, value),
            None => self.pending = Some(value),
        }
    }

    /// Take pending work, leaving the flag clean
    pub fn take(&mut self) -> Option<T> {
        let pending = self.pending.take();
        if pending.is_some() {
            self.flushes += 1;
        }
        pending
    }

    /// Peek at pending work
    pub fn pending(&self) -> Option<&T> {
        self.pending.as_ref()
    }

    /// Number of times pending work was taken
    pub fn flushes(&self) -> u64 {
        self.flushes
    }
}

impl<T: Default> Dirty<T> {
    /// Mark dirty and return the accumulator
    pub fn mark(&mut self) -> &mut T {
        self.pending.get_or_insert_with(T::default)
    }
}

impl<T> Default for Dirty<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_batches_flush_once() {
        let mut depth = BatchDepth::new();
        depth.start();
        depth.start();
        assert_eq!(depth.depth(), 2);
        assert!(!depth.end());
        assert!(depth.is_batching());
        assert!(depth.end());
        assert!(!depth.is_batching());
        // Unbalanced end is ignored
        assert!(!depth.end());
    }

    #[test]
    fn test_dirty_accumulates_until_taken() {
        let mut dirty: Dirty<Vec<u32>> = Dirty::new();
        assert!(!dirty.is_dirty());

        dirty.mark().push(1);
        dirty.mark().push(2);
        assert_eq!(dirty.pending(), Some(&vec![1, 2]));

        assert_eq!(dirty.take(), Some(vec![1, 2]));
        assert!(!dirty.is_dirty());
        assert_eq!(dirty.flushes(), 1);
        assert_eq!(dirty.take(), None);
        assert_eq!(dirty.flushes(), 1);
    }

    #[test]
    fn test_mark_with_merges() {
        let mut dirty: Dirty<(bool, bool)> = Dirty::new();
        dirty.mark_with((true, false), |a, b| {
            a.0 |= b.0;
            a.1 |= b.1;
        });
        dirty.mark_with((false, true), |a, b| {
            a.0 |= b.0;
            a.1 |= b.1;
        });
        assert_eq!(dirty.take(), Some((true, true)));
    }
}
