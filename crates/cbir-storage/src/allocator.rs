//! Per-namespace id allocation.
//!
//! The `{storage}:{index}:last_id` counter in the metadata store is the only
//! source of truth for the next id. Ids are handed out in contiguous blocks
//! and never reused, even after the image that held them is removed.
//!
//! The allocator does not lock: callers hold the namespace lock across
//! `allocate` and `advance`.

use std::ops::Range;

use cbir_types::Namespace;
use tracing::debug;

use crate::error::StorageError;
use crate::metadata::MetadataStore;

/// Reserved by the vector engine to mark empty result slots.
pub const RESERVED_ID: u64 = u64::MAX;

/// A contiguous block of ids `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdBlock {
    pub start: u64,
    pub end: u64,
}

impl IdBlock {
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn ids(&self) -> Range<u64> {
        self.start..self.end
    }
}

/// Issues monotonically increasing ids per namespace.
#[derive(Clone)]
pub struct IdAllocator {
    metadata: MetadataStore,
}

impl IdAllocator {
    pub fn new(metadata: MetadataStore) -> Self {
        Self { metadata }
    }

    /// Read the next unallocated id (0 if the namespace never allocated).
    pub fn next_id(&self, ns: &Namespace) -> Result<u64, StorageError> {
        self.metadata.last_id(ns)
    }

    /// Reserve `count` ids starting at the current counter.
    ///
    /// Nothing is written; follow with [`IdAllocator::advance`] once the ids
    /// are in use.
    pub fn allocate(&self, ns: &Namespace, count: usize) -> Result<IdBlock, StorageError> {
        let start = self.next_id(ns)?;
        self.block(ns, start, count)
    }

    /// Reserve `count` ids starting at `start`, which must not be below the
    /// stored counter.
    pub fn allocate_from(
        &self,
        ns: &Namespace,
        start: u64,
        count: usize,
    ) -> Result<IdBlock, StorageError> {
        let current = self.next_id(ns)?;
        if start < current {
            return Err(StorageError::CounterRegression {
                namespace: ns.to_string(),
                current,
                requested: start,
            });
        }
        self.block(ns, start, count)
    }

    fn block(&self, ns: &Namespace, start: u64, count: usize) -> Result<IdBlock, StorageError> {
        let end = start
            .checked_add(count as u64)
            .filter(|end| *end <= RESERVED_ID)
            .ok_or_else(|| StorageError::IdSpaceExhausted(ns.to_string()))?;
        debug!(namespace = %ns, start, end, "Allocated id block");
        Ok(IdBlock { start, end })
    }

    /// Persist the counter as `new_last_id`.
    ///
    /// The counter never moves backwards.
    pub fn advance(&self, ns: &Namespace, new_last_id: u64) -> Result<(), StorageError> {
        let current = self.metadata.last_id(ns)?;
        if new_last_id < current {
            return Err(StorageError::CounterRegression {
                namespace: ns.to_string(),
                current,
                requested: new_last_id,
            });
        }
        if new_last_id > current {
            self.metadata.set_last_id(ns, new_last_id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use std::sync::Arc;

    fn allocator() -> IdAllocator {
        IdAllocator::new(MetadataStore::new(Arc::new(MemoryStore::new())))
    }

    #[test]
    fn test_starts_at_zero() {
        let alloc = allocator();
        let ns = Namespace::new("a", "x").unwrap();
        assert_eq!(alloc.next_id(&ns).unwrap(), 0);
    }

    #[test]
    fn test_contiguous_blocks() {
        let alloc = allocator();
        let ns = Namespace::new("a", "x").unwrap();

        let first = alloc.allocate(&ns, 3).unwrap();
        assert_eq!(first.ids().collect::<Vec<_>>(), vec![0, 1, 2]);
        alloc.advance(&ns, first.end).unwrap();

        let second = alloc.allocate(&ns, 1).unwrap();
        assert_eq!(second, IdBlock { start: 3, end: 4 });
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn test_allocate_without_advance_repeats() {
        let alloc = allocator();
        let ns = Namespace::new("a", "x").unwrap();

        let first = alloc.allocate(&ns, 1).unwrap();
        let again = alloc.allocate(&ns, 1).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn test_counter_never_regresses() {
        let alloc = allocator();
        let ns = Namespace::new("a", "x").unwrap();

        alloc.advance(&ns, 5).unwrap();
        let err = alloc.advance(&ns, 2).unwrap_err();
        assert!(matches!(
            err,
            StorageError::CounterRegression {
                current: 5,
                requested: 2,
                ..
            }
        ));
        alloc.advance(&ns, 5).unwrap();
        assert_eq!(alloc.next_id(&ns).unwrap(), 5);
        assert!(alloc.allocate_from(&ns, 4, 1).is_err());
    }

    #[test]
    fn test_counters_are_per_namespace() {
        let alloc = allocator();
        let x = Namespace::new("a", "x").unwrap();
        let y = Namespace::new("a", "y").unwrap();

        alloc.advance(&x, 10).unwrap();
        assert_eq!(alloc.next_id(&y).unwrap(), 0);
    }

    #[test]
    fn test_never_hands_out_reserved_id() {
        let alloc = allocator();
        let ns = Namespace::new("a", "x").unwrap();

        let last = alloc.allocate_from(&ns, RESERVED_ID - 1, 1).unwrap();
        assert_eq!(last.end, RESERVED_ID);
        assert!(matches!(
            alloc.allocate_from(&ns, RESERVED_ID - 1, 2),
            Err(StorageError::IdSpaceExhausted(_))
        ));
    }
}
