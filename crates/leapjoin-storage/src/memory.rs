//! In-memory sorted relations.

use std::sync::Arc;

use crate::{Key, Position, SortedRelation, StorageError, Value};

/// An immutable sorted relation held in memory.
///
/// Cloning shares the underlying slice, so many concurrent joins can read the
/// same relation while each owns its own cursors.
#[derive(Debug, Clone)]
pub struct MemoryRelation {
    values: Arc<[Value]>,
}

impl MemoryRelation {
    pub fn empty() -> Self {
        Self {
            values: Arc::from(Vec::new()),
        }
    }

    /// Build from pairs in any order; sorts and drops duplicates.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Key, Key)>) -> Self {
        Self::from_values(pairs.into_iter().map(Value::from))
    }

    /// Build from values in any order; sorts and drops duplicates.
    pub fn from_values(values: impl IntoIterator<Item = Value>) -> Self {
        let mut values: Vec<Value> = values.into_iter().collect();
        values.sort_unstable();
        values.dedup();
        Self {
            values: Arc::from(values),
        }
    }

    /// Build from an already sorted stream, rejecting out-of-order input.
    pub fn from_sorted(
        values: impl IntoIterator<Item = Value>,
    ) -> Result<Self, StorageError> {
        let mut builder = RelationBuilder::new();
        for value in values {
            builder.push(value)?;
        }
        Ok(builder.build())
    }

    /// The same relation with both columns swapped, re-sorted.
    pub fn inverse(&self) -> Self {
        Self::from_values(self.values.iter().map(|v| v.swapped()))
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = Value> + '_ {
        self.values.iter().copied()
    }
}

impl Default for MemoryRelation {
    fn default() -> Self {
        Self::empty()
    }
}

impl SortedRelation for MemoryRelation {
    fn len(&self) -> usize {
        self.values.len()
    }

    fn lower_bound(&self, target: Value) -> Result<Position, StorageError> {
        Ok(self.values.partition_point(|v| *v < target))
    }

    fn value_at(&self, position: Position) -> Result<Option<Value>, StorageError> {
        Ok(self.values.get(position).copied())
    }
}

// ============================================================================
// Push-based construction
// ============================================================================

/// Accepts a pre-sorted stream of values, the way a B-tree bulk builder does.
///
/// Exact duplicates are dropped; anything smaller than its predecessor is an
/// error.
#[derive(Debug, Default)]
pub struct RelationBuilder {
    values: Vec<Value>,
    pushed: u64,
}

impl RelationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            pushed: 0,
        }
    }

    pub fn push(&mut self, value: Value) -> Result<(), StorageError> {
        let index = self.pushed;
        self.pushed += 1;
        match self.values.last() {
            Some(&previous) if value < previous => Err(StorageError::Unsorted {
                index,
                previous,
                value,
            }),
            Some(&previous) if value == previous => Ok(()),
            _ => {
                self.values.push(value);
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn build(self) -> MemoryRelation {
        MemoryRelation {
            values: Arc::from(self.values),
        }
    }
}
