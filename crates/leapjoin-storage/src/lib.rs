//! Sorted binary relations for leapfrog joins.
//!
//! A relation is an immutable, sorted, de-duplicated sequence of
//! `(key1, key2)` integer pairs, ordered lexicographically. The join engine
//! only needs three things from it:
//!
//! - `lower_bound(v)`: the first position whose value is `>= v`
//! - `value_at(pos)`: the value at a position (`None` past the end)
//! - forward `advance(pos)`
//!
//! Two backends implement [`SortedRelation`]:
//!
//! - [`MemoryRelation`]: a shared `Arc<[Value]>`, cheap to clone and `Sync`
//! - [`MappedRelation`]: a read-only memory-mapped relation file
//!
//! [`AnyRelation`] picks one of them at setup time without boxing.

pub mod error;
pub mod mapped;
pub mod memory;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub use error::StorageError;
pub use mapped::{write_relation_file, MappedRelation, RELATION_FILE_MAGIC};
pub use memory::{MemoryRelation, RelationBuilder};

/// Dictionary-encoded entity identifier.
pub type Key = u32;

/// Index into a relation's sorted sequence. `len()` is the end sentinel.
pub type Position = usize;

// ============================================================================
// Values
// ============================================================================

/// One relation entry: `(subject, object)` for a forward relation,
/// `(object, subject)` for an inverse one.
///
/// Ordering is lexicographic on `(key1, key2)`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Value {
    pub key1: Key,
    pub key2: Key,
}

impl Value {
    pub const MIN: Value = Value { key1: 0, key2: 0 };

    pub const fn new(key1: Key, key2: Key) -> Self {
        Self { key1, key2 }
    }

    pub fn get(self, column: Column) -> Key {
        match column {
            Column::Key1 => self.key1,
            Column::Key2 => self.key2,
        }
    }

    pub fn set(&mut self, column: Column, key: Key) {
        match column {
            Column::Key1 => self.key1 = key,
            Column::Key2 => self.key2 = key,
        }
    }

    /// `(key2, key1)`: the same entry as seen from the inverse relation.
    pub const fn swapped(self) -> Self {
        Self {
            key1: self.key2,
            key2: self.key1,
        }
    }
}

impl From<(Key, Key)> for Value {
    fn from((key1, key2): (Key, Key)) -> Self {
        Self { key1, key2 }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.key1, self.key2)
    }
}

/// A column of a stored pair, in sort-significance order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Column {
    Key1,
    Key2,
}

impl Column {
    pub const ALL: [Column; 2] = [Column::Key1, Column::Key2];

    pub const fn index(self) -> usize {
        match self {
            Column::Key1 => 0,
            Column::Key2 => 1,
        }
    }

    /// Columns that sort before this one (the prefix it is nested under).
    pub fn preceding(self) -> &'static [Column] {
        &Self::ALL[..self.index()]
    }

    /// Columns that sort after this one.
    pub fn following(self) -> &'static [Column] {
        &Self::ALL[self.index() + 1..]
    }
}

// ============================================================================
// Capability interface
// ============================================================================

/// Read-only, seekable view of a sorted relation.
///
/// Implementations must present values in strictly increasing order; the join
/// relies on `lower_bound` returning the *first* position `>= target`.
pub trait SortedRelation {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn begin(&self) -> Position {
        0
    }

    /// First position whose value is `>= target`, or `len()` if none.
    fn lower_bound(&self, target: Value) -> Result<Position, StorageError>;

    /// Value at `position`, or `None` at (or past) the end.
    fn value_at(&self, position: Position) -> Result<Option<Value>, StorageError>;

    fn advance(&self, position: Position) -> Position {
        position.saturating_add(1).min(self.len())
    }
}

impl<R: SortedRelation + ?Sized> SortedRelation for &R {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn begin(&self) -> Position {
        (**self).begin()
    }

    fn lower_bound(&self, target: Value) -> Result<Position, StorageError> {
        (**self).lower_bound(target)
    }

    fn value_at(&self, position: Position) -> Result<Option<Value>, StorageError> {
        (**self).value_at(position)
    }

    fn advance(&self, position: Position) -> Position {
        (**self).advance(position)
    }
}

// ============================================================================
// Setup-time backend selection
// ============================================================================

/// A relation backend chosen when the query is set up.
#[derive(Debug, Clone)]
pub enum AnyRelation {
    Memory(MemoryRelation),
    Mapped(MappedRelation),
}

impl AnyRelation {
    pub fn open_mapped(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        MappedRelation::open(path).map(AnyRelation::Mapped)
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            AnyRelation::Memory(_) => "memory",
            AnyRelation::Mapped(_) => "mapped",
        }
    }
}

impl From<MemoryRelation> for AnyRelation {
    fn from(rel: MemoryRelation) -> Self {
        AnyRelation::Memory(rel)
    }
}

impl From<MappedRelation> for AnyRelation {
    fn from(rel: MappedRelation) -> Self {
        AnyRelation::Mapped(rel)
    }
}

impl SortedRelation for AnyRelation {
    fn len(&self) -> usize {
        match self {
            AnyRelation::Memory(rel) => rel.len(),
            AnyRelation::Mapped(rel) => rel.len(),
        }
    }

    fn lower_bound(&self, target: Value) -> Result<Position, StorageError> {
        match self {
            AnyRelation::Memory(rel) => rel.lower_bound(target),
            AnyRelation::Mapped(rel) => rel.lower_bound(target),
        }
    }

    fn value_at(&self, position: Position) -> Result<Option<Value>, StorageError> {
        match self {
            AnyRelation::Memory(rel) => rel.value_at(position),
            AnyRelation::Mapped(rel) => rel.value_at(position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_order_is_lexicographic() {
        assert!(Value::new(1, 9) < Value::new(2, 0));
        assert!(Value::new(1, 2) < Value::new(1, 3));
        assert_eq!(Value::new(4, 5).swapped(), Value::new(5, 4));
    }

    #[test]
    fn column_prefixes() {
        assert!(Column::Key1.preceding().is_empty());
        assert_eq!(Column::Key2.preceding(), &[Column::Key1]);
        assert_eq!(Column::Key1.following(), &[Column::Key2]);
        assert!(Column::Key2.following().is_empty());
    }

    #[test]
    fn value_get_set_by_column() {
        let mut v = Value::new(3, 4);
        v.set(Column::Key2, 10);
        assert_eq!(v.get(Column::Key1), 3);
        assert_eq!(v.get(Column::Key2), 10);
    }

    #[test]
    fn any_relation_dispatches_to_memory_backend() {
        let rel: AnyRelation = MemoryRelation::from_pairs([(2, 1), (1, 5), (1, 2)]).into();
        assert_eq!(rel.backend_name(), "memory");
        assert_eq!(rel.len(), 3);
        let pos = rel.lower_bound(Value::new(1, 3)).unwrap();
        assert_eq!(rel.value_at(pos).unwrap(), Some(Value::new(1, 5)));
        assert_eq!(rel.value_at(rel.len()).unwrap(), None);
    }
}
