use leapjoin_storage::{Position, SortedRelation, StorageError, Value};

/// A relation's single read position.
///
/// One cursor exists per relation per run; the key1 and key2 legs of that
/// relation both move it, so it lives in the arena and legs refer to it by
/// relation index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Cursor {
    position: Position,
    value: Option<Value>,
}

impl Cursor {
    pub(crate) fn begin<R: SortedRelation>(relation: &R) -> Result<Self, StorageError> {
        let position = relation.begin();
        Ok(Self {
            position,
            value: relation.value_at(position)?,
        })
    }

    pub(crate) fn position(&self) -> Position {
        self.position
    }

    /// Current value, `None` once the cursor has run off the end.
    pub(crate) fn value(&self) -> Option<Value> {
        self.value
    }

    pub(crate) fn seek<R: SortedRelation>(
        &mut self,
        relation: &R,
        target: Value,
    ) -> Result<(), StorageError> {
        self.move_to(relation, relation.lower_bound(target)?)
    }

    pub(crate) fn rewind<R: SortedRelation>(&mut self, relation: &R) -> Result<(), StorageError> {
        self.move_to(relation, relation.begin())
    }

    pub(crate) fn move_to_end<R: SortedRelation>(&mut self, relation: &R) {
        self.position = relation.len();
        self.value = None;
    }

    fn move_to<R: SortedRelation>(
        &mut self,
        relation: &R,
        position: Position,
    ) -> Result<(), StorageError> {
        self.value = relation.value_at(position)?;
        self.position = position;
        Ok(())
    }
}
