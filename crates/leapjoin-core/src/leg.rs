//! Depth legs: one relation column's participation at one depth.
//!
//! All legs and cursors of a run live in a [`LegArena`]. A leg carries the
//! prefix fixed by shallower depths of its own relation; the arena resolves
//! its cursor by relation index and its chain neighbours by leg index.

use leapjoin_storage::{Key, SortedRelation, Value};

use crate::cursor::Cursor;
use crate::error::JoinError;
use crate::plan::{JoinPlan, LegId, LegSpec, Slot};

#[derive(Debug, Clone, Copy)]
struct Leg {
    spec: LegSpec,
    /// Components before this leg's column are fixed; the rest are scratch
    /// for the next seek target.
    prefix: Value,
}

pub(crate) struct LegArena<'r, R> {
    relations: Vec<&'r R>,
    cursors: Vec<Cursor>,
    legs: Vec<Leg>,
    seeks: u64,
}

impl<'r, R: SortedRelation> LegArena<'r, R> {
    pub(crate) fn new(plan: &JoinPlan, relations: Vec<&'r R>) -> Result<Self, JoinError> {
        let cursors = relations
            .iter()
            .enumerate()
            .map(|(relation, rel)| {
                Cursor::begin(*rel).map_err(|source| JoinError::Storage {
                    relation,
                    depth: 0,
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let legs = plan
            .legs()
            .iter()
            .map(|&spec| Leg {
                spec,
                prefix: Value::MIN,
            })
            .collect();

        Ok(Self {
            relations,
            cursors,
            legs,
            seeks: 0,
        })
    }

    pub(crate) fn seeks(&self) -> u64 {
        self.seeks
    }

    fn cursor(&self, id: LegId) -> &Cursor {
        &self.cursors[self.legs[id].spec.relation]
    }

    /// Component of the current value at this leg's column; `None` for root
    /// legs and for cursors past the end.
    pub(crate) fn current_key(&self, id: LegId) -> Option<Key> {
        let column = self.legs[id].spec.slot.column()?;
        self.cursor(id).value().map(|v| v.get(column))
    }

    /// True once the cursor has left the prefix fixed by shallower depths
    /// (or the relation).
    pub(crate) fn is_exhausted(&self, id: LegId) -> bool {
        let leg = &self.legs[id];
        let Some(value) = self.cursor(id).value() else {
            return true;
        };
        match leg.spec.slot {
            Slot::Root => false,
            Slot::Column(column) => column
                .preceding()
                .iter()
                .any(|&c| value.get(c) != leg.prefix.get(c)),
        }
    }

    /// Fix `key` at this leg's column, clear deeper columns and jump the
    /// cursor to the first entry at or after the resulting prefix.
    pub(crate) fn seek_to(&mut self, id: LegId, key: Key) -> Result<(), JoinError> {
        let Slot::Column(column) = self.legs[id].spec.slot else {
            return self.rewind_root(id);
        };
        let leg = &mut self.legs[id];
        leg.prefix.set(column, key);
        for &deeper in column.following() {
            leg.prefix.set(deeper, 0);
        }
        let target = leg.prefix;
        let LegSpec {
            relation, depth, ..
        } = leg.spec;

        self.seeks += 1;
        let cursor = &mut self.cursors[relation];
        cursor
            .seek(self.relations[relation], target)
            .map_err(|source| JoinError::Storage {
                relation,
                depth,
                source,
            })?;
        tracing::trace!(
            relation,
            depth,
            target = %target,
            position = cursor.position(),
            "seek"
        );
        Ok(())
    }

    /// Step past the current key at this leg's column.
    pub(crate) fn advance_to_next(&mut self, id: LegId) -> Result<(), JoinError> {
        let Some(key) = self.current_key(id) else {
            return Ok(());
        };
        match key.checked_add(1) {
            Some(next) => self.seek_to(id, next),
            None => {
                let relation = self.legs[id].spec.relation;
                self.cursors[relation].move_to_end(self.relations[relation]);
                Ok(())
            }
        }
    }

    /// Hand the value just matched down to the next deeper leg of the same
    /// relation as its fixed prefix.
    pub(crate) fn propagate_open(&mut self, id: LegId) {
        let Some(next) = self.legs[id].spec.next else {
            return;
        };
        if let Some(value) = self.cursor(id).value() {
            self.legs[next].prefix = value;
        }
    }

    /// Called when this leg's depth is exhausted: put the parent leg's cursor
    /// back on the block of the key the parent matched, so the parent depth
    /// resumes from that match and the next re-entry of this depth starts
    /// from the top of the block.
    pub(crate) fn propagate_close(&mut self, id: LegId) -> Result<(), JoinError> {
        let leg = &self.legs[id];
        let Some(prev) = leg.spec.prev else {
            return Ok(());
        };
        match self.legs[prev].spec.slot {
            Slot::Root => self.rewind_root(prev),
            Slot::Column(parent) => {
                let bound = leg.prefix.get(parent);
                self.seek_to(prev, bound)
            }
        }
    }

    fn rewind_root(&mut self, id: LegId) -> Result<(), JoinError> {
        let LegSpec {
            relation, depth, ..
        } = self.legs[id].spec;
        self.seeks += 1;
        self.cursors[relation]
            .rewind(self.relations[relation])
            .map_err(|source| JoinError::Storage {
                relation,
                depth,
                source,
            })
    }

    #[cfg(test)]
    pub(crate) fn prefix(&self, id: LegId) -> Value {
        self.legs[id].prefix
    }

    #[cfg(test)]
    pub(crate) fn column(&self, id: LegId) -> Option<leapjoin_storage::Column> {
        self.legs[id].spec.slot.column()
    }
}
