//! Join setup: depth assignments, the leg layout, and the depth index.
//!
//! Every relation contributes three legs, stored contiguously:
//!
//! ```text
//! 3r + 0   root  (depth 0, seeds the chain)
//! 3r + 1   key1  (subject_depth)
//! 3r + 2   key2  (object_depth)
//! ```
//!
//! `prev`/`next` link those three in depth order; they are indices into the
//! same layout, never references.

use std::fmt;

use leapjoin_storage::Column;
use serde::{Deserialize, Serialize};

use crate::error::JoinError;

/// Which variable depths a relation's two columns bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyInfo {
    pub subject_depth: usize,
    pub object_depth: usize,
}

impl KeyInfo {
    pub const fn new(subject_depth: usize, object_depth: usize) -> Self {
        Self {
            subject_depth,
            object_depth,
        }
    }

    fn depth_of(self, column: Column) -> usize {
        match column {
            Column::Key1 => self.subject_depth,
            Column::Key2 => self.object_depth,
        }
    }
}

/// One relation taking part in a join.
///
/// The relation must be sorted so that its first column is the one bound at
/// the shallower depth; [`JoinInput::oriented`] picks between a relation and
/// its inverse to guarantee that.
#[derive(Debug)]
pub struct JoinInput<'r, R> {
    pub relation: &'r R,
    pub key_info: KeyInfo,
}

impl<'r, R> Clone for JoinInput<'r, R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'r, R> Copy for JoinInput<'r, R> {}

impl<'r, R> JoinInput<'r, R> {
    pub fn new(relation: &'r R, subject_depth: usize, object_depth: usize) -> Self {
        Self {
            relation,
            key_info: KeyInfo::new(subject_depth, object_depth),
        }
    }

    /// Use `forward` when the subject binds first, otherwise `inverse` with
    /// the depths swapped.
    pub fn oriented(
        forward: &'r R,
        inverse: &'r R,
        subject_depth: usize,
        object_depth: usize,
    ) -> Self {
        if object_depth < subject_depth {
            Self::new(inverse, object_depth, subject_depth)
        } else {
            Self::new(forward, subject_depth, object_depth)
        }
    }
}

// ============================================================================
// Leg layout
// ============================================================================

/// Which component of a relation's value a leg binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Slot {
    Root,
    Column(Column),
}

impl Slot {
    pub fn column(self) -> Option<Column> {
        match self {
            Slot::Root => None,
            Slot::Column(column) => Some(column),
        }
    }
}

pub(crate) type LegId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct LegSpec {
    pub(crate) relation: usize,
    pub(crate) slot: Slot,
    pub(crate) depth: usize,
    pub(crate) prev: Option<LegId>,
    pub(crate) next: Option<LegId>,
}

/// The validated leg layout and depth index for one query.
#[derive(Debug, Clone)]
pub struct JoinPlan {
    legs: Vec<LegSpec>,
    depths: Vec<Vec<LegId>>,
}

impl JoinPlan {
    pub fn build(key_infos: &[KeyInfo]) -> Result<Self, JoinError> {
        if key_infos.is_empty() {
            return Err(JoinError::NoRelations);
        }

        for (relation, info) in key_infos.iter().enumerate() {
            if info.subject_depth == 0 || info.object_depth == 0 {
                return Err(JoinError::ZeroDepth { relation });
            }
            if info.subject_depth == info.object_depth {
                return Err(JoinError::SameDepth {
                    relation,
                    depth: info.subject_depth,
                });
            }
            if info.subject_depth > info.object_depth {
                return Err(JoinError::InvertedRelation {
                    relation,
                    subject_depth: info.subject_depth,
                    object_depth: info.object_depth,
                });
            }
        }

        let max_depth = key_infos
            .iter()
            .map(|info| info.object_depth)
            .max()
            .unwrap_or(0);

        let mut legs = Vec::with_capacity(key_infos.len() * 3);
        let mut depths: Vec<Vec<LegId>> = vec![Vec::new(); max_depth + 1];
        for (relation, info) in key_infos.iter().enumerate() {
            let root = legs.len();
            legs.push(LegSpec {
                relation,
                slot: Slot::Root,
                depth: 0,
                prev: None,
                next: Some(root + 1),
            });
            depths[0].push(root);

            for column in Column::ALL {
                let id = legs.len();
                let depth = info.depth_of(column);
                legs.push(LegSpec {
                    relation,
                    slot: Slot::Column(column),
                    depth,
                    prev: Some(id - 1),
                    next: column.following().first().map(|_| id + 1),
                });
                depths[depth].push(id);
            }
        }

        if let Some(depth) = (1..=max_depth).find(|&d| depths[d].is_empty()) {
            return Err(JoinError::MissingDepth { depth, max_depth });
        }

        Ok(Self { legs, depths })
    }

    pub fn max_depth(&self) -> usize {
        self.depths.len() - 1
    }

    pub fn relation_count(&self) -> usize {
        self.depths[0].len()
    }

    pub(crate) fn legs(&self) -> &[LegSpec] {
        &self.legs
    }

    pub(crate) fn depths(&self) -> &[Vec<LegId>] {
        &self.depths
    }

    pub fn summary(&self) -> PlanSummary {
        let depths = (1..=self.max_depth())
            .map(|depth| DepthSummary {
                depth,
                legs: self.depths[depth]
                    .iter()
                    .filter_map(|&id| {
                        let leg = &self.legs[id];
                        leg.slot.column().map(|column| LegSummary {
                            relation: leg.relation,
                            column,
                        })
                    })
                    .collect(),
            })
            .collect();
        PlanSummary {
            max_depth: self.max_depth(),
            relations: self.relation_count(),
            depths,
        }
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Depth count and the legs active at each depth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub max_depth: usize,
    pub relations: usize,
    pub depths: Vec<DepthSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthSummary {
    pub depth: usize,
    pub legs: Vec<LegSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegSummary {
    pub relation: usize,
    pub column: Column,
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total depth = {} ({} relations)",
            self.max_depth, self.relations
        )?;
        for depth in &self.depths {
            write!(f, "\ndepth {}:", depth.depth)?;
            for leg in &depth.legs {
                let column = match leg.column {
                    Column::Key1 => "key1",
                    Column::Key2 => "key2",
                };
                write!(f, " {{r{} {}}}", leg.relation, column)?;
            }
        }
        Ok(())
    }
}
