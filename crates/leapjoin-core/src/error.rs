use leapjoin_storage::StorageError;
use thiserror::Error;

/// Errors raised while setting up or running a join.
///
/// Everything except [`JoinError::Storage`] is a malformed join specification
/// and is reported before any cursor moves.
#[derive(Debug, Error)]
pub enum JoinError {
    #[error("join has no relations")]
    NoRelations,

    #[error("relation {relation}: depths start at 1, got 0")]
    ZeroDepth { relation: usize },

    #[error("relation {relation}: subject and object both bound at depth {depth}")]
    SameDepth { relation: usize, depth: usize },

    #[error(
        "relation {relation}: subject depth {subject_depth} is deeper than object depth \
         {object_depth}; supply the inverse relation instead"
    )]
    InvertedRelation {
        relation: usize,
        subject_depth: usize,
        object_depth: usize,
    },

    #[error("depth {depth} of {max_depth} has no relation bound to it")]
    MissingDepth { depth: usize, max_depth: usize },

    #[error("storage failure in relation {relation} at depth {depth}: {source}")]
    Storage {
        relation: usize,
        depth: usize,
        #[source]
        source: StorageError,
    },
}

impl JoinError {
    /// True for errors that describe a bad join specification rather than a
    /// failure while reading relations.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, JoinError::Storage { .. })
    }
}
