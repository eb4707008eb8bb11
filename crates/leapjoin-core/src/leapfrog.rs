//! Leapfrog intersection at a single depth.
//!
//! The legs active at a depth are kept sorted by their key as of entry; a
//! rotating pointer seeks each leg to the largest key seen so far until every
//! leg agrees (a match) or one leg leaves its prefix (the depth is done).

use leapjoin_storage::{Key, SortedRelation};

use crate::error::JoinError;
use crate::leg::LegArena;
use crate::plan::LegId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Probe {
    Match(Key),
    Exhausted,
}

/// Outcome of a search at one depth: the rotation position it stopped at
/// (kept on the search stack) and what was found there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Step {
    pub(crate) position: usize,
    pub(crate) probe: Probe,
}

impl Step {
    fn exhausted(position: usize) -> Self {
        Self {
            position,
            probe: Probe::Exhausted,
        }
    }
}

/// First search at a depth under the current prefixes.
pub(crate) fn open<R: SortedRelation>(
    arena: &mut LegArena<'_, R>,
    legs: &mut [LegId],
) -> Result<Step, JoinError> {
    if let Some(position) = legs.iter().position(|&leg| arena.is_exhausted(leg)) {
        return Ok(Step::exhausted(position));
    }
    legs.sort_by_key(|&leg| arena.current_key(leg));
    converge(arena, legs, 0)
}

/// Move past the match at `position` and search for the next one.
pub(crate) fn next<R: SortedRelation>(
    arena: &mut LegArena<'_, R>,
    legs: &[LegId],
    position: usize,
) -> Result<Step, JoinError> {
    arena.advance_to_next(legs[position])?;
    if arena.is_exhausted(legs[position]) {
        return Ok(Step::exhausted(position));
    }
    converge(arena, legs, (position + 1) % legs.len())
}

fn converge<R: SortedRelation>(
    arena: &mut LegArena<'_, R>,
    legs: &[LegId],
    start: usize,
) -> Result<Step, JoinError> {
    let k = legs.len();
    let mut p = start;
    let Some(mut max_key) = arena.current_key(legs[(p + k - 1) % k]) else {
        return Ok(Step::exhausted(p));
    };

    loop {
        let Some(key) = arena.current_key(legs[p]) else {
            return Ok(Step::exhausted(p));
        };
        if key == max_key {
            return Ok(Step {
                position: p,
                probe: Probe::Match(key),
            });
        }

        arena.seek_to(legs[p], max_key)?;
        if arena.is_exhausted(legs[p]) {
            return Ok(Step::exhausted(p));
        }
        let Some(landed) = arena.current_key(legs[p]) else {
            return Ok(Step::exhausted(p));
        };
        max_key = landed;
        p = (p + 1) % k;
    }
}
