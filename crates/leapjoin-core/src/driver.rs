//! The depth-by-depth join driver.
//!
//! Starting at depth 1, each iteration either enters a depth for the first
//! time (fresh leapfrog search) or re-enters an open one (step past the last
//! match). A match descends, handing the bound value to deeper legs; at the
//! deepest depth it is a complete binding for the sink. Exhaustion pops the
//! depth, rewinds the parent legs and backtracks. Depth 0 means done.

use leapjoin_storage::{Key, SortedRelation};
use serde::{Deserialize, Serialize};

use crate::config::JoinConfig;
use crate::error::JoinError;
use crate::leapfrog::{self, Probe};
use crate::leg::LegArena;
use crate::plan::{JoinInput, JoinPlan, KeyInfo, LegId};
use crate::sink::{CollectSink, CountSink, Limit, ResultSink};

/// Counters collected during one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinStats {
    /// Lower-bound seeks issued against relations.
    pub seeks: u64,
    /// Times a depth was exhausted and popped.
    pub backtracks: u64,
    /// Fresh entries into a depth.
    pub depth_entries: u64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinOutcome {
    /// Complete bindings handed to the sink.
    pub matches: u64,
    /// The sink asked to stop before the search space was exhausted.
    pub stopped_early: bool,
    pub stats: JoinStats,
}

/// A validated multi-way join over borrowed relations.
///
/// Setup checks the depth assignment once; every call to [`run`](Self::run)
/// builds fresh cursors and legs, so a join can be run repeatedly (and the
/// same relations can back several joins on different threads).
#[derive(Debug)]
pub struct LeapfrogJoin<'r, R> {
    relations: Vec<&'r R>,
    plan: JoinPlan,
    config: JoinConfig,
}

impl<'r, R: SortedRelation> LeapfrogJoin<'r, R> {
    pub fn new(inputs: &[JoinInput<'r, R>]) -> Result<Self, JoinError> {
        Self::with_config(inputs, JoinConfig::default())
    }

    pub fn with_config(inputs: &[JoinInput<'r, R>], config: JoinConfig) -> Result<Self, JoinError> {
        let key_infos: Vec<KeyInfo> = inputs.iter().map(|input| input.key_info).collect();
        let plan = JoinPlan::build(&key_infos)?;
        Ok(Self {
            relations: inputs.iter().map(|input| input.relation).collect(),
            plan,
            config,
        })
    }

    pub fn plan(&self) -> &JoinPlan {
        &self.plan
    }

    pub fn config(&self) -> &JoinConfig {
        &self.config
    }

    pub fn count(&self) -> Result<u64, JoinError> {
        let mut sink = CountSink::default();
        self.run(&mut sink)?;
        Ok(sink.count)
    }

    pub fn collect(&self) -> Result<Vec<Vec<Key>>, JoinError> {
        let mut sink = CollectSink::default();
        self.run(&mut sink)?;
        Ok(sink.tuples)
    }

    pub fn run<S: ResultSink>(&self, sink: S) -> Result<JoinOutcome, JoinError> {
        match self.config.match_limit {
            Some(0) => Ok(JoinOutcome {
                stopped_early: true,
                ..JoinOutcome::default()
            }),
            Some(limit) => self.execute(Limit::new(sink, limit)),
            None => self.execute(sink),
        }
    }

    fn execute<S: ResultSink>(&self, mut sink: S) -> Result<JoinOutcome, JoinError> {
        let max_depth = self.plan.max_depth();
        if self.config.log_plan {
            tracing::debug!(plan = %self.plan.summary(), "leapfrog join plan");
        }

        let mut arena = LegArena::new(&self.plan, self.relations.clone())?;
        // Per-depth leg order; re-sorted by key on every fresh entry.
        let mut order: Vec<Vec<LegId>> = self.plan.depths().to_vec();
        // Rotation position of the last search, one entry per open depth.
        let mut stack: Vec<usize> = Vec::with_capacity(max_depth);
        let mut bindings: Vec<Key> = vec![0; max_depth];

        let mut outcome = JoinOutcome::default();
        let mut depth = 1usize;
        while depth != 0 {
            let step = if stack.len() != depth {
                outcome.stats.depth_entries += 1;
                let step = leapfrog::open(&mut arena, &mut order[depth])?;
                stack.push(step.position);
                step
            } else {
                let position = stack[depth - 1];
                let step = leapfrog::next(&mut arena, &order[depth], position)?;
                stack[depth - 1] = step.position;
                step
            };

            match step.probe {
                Probe::Exhausted => {
                    stack.pop();
                    for &leg in &order[depth] {
                        arena.propagate_close(leg)?;
                    }
                    outcome.stats.backtracks += 1;
                    tracing::trace!(depth, "backtrack");
                    depth -= 1;
                }
                Probe::Match(key) => {
                    bindings[depth - 1] = key;
                    if depth == max_depth {
                        outcome.matches += 1;
                        if sink.on_match(&bindings).is_break() {
                            outcome.stopped_early = true;
                            break;
                        }
                    } else {
                        for &leg in &order[depth] {
                            arena.propagate_open(leg);
                        }
                        tracing::trace!(depth, key, "descend");
                        depth += 1;
                    }
                }
            }
        }
        debug_assert!(outcome.stopped_early || stack.is_empty());

        outcome.stats.seeks = arena.seeks();
        tracing::debug!(
            matches = outcome.matches,
            stopped_early = outcome.stopped_early,
            seeks = outcome.stats.seeks,
            backtracks = outcome.stats.backtracks,
            "leapfrog join finished"
        );
        Ok(outcome)
    }
}

/// Count the complete bindings of a join.
pub fn run_join<R: SortedRelation>(inputs: &[JoinInput<'_, R>]) -> Result<u64, JoinError> {
    LeapfrogJoin::new(inputs)?.count()
}

/// Stream every complete binding of a join into `sink`.
pub fn run_join_with<R: SortedRelation, S: ResultSink>(
    inputs: &[JoinInput<'_, R>],
    sink: S,
) -> Result<JoinOutcome, JoinError> {
    LeapfrogJoin::new(inputs)?.run(sink)
}
