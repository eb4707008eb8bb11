//! Leapfrog joins over sorted binary relations.
//!
//! A query is a set of binary relations, each sorted by `(key1, key2)`, plus
//! the depth (position in the global variable order) at which each column is
//! bound. The join walks the variables depth by depth:
//!
//! - at every depth, all legs bound there intersect their candidate keys by
//!   seeking each other forward (leapfrog), never by nested scanning
//! - a match fixes the key as a prefix for deeper legs of the same relation
//! - an exhausted depth rewinds its parents and backtracks
//!
//! ```
//! use leapjoin_core::{run_join, JoinInput};
//! use leapjoin_storage::MemoryRelation;
//!
//! // A(x, y), B(y, z)
//! let a = MemoryRelation::from_pairs([(1, 2), (1, 3)]);
//! let b = MemoryRelation::from_pairs([(2, 9), (3, 9)]);
//! let count = run_join(&[JoinInput::new(&a, 1, 2), JoinInput::new(&b, 2, 3)]).unwrap();
//! assert_eq!(count, 2);
//! ```
//!
//! ## Module Organization
//!
//! - `plan`: depth assignment validation, leg layout, diagnostic summary
//! - `leg`: the leg/cursor arena and its seek and propagation primitives
//! - `leapfrog`: per-depth intersection
//! - `driver`: the descend/backtrack state machine
//! - `sink`: where complete bindings go
//! - `reference`: a nested-loop oracle

pub mod config;
mod cursor;
pub mod driver;
pub mod error;
mod leapfrog;
mod leg;
pub mod plan;
pub mod reference;
pub mod sink;

pub use config::JoinConfig;
pub use driver::{run_join, run_join_with, JoinOutcome, JoinStats, LeapfrogJoin};
pub use error::JoinError;
pub use plan::{DepthSummary, JoinInput, JoinPlan, KeyInfo, LegSummary, PlanSummary, Slot};
pub use sink::{CollectSink, CountSink, FnSink, Limit, ResultSink};

pub use leapjoin_storage::{Key, Value};
