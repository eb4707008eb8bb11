//! Synthetic leapfrog join benchmarks.
//!
//! Not a microbenchmark framework. It generates one random edge relation
//! `E`, joins it with itself in a fixed query shape, and reports how long
//! each run took:
//!
//! ```bash
//! cargo run -p leapjoin-cli --release -- bench --shape triangle --nodes 20000 --edges-per-node 8
//! ```

use anyhow::{anyhow, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use leapjoin_core::reference::nested_loop_join;
use leapjoin_core::{
    CollectSink, CountSink, JoinConfig, JoinInput, JoinStats, LeapfrogJoin, PlanSummary,
};
use leapjoin_storage::{write_relation_file, AnyRelation, Key, MemoryRelation, SortedRelation};

use crate::synthetic::random_edges;

/// Query shapes over a single edge relation `E`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Shape {
    /// E(a, b), E(b, c), E(c, d)
    Path,
    /// E(a, b), E(a, c), E(a, d)
    Star,
    /// E(a, b), E(b, c), E(a, c)
    Triangle,
    /// E(a, b), E(c, b): two edges into the same node
    Converge,
}

impl Shape {
    /// `(subject_depth, object_depth)` of each atom, before orientation.
    fn atoms(self) -> &'static [(usize, usize)] {
        match self {
            Shape::Path => &[(1, 2), (2, 3), (3, 4)],
            Shape::Star => &[(1, 2), (1, 3), (1, 4)],
            Shape::Triangle => &[(1, 2), (2, 3), (1, 3)],
            Shape::Converge => &[(1, 2), (3, 2)],
        }
    }

    fn variables(self) -> &'static str {
        match self {
            Shape::Path | Shape::Star => "a, b, c, d",
            Shape::Triangle | Shape::Converge => "a, b, c",
        }
    }

    /// Join inputs for this shape, reading atoms whose object binds first
    /// from `inverse`.
    pub fn inputs<'r, R>(self, forward: &'r R, inverse: &'r R) -> Vec<JoinInput<'r, R>> {
        self.atoms()
            .iter()
            .map(|&(s, o)| JoinInput::oriented(forward, inverse, s, o))
            .collect()
    }

    pub fn plan_summary(self) -> Result<PlanSummary> {
        let empty = MemoryRelation::empty();
        let inputs = self.inputs(&empty, &empty);
        Ok(LeapfrogJoin::new(&inputs)?.plan().summary())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Memory,
    Mapped,
}

#[derive(Debug, Clone, Args)]
pub struct BenchArgs {
    /// Query shape to run.
    #[arg(long, value_enum, default_value_t = Shape::Path)]
    pub shape: Shape,

    /// Number of nodes in the synthetic graph.
    #[arg(long, default_value_t = 10_000)]
    pub nodes: Key,

    /// Outgoing edges per node (duplicates collapse).
    #[arg(long, default_value_t = 4)]
    pub edges_per_node: usize,

    /// RNG seed (deterministic).
    #[arg(long, default_value_t = 1)]
    pub seed: u64,

    /// Number of timed runs over the same relations.
    #[arg(long, default_value_t = 3)]
    pub runs: usize,

    /// Stop each run after this many matches.
    #[arg(long)]
    pub limit: Option<u64>,

    /// Relation backend.
    #[arg(long, value_enum, default_value_t = Backend::Memory)]
    pub backend: Backend,

    /// Directory for relation files (required with `--backend mapped`).
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Check the result against a nested-loop join (slow; small graphs only).
    #[arg(long)]
    pub verify: bool,

    /// Write a JSON performance report to this path.
    #[arg(long)]
    pub out_json: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub shape: Shape,
    pub backend: Backend,
    pub nodes: Key,
    pub edges_per_node: usize,
    pub seed: u64,
    pub limit: Option<u64>,
    pub edges: usize,
    pub plan: PlanSummary,
    pub load_secs: f64,
    pub run_secs: Vec<f64>,
    pub best_secs: f64,
    pub matches: u64,
    pub stopped_early: bool,
    pub stats: JoinStats,
    pub verified: Option<bool>,
}

pub fn cmd_bench(args: &BenchArgs) -> Result<BenchReport> {
    if args.runs == 0 {
        return Err(anyhow!("--runs must be > 0"));
    }

    println!("bench/{}", shape_name(args.shape));
    println!(
        "  shape=({}) nodes={} edges_per_node={} seed={} runs={} backend={:?}",
        args.shape.variables(),
        args.nodes,
        args.edges_per_node,
        args.seed,
        args.runs,
        args.backend
    );

    // ---------------------------------------------------------------------
    // Generate and load the relations.
    // ---------------------------------------------------------------------
    let start = Instant::now();
    let edges = MemoryRelation::from_pairs(random_edges(args.nodes, args.edges_per_node, args.seed));
    let (forward, inverse) = load(args, edges)?;
    let load_time = start.elapsed();

    let inputs = args.shape.inputs(&forward, &inverse);
    let config = JoinConfig {
        match_limit: args.limit,
        ..JoinConfig::default()
    };
    let join = LeapfrogJoin::with_config(&inputs, config)?;
    let plan = join.plan().summary();
    tracing::debug!(%plan, "bench plan");

    // ---------------------------------------------------------------------
    // Timed runs.
    // ---------------------------------------------------------------------
    let mut run_times = Vec::with_capacity(args.runs);
    let mut first = None;
    for run in 0..args.runs {
        let start = Instant::now();
        let outcome = join.run(CountSink::default())?;
        let elapsed = start.elapsed();
        tracing::debug!(run, matches = outcome.matches, ?elapsed, "bench run");

        match first {
            None => first = Some(outcome),
            Some(prev) if prev.matches != outcome.matches => {
                return Err(anyhow!(
                    "run {run} found {} matches, run 0 found {}",
                    outcome.matches,
                    prev.matches
                ));
            }
            Some(_) => {}
        }
        run_times.push(elapsed);
    }
    let outcome = first.ok_or_else(|| anyhow!("no runs executed"))?;

    // ---------------------------------------------------------------------
    // Optional oracle check.
    // ---------------------------------------------------------------------
    let verified = if args.verify {
        let start = Instant::now();
        let mut sink = CollectSink::default();
        join.run(&mut sink)?;
        let mut expected = nested_loop_join(&inputs)?;
        if let Some(limit) = args.limit {
            expected.truncate(limit.min(expected.len() as u64) as usize);
        }
        let ok = sink.tuples == expected;
        let status = if ok { "ok".green().bold() } else { "MISMATCH".red().bold() };
        println!(
            "  verify={} ({} bindings, {:?})",
            status,
            expected.len(),
            start.elapsed()
        );
        Some(ok)
    } else {
        None
    };

    // ---------------------------------------------------------------------
    // Report.
    // ---------------------------------------------------------------------
    let best = run_times.iter().copied().min().unwrap_or_default();
    println!("  edges={} load={:?}", forward.len(), load_time);
    println!("  plan: {}", plan.to_string().replace('\n', "; "));
    println!(
        "  best_run={:?} ({:.1} matches/sec)",
        best,
        rate(outcome.matches, best)
    );
    println!(
        "  matches={} stopped_early={}",
        outcome.matches, outcome.stopped_early
    );
    println!(
        "  seeks={} backtracks={} depth_entries={}",
        outcome.stats.seeks, outcome.stats.backtracks, outcome.stats.depth_entries
    );

    let report = BenchReport {
        shape: args.shape,
        backend: args.backend,
        nodes: args.nodes,
        edges_per_node: args.edges_per_node,
        seed: args.seed,
        limit: args.limit,
        edges: forward.len(),
        plan,
        load_secs: load_time.as_secs_f64(),
        run_secs: run_times.iter().map(Duration::as_secs_f64).collect(),
        best_secs: best.as_secs_f64(),
        matches: outcome.matches,
        stopped_early: outcome.stopped_early,
        stats: outcome.stats,
        verified,
    };

    if let Some(out) = &args.out_json {
        fs::write(out, serde_json::to_string_pretty(&report)?)?;
        println!("  wrote_json={}", out.display());
    }

    if verified == Some(false) {
        return Err(anyhow!("leapfrog result differs from nested-loop join"));
    }
    Ok(report)
}

pub fn cmd_plan(shape: Shape, json: bool) -> Result<()> {
    let summary = shape.plan_summary()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{} ({})", shape_name(shape).bold(), shape.variables());
        println!("{summary}");
    }
    Ok(())
}

/// Build `E` and its inverse on the chosen backend.
fn load(args: &BenchArgs, edges: MemoryRelation) -> Result<(AnyRelation, AnyRelation)> {
    let inverse = edges.inverse();
    match args.backend {
        Backend::Memory => Ok((edges.into(), inverse.into())),
        Backend::Mapped => {
            let dir = args
                .data_dir
                .as_deref()
                .ok_or_else(|| anyhow!("--backend mapped requires --data-dir"))?;
            fs::create_dir_all(dir)?;
            let forward = write_and_map(&dir.join("edges.rel"), &edges)?;
            let inverse = write_and_map(&dir.join("edges_inv.rel"), &inverse)?;
            Ok((forward, inverse))
        }
    }
}

fn write_and_map(path: &Path, relation: &MemoryRelation) -> Result<AnyRelation> {
    let written = write_relation_file(path, relation.iter())?;
    println!("  wrote_relation={} ({} entries)", path.display(), written);
    Ok(AnyRelation::open_mapped(path)?)
}

fn shape_name(shape: Shape) -> &'static str {
    match shape {
        Shape::Path => "path",
        Shape::Star => "star",
        Shape::Triangle => "triangle",
        Shape::Converge => "converge",
    }
}

fn rate(items: u64, dt: Duration) -> f64 {
    let secs = dt.as_secs_f64();
    if secs <= 0.0 {
        return f64::INFINITY;
    }
    (items as f64) / secs
}
