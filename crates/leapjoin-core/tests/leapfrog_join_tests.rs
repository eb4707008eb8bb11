use std::cell::RefCell;
use std::io;
use std::ops::ControlFlow;

use anyhow::Result;
use leapjoin_core::reference::nested_loop_join;
use leapjoin_core::{
    run_join, run_join_with, CollectSink, FnSink, JoinConfig, JoinError, JoinInput, Key,
    LeapfrogJoin,
};
use leapjoin_storage::{MemoryRelation, Position, SortedRelation, StorageError, Value};

fn rel(pairs: &[(Key, Key)]) -> MemoryRelation {
    MemoryRelation::from_pairs(pairs.iter().copied())
}

/// Expand `(subject, [objects])` groups into pairs.
fn grouped(groups: &[(Key, &[Key])]) -> MemoryRelation {
    MemoryRelation::from_pairs(
        groups
            .iter()
            .flat_map(|&(s, objects)| objects.iter().map(move |&o| (s, o))),
    )
}

// ============================================================================
// Basic shapes
// ============================================================================

#[test]
fn shared_subject_and_object_must_both_agree() -> Result<()> {
    let a = rel(&[(1, 10)]);
    let b = rel(&[(1, 20)]);
    assert_eq!(run_join(&[JoinInput::new(&a, 1, 2), JoinInput::new(&b, 1, 2)])?, 0);

    let b = rel(&[(1, 10)]);
    assert_eq!(run_join(&[JoinInput::new(&a, 1, 2), JoinInput::new(&b, 1, 2)])?, 1);
    Ok(())
}

#[test]
fn shared_subject_with_independent_objects() -> Result<()> {
    let a = rel(&[(1, 10)]);
    let b = rel(&[(1, 20)]);
    let tuples = LeapfrogJoin::new(&[JoinInput::new(&a, 1, 2), JoinInput::new(&b, 1, 3)])?
        .collect()?;
    assert_eq!(tuples, vec![vec![1, 10, 20]]);
    Ok(())
}

#[test]
fn no_subject_overlap_means_no_results() -> Result<()> {
    let a = rel(&[(1, 5), (3, 5)]);
    let b = rel(&[(2, 5), (4, 5)]);
    assert_eq!(run_join(&[JoinInput::new(&a, 1, 2), JoinInput::new(&b, 1, 3)])?, 0);
    Ok(())
}

#[test]
fn chained_path_query() -> Result<()> {
    // A(x, y), B(y, z)
    let a = rel(&[(1, 2), (1, 3)]);
    let b = rel(&[(2, 9), (3, 9)]);
    let tuples = LeapfrogJoin::new(&[JoinInput::new(&a, 1, 2), JoinInput::new(&b, 2, 3)])?
        .collect()?;
    assert_eq!(tuples, vec![vec![1, 2, 9], vec![1, 3, 9]]);
    Ok(())
}

#[test]
fn chained_path_revisits_inner_relation_for_every_outer_key() -> Result<()> {
    // B's subject leg sits at depth 2 and must start over for each x.
    let a = rel(&[(1, 2), (1, 3), (4, 2), (5, 3)]);
    let b = rel(&[(2, 7), (2, 8), (3, 9)]);
    let inputs = [JoinInput::new(&a, 1, 2), JoinInput::new(&b, 2, 3)];
    let tuples = LeapfrogJoin::new(&inputs)?.collect()?;
    assert_eq!(
        tuples,
        vec![
            vec![1, 2, 7],
            vec![1, 2, 8],
            vec![1, 3, 9],
            vec![4, 2, 7],
            vec![4, 2, 8],
            vec![5, 3, 9],
        ]
    );
    assert_eq!(tuples, nested_loop_join(&inputs)?);
    Ok(())
}

#[test]
fn star_join_multiplies_object_fanout_of_common_subject() -> Result<()> {
    let a = grouped(&[(1, &[10]), (7, &[1, 2]), (9, &[3])]);
    let b = grouped(&[(2, &[5]), (7, &[1, 2, 3]), (8, &[1])]);
    let c = grouped(&[(3, &[1]), (7, &[4, 5, 6, 7]), (11, &[2])]);
    let inputs = [
        JoinInput::new(&a, 1, 2),
        JoinInput::new(&b, 1, 3),
        JoinInput::new(&c, 1, 4),
    ];
    assert_eq!(run_join(&inputs)?, 2 * 3 * 4);

    let tuples = LeapfrogJoin::new(&inputs)?.collect()?;
    assert!(tuples.iter().all(|t| t[0] == 7));
    assert_eq!(tuples, nested_loop_join(&inputs)?);
    Ok(())
}

#[test]
fn triangle_query() -> Result<()> {
    // E(x, y), E(y, z), E(x, z)
    let e = rel(&[(1, 2), (2, 3), (1, 3), (3, 1), (2, 4), (1, 4), (4, 5)]);
    let inputs = [
        JoinInput::new(&e, 1, 2),
        JoinInput::new(&e, 2, 3),
        JoinInput::new(&e, 1, 3),
    ];
    let tuples = LeapfrogJoin::new(&inputs)?.collect()?;
    assert_eq!(tuples, vec![vec![1, 2, 3], vec![1, 2, 4]]);
    assert_eq!(tuples, nested_loop_join(&inputs)?);
    Ok(())
}

#[test]
fn object_bound_first_uses_inverse_relation() -> Result<()> {
    // E(x, y), E(z, y): z's relation binds its object (y) before its subject.
    let e = rel(&[(1, 5), (2, 5), (3, 6)]);
    let inv = e.inverse();
    let inputs = [
        JoinInput::oriented(&e, &inv, 1, 2),
        JoinInput::oriented(&e, &inv, 3, 2),
    ];
    let tuples = LeapfrogJoin::new(&inputs)?.collect()?;
    assert_eq!(
        tuples,
        vec![
            vec![1, 5, 1],
            vec![1, 5, 2],
            vec![2, 5, 1],
            vec![2, 5, 2],
            vec![3, 6, 3],
        ]
    );
    Ok(())
}

// ============================================================================
// Degenerate inputs and determinism
// ============================================================================

#[test]
fn empty_relation_short_circuits() -> Result<()> {
    let a = rel(&[(1, 2), (2, 3)]);
    let empty = MemoryRelation::empty();
    for inputs in [
        [JoinInput::new(&a, 1, 2), JoinInput::new(&empty, 2, 3)],
        [JoinInput::new(&empty, 1, 2), JoinInput::new(&a, 2, 3)],
        [JoinInput::new(&a, 1, 2), JoinInput::new(&empty, 1, 3)],
    ] {
        let outcome = run_join_with(&inputs, CollectSink::default())?;
        assert_eq!(outcome.matches, 0);
        assert!(!outcome.stopped_early);
    }
    Ok(())
}

#[test]
fn repeated_runs_are_identical() -> Result<()> {
    let a = rel(&[(1, 2), (1, 3), (2, 3), (3, 1)]);
    let b = rel(&[(2, 1), (3, 1), (3, 2), (1, 2)]);
    let join = LeapfrogJoin::new(&[JoinInput::new(&a, 1, 2), JoinInput::new(&b, 2, 3)])?;

    let first = join.collect()?;
    let second = join.collect()?;
    assert_eq!(first, second);
    assert_eq!(join.count()?, first.len() as u64);
    Ok(())
}

#[test]
fn bindings_arrive_in_lexicographic_order_without_repeats() -> Result<()> {
    let a = grouped(&[(1, &[1, 2, 3]), (2, &[1, 3]), (3, &[2])]);
    let b = grouped(&[(1, &[1, 2]), (2, &[2, 3]), (3, &[1, 3])]);
    let c = grouped(&[(1, &[3]), (2, &[1, 2]), (3, &[1, 2, 3])]);
    let inputs = [
        JoinInput::new(&a, 1, 2),
        JoinInput::new(&b, 2, 3),
        JoinInput::new(&c, 1, 3),
    ];
    let tuples = LeapfrogJoin::new(&inputs)?.collect()?;
    assert!(!tuples.is_empty());
    assert!(tuples.windows(2).all(|w| w[0] < w[1]), "{tuples:?}");
    assert_eq!(tuples, nested_loop_join(&inputs)?);
    Ok(())
}

// ============================================================================
// Early stop
// ============================================================================

#[test]
fn match_limit_stops_the_join() -> Result<()> {
    let a = grouped(&[(1, &[1, 2, 3, 4, 5])]);
    let b = grouped(&[(1, &[1, 2, 3, 4, 5])]);
    let inputs = [JoinInput::new(&a, 1, 2), JoinInput::new(&b, 1, 3)];

    let join = LeapfrogJoin::with_config(&inputs, JoinConfig::default().with_match_limit(7))?;
    assert_eq!(join.count()?, 7);

    let mut sink = CollectSink::default();
    let outcome = join.run(&mut sink)?;
    assert!(outcome.stopped_early);
    assert_eq!(sink.tuples.len(), 7);
    assert_eq!(sink.tuples[0], vec![1, 1, 1]);
    Ok(())
}

#[test]
fn closure_sink_can_stop_early() -> Result<()> {
    let a = grouped(&[(1, &[1, 2, 3]), (2, &[1])]);
    let b = grouped(&[(1, &[4]), (2, &[5])]);
    let mut first: Option<Vec<Key>> = None;
    let outcome = run_join_with(
        &[JoinInput::new(&a, 1, 2), JoinInput::new(&b, 1, 3)],
        FnSink(|keys: &[Key]| {
            first = Some(keys.to_vec());
            ControlFlow::Break(())
        }),
    )?;
    assert!(outcome.stopped_early);
    assert_eq!(outcome.matches, 1);
    assert_eq!(first, Some(vec![1, 1, 4]));
    Ok(())
}

// ============================================================================
// Configuration errors
// ============================================================================

#[test]
fn depth_without_legs_is_rejected_before_search() {
    let a = rel(&[(1, 2)]);
    let err = run_join(&[JoinInput::new(&a, 1, 3)]).unwrap_err();
    assert!(matches!(
        err,
        JoinError::MissingDepth {
            depth: 2,
            max_depth: 3
        }
    ));
    assert!(err.is_configuration());
}

#[test]
fn same_depth_for_both_columns_is_rejected() {
    let a = rel(&[(1, 1)]);
    let err = run_join(&[JoinInput::new(&a, 1, 2), JoinInput::new(&a, 2, 2)]).unwrap_err();
    assert!(matches!(err, JoinError::SameDepth { relation: 1, depth: 2 }));
}

#[test]
fn inverted_relation_without_orientation_is_rejected() {
    let a = rel(&[(1, 1)]);
    let err = run_join(&[JoinInput::new(&a, 2, 1)]).unwrap_err();
    assert!(matches!(err, JoinError::InvertedRelation { relation: 0, .. }));
}

// ============================================================================
// Storage failures
// ============================================================================

/// Serves values from memory but fails every lower-bound seek.
struct FailingRelation(MemoryRelation);

impl SortedRelation for FailingRelation {
    fn len(&self) -> usize {
        self.0.len()
    }

    fn lower_bound(&self, _target: Value) -> Result<Position, StorageError> {
        Err(StorageError::Io {
            path: "failing.rel".into(),
            source: io::Error::new(io::ErrorKind::Other, "device went away"),
        })
    }

    fn value_at(&self, position: Position) -> Result<Option<Value>, StorageError> {
        self.0.value_at(position)
    }
}

#[test]
fn storage_failure_names_relation_and_depth() {
    let a = FailingRelation(rel(&[(1, 1), (5, 1)]));
    let b = FailingRelation(rel(&[(1, 1), (1, 2)]));
    let mut seen = Vec::new();
    let err = run_join_with(
        &[JoinInput::new(&a, 1, 2), JoinInput::new(&b, 2, 3)],
        FnSink(|keys: &[Key]| {
            seen.push(keys.to_vec());
            ControlFlow::Continue(())
        }),
    )
    .unwrap_err();

    // The first binding needs no seek; stepping past it in b's object leg does.
    assert_eq!(seen, vec![vec![1, 1, 1]]);
    match err {
        JoinError::Storage {
            relation, depth, ..
        } => {
            assert_eq!(relation, 1);
            assert_eq!(depth, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
}

// ============================================================================
// Seek discipline
// ============================================================================

/// Records every lower-bound target issued against the relation.
struct RecordingRelation {
    inner: MemoryRelation,
    targets: RefCell<Vec<Value>>,
}

impl RecordingRelation {
    fn new(inner: MemoryRelation) -> Self {
        Self {
            inner,
            targets: RefCell::new(Vec::new()),
        }
    }
}

impl SortedRelation for RecordingRelation {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn lower_bound(&self, target: Value) -> Result<Position, StorageError> {
        self.targets.borrow_mut().push(target);
        self.inner.lower_bound(target)
    }

    fn value_at(&self, position: Position) -> Result<Option<Value>, StorageError> {
        self.inner.value_at(position)
    }
}

#[test]
fn seek_targets_only_move_forward_except_block_rewinds() -> Result<()> {
    let rels = [
        RecordingRelation::new(grouped(&[(1, &[1, 2]), (3, &[1, 4]), (5, &[2]), (7, &[1, 3])])),
        RecordingRelation::new(grouped(&[(2, &[1]), (3, &[2, 4]), (5, &[1, 2]), (7, &[3])])),
        RecordingRelation::new(grouped(&[(3, &[5, 6]), (4, &[1]), (5, &[7]), (7, &[8, 9])])),
    ];
    let inputs = [
        JoinInput::new(&rels[0], 1, 2),
        JoinInput::new(&rels[1], 1, 2),
        JoinInput::new(&rels[2], 1, 3),
    ];
    let tuples = LeapfrogJoin::new(&inputs)?.collect()?;
    assert_eq!(tuples, nested_loop_join(&inputs)?);
    assert!(!tuples.is_empty());

    for (i, rel) in rels.iter().enumerate() {
        let targets = rel.targets.borrow();
        assert!(!targets.is_empty(), "relation {i} was never sought");
        for w in targets.windows(2) {
            let (prev, next) = (w[0], w[1]);
            let forward = next >= prev;
            let rewind = next.key1 == prev.key1 && next.key2 == 0;
            assert!(
                forward || rewind,
                "relation {i}: seek to {next} after {prev} moved backwards"
            );
        }
    }
    Ok(())
}
