//! Naive nested-loop evaluation of the same joins.
//!
//! Exponential in the number of relations and only meant as an oracle for
//! tests and for `leapjoin bench --verify`.

use std::collections::BTreeSet;

use leapjoin_storage::{Key, SortedRelation, Value};

use crate::error::JoinError;
use crate::plan::{JoinInput, JoinPlan, KeyInfo};

/// Every complete binding of the join, sorted and de-duplicated.
pub fn nested_loop_join<R: SortedRelation>(
    inputs: &[JoinInput<'_, R>],
) -> Result<Vec<Vec<Key>>, JoinError> {
    let key_infos: Vec<KeyInfo> = inputs.iter().map(|input| input.key_info).collect();
    let plan = JoinPlan::build(&key_infos)?;

    let mut tables = Vec::with_capacity(inputs.len());
    for (relation, input) in inputs.iter().enumerate() {
        let mut values = Vec::with_capacity(input.relation.len());
        for position in 0..input.relation.len() {
            let value = input
                .relation
                .value_at(position)
                .map_err(|source| JoinError::Storage {
                    relation,
                    depth: 0,
                    source,
                })?;
            values.extend(value);
        }
        tables.push(values);
    }

    let mut binding: Vec<Option<Key>> = vec![None; plan.max_depth() + 1];
    let mut out = BTreeSet::new();
    extend(0, &tables, &key_infos, &mut binding, &mut out);
    Ok(out.into_iter().collect())
}

fn extend(
    relation: usize,
    tables: &[Vec<Value>],
    key_infos: &[KeyInfo],
    binding: &mut [Option<Key>],
    out: &mut BTreeSet<Vec<Key>>,
) {
    if relation == tables.len() {
        if let Some(tuple) = binding[1..].iter().copied().collect::<Option<Vec<Key>>>() {
            out.insert(tuple);
        }
        return;
    }

    let KeyInfo {
        subject_depth,
        object_depth,
    } = key_infos[relation];
    for value in &tables[relation] {
        let saved = (binding[subject_depth], binding[object_depth]);
        if saved.0.is_some_and(|k| k != value.key1) || saved.1.is_some_and(|k| k != value.key2) {
            continue;
        }
        binding[subject_depth] = Some(value.key1);
        binding[object_depth] = Some(value.key2);
        extend(relation + 1, tables, key_infos, binding, out);
        binding[subject_depth] = saved.0;
        binding[object_depth] = saved.1;
    }
}
