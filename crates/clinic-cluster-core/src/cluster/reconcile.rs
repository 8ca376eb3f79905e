//! Recover IDs for clusters of bare vectors.
//!
//! Each grouped vector claims the first not-yet-claimed original position
//! holding an equal vector. Duplicate vectors are therefore handed out in
//! order of first appearance, each position exactly once.

use std::collections::{HashMap, VecDeque};

use thiserror::Error;

use super::features::FeatureVector;

/// Reconciliation errors.
#[derive(Error, Debug, PartialEq)]
pub enum ReconcileError {
    #[error("vector {position} of cluster {cluster} has no unclaimed original")]
    Unmatched { cluster: usize, position: usize },

    #[error("{count} original vectors were never claimed by any cluster")]
    Unclaimed { count: usize },
}

/// Exact-equality key for a vector. Signed zeros compare equal.
fn key(vector: &FeatureVector) -> Vec<u64> {
    vector
        .as_slice()
        .iter()
        .map(|v| if *v == 0.0 { 0 } else { v.to_bits() })
        .collect()
}

/// Map grouped vectors back to the IDs of `original`.
///
/// `groups[label]` holds the vectors placed in cluster `label`. Returns
/// `(id, label)` pairs in the order the groups were scanned.
pub fn reconcile<I: Copy>(
    original: &[(I, FeatureVector)],
    groups: &[Vec<FeatureVector>],
) -> Result<Vec<(I, usize)>, ReconcileError> {
    let mut unclaimed: HashMap<Vec<u64>, VecDeque<usize>> = HashMap::new();
    for (index, (_, vector)) in original.iter().enumerate() {
        unclaimed.entry(key(vector)).or_default().push_back(index);
    }

    let mut matched = Vec::with_capacity(original.len());
    for (label, group) in groups.iter().enumerate() {
        for (position, vector) in group.iter().enumerate() {
            let index = unclaimed
                .get_mut(&key(vector))
                .and_then(VecDeque::pop_front)
                .ok_or(ReconcileError::Unmatched {
                    cluster: label,
                    position,
                })?;
            matched.push((original[index].0, label));
        }
    }

    if matched.len() != original.len() {
        return Err(ReconcileError::Unclaimed {
            count: original.len() - matched.len(),
        });
    }
    Ok(matched)
}
