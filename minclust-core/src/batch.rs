//! Batched clustering entry point.
//!
//! Streams candidate points through the search oracle in fixed-size
//! batches, seeding clusters on the fly. Unlike [`crate::nng_clustering`],
//! the full nearest-neighbor digraph is never materialized: peak memory is
//! proportional to the batch size, not to the point count.
//!
//! A candidate becomes a seed when all of its `size_constraint` nearest
//! neighbors are still unassigned; the neighbors (and the candidate, when
//! it is not among them) then form a new cluster. The walk over the point
//! set never rewinds, so each point is offered candidacy exactly once.

use crate::clustering::{CLUSTER_MAX, CLUSTER_NA, Clustering, ClusterLabel, UnassignedMode};
use crate::error::{Error, Result, try_filled};
use crate::graph::digraph::{POINT_NA, PointIndex};
use crate::nng::{build_primary_mask, validate_problem};
use crate::oracle::NnOracle;

/// Cluster the oracle's point set without materializing the
/// nearest-neighbor digraph.
///
/// A `batch_size` of zero means "as large as possible" (one batch spanning
/// the whole point set). In [`UnassignedMode::AnyNeighbor`] a candidate
/// that cannot seed a cluster is tentatively attached to the cluster of
/// its first already-assigned neighbor; a later seed may still claim it as
/// a core member and overwrite that label.
///
/// # Errors
///
/// `InvalidInput` for violated preconditions (see
/// [`crate::nng_clustering`]); `TooLargeProblem` when the cluster
/// count would reach the label ceiling; `NoSolution` when no cluster could
/// be seeded (all-secondary primary mask or a radius too tight for any
/// seed); `DistSearch`/`NoMemory` propagated from below.
pub fn nng_clustering_batches<O: NnOracle + ?Sized>(
    oracle: &mut O,
    size_constraint: u32,
    unassigned: UnassignedMode,
    radius: Option<f64>,
    primary: Option<&[PointIndex]>,
    batch_size: usize,
) -> Result<Clustering> {
    let num_points = oracle.num_points();
    validate_problem(num_points, size_constraint, radius, primary)?;

    let k = size_constraint as usize;
    let batch_cap = if batch_size == 0 { num_points } else { batch_size.min(num_points) };
    let mask = build_primary_mask(num_points, primary)?;

    let mut assigned = try_filled(num_points, false)?;
    let mut labels = try_filled(num_points, CLUSTER_NA)?;
    let mut batch: Vec<PointIndex> = Vec::new();
    batch.try_reserve_exact(batch_cap)?;
    let mut out = try_filled(batch_cap * k, POINT_NA)?;

    let mut next_label: ClusterLabel = 0;
    let mut cursor = 0usize;

    loop {
        batch.clear();
        while cursor < num_points && batch.len() < batch_cap {
            if !assigned[cursor] && mask.as_ref().is_none_or(|m| m[cursor]) {
                labels[cursor] = CLUSTER_NA;
                batch.push(cursor as PointIndex);
            }
            cursor += 1;
        }
        if batch.is_empty() {
            break;
        }

        let batch_len = batch.len();
        let num_ok =
            oracle.search_batch(&mut batch, k, radius, &mut out[..batch_len * k])?;

        for i in 0..num_ok {
            let candidate = batch[i];
            if assigned[candidate as usize] {
                // Claimed by an earlier seed in this batch.
                continue;
            }
            let row = &mut out[i * k..(i + 1) * k];

            #[cfg(feature = "extensive-checks")]
            if row.iter().any(|&x| x as usize >= num_points) {
                return Err(Error::dist_search("oracle returned an out-of-range neighbor"));
            }

            #[cfg(feature = "stable-clustering")]
            row.sort_unstable();

            if row.iter().all(|&x| !assigned[x as usize]) {
                if next_label as usize + 1 >= CLUSTER_MAX as usize {
                    return Err(Error::too_large_problem());
                }
                let label = next_label;
                next_label += 1;

                // The candidate may or may not be among its own neighbors;
                // either way the cluster ends up with exactly k members, or
                // k plus the seed when the search skipped it.
                let mut candidate_in_row = false;
                for &x in row.iter() {
                    assigned[x as usize] = true;
                    labels[x as usize] = label;
                    candidate_in_row |= x == candidate;
                }
                if !candidate_in_row {
                    assigned[candidate as usize] = true;
                    labels[candidate as usize] = label;
                }
            } else if unassigned == UnassignedMode::AnyNeighbor {
                if let Some(&x) = row.iter().find(|&&x| assigned[x as usize]) {
                    labels[candidate as usize] = labels[x as usize];
                }
            }
        }
    }

    if next_label == 0 {
        return Err(Error::no_solution("no cluster could be seeded"));
    }
    Ok(Clustering::from_labels(labels, next_label))
}
