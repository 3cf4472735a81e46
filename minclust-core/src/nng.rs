//! Graph-based clustering entry point.
//!
//! Materializes the full nearest-neighbor digraph through the search
//! oracle, selects seeds with one of the ordering heuristics, and labels
//! every seed's closed neighborhood. The batched sibling
//! [`crate::nng_clustering_batches`] trades the materialized digraph for
//! streaming the oracle directly.

use crate::clustering::{CLUSTER_NA, Clustering, UnassignedMode};
use crate::error::{Error, Result, try_filled};
use crate::graph::digraph::{ARC_MAX, ArcIndex, Digraph, POINT_NA, PointIndex};
use crate::graph::seed::{SeedMethod, find_seeds, label_closed_neighborhoods};
use crate::oracle::NnOracle;

/// Queries per oracle call while materializing the digraph.
const NNG_BUILD_BATCH: usize = 512;

/// Cluster the oracle's point set under a minimum cluster size.
///
/// Builds a digraph in which every candidate tail points at its
/// `size_constraint` nearest neighbors (the point itself included when it
/// is its own neighbor), then runs the selected seed heuristic. With a
/// radius, points without `size_constraint` neighbors inside it get an
/// empty row and can only join clusters through other points'
/// neighborhoods. With a primary set, only primary points get rows.
///
/// # Errors
///
/// `InvalidInput` for violated preconditions (`size_constraint < 2`, fewer
/// points than the constraint, non-positive radius, empty or out-of-range
/// primary set); `TooLargeDigraph` when the digraph would not fit the arc
/// index; `NoSolution` when no seed can be formed; `DistSearch`,
/// `NoMemory`, `TooLargeProblem` propagated from below.
pub fn nng_clustering<O: NnOracle + ?Sized>(
    oracle: &mut O,
    size_constraint: u32,
    method: SeedMethod,
    unassigned: UnassignedMode,
    radius: Option<f64>,
    primary: Option<&[PointIndex]>,
) -> Result<Clustering> {
    let num_points = oracle.num_points();
    validate_problem(num_points, size_constraint, radius, primary)?;

    let nng = build_nng(oracle, num_points, size_constraint as usize, radius, primary)?;
    nng_clustering_from_digraph(&nng, method, unassigned)
}

/// Cluster an already-materialized nearest-neighbor digraph.
///
/// # Errors
///
/// `InvalidInput` for an uninitialized digraph; `NoSolution` when no seed
/// can be formed; `NoMemory`/`TooLargeProblem` propagated from the seed
/// finder.
pub fn nng_clustering_from_digraph(
    nng: &Digraph,
    method: SeedMethod,
    unassigned: UnassignedMode,
) -> Result<Clustering> {
    if !nng.is_initialized() {
        return Err(Error::invalid_input("clustering needs an initialized digraph"));
    }

    let seeds = find_seeds(nng, method)?;
    if seeds.is_empty() {
        return Err(Error::no_solution("no seed could be formed"));
    }

    let mut labels = label_closed_neighborhoods(nng, &seeds)?;

    if unassigned == UnassignedMode::AnyNeighbor {
        // Only seed-stage assignments count as attachment targets, so the
        // outcome does not depend on the vertex order of this pass.
        let claimed: Vec<bool> = labels.iter().map(|&c| c != CLUSTER_NA).collect();
        for v in 0..nng.vertices() {
            if claimed[v] {
                continue;
            }
            if let Some(&x) = nng
                .out(v as PointIndex)
                .iter()
                .find(|&&x| claimed[x as usize])
            {
                labels[v] = labels[x as usize];
            }
        }
    }

    Ok(Clustering::from_labels(labels, seeds.len() as u32))
}

/// Shared precondition audit for both clustering entry points.
pub(crate) fn validate_problem(
    num_points: usize,
    size_constraint: u32,
    radius: Option<f64>,
    primary: Option<&[PointIndex]>,
) -> Result<()> {
    if size_constraint < 2 {
        return Err(Error::invalid_input("size constraint must be at least 2"));
    }
    if num_points < size_constraint as usize {
        return Err(Error::invalid_input("fewer data points than the size constraint"));
    }
    if num_points >= POINT_NA as usize {
        return Err(Error::too_large_problem());
    }
    if let Some(r) = radius {
        if r <= 0.0 || !r.is_finite() {
            return Err(Error::invalid_input("radius constraint must be strictly positive"));
        }
    }
    if let Some(primary) = primary {
        if primary.is_empty() {
            return Err(Error::invalid_input("primary point set is empty"));
        }
        if primary.iter().any(|&p| p as usize >= num_points) {
            return Err(Error::invalid_input("primary point index out of range"));
        }
    }
    Ok(())
}

/// Mask of primary points, `None` when every point is primary.
pub(crate) fn build_primary_mask(
    num_points: usize,
    primary: Option<&[PointIndex]>,
) -> Result<Option<Vec<bool>>> {
    let Some(primary) = primary else {
        return Ok(None);
    };
    let mut mask = try_filled(num_points, false)?;
    for &p in primary {
        mask[p as usize] = true;
    }
    Ok(Some(mask))
}

fn build_nng<O: NnOracle + ?Sized>(
    oracle: &mut O,
    num_points: usize,
    k: usize,
    radius: Option<f64>,
    primary: Option<&[PointIndex]>,
) -> Result<Digraph> {
    let arc_cap = num_points
        .checked_mul(k)
        .filter(|&arcs| arcs <= ARC_MAX as usize)
        .ok_or_else(|| Error::too_large_digraph())?;

    let mask = build_primary_mask(num_points, primary)?;

    let mut head: Vec<PointIndex> = Vec::new();
    head.try_reserve_exact(arc_cap)?;
    let mut degrees: Vec<ArcIndex> = try_filled(num_points, 0)?;

    let batch_cap = NNG_BUILD_BATCH.min(num_points);
    let mut chunk: Vec<PointIndex> = Vec::new();
    chunk.try_reserve_exact(batch_cap)?;
    let mut queries: Vec<PointIndex> = try_filled(batch_cap, POINT_NA)?;
    let mut out = try_filled(batch_cap * k, POINT_NA)?;

    for v in 0..num_points {
        if mask.as_ref().is_none_or(|m| m[v]) {
            chunk.push(v as PointIndex);
        }
        if chunk.len() == batch_cap || (v + 1 == num_points && !chunk.is_empty()) {
            queries[..chunk.len()].copy_from_slice(&chunk);
            let num_ok = oracle.search_batch(
                &mut queries[..chunk.len()],
                k,
                radius,
                &mut out[..chunk.len() * k],
            )?;

            // The compaction preserves query order, so one forward walk
            // pairs every surviving tail with its row.
            let mut row = 0usize;
            for &tail in &chunk {
                if row < num_ok && queries[row] == tail {
                    let neighbors = &mut out[row * k..(row + 1) * k];

                    #[cfg(feature = "extensive-checks")]
                    if neighbors.iter().any(|&x| x as usize >= num_points) {
                        return Err(Error::dist_search("oracle returned an out-of-range neighbor"));
                    }

                    #[cfg(feature = "stable-nng")]
                    neighbors.sort_unstable();

                    head.extend_from_slice(neighbors);
                    degrees[tail as usize] = k as ArcIndex;
                    row += 1;
                }
            }
            chunk.clear();
        }
    }

    let mut tail_ptr: Vec<ArcIndex> = try_filled(num_points + 1, 0)?;
    for v in 0..num_points {
        tail_ptr[v + 1] = tail_ptr[v] + degrees[v];
    }
    Ok(Digraph::from_parts(num_points, tail_ptr, head))
}
