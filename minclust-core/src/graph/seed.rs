//! Seed selection over a nearest-neighbor digraph.
//!
//! A *seed* anchors one cluster: its closed out-neighborhood becomes the
//! cluster's core members. Every heuristic here emits a seed list such that
//!
//! 1. every seed has at least one out-arc,
//! 2. no two seeds have overlapping closed out-neighborhoods.
//!
//! The heuristics differ only in the order vertices are offered seedhood,
//! which is what drives clustering quality: offering low in-degree vertices
//! first tends to claim the periphery before the dense interior.

use super::algebra;
use super::digraph::{Digraph, PointIndex};
use super::inwards::InwardsOrder;
use crate::clustering::{CLUSTER_MAX, CLUSTER_NA, ClusterLabel};
use crate::error::{Error, Result, try_filled};

/// Vertex-ordering heuristic used by the seed finder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedMethod {
    /// Scan vertices in index order.
    #[default]
    Lexical,
    /// Scan in non-decreasing in-degree order, frozen at the start.
    InwardsOrder,
    /// In-degree order with live decrements as neighborhoods are claimed.
    InwardsUpdating,
    /// As `InwardsUpdating`, with decrements also on the skip path.
    InwardsAltUpdating,
    /// Scan the exclusion graph in frozen in-degree order.
    ExclusionOrder,
    /// Scan the exclusion graph with live decrements.
    ExclusionUpdating,
}

/// Find seeds in the nearest-neighbor digraph `g` using `method`.
///
/// Vertices with no out-arcs are never seeds; they can only become cluster
/// members through some other vertex's neighborhood.
///
/// # Errors
///
/// `TooLargeProblem` when the seed count would reach the cluster-label
/// ceiling; `NoMemory` for scratch allocation failures; `InvalidInput` for
/// an uninitialized digraph.
pub fn find_seeds(g: &Digraph, method: SeedMethod) -> Result<Vec<PointIndex>> {
    if !g.is_initialized() {
        return Err(Error::invalid_input("seed finding needs an initialized digraph"));
    }

    #[cfg(feature = "extensive-checks")]
    if !g.is_valid() {
        return Err(Error::invalid_input("structurally invalid nearest-neighbor digraph"));
    }

    match method {
        SeedMethod::Lexical => find_in_fixed_order(g, 0..g.vertices() as PointIndex),
        SeedMethod::InwardsOrder => {
            let ord = InwardsOrder::new(g, false)?;
            find_in_fixed_order(g, ord.sorted().iter().copied())
        }
        SeedMethod::InwardsUpdating => find_inwards_updating(g, false),
        SeedMethod::InwardsAltUpdating => find_inwards_updating(g, true),
        SeedMethod::ExclusionOrder => find_exclusion(g, false),
        SeedMethod::ExclusionUpdating => find_exclusion(g, true),
    }
}

/// Label every seed's closed out-neighborhood with the seed's cluster.
///
/// Seeds have pairwise disjoint closed neighborhoods, so the write order is
/// immaterial. Unclaimed vertices come out as [`CLUSTER_NA`].
pub(crate) fn label_closed_neighborhoods(
    g: &Digraph,
    seeds: &[PointIndex],
) -> Result<Vec<ClusterLabel>> {
    let mut labels = try_filled(g.vertices(), CLUSTER_NA)?;
    for (c, &s) in seeds.iter().enumerate() {
        let c = c as ClusterLabel;
        for &x in g.out(s) {
            labels[x as usize] = c;
        }
        labels[s as usize] = c;
    }
    Ok(labels)
}

/// Seed list with the engine's capacity growth policy: grow by
/// `cap + cap / 8 + 1024`, never past the cluster-label ceiling.
struct SeedList {
    seeds: Vec<PointIndex>,
}

impl SeedList {
    fn new(vertices: usize) -> Result<Self> {
        let estimate = (1 + vertices / 16).min(CLUSTER_MAX as usize);
        let mut seeds = Vec::new();
        seeds.try_reserve_exact(estimate)?;
        Ok(Self { seeds })
    }

    fn push(&mut self, v: PointIndex) -> Result<()> {
        if self.seeds.len() + 1 >= CLUSTER_MAX as usize {
            return Err(Error::too_large_problem());
        }
        if self.seeds.len() == self.seeds.capacity() {
            let cap = self.seeds.capacity();
            let target = (cap + cap / 8 + 1024).min(CLUSTER_MAX as usize);
            self.seeds.try_reserve_exact(target - cap)?;
        }
        self.seeds.push(v);
        Ok(())
    }

    fn into_vec(self) -> Vec<PointIndex> {
        self.seeds
    }
}

/// `v` becomes a seed iff it is unmarked, has out-arcs, and its whole
/// out-list is unmarked. On success the closed neighborhood is marked, `v`
/// last so a self-loop in the out-list is harmless.
fn try_seed(
    g: &Digraph,
    v: PointIndex,
    marks: &mut [bool],
    seeds: &mut SeedList,
) -> Result<bool> {
    if marks[v as usize] {
        return Ok(false);
    }
    let out = g.out(v);
    if out.is_empty() || out.iter().any(|&x| marks[x as usize]) {
        return Ok(false);
    }

    seeds.push(v)?;
    for &x in out {
        marks[x as usize] = true;
    }
    marks[v as usize] = true;
    Ok(true)
}

fn find_in_fixed_order(
    g: &Digraph,
    order: impl IntoIterator<Item = PointIndex>,
) -> Result<Vec<PointIndex>> {
    let mut marks = try_filled(g.vertices(), false)?;
    let mut seeds = SeedList::new(g.vertices())?;
    for v in order {
        try_seed(g, v, &mut marks, &mut seeds)?;
    }
    Ok(seeds.into_vec())
}

/// The two updating inwards scans.
///
/// After a vertex's neighborhood is claimed, every still-viable candidate
/// reachable through a claimed neighbor has lost one potential seed-making
/// in-arc, so it is promoted one bucket toward the front of the live sort.
/// The alt variant also fires the promotion when the scan skips an unmarked
/// vertex, and gates the accept-path expansion on the neighbor still being
/// ahead of the cursor.
fn find_inwards_updating(g: &Digraph, alt: bool) -> Result<Vec<PointIndex>> {
    let vertices = g.vertices();
    let mut ord = InwardsOrder::new(g, true)?;
    let mut marks = try_filled(vertices, false)?;
    let mut seeds = SeedList::new(vertices)?;

    for cursor in 0..vertices {
        let v = ord.sorted()[cursor];
        if try_seed(g, v, &mut marks, &mut seeds)? {
            for &a in g.out(v) {
                if alt && ord.position(a) <= cursor {
                    continue;
                }
                decrement_through(g, a, cursor, &mut ord, &marks);
            }
        } else if alt && !marks[v as usize] {
            for &a in g.out(v) {
                decrement_through(g, a, cursor, &mut ord, &marks);
            }
        }
    }
    Ok(seeds.into_vec())
}

/// Promote every candidate in `out(a)`: unmarked, strictly after the
/// cursor, with out-arcs and in-arcs left to lose.
fn decrement_through(
    g: &Digraph,
    a: PointIndex,
    cursor: usize,
    ord: &mut InwardsOrder,
    marks: &[bool],
) {
    for &b in g.out(a) {
        if !marks[b as usize]
            && ord.position(b) > cursor
            && ord.count(b) > 0
            && !g.out(b).is_empty()
        {
            ord.decrement(b, cursor);
        }
    }
}

/// Build the exclusion graph of `g`: an arc `u -> w` means `u` and `w`
/// cannot both be seeds because their closed neighborhoods intersect.
///
/// `X = delete_loops(union_and_delete([g, g * transpose(g)], keep))`, the
/// product taken with forced loops, where `keep[v]` holds iff `out(v)` is
/// non-empty. The filter is required: the transposed term would otherwise
/// re-introduce arcs out of excluded vertices and
/// corrupt the in-degree ordering. When every vertex is kept the filter is
/// skipped entirely.
fn exclusion_graph(g: &Digraph) -> Result<Digraph> {
    let gt = algebra::transpose(g)?;
    let prod = algebra::adjacency_product(g, &gt, true, false)?;

    let vertices = g.vertices();
    let mut keep = try_filled(vertices, false)?;
    let mut all_kept = true;
    for (v, slot) in keep.iter_mut().enumerate() {
        *slot = !g.out(v as PointIndex).is_empty();
        all_kept &= *slot;
    }

    let mut x = if all_kept {
        algebra::union(&[g, &prod])?
    } else {
        algebra::union_and_delete(&[g, &prod], &keep)?
    };
    algebra::delete_loops(&mut x);
    Ok(x)
}

fn find_exclusion(g: &Digraph, updating: bool) -> Result<Vec<PointIndex>> {
    let vertices = g.vertices();
    let mut x = exclusion_graph(g)?;

    let mut not_excluded = try_filled(vertices, false)?;
    for (v, slot) in not_excluded.iter_mut().enumerate() {
        *slot = !g.out(v as PointIndex).is_empty();
    }

    let mut ord = InwardsOrder::new(&x, updating)?;
    let mut seeds = SeedList::new(vertices)?;

    if !updating {
        for &v in ord.sorted() {
            if !not_excluded[v as usize] {
                continue;
            }
            seeds.push(v)?;
            not_excluded[v as usize] = false;
            for &e in x.out(v) {
                not_excluded[e as usize] = false;
            }
        }
        return Ok(seeds.into_vec());
    }

    for cursor in 0..vertices {
        let v = ord.sorted()[cursor];
        if !not_excluded[v as usize] {
            continue;
        }
        seeds.push(v)?;
        not_excluded[v as usize] = false;

        let row_start = x.tail_ptr[v as usize] as usize;
        let row_end = x.tail_ptr[v as usize + 1] as usize;

        // First pass: exclude the surviving neighbors, compacting them into
        // the head of row v. The row is safe to reuse as scratch because
        // the scan never revisits a chosen seed's row.
        let mut kept = 0usize;
        for i in row_start..row_end {
            let e = x.head[i];
            if not_excluded[e as usize] {
                not_excluded[e as usize] = false;
                x.head[row_start + kept] = e;
                kept += 1;
            }
        }

        // Second pass: each newly excluded neighbor can no longer make its
        // own neighbors seeds, so promote the survivors among them.
        for i in row_start..row_start + kept {
            let e = x.head[i] as usize;
            let e_start = x.tail_ptr[e] as usize;
            let e_end = x.tail_ptr[e + 1] as usize;
            for j in e_start..e_end {
                let w = x.head[j];
                if not_excluded[w as usize] && ord.position(w) > cursor && ord.count(w) > 0 {
                    ord.decrement(w, cursor);
                }
            }
        }
    }
    Ok(seeds.into_vec())
}
