//! Algebraic operations over CSR digraphs.
//!
//! All operators share two protocols:
//!
//! - **Row markers**: a scratch array `markers[0..n]` filled with
//!   [`POINT_NA`]. While emitting row `v`, writing `markers[x] = v` both
//!   records "x already emitted in row v" and self-overwrites on the next
//!   row, so per-row set union costs O(deg) without a hash table.
//! - **Count then write, shrink**: allocate a greedy upper bound on the
//!   output arcs, run the single write pass, then shrink the arc buffer to
//!   the exact count. If the greedy allocation fails, a counting pass (same
//!   row loop, no writes) computes the exact arc count and the allocation is
//!   retried at that size. This keeps dense inputs alive near the memory
//!   ceiling.

use super::digraph::{ArcIndex, Digraph, POINT_NA, PointIndex};
use crate::error::{Error, Result};

/// Validate that the operands are initialized and agree on the vertex count.
fn common_vertex_count(dgs: &[&Digraph]) -> Result<usize> {
    let first = dgs
        .first()
        .ok_or_else(|| Error::invalid_input("operator needs at least one digraph"))?;
    if dgs.iter().any(|g| !g.is_initialized()) {
        return Err(Error::invalid_input("uninitialized digraph operand"));
    }
    if dgs.iter().any(|g| g.vertices() != first.vertices()) {
        return Err(Error::invalid_input("operands disagree on vertex count"));
    }

    #[cfg(feature = "extensive-checks")]
    for g in dgs {
        if !g.is_valid() {
            return Err(Error::invalid_input("structurally invalid digraph operand"));
        }
    }

    Ok(first.vertices())
}

fn alloc_markers(vertices: usize) -> Result<Vec<PointIndex>> {
    let mut markers = Vec::new();
    markers.try_reserve_exact(vertices)?;
    markers.resize(vertices, POINT_NA);
    Ok(markers)
}

/// Run `rows` against a greedily sized output; on allocation failure fall
/// back to an exact counting pass and retry at the exact size.
///
/// `rows(markers, out)` must emit every row in order, writing heads and
/// `tail_ptr` when `out` is `Some` and merely counting otherwise, and return
/// the total arc count either way.
fn count_write_shrink<F>(vertices: usize, upper_bound: usize, mut rows: F) -> Result<Digraph>
where
    F: FnMut(&mut [PointIndex], Option<&mut Digraph>) -> usize,
{
    let mut markers = alloc_markers(vertices)?;

    let mut out = match Digraph::with_capacity(vertices, upper_bound) {
        Ok(g) => g,
        Err(_) => {
            // Greedy bound did not fit; pay for an exact count and retry.
            let exact = rows(&mut markers, None);
            markers.fill(POINT_NA);
            Digraph::with_capacity(vertices, exact)?
        }
    };

    let arcs = rows(&mut markers, Some(&mut out));
    out.resize_arc_storage(arcs)?;
    Ok(out)
}

#[inline]
fn emit(out: Option<&mut &mut Digraph>, pos: usize, x: PointIndex) {
    if let Some(g) = out {
        g.head[pos] = x;
    }
}

/// Arc-set union of one or more digraphs on the same vertex set.
///
/// # Errors
///
/// `InvalidInput` for mismatched operands, `NoMemory`/`TooLargeDigraph` from
/// the allocation protocol.
pub fn union(dgs: &[&Digraph]) -> Result<Digraph> {
    union_rows(dgs, None)
}

/// Arc-set union that additionally drops every out-arc of the vertices whose
/// `tails_to_keep` entry is false. Dropped rows are still present (empty) in
/// the output.
///
/// # Errors
///
/// As [`union`], plus `InvalidInput` when the filter length differs from the
/// vertex count.
pub fn union_and_delete(dgs: &[&Digraph], tails_to_keep: &[bool]) -> Result<Digraph> {
    let vertices = common_vertex_count(dgs)?;
    if tails_to_keep.len() != vertices {
        return Err(Error::invalid_input("tail filter length differs from vertex count"));
    }
    union_rows(dgs, Some(tails_to_keep))
}

fn union_rows(dgs: &[&Digraph], tails_to_keep: Option<&[bool]>) -> Result<Digraph> {
    let vertices = common_vertex_count(dgs)?;
    let upper = dgs
        .iter()
        .fold(0usize, |acc, g| acc.saturating_add(g.arc_count()));

    count_write_shrink(vertices, upper, |markers, mut out| {
        let mut pos = 0usize;
        for v in 0..vertices {
            let vm = v as PointIndex;
            if tails_to_keep.is_none_or(|keep| keep[v]) {
                for g in dgs {
                    for &x in g.out(vm) {
                        if markers[x as usize] != vm {
                            markers[x as usize] = vm;
                            emit(out.as_mut(), pos, x);
                            pos += 1;
                        }
                    }
                }
            }
            if let Some(g) = out.as_mut() {
                g.tail_ptr[v + 1] = pos as ArcIndex;
            }
        }
        pos
    })
}

/// Arc-set difference `minuend \ subtrahend`, emitting at most
/// `max_out_degree` arcs per row. The minuend's vertex count is
/// authoritative; the subtrahend must match it.
///
/// # Errors
///
/// `InvalidInput` for mismatched operands, `NoMemory`/`TooLargeDigraph` from
/// the allocation protocol.
pub fn difference(
    minuend: &Digraph,
    subtrahend: &Digraph,
    max_out_degree: usize,
) -> Result<Digraph> {
    let vertices = common_vertex_count(&[minuend, subtrahend])?;
    let upper = minuend.arc_count();

    count_write_shrink(vertices, upper, |markers, mut out| {
        let mut pos = 0usize;
        for v in 0..vertices {
            let vm = v as PointIndex;
            for &x in subtrahend.out(vm) {
                markers[x as usize] = vm;
            }
            let mut emitted = 0usize;
            for &x in minuend.out(vm) {
                if emitted == max_out_degree {
                    break;
                }
                if markers[x as usize] != vm {
                    markers[x as usize] = vm;
                    emit(out.as_mut(), pos, x);
                    pos += 1;
                    emitted += 1;
                }
            }
            if let Some(g) = out.as_mut() {
                g.tail_ptr[v + 1] = pos as ArcIndex;
            }
        }
        pos
    })
}

/// Transpose by counting sort: count in-degrees, prefix-sum them into
/// `tail_ptr`, then scatter every arc. Rows of the result come out sorted by
/// source vertex.
///
/// # Errors
///
/// `NoMemory`/`TooLargeDigraph` from allocation; `InvalidInput` for an
/// uninitialized operand.
pub fn transpose(g: &Digraph) -> Result<Digraph> {
    let vertices = common_vertex_count(&[g])?;
    let arcs = g.arc_count();

    let mut out = Digraph::with_capacity(vertices, arcs)?;
    for &x in &g.head[..arcs] {
        out.tail_ptr[x as usize + 1] += 1;
    }
    for v in 0..vertices {
        out.tail_ptr[v + 1] += out.tail_ptr[v];
    }

    let mut cursor = Vec::new();
    cursor.try_reserve_exact(vertices)?;
    cursor.extend_from_slice(&out.tail_ptr[..vertices]);

    for v in 0..vertices {
        let vm = v as PointIndex;
        for &x in g.out(vm) {
            out.head[cursor[x as usize] as usize] = vm;
            cursor[x as usize] += 1;
        }
    }

    Ok(out)
}

/// Adjacency product `a * b`: row `v` of the result is the de-duplicated
/// union of `b.out(x)` over every `x` in `a.out(v)`.
///
/// The flags are mutually exclusive. Both skip the term `x == v`;
/// `force_loops` additionally pre-seeds row `v` with `b.out(v)` itself, so
/// the product behaves as if `a` had a self-loop at every vertex.
///
/// # Errors
///
/// `InvalidInput` when both flags are set or the operands mismatch;
/// `NoMemory`/`TooLargeDigraph` from the allocation protocol.
pub fn adjacency_product(
    a: &Digraph,
    b: &Digraph,
    force_loops: bool,
    ignore_loops: bool,
) -> Result<Digraph> {
    if force_loops && ignore_loops {
        return Err(Error::invalid_input("force_loops and ignore_loops are mutually exclusive"));
    }
    let vertices = common_vertex_count(&[a, b])?;
    let skip_self = force_loops || ignore_loops;

    let mut upper = 0usize;
    for v in 0..vertices {
        let vm = v as PointIndex;
        if force_loops {
            upper = upper.saturating_add(b.out_degree(vm));
        }
        for &x in a.out(vm) {
            if skip_self && x == vm {
                continue;
            }
            upper = upper.saturating_add(b.out_degree(x));
        }
    }

    count_write_shrink(vertices, upper, |markers, mut out| {
        let mut pos = 0usize;
        for v in 0..vertices {
            let vm = v as PointIndex;
            if force_loops {
                for &x in b.out(vm) {
                    if markers[x as usize] != vm {
                        markers[x as usize] = vm;
                        emit(out.as_mut(), pos, x);
                        pos += 1;
                    }
                }
            }
            for &t in a.out(vm) {
                if skip_self && t == vm {
                    continue;
                }
                for &x in b.out(t) {
                    if markers[x as usize] != vm {
                        markers[x as usize] = vm;
                        emit(out.as_mut(), pos, x);
                        pos += 1;
                    }
                }
            }
            if let Some(g) = out.as_mut() {
                g.tail_ptr[v + 1] = pos as ArcIndex;
            }
        }
        pos
    })
}

/// Remove all self-arcs in place, compacting `head` left-to-right and
/// shifting `tail_ptr` downward. The arc capacity is left untouched.
pub fn delete_loops(g: &mut Digraph) {
    debug_assert!(g.is_initialized());

    let vertices = g.vertices();
    let mut write = 0usize;
    let mut row_start = 0usize;
    for v in 0..vertices {
        let row_end = g.tail_ptr[v + 1] as usize;
        for i in row_start..row_end {
            let x = g.head[i];
            if x as usize != v {
                g.head[write] = x;
                write += 1;
            }
        }
        row_start = row_end;
        g.tail_ptr[v + 1] = write as ArcIndex;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn rows(g: &Digraph) -> Vec<Vec<PointIndex>> {
        (0..g.vertices())
            .map(|v| {
                let mut row = g.out(v as PointIndex).to_vec();
                row.sort_unstable();
                row
            })
            .collect()
    }

    #[test]
    fn test_union_deduplicates_rows() {
        let a = Digraph::from_rows(&[vec![1, 2], vec![0], vec![]]).unwrap();
        let b = Digraph::from_rows(&[vec![2, 0], vec![0], vec![1]]).unwrap();

        let u = union(&[&a, &b]).unwrap();
        assert!(u.is_valid());
        assert_eq!(rows(&u), vec![vec![0, 1, 2], vec![0], vec![1]]);
        // Shrunk to the exact arc count.
        assert_eq!(u.max_arcs(), u.arc_count());
    }

    #[test]
    fn test_union_of_single_graph_is_identity() {
        let g = Digraph::from_rows(&[vec![1], vec![2], vec![0]]).unwrap();
        let u = union(&[&g]).unwrap();
        assert_eq!(rows(&u), rows(&g));
    }

    #[test]
    fn test_union_rejects_mismatched_vertex_counts() {
        let a = Digraph::from_rows(&[vec![0]]).unwrap();
        let b = Digraph::from_rows(&[vec![0], vec![1]]).unwrap();
        assert_eq!(union(&[&a, &b]).unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_union_and_delete_keeps_rows_but_empties_them() {
        let a = Digraph::from_rows(&[vec![1], vec![0], vec![0, 1]]).unwrap();
        let u = union_and_delete(&[&a], &[true, false, true]).unwrap();
        assert_eq!(rows(&u), vec![vec![1], vec![], vec![0, 1]]);
        assert!(u.is_valid());
    }

    #[test]
    fn test_difference_removes_and_caps() {
        let a = Digraph::from_rows(&[vec![1, 2, 3], vec![0, 2], vec![], vec![0]]).unwrap();
        let b = Digraph::from_rows(&[vec![2], vec![], vec![1], vec![0]]).unwrap();

        let d = difference(&a, &b, 10).unwrap();
        assert_eq!(rows(&d), vec![vec![1, 3], vec![0, 2], vec![], vec![]]);

        let capped = difference(&a, &b, 1).unwrap();
        assert_eq!(capped.out(0), &[1]);
        assert_eq!(capped.out(1), &[0]);
    }

    #[test]
    fn test_difference_with_self_is_empty() {
        let a = Digraph::from_rows(&[vec![1, 2], vec![0], vec![1]]).unwrap();
        let d = difference(&a, &a, 10).unwrap();
        assert!(d.is_empty());
        assert_eq!(d.vertices(), 3);
    }

    #[test]
    fn test_transpose_example() {
        // transpose of [{1,2},{},{0}] equals [{2},{0},{0}]
        let g = Digraph::from_rows(&[vec![1, 2], vec![], vec![0]]).unwrap();
        let t = transpose(&g).unwrap();
        assert_eq!(rows(&t), vec![vec![2], vec![0], vec![0]]);
    }

    #[test]
    fn test_transpose_is_involutive() {
        let g = Digraph::from_rows(&[vec![1, 3], vec![2], vec![0, 1, 3], vec![]]).unwrap();
        let tt = transpose(&transpose(&g).unwrap()).unwrap();
        assert_eq!(rows(&tt), rows(&g));
    }

    #[test]
    fn test_adjacency_product_with_identity() {
        let g = Digraph::from_rows(&[vec![1, 2], vec![0], vec![1]]).unwrap();
        let id = Digraph::from_rows(&[vec![0], vec![1], vec![2]]).unwrap();

        let p = adjacency_product(&g, &id, false, false).unwrap();
        assert_eq!(rows(&p), rows(&g));
    }

    #[test]
    fn test_adjacency_product_identity_with_ignore_loops_is_empty() {
        let g = Digraph::from_rows(&[vec![1, 2], vec![0], vec![1]]).unwrap();
        let id = Digraph::from_rows(&[vec![0], vec![1], vec![2]]).unwrap();

        // Every term of row v is id.out(v) reached through x == v, which
        // ignore_loops skips.
        let p = adjacency_product(&id, &g, false, true).unwrap();
        assert!(p.is_empty());
        assert_eq!(p.vertices(), 3);
    }

    #[test]
    fn test_adjacency_product_force_loops_preseeds_own_row() {
        let a = Digraph::from_rows(&[vec![1], vec![0], vec![]]).unwrap();
        let b = Digraph::from_rows(&[vec![2], vec![1], vec![0]]).unwrap();

        let p = adjacency_product(&a, &b, true, false).unwrap();
        // row 0: b.out(0) and b.out(1) = {2} and {1}
        assert_eq!(rows(&p), vec![vec![1, 2], vec![1, 2], vec![0]]);
    }

    #[test]
    fn test_adjacency_product_rejects_both_flags() {
        let g = Digraph::from_rows(&[vec![0]]).unwrap();
        let err = adjacency_product(&g, &g, true, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_delete_loops_compacts_in_place() {
        let mut g =
            Digraph::from_rows(&[vec![0, 1], vec![1], vec![0, 2, 1]]).unwrap();
        let cap = g.max_arcs();
        delete_loops(&mut g);

        assert_eq!(rows(&g), vec![vec![1], vec![], vec![0, 1]]);
        assert_eq!(g.max_arcs(), cap);
        assert!(g.is_valid());
    }
}
