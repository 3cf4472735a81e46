//! Nearest-neighbor search oracle: the abstract interface the clustering
//! entry points consume, plus a built-in exact-scan implementation so the
//! engine is usable without an external index.

use std::collections::BinaryHeap;

use crate::distance::euclidean_sq;
use crate::error::{Error, Result};
use crate::graph::digraph::{POINT_NA, PointIndex};

/// A batched k-nearest-neighbor search oracle over a fixed point set.
///
/// Opening an oracle is construction; closing is `Drop`.
pub trait NnOracle {
    /// Number of points in the underlying data set.
    fn num_points(&self) -> usize;

    /// Search the `k` nearest neighbors of each query, in ascending
    /// distance. A query point that is itself in the searchable set is its
    /// own nearest neighbor.
    ///
    /// With a radius, queries with fewer than `k` neighbors within it fail.
    ///
    /// **The query slice is clobbered**: the successful queries are
    /// compacted to its front, preserving their relative order, and their
    /// count is returned. Row `i` of `out` (that is,
    /// `out[i * k..(i + 1) * k]`) holds the neighbors of the compacted
    /// `queries[i]`; rows at and beyond the returned count are unspecified.
    ///
    /// # Errors
    ///
    /// `DistSearch` for failures inside the oracle; `InvalidInput` when
    /// `out` is shorter than `queries.len() * k` or a query is out of
    /// range.
    fn search_batch(
        &mut self,
        queries: &mut [PointIndex],
        k: usize,
        radius: Option<f64>,
        out: &mut [PointIndex],
    ) -> Result<usize>;
}

/// Heap entry ordered by distance, ties broken toward the lower point id so
/// results are a pure function of the point set.
#[derive(Debug, Clone, Copy)]
struct Neighbor {
    distance: f64,
    id: PointIndex,
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Exact k-nearest-neighbor search by linear scan over a row-major `f64`
/// point set.
///
/// Every query costs O(n * dims); fine for the data sizes the batch
/// clusterer feeds it and as the reference implementation the fast oracles
/// are tested against.
#[derive(Debug)]
pub struct BruteForceOracle<'a> {
    points: &'a [f64],
    dims: usize,
    num_points: usize,
    /// Restricts which points may appear as neighbors.
    searchable: Option<Vec<bool>>,
}

impl<'a> BruteForceOracle<'a> {
    /// Open an oracle over `num_points = points.len() / dims` points.
    ///
    /// # Errors
    ///
    /// `InvalidInput` when `dims` is zero, the buffer is not a whole number
    /// of rows, or the point count exceeds the index range.
    pub fn new(points: &'a [f64], dims: usize) -> Result<Self> {
        if dims == 0 {
            return Err(Error::invalid_input("dims must be positive"));
        }
        if points.len() % dims != 0 {
            return Err(Error::invalid_input("point buffer is not a whole number of rows"));
        }
        let num_points = points.len() / dims;
        if num_points >= POINT_NA as usize {
            return Err(Error::invalid_input("too many points for the index range"));
        }
        Ok(Self { points, dims, num_points, searchable: None })
    }

    /// As [`BruteForceOracle::new`], restricting neighbor candidates to
    /// `subset`.
    ///
    /// # Errors
    ///
    /// As [`BruteForceOracle::new`], plus `InvalidInput` for an empty or
    /// out-of-range subset.
    pub fn with_searchable_subset(
        points: &'a [f64],
        dims: usize,
        subset: &[PointIndex],
    ) -> Result<Self> {
        let mut oracle = Self::new(points, dims)?;
        if subset.is_empty() {
            return Err(Error::invalid_input("searchable subset is empty"));
        }

        let mut mask = vec![false; oracle.num_points];
        for &p in subset {
            let slot = mask
                .get_mut(p as usize)
                .ok_or_else(|| Error::invalid_input("searchable subset index out of range"))?;
            *slot = true;
        }
        oracle.searchable = Some(mask);
        Ok(oracle)
    }

    #[inline]
    fn row(&self, p: PointIndex) -> &[f64] {
        let start = p as usize * self.dims;
        &self.points[start..start + self.dims]
    }

    /// Collect the k nearest neighbors of `query` into `row`, ascending by
    /// distance. Returns false when fewer than `k` candidates pass the
    /// radius cut.
    fn knn_into(
        &self,
        query: PointIndex,
        k: usize,
        radius_sq: Option<f64>,
        row: &mut Vec<PointIndex>,
    ) -> bool {
        let query_row = self.row(query);
        let mut heap: BinaryHeap<Neighbor> = BinaryHeap::with_capacity(k + 1);

        for id in 0..self.num_points as PointIndex {
            if let Some(mask) = &self.searchable {
                if !mask[id as usize] {
                    continue;
                }
            }
            let distance = euclidean_sq(query_row, self.row(id));
            if radius_sq.is_some_and(|r| distance > r) {
                continue;
            }

            let candidate = Neighbor { distance, id };
            if heap.len() < k {
                heap.push(candidate);
            } else if heap.peek().is_some_and(|worst| candidate < *worst) {
                heap.pop();
                heap.push(candidate);
            }
        }

        if heap.len() < k {
            return false;
        }
        row.clear();
        row.extend(heap.into_sorted_vec().into_iter().map(|nb| nb.id));
        true
    }
}

impl NnOracle for BruteForceOracle<'_> {
    fn num_points(&self) -> usize {
        self.num_points
    }

    fn search_batch(
        &mut self,
        queries: &mut [PointIndex],
        k: usize,
        radius: Option<f64>,
        out: &mut [PointIndex],
    ) -> Result<usize> {
        if k == 0 {
            return Err(Error::invalid_input("k must be positive"));
        }
        if out.len() < queries.len() * k {
            return Err(Error::invalid_input("output buffer shorter than queries * k"));
        }
        let radius_sq = radius.map(|r| r * r);

        let mut row = Vec::with_capacity(k);
        let mut num_ok = 0usize;
        for i in 0..queries.len() {
            let query = queries[i];
            if query as usize >= self.num_points {
                return Err(Error::invalid_input("query index out of range"));
            }
            if self.knn_into(query, k, radius_sq, &mut row) {
                queries[num_ok] = query;
                out[num_ok * k..(num_ok + 1) * k].copy_from_slice(&row);
                num_ok += 1;
            }
        }
        Ok(num_ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn test_knn_on_a_line() {
        let points = line(10);
        let mut oracle = BruteForceOracle::new(&points, 1).unwrap();

        let mut queries = [0, 5, 9];
        let mut out = [POINT_NA; 9];
        let num_ok = oracle.search_batch(&mut queries, 3, None, &mut out).unwrap();

        assert_eq!(num_ok, 3);
        assert_eq!(&out[0..3], &[0, 1, 2]);
        // Neighbors come out ascending by distance; the tie 4/6 breaks
        // toward the lower id.
        assert_eq!(out[3], 5);
        assert_eq!(&out[6..9], &[9, 8, 7]);
    }

    #[test]
    fn test_radius_failures_are_compacted_out() {
        let points = [0.0, 1.0, 2.0, 50.0];
        let mut oracle = BruteForceOracle::new(&points, 1).unwrap();

        let mut queries = [0, 3, 2];
        let mut out = [POINT_NA; 6];
        let num_ok = oracle.search_batch(&mut queries, 2, Some(2.5), &mut out).unwrap();

        // Point 3 has no second neighbor within radius 2.5.
        assert_eq!(num_ok, 2);
        assert_eq!(&queries[..2], &[0, 2]);
        assert_eq!(&out[0..2], &[0, 1]);
        assert_eq!(&out[2..4], &[2, 1]);
    }

    #[test]
    fn test_searchable_subset_restricts_neighbors() {
        let points = line(6);
        let mut oracle =
            BruteForceOracle::with_searchable_subset(&points, 1, &[0, 4, 5]).unwrap();

        let mut queries = [1];
        let mut out = [POINT_NA; 3];
        let num_ok = oracle.search_batch(&mut queries, 3, None, &mut out).unwrap();

        assert_eq!(num_ok, 1);
        assert_eq!(&out[..3], &[0, 4, 5]);
    }

    #[test]
    fn test_rejects_ragged_buffer_and_zero_dims() {
        assert!(BruteForceOracle::new(&[1.0, 2.0, 3.0], 2).is_err());
        assert!(BruteForceOracle::new(&[], 0).is_err());
        assert!(BruteForceOracle::with_searchable_subset(&line(4), 1, &[]).is_err());
        assert!(BruteForceOracle::with_searchable_subset(&line(4), 1, &[9]).is_err());
    }

    #[test]
    fn test_output_buffer_too_short_is_rejected() {
        let points = line(4);
        let mut oracle = BruteForceOracle::new(&points, 1).unwrap();
        let mut queries = [0, 1];
        let mut out = [POINT_NA; 3];
        assert!(oracle.search_batch(&mut queries, 2, None, &mut out).is_err());
    }

    #[test]
    fn test_multidimensional_distances() {
        // Two clusters in the plane.
        let points = [0.0, 0.0, 0.1, 0.0, 10.0, 10.0, 10.1, 10.0];
        let mut oracle = BruteForceOracle::new(&points, 2).unwrap();

        let mut queries = [0, 2];
        let mut out = [POINT_NA; 4];
        let num_ok = oracle.search_batch(&mut queries, 2, None, &mut out).unwrap();

        assert_eq!(num_ok, 2);
        assert_eq!(&out[0..2], &[0, 1]);
        assert_eq!(&out[2..4], &[2, 3]);
    }
}
