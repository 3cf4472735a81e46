//! Bucket-sorted vertex ordering by in-degree, with live decrement.
//!
//! The seed scans walk a permutation of the vertices in non-decreasing
//! in-degree order. The updating scans additionally *decrement* the count of
//! a vertex mid-scan, which must promote it one bucket toward the front
//! without disturbing the already-visited prefix. Four parallel arrays make
//! that an O(1) operation:
//!
//! ```text
//! count[v]         current in-degree of v
//! sorted[0..n]     permutation of the vertices, non-decreasing count
//! position[v]      index of v inside sorted
//! bucket_start[k]  index of the first element whose count is k
//! ```
//!
//! Invariant: `sorted[position[v]] == v`, and
//! `bucket_start[k] <= position[v] < bucket_start[k + 1]` iff
//! `count[v] == k`, restricted to the unvisited region once a scan has a
//! cursor, because positions at or before the cursor are finalized.

use super::digraph::{ArcIndex, Digraph, PointIndex};
use crate::error::{Result, try_filled};

/// Vertices of a digraph sorted by in-degree.
///
/// Built with or without the update indices; [`InwardsOrder::decrement`]
/// requires them.
#[derive(Debug)]
pub struct InwardsOrder {
    sorted: Vec<PointIndex>,
    /// Empty when the order is frozen (built without update indices).
    count: Vec<ArcIndex>,
    position: Vec<u32>,
    bucket_start: Vec<u32>,
}

impl InwardsOrder {
    /// Sort the vertices of `g` by in-degree, ascending. Ties come out in
    /// vertex-id order (the counting sort is stable).
    ///
    /// With `track` false the update indices are dropped and only the
    /// sorted permutation is kept; [`InwardsOrder::decrement`] must not be
    /// called on a frozen order.
    ///
    /// # Errors
    ///
    /// `NoMemory` when a working array cannot be allocated.
    pub fn new(g: &Digraph, track: bool) -> Result<Self> {
        let vertices = g.vertices();

        let mut count = try_filled::<ArcIndex>(vertices, 0)?;
        for &x in &g.head[..g.arc_count()] {
            count[x as usize] += 1;
        }
        let max_count = count.iter().copied().max().unwrap_or(0) as usize;

        // Bucket starts via prefix sums; one sentinel bucket past the top so
        // bucket_start[k + 1] is always the end of bucket k.
        let mut bucket_start = try_filled::<u32>(max_count + 2, 0)?;
        for &c in &count {
            bucket_start[c as usize + 1] += 1;
        }
        for k in 0..=max_count {
            bucket_start[k + 1] += bucket_start[k];
        }

        let mut sorted = try_filled::<PointIndex>(vertices, 0)?;
        let mut position = try_filled::<u32>(vertices, 0)?;
        let mut cursor = bucket_start.clone();
        for v in 0..vertices {
            let slot = cursor[count[v] as usize];
            cursor[count[v] as usize] += 1;
            sorted[slot as usize] = v as PointIndex;
            position[v] = slot;
        }

        if track {
            Ok(Self { sorted, count, position, bucket_start })
        } else {
            Ok(Self { sorted, count: Vec::new(), position: Vec::new(), bucket_start: Vec::new() })
        }
    }

    /// The vertices in non-decreasing in-degree order.
    #[inline]
    #[must_use]
    pub fn sorted(&self) -> &[PointIndex] {
        &self.sorted
    }

    /// Current in-degree of `v`. Requires update indices.
    #[inline]
    #[must_use]
    pub fn count(&self, v: PointIndex) -> usize {
        self.count[v as usize] as usize
    }

    /// Current index of `v` inside [`InwardsOrder::sorted`]. Requires update
    /// indices.
    #[inline]
    #[must_use]
    pub fn position(&self, v: PointIndex) -> usize {
        self.position[v as usize] as usize
    }

    /// Decrement the in-degree of `v`, moving it one bucket toward the
    /// front of the sort.
    ///
    /// `cursor` is the position the owning scan is currently at; `v` must
    /// sit strictly after it. Slots at or before the cursor are finalized,
    /// so when the target slot (the first slot of v's bucket) falls inside
    /// the visited prefix it is retargeted to `cursor + 1` and the new
    /// bucket logically begins there.
    pub fn decrement(&mut self, v: PointIndex, cursor: usize) {
        let k = self.count[v as usize] as usize;
        debug_assert!(k >= 1, "decrement of a vertex with no in-arcs");

        let from = self.position[v as usize] as usize;
        debug_assert!(from > cursor, "decrement of an already-visited vertex");

        let mut to = self.bucket_start[k] as usize;
        if to <= cursor {
            to = cursor + 1;
            self.bucket_start[k - 1] = to as u32;
        }

        let displaced = self.sorted[to];
        self.sorted.swap(from, to);
        self.position[v as usize] = to as u32;
        self.position[displaced as usize] = from as u32;

        self.bucket_start[k] = (to + 1) as u32;
        self.count[v as usize] -= 1;

        #[cfg(feature = "stable-findseed")]
        self.restore_bucket_order(k, cursor);
    }

    /// Re-sort the unvisited tails of the two buckets touched by a
    /// decrement so the scan order is a pure function of the input.
    #[cfg(feature = "stable-findseed")]
    fn restore_bucket_order(&mut self, k: usize, cursor: usize) {
        let spans = [
            (self.bucket_start[k - 1] as usize, self.bucket_start[k] as usize),
            (self.bucket_start[k] as usize, self.bucket_start[k + 1] as usize),
        ];
        for (start, end) in spans {
            let start = start.max(cursor + 1);
            if start + 1 >= end {
                continue;
            }
            self.sorted[start..end].sort_unstable();
            for slot in start..end {
                self.position[self.sorted[slot] as usize] = slot as u32;
            }
        }
    }

    #[cfg(test)]
    fn assert_consistent(&self, cursor: usize) {
        for (slot, &v) in self.sorted.iter().enumerate() {
            assert_eq!(self.position[v as usize] as usize, slot);
            if slot > cursor {
                let k = self.count[v as usize] as usize;
                assert!(self.bucket_start[k] as usize <= slot);
                assert!(slot < self.bucket_start[k + 1] as usize);
            }
        }
    }
}
