//! The clustering result surface: per-point labels and the cluster count.

use crate::error::Result;

/// Identifier of a cluster.
pub type ClusterLabel = u32;

/// Sentinel label denoting "unassigned".
pub const CLUSTER_NA: ClusterLabel = ClusterLabel::MAX;

/// The cluster count must stay strictly below this ceiling.
pub const CLUSTER_MAX: ClusterLabel = ClusterLabel::MAX;

/// What to do with points no seed claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnassignedMode {
    /// Leave them labelled [`CLUSTER_NA`].
    #[default]
    Ignore,
    /// Attach each to the cluster of its first assigned neighbor, when one
    /// exists.
    AnyNeighbor,
}

/// A partition of a point set into labelled clusters.
///
/// Labels run `0..num_clusters()`; points outside every cluster carry
/// [`CLUSTER_NA`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clustering {
    labels: Vec<ClusterLabel>,
    num_clusters: ClusterLabel,
}

impl Clustering {
    /// An unassigned clustering over `num_points` points.
    #[must_use]
    pub fn unassigned(num_points: usize) -> Self {
        Self { labels: vec![CLUSTER_NA; num_points], num_clusters: 0 }
    }

    pub(crate) fn from_labels(labels: Vec<ClusterLabel>, num_clusters: ClusterLabel) -> Self {
        debug_assert!(
            labels.iter().all(|&c| c == CLUSTER_NA || c < num_clusters),
            "label outside the produced cluster range"
        );
        Self { labels, num_clusters }
    }

    /// Number of data points covered by the clustering.
    #[inline]
    #[must_use]
    pub fn num_points(&self) -> usize {
        self.labels.len()
    }

    /// Number of clusters produced.
    #[inline]
    #[must_use]
    pub fn num_clusters(&self) -> ClusterLabel {
        self.num_clusters
    }

    /// The label array; unassigned points carry [`CLUSTER_NA`].
    #[inline]
    #[must_use]
    pub fn labels(&self) -> &[ClusterLabel] {
        &self.labels
    }

    /// Label of point `index`, or `None` when unassigned.
    #[must_use]
    pub fn label_of(&self, index: usize) -> Option<ClusterLabel> {
        match self.labels.get(index) {
            Some(&c) if c != CLUSTER_NA => Some(c),
            _ => None,
        }
    }

    /// Whether point `index` belongs to a cluster.
    #[must_use]
    pub fn is_assigned(&self, index: usize) -> bool {
        self.label_of(index).is_some()
    }

    /// Per-cluster point counts, indexed by label.
    ///
    /// # Errors
    ///
    /// `NoMemory` when the count array cannot be allocated.
    pub fn cluster_sizes(&self) -> Result<Vec<usize>> {
        let mut sizes = Vec::new();
        sizes.try_reserve_exact(self.num_clusters as usize)?;
        sizes.resize(self.num_clusters as usize, 0);

        for &c in &self.labels {
            if c != CLUSTER_NA {
                sizes[c as usize] += 1;
            }
        }
        Ok(sizes)
    }
}
