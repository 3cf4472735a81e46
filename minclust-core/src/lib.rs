//! Minclust - embeddable size-constrained clustering engine
//!
//! Minclust partitions a set of data points into clusters in which every
//! cluster holds at least a caller-chosen number of points, optionally
//! within a maximum distance of the cluster's seed. It is built around a
//! nearest-neighbor digraph: every point gets an arc to each of its k
//! nearest neighbors, a set of *seeds* with pairwise disjoint closed
//! neighborhoods is selected, and each seed's neighborhood becomes one
//! cluster.
//!
//! # Features
//!
//! - Compact CSR digraph with a full set of algebraic operations
//! - Six seed-selection heuristics, from plain lexical scan to live
//!   in-degree ordering over an exclusion graph
//! - A batched clusterer that streams the search oracle and never
//!   materializes the digraph
//! - Pluggable nearest-neighbor search through the [`NnOracle`] trait,
//!   with an exact-scan implementation included
//!
//! # Example
//!
//! ```no_run
//! use minclust_core::{BruteForceOracle, SeedMethod, UnassignedMode, nng_clustering};
//!
//! # fn main() -> minclust_core::Result<()> {
//! let points: Vec<f64> = (0..100).map(f64::from).collect();
//! let mut oracle = BruteForceOracle::new(&points, 1)?;
//!
//! let clustering = nng_clustering(
//!     &mut oracle,
//!     5, // minimum cluster size
//!     SeedMethod::InwardsUpdating,
//!     UnassignedMode::AnyNeighbor,
//!     None, // no radius constraint
//!     None, // no primary subset
//! )?;
//!
//! assert!(clustering.cluster_sizes()?.iter().all(|&size| size >= 5));
//! # Ok(())
//! # }
//! ```
//!
//! # Design Philosophy
//!
//! The clusterings are heuristic: every cluster honors the size and radius
//! constraints, but no optimality is claimed. The engine is single-threaded
//! and synchronous, keeps no global state, and refuses to refine an
//! existing clustering - callers wanting parallelism run independent
//! engines over independent data.

mod batch;
mod clustering;
mod distance;
mod error;
mod graph;
mod nng;
mod oracle;

pub use batch::nng_clustering_batches;
pub use clustering::{CLUSTER_MAX, CLUSTER_NA, ClusterLabel, Clustering, UnassignedMode};
pub use distance::euclidean_sq;
pub use error::{Error, ErrorKind, Result};
pub use graph::algebra;
pub use graph::digraph::{ARC_MAX, ArcIndex, Digraph, POINT_NA, PointIndex};
pub use graph::inwards::InwardsOrder;
pub use graph::seed::{SeedMethod, find_seeds};
pub use nng::{nng_clustering, nng_clustering_from_digraph};
pub use oracle::{BruteForceOracle, NnOracle};
