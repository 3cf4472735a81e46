//! Nearest-neighbor digraph machinery: the CSR store, its algebra, the
//! inwards-count sort index, and the seed finder built on top of them.

pub mod algebra;
pub mod digraph;
pub mod inwards;
pub mod seed;
