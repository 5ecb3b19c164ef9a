//! The core data structures: point sets, metrics, bounding volumes and trees.

pub mod bound;
pub mod dataset;
pub mod metric;
pub mod tree;

pub use bound::{Ball, BoundingVolume, Hrect};
pub use dataset::{Permutation, PointSet};
pub use metric::Metric;
pub use tree::{build_tree, BallTree, KdTree, Node, SplitRule, Tree, TreeBuilder};
