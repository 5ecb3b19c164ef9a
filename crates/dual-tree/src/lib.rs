#![deny(clippy::correctness)]
#![warn(
    missing_docs,
    clippy::all,
    clippy::suspicious,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::pedantic,
    clippy::nursery,
    clippy::missing_docs_in_private_items,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::cast_lossless
)]
#![doc = include_str!("../README.md")]

mod core;
mod error;
pub mod kde;
pub mod knn;
pub mod rank_approx;
pub mod traversal;
pub mod utils;

pub use crate::core::{
    bound, dataset, metric, tree, build_tree, Ball, BallTree, BoundingVolume, Hrect, KdTree, Metric, Node, Permutation,
    PointSet, SplitRule, Tree, TreeBuilder,
};
pub use error::{Result, TreeError};
pub use traversal::{DualTreeTraversal, TraversalRules, TraversalStats};

/// The current version of the crate.
pub const VERSION: &str = "0.1.0";
