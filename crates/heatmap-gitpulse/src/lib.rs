//! Review-queue churn aggregation over a path tree.
//!
//! Applies the diff of every change in a review queue to a tree of
//! directories and files, accumulating open-change churn weighted by how long
//! the change has waited, and merged-change churn weighted by how long it took
//! to approve. The tree is seeded with the line counts of the working tree and
//! exported as a nested JSON document for heat-map rendering.

pub mod aggregate;
pub mod baseline;
pub mod export;
pub mod tree;
