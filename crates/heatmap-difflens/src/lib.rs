//! Unified diff scanning and churn counting.
//!
//! Splits the output of `git show` into per-file hunk lines and counts the
//! added and removed lines of each file, checking every hunk body against
//! the line counts announced in its header.

pub mod churn;
pub mod parser;
