//! Review-service and repository collaborators.
//!
//! Queries Gerrit over ssh for changes, retrieves patch set diffs from the
//! local git repository (fetching review refs on demand), filters open
//! changes by the directories they touch, and lists open changes by
//! dependency.

pub mod changes;
pub mod dirs;
pub mod gerrit;
pub mod patches;
