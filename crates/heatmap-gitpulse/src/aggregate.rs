//! Applies review-queue changes to a [`PathTree`].
//!
//! Every change contributes one age: how long it has been open, or how long
//! it took to approve once merged. Its diff is counted per file and the churn
//! is added to every node on each file's ancestor chain. Touch counts and
//! ages are added once per node per change, however many files below the node
//! the change touched.

use std::collections::{BTreeSet, HashMap};

use heatmap_core::{Change, ChangeStatus, HeatmapError};
use heatmap_difflens::churn::{count_churn, Churn};
use heatmap_difflens::parser::diff_files;

use crate::tree::PathTree;

/// Approval type whose timestamp marks a merged change as approved.
pub const APPROVAL_KIND: &str = "APRV";

/// Produces the unified diff of a patch set.
pub trait PatchSource {
    /// Return the `git show`-style diff of `revision`, which is reachable
    /// through `git_ref` on the review service.
    ///
    /// # Errors
    ///
    /// Returns [`HeatmapError::DiffRetrieval`] when no diff can be produced.
    fn fetch_diff(&self, git_ref: &str, revision: &str) -> Result<String, HeatmapError>;
}

/// Diffs kept in memory, keyed by revision.
impl PatchSource for HashMap<String, String> {
    fn fetch_diff(&self, _git_ref: &str, revision: &str) -> Result<String, HeatmapError> {
        self.get(revision)
            .cloned()
            .ok_or_else(|| HeatmapError::DiffRetrieval {
                revision: revision.to_string(),
                message: "no diff recorded for revision".into(),
            })
    }
}

/// What a single change contributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSummary {
    /// Status the change was aggregated under.
    pub status: ChangeStatus,
    /// Open time or time-to-approval, in the review service's time unit.
    pub age: u64,
    /// Files counted; created files (old side `/dev/null`) are not.
    pub files: usize,
    /// Churn over all counted files.
    pub churn: Churn,
    /// Distinct tree nodes the change touched, root included.
    pub nodes_touched: usize,
}

/// Determine the status of a change and the age it contributes.
///
/// Open changes age from the creation of their current patch set until `now`;
/// merged changes from that creation until their first `APRV` approval.
/// Negative spans (clock skew) count as zero.
///
/// # Errors
///
/// Returns [`HeatmapError::UnknownChangeStatus`] for statuses other than open
/// and merged, and [`HeatmapError::MissingApproval`] for a merged change
/// without an `APRV` approval.
///
/// # Examples
///
/// ```
/// use heatmap_core::{Change, ChangeStatus};
/// use heatmap_gitpulse::aggregate::change_age;
///
/// let row = r#"{"id":"I1","status":"NEW",
///     "currentPatchSet":{"revision":"r","ref":"refs/changes/01/1/1","createdOn":100}}"#;
/// let change: Change = serde_json::from_str(row).unwrap();
/// assert_eq!(change_age(&change, 160).unwrap(), (ChangeStatus::Open, 60));
/// ```
pub fn change_age(change: &Change, now: i64) -> Result<(ChangeStatus, u64), HeatmapError> {
    let status = change.status()?;
    let patch_set = &change.current_patch_set;
    let until = match status {
        ChangeStatus::Open => now,
        ChangeStatus::Merged => {
            patch_set
                .first_approval(APPROVAL_KIND)
                .ok_or_else(|| HeatmapError::MissingApproval {
                    change: change.id.clone(),
                })?
                .granted_on
        }
    };
    let age = u64::try_from(until.saturating_sub(patch_set.created_on)).unwrap_or(0);
    Ok((status, age))
}

/// Count the churn of every file section in `diff`, skipping created files.
///
/// All sections are counted before anything is returned, so a malformed hunk
/// anywhere in the diff fails the whole diff.
///
/// # Errors
///
/// Returns [`HeatmapError::MalformedHunkHeader`] from the churn counter.
pub fn churn_by_file(diff: &str) -> Result<Vec<(&str, Churn)>, HeatmapError> {
    diff_files(diff)
        .filter(|section| !section.is_dev_null())
        .map(|section| Ok((section.path, count_churn(&section.lines)?)))
        .collect()
}

/// Applies changes to a borrowed tree, one at a time.
///
/// # Examples
///
/// ```
/// use heatmap_core::Change;
/// use heatmap_gitpulse::aggregate::Aggregator;
/// use heatmap_gitpulse::tree::PathTree;
///
/// let row = r#"{"id":"I1","status":"NEW",
///     "currentPatchSet":{"revision":"r","ref":"refs/changes/01/1/1","createdOn":100}}"#;
/// let change: Change = serde_json::from_str(row).unwrap();
/// let diff = "--- a/x.py\n+++ b/x.py\n@@ -1,2 +1,3 @@\n line1\n-old\n+new1\n+new2\n";
///
/// let mut tree = PathTree::new();
/// Aggregator::new(&mut tree, 110).apply_diff(&change, diff).unwrap();
/// let x = tree.node(tree.find("x.py").unwrap());
/// assert_eq!((x.open.added, x.open.removed, x.open.age), (2, 1, 10));
/// ```
pub struct Aggregator<'t> {
    tree: &'t mut PathTree,
    now: i64,
    prune_segments: usize,
}

impl<'t> Aggregator<'t> {
    /// Aggregate into `tree`, aging open changes until `now`. Diff paths lose
    /// their first segment (`a/`) by default.
    pub fn new(tree: &'t mut PathTree, now: i64) -> Self {
        Self {
            tree,
            now,
            prune_segments: 1,
        }
    }

    /// Drop this many leading segments from diff paths instead.
    pub fn with_prune_segments(mut self, prune_segments: usize) -> Self {
        self.prune_segments = prune_segments;
        self
    }

    /// Fetch the diff of the change's current patch set and apply it.
    ///
    /// Status and age are checked before the diff is fetched; nothing in the
    /// tree changes unless the whole change can be applied.
    ///
    /// # Errors
    ///
    /// Any error of [`change_age`], of the patch source, or of
    /// [`churn_by_file`].
    pub fn apply_change<P>(
        &mut self,
        change: &Change,
        patches: &P,
    ) -> Result<ChangeSummary, HeatmapError>
    where
        P: PatchSource + ?Sized,
    {
        let (status, age) = change_age(change, self.now)?;
        let patch_set = &change.current_patch_set;
        let diff = patches.fetch_diff(&patch_set.git_ref, &patch_set.revision)?;
        self.apply(status, age, &diff)
    }

    /// Apply an already retrieved diff of the change.
    ///
    /// # Errors
    ///
    /// Any error of [`change_age`] or [`churn_by_file`].
    pub fn apply_diff(&mut self, change: &Change, diff: &str) -> Result<ChangeSummary, HeatmapError> {
        let (status, age) = change_age(change, self.now)?;
        self.apply(status, age, diff)
    }

    /// Apply every change in order, stopping at the first error.
    ///
    /// # Errors
    ///
    /// The first error of [`Aggregator::apply_change`].
    pub fn apply_all<P>(
        &mut self,
        changes: &[Change],
        patches: &P,
    ) -> Result<Vec<ChangeSummary>, HeatmapError>
    where
        P: PatchSource + ?Sized,
    {
        changes
            .iter()
            .map(|change| self.apply_change(change, patches))
            .collect()
    }

    fn apply(
        &mut self,
        status: ChangeStatus,
        age: u64,
        diff: &str,
    ) -> Result<ChangeSummary, HeatmapError> {
        let files = churn_by_file(diff)?;

        let mut total = Churn::default();
        let mut touched = BTreeSet::new();
        for &(path, churn) in &files {
            total += churn;
            for id in self.tree.resolve_path(path, self.prune_segments) {
                touched.insert(id);
                let node = self.tree.node_mut(id);
                match status {
                    ChangeStatus::Open => node.open.add_churn(churn, age),
                    ChangeStatus::Merged => node.merged.add_churn(churn, age),
                }
            }
        }

        for &id in &touched {
            let node = self.tree.node_mut(id);
            match status {
                ChangeStatus::Open => node.open.add_touch(age),
                ChangeStatus::Merged => node.merged.add_touch(age),
            }
        }

        Ok(ChangeSummary {
            status,
            age,
            files: files.len(),
            churn: total,
            nodes_touched: touched.len(),
        })
    }
}
