//! Open changes that touch a set of directories.

use heatmap_core::Change;

/// Synthetic file Gerrit lists for the commit message of every patch set.
pub const COMMIT_MSG: &str = "/COMMIT_MSG";

/// Whether `path` is `dir` itself or lies below it.
///
/// A trailing slash on `dir` is ignored, and `nova/api` does not match
/// `nova/api_samples/...`.
pub fn is_under(path: &str, dir: &str) -> bool {
    let dir = dir.trim_end_matches('/');
    match path.strip_prefix(dir) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Whether the current patch set of `change` touches any of `dirs`.
///
/// # Examples
///
/// ```
/// use heatmap_core::Change;
/// use heatmap_review::dirs::touches_dirs;
///
/// let change: Change = serde_json::from_str(r#"{
///     "id": "I1", "status": "NEW",
///     "currentPatchSet": {
///         "revision": "r1", "ref": "refs/changes/01/1/1", "createdOn": 0,
///         "files": [{"file": "/COMMIT_MSG"}, {"file": "nova/virt/driver.py"}]
///     }
/// }"#).unwrap();
///
/// assert!(touches_dirs(&change, &["nova/virt".to_string()]));
/// assert!(!touches_dirs(&change, &["nova/api".to_string()]));
/// ```
pub fn touches_dirs(change: &Change, dirs: &[String]) -> bool {
    change
        .current_patch_set
        .files
        .iter()
        .filter(|f| f.file != COMMIT_MSG)
        .any(|f| dirs.iter().any(|dir| is_under(&f.file, dir)))
}

/// One report line: `<subject>: <url>`.
pub fn format_change(change: &Change) -> String {
    format!(
        "{}: {}",
        change.subject,
        change.url.as_deref().unwrap_or(&change.id)
    )
}
