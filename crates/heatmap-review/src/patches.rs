use std::path::{Path, PathBuf};
use std::process::Command;

use git2::{Oid, Repository};
use heatmap_core::HeatmapError;
use heatmap_gitpulse::aggregate::PatchSource;

/// Retrieves patch set diffs from a local clone with `git show`, fetching the
/// review ref from `remote` first when the revision is not present.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use heatmap_gitpulse::aggregate::PatchSource;
/// use heatmap_review::patches::GitPatchSource;
///
/// let source = GitPatchSource::open(Path::new("."), "gerrit").unwrap();
/// let diff = source.fetch_diff("refs/changes/42/4242/3", "0f9e8d7c").unwrap();
/// print!("{diff}");
/// ```
pub struct GitPatchSource {
    repo: Repository,
    workdir: PathBuf,
    remote: String,
}

impl GitPatchSource {
    /// Open the repository containing `path`.
    ///
    /// # Errors
    ///
    /// Returns [`HeatmapError::Git`] if no repository is found.
    pub fn open(path: &Path, remote: &str) -> Result<Self, HeatmapError> {
        let repo = Repository::discover(path)
            .map_err(|e| HeatmapError::Git(format!("failed to open repository: {e}")))?;
        let workdir = repo
            .workdir()
            .unwrap_or_else(|| repo.path())
            .to_path_buf();
        Ok(Self {
            repo,
            workdir,
            remote: remote.to_string(),
        })
    }

    /// Whether the commit `revision` exists in the object database.
    pub fn has_revision(&self, revision: &str) -> bool {
        Oid::from_str(revision)
            .ok()
            .and_then(|oid| self.repo.find_commit(oid).ok())
            .is_some()
    }

    fn git(&self, args: &[&str], revision: &str) -> Result<String, HeatmapError> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.workdir)
            .args(args)
            .output()
            .map_err(|e| HeatmapError::DiffRetrieval {
                revision: revision.to_string(),
                message: format!("failed to run git {}: {e}", args[0]),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HeatmapError::DiffRetrieval {
                revision: revision.to_string(),
                message: format!("git {} failed: {}", args[0], stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl PatchSource for GitPatchSource {
    fn fetch_diff(&self, git_ref: &str, revision: &str) -> Result<String, HeatmapError> {
        if !self.has_revision(revision) {
            self.git(&["fetch", "--quiet", &self.remote, git_ref], revision)?;
        }
        self.git(&["show", "--no-color", "--no-ext-diff", revision], revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn repo_with_commit() -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        fs::create_dir_all(dir.path().join("nova")).unwrap();
        fs::write(dir.path().join("nova/api.py"), "one\ntwo\n").unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new("nova/api.py")).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();
        let sig = git2::Signature::now("Jane Doe", "jane@example.com").unwrap();
        let oid = repo
            .commit(Some("HEAD"), &sig, &sig, "Add api", &tree, &[])
            .unwrap();
        (dir, oid.to_string())
    }

    #[test]
    fn open_outside_a_repository_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = GitPatchSource::open(dir.path(), "gerrit");
        assert!(matches!(result, Err(HeatmapError::Git(_))));
    }

    #[test]
    fn known_and_unknown_revisions() {
        let (dir, head) = repo_with_commit();
        let source = GitPatchSource::open(dir.path(), "gerrit").unwrap();
        assert!(source.has_revision(&head));
        assert!(!source.has_revision("0123456789012345678901234567890123456789"));
        assert!(!source.has_revision("not-a-sha"));
    }

    #[test]
    fn show_returns_unified_diff_of_revision() {
        let (dir, head) = repo_with_commit();
        let source = GitPatchSource::open(dir.path(), "gerrit").unwrap();
        let diff = source.fetch_diff("refs/changes/01/1/1", &head).unwrap();
        assert!(diff.contains("--- /dev/null"));
        assert!(diff.contains("+++ b/nova/api.py"));
        assert!(diff.contains("+two"));
    }

    #[test]
    fn unfetchable_revision_is_a_retrieval_error() {
        let (dir, _) = repo_with_commit();
        let source = GitPatchSource::open(dir.path(), "no-such-remote").unwrap();
        let err = source
            .fetch_diff("refs/changes/01/1/1", "0123456789012345678901234567890123456789")
            .unwrap_err();
        assert!(matches!(err, HeatmapError::DiffRetrieval { .. }));
    }
}
