//! Line counts of the working tree, used as the heat map's baseline.

use std::path::Path;

use heatmap_core::HeatmapError;

use crate::tree::PathTree;

/// Count the lines of every file under `root`, respecting `.gitignore` and
/// skipping hidden entries such as `.git`.
///
/// Paths are relative to `root`, `/`-separated, and sorted. Files that are
/// not valid UTF-8 are counted lossily.
///
/// # Errors
///
/// Returns [`HeatmapError::Io`] if `root` cannot be read, an entry or ignore
/// file under it cannot be read, or a file disappears while it is being
/// counted. Nothing is skipped silently.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use heatmap_gitpulse::baseline::scan_line_counts;
///
/// for (path, lines) in scan_line_counts(Path::new(".")).unwrap() {
///     println!("{lines:>8} {path}");
/// }
/// ```
pub fn scan_line_counts(root: &Path) -> Result<Vec<(String, u64)>, HeatmapError> {
    std::fs::read_dir(root)?;

    let walker = ignore::WalkBuilder::new(root).require_git(false).build();
    let mut counts = Vec::new();

    for entry in walker {
        let entry = entry.map_err(|e| walk_error(&e))?;
        // Ignore-file parse errors ride on the directory's entry.
        if let Some(err) = entry.error() {
            return Err(walk_error(err));
        }

        let Some(file_type) = entry.file_type() else {
            continue;
        };
        if !file_type.is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        let bytes = std::fs::read(path)?;
        counts.push((key, count_lines(&bytes)));
    }

    counts.sort();
    Ok(counts)
}

fn walk_error(err: &ignore::Error) -> HeatmapError {
    let kind = err
        .io_error()
        .map_or(std::io::ErrorKind::Other, std::io::Error::kind);
    HeatmapError::Io(std::io::Error::new(kind, err.to_string()))
}

fn count_lines(bytes: &[u8]) -> u64 {
    String::from_utf8_lossy(bytes).lines().count() as u64
}

/// Prune for working-tree paths matching `diff_prune_segments` on diff paths.
///
/// Diff paths carry a side prefix (`a/nova/api.py`) that working-tree paths
/// (`nova/api.py`) lack, so one segment fewer is dropped.
///
/// # Examples
///
/// ```
/// use heatmap_gitpulse::baseline::baseline_prune;
///
/// assert_eq!(baseline_prune(1), 0);
/// assert_eq!(baseline_prune(3), 2);
/// assert_eq!(baseline_prune(0), 0);
/// ```
pub fn baseline_prune(diff_prune_segments: usize) -> usize {
    diff_prune_segments.saturating_sub(1)
}

/// Add the line count of every file under `root` to `tree`.
///
/// `diff_prune_segments` is the prune applied to diff paths; baseline paths
/// are pruned to land on the same nodes (see [`baseline_prune`]). Returns the
/// number of files counted.
///
/// # Errors
///
/// Any error of [`scan_line_counts`].
pub fn seed_baseline(
    tree: &mut PathTree,
    root: &Path,
    diff_prune_segments: usize,
) -> Result<usize, HeatmapError> {
    let counts = scan_line_counts(root)?;
    let prune = baseline_prune(diff_prune_segments);
    for (path, lines) in &counts {
        tree.add_baseline(path, *lines, prune);
    }
    Ok(counts.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;
    use std::fs;

    fn make_temp_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        fs::create_dir_all(root.join("nova/compute")).unwrap();
        fs::write(root.join("nova/api.py"), "import os\n\ndef api():\n    pass\n").unwrap();
        fs::write(root.join("nova/compute/manager.py"), "a\nb\nc").unwrap();
        fs::write(root.join("README"), "").unwrap();
        fs::write(root.join("build.log"), "ignored\n").unwrap();
        fs::write(root.join(".gitignore"), "*.log\n").unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join(".git/HEAD"), "ref: refs/heads/master\n").unwrap();
        dir
    }

    #[test]
    fn counts_lines_of_visible_files() {
        let dir = make_temp_repo();
        let counts = scan_line_counts(dir.path()).unwrap();
        assert_eq!(
            counts,
            vec![
                ("README".to_string(), 0),
                ("nova/api.py".to_string(), 4),
                ("nova/compute/manager.py".to_string(), 3),
            ]
        );
    }

    #[test]
    fn seed_rolls_counts_up_the_tree() {
        let dir = make_temp_repo();
        let mut tree = PathTree::new();
        let files = seed_baseline(&mut tree, dir.path(), 1).unwrap();
        assert_eq!(files, 3);

        assert_eq!(tree.node(tree.root()).lines, 7);
        assert_eq!(tree.node(tree.find("nova").unwrap()).lines, 7);
        assert_eq!(tree.node(tree.find("nova/compute").unwrap()).lines, 3);
        assert!(tree.find("build.log").is_none());
        assert!(tree.find(".git").is_none());
    }

    #[test]
    fn churned_nodes_carry_baseline_lines_for_any_prune() {
        let diff = "--- a/nova/compute/manager.py\n+++ b/nova/compute/manager.py\n\
                    @@ -1,3 +1,3 @@\n a\n-b\n+B\n c\n";
        let row = r#"{"id":"I1","status":"NEW",
            "currentPatchSet":{"revision":"r","ref":"refs/changes/01/1/1","createdOn":0}}"#;
        let change: heatmap_core::Change = serde_json::from_str(row).unwrap();

        for (prune, path) in [
            (1, "nova/compute/manager.py"),
            (2, "compute/manager.py"),
            (3, "manager.py"),
        ] {
            let dir = make_temp_repo();
            let mut tree = PathTree::new();
            seed_baseline(&mut tree, dir.path(), prune).unwrap();
            Aggregator::new(&mut tree, 10)
                .with_prune_segments(prune)
                .apply_diff(&change, diff)
                .unwrap();

            let node = tree.node(tree.find(path).unwrap());
            assert_eq!(node.lines, 3, "prune {prune}");
            assert_eq!((node.open.added, node.open.removed), (1, 1), "prune {prune}");
            assert_eq!(node.open.touched, 1, "prune {prune}");
        }
    }

    #[test]
    fn pruned_baseline_still_totals_at_root() {
        let dir = make_temp_repo();
        let mut tree = PathTree::new();
        seed_baseline(&mut tree, dir.path(), 2).unwrap();
        assert_eq!(tree.node(tree.root()).lines, 7);
        assert_eq!(tree.node(tree.find("api.py").unwrap()).lines, 4);
        assert_eq!(tree.node(tree.find("compute").unwrap()).lines, 3);
        assert!(tree.find("nova").is_none());
    }

    #[test]
    fn unreadable_ignore_rules_are_an_error() {
        let dir = make_temp_repo();
        fs::write(dir.path().join(".gitignore"), "*.log\nunclosed[class\n").unwrap();
        assert!(matches!(
            scan_line_counts(dir.path()),
            Err(HeatmapError::Io(_))
        ));
    }

    #[test]
    fn invalid_utf8_is_counted_lossily() {
        assert_eq!(count_lines(b"ok\n\xff\xfe\nend"), 3);
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            scan_line_counts(&missing),
            Err(HeatmapError::Io(_))
        ));
    }
}
