use std::fmt;
use std::str::Lines;

/// Path reported for the missing side of a created or deleted file.
pub const DEV_NULL: &str = "/dev/null";

/// One file section of a unified diff: the old-side path and every line
/// after the `+++` header up to the next `diff ` line.
///
/// # Examples
///
/// ```
/// use heatmap_difflens::parser::diff_files;
///
/// let diff = "--- a/x.py\n+++ b/x.py\n@@ -1,2 +1,3 @@\n line1\n-old\n+new1\n+new2\n";
/// let sections: Vec<_> = diff_files(diff).collect();
/// assert_eq!(sections.len(), 1);
/// assert_eq!(sections[0].path, "a/x.py");
/// assert_eq!(sections[0].lines.len(), 4);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSection<'a> {
    /// Old-side path exactly as written after `--- `, right-trimmed.
    pub path: &'a str,
    /// Hunk headers and bodies of this file.
    pub lines: Vec<&'a str>,
}

impl FileSection<'_> {
    /// Whether the old side does not exist (the file is created by the diff).
    pub fn is_dev_null(&self) -> bool {
        self.path == DEV_NULL
    }
}

impl fmt::Display for FileSection<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} lines)", self.path, self.lines.len())
    }
}

/// Lazy, single-pass iterator over the file sections of a diff.
///
/// Created by [`diff_files`].
#[derive(Debug, Clone)]
pub struct DiffFiles<'a> {
    lines: Lines<'a>,
}

impl<'a> Iterator for DiffFiles<'a> {
    type Item = FileSection<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        // Commit header, `diff --git`, `index` and mode lines are all skipped.
        let path = loop {
            let line = self.lines.next()?;
            if let Some(rest) = line.strip_prefix("--- ") {
                break rest.trim_end();
            }
        };

        // The `+++` line is not validated.
        self.lines.next()?;

        let mut lines = Vec::new();
        for line in self.lines.by_ref() {
            if line.starts_with("diff ") {
                break;
            }
            lines.push(line);
        }

        Some(FileSection { path, lines })
    }
}

/// Split a unified diff (as produced by `git show <rev>`) into file sections,
/// in the order they appear.
///
/// Sections whose path is [`DEV_NULL`] are still yielded; filtering them is
/// up to the caller.
///
/// # Examples
///
/// ```
/// use heatmap_difflens::parser::diff_files;
///
/// assert_eq!(diff_files("").count(), 0);
/// ```
pub fn diff_files(diff: &str) -> DiffFiles<'_> {
    DiffFiles { lines: diff.lines() }
}
