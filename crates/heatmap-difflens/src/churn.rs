use std::ops::AddAssign;

use heatmap_core::HeatmapError;

/// Added and removed line counts of a file or a whole change.
///
/// # Examples
///
/// ```
/// use heatmap_difflens::churn::Churn;
///
/// let churn = Churn { added: 3, removed: 1 };
/// assert_eq!(churn.changed(), 4);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Churn {
    /// Lines starting with `+` inside hunk bodies.
    pub added: u64,
    /// Lines starting with `-` inside hunk bodies.
    pub removed: u64,
}

impl Churn {
    /// Total lines touched, `added + removed`.
    pub fn changed(&self) -> u64 {
        self.added + self.removed
    }
}

impl AddAssign for Churn {
    fn add_assign(&mut self, rhs: Self) {
        self.added += rhs.added;
        self.removed += rhs.removed;
    }
}

/// A parsed `@@ -a,b +c,d @@` line.
///
/// # Examples
///
/// ```
/// use heatmap_difflens::churn::HunkHeader;
///
/// let h = HunkHeader::parse("@@ -10,3 +12 @@ fn main() {").unwrap();
/// assert_eq!((h.old_lines, h.new_lines), (3, 1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkHeader {
    /// Starting line in the old version.
    pub old_start: u32,
    /// Number of lines in the old version.
    pub old_lines: u32,
    /// Starting line in the new version.
    pub new_start: u32,
    /// Number of lines in the new version.
    pub new_lines: u32,
}

impl HunkHeader {
    /// Parse a hunk header; anything after the closing `@@` is ignored.
    ///
    /// A range without a comma has a count of one. Returns `None` when the
    /// line does not follow the grammar.
    pub fn parse(line: &str) -> Option<Self> {
        let inner = line.strip_prefix("@@ ")?;
        let inner = &inner[..inner.find(" @@")?];

        let (old, new) = inner.split_once(' ')?;
        let (old_start, old_lines) = parse_range(old.strip_prefix('-')?)?;
        let (new_start, new_lines) = parse_range(new.strip_prefix('+')?)?;

        Some(Self {
            old_start,
            old_lines,
            new_start,
            new_lines,
        })
    }
}

fn parse_range(range: &str) -> Option<(u32, u32)> {
    match range.split_once(',') {
        Some((start, count)) => Some((parse_number(start)?, parse_number(count)?)),
        None => Some((parse_number(range)?, 1)),
    }
}

fn parse_number(digits: &str) -> Option<u32> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Count the added and removed lines of one file's hunk lines, as produced by
/// [`diff_files`](crate::parser::diff_files).
///
/// Each hunk body is consumed exactly until the old and new counts of its
/// header are used up: context lines count against both, `-` lines against
/// the old side and `+` lines against the new side. `\ No newline at end of
/// file` markers between hunks are skipped.
///
/// If the lines run out before a hunk is complete, counting stops and the
/// lines seen so far are returned. Empty body lines are taken as context.
///
/// A range without a comma (`@@ -7 +7 @@`) announces one line, as in the
/// unified diff format. The bare number is a start line, never a count, so
/// `-7` does not make the counter wait for seven old-side lines.
///
/// # Errors
///
/// Returns [`HeatmapError::MalformedHunkHeader`] when a line in header
/// position is not a hunk header. The error carries the remaining lines.
///
/// # Examples
///
/// ```
/// use heatmap_difflens::churn::{count_churn, Churn};
///
/// let lines = ["@@ -1,2 +1,3 @@", " line1", "-old", "+new1", "+new2"];
/// assert_eq!(count_churn(&lines).unwrap(), Churn { added: 2, removed: 1 });
/// ```
pub fn count_churn(lines: &[&str]) -> Result<Churn, HeatmapError> {
    let mut churn = Churn::default();
    let mut pos = 0;

    while let Some(&line) = lines.get(pos) {
        let header = HunkHeader::parse(line).ok_or_else(|| HeatmapError::MalformedHunkHeader {
            line: line.to_string(),
            context: lines[pos..].join("\n"),
        })?;
        pos += 1;

        let mut old_left = i64::from(header.old_lines);
        let mut new_left = i64::from(header.new_lines);
        while old_left > 0 || new_left > 0 {
            let Some(&body) = lines.get(pos) else {
                return Ok(churn);
            };
            pos += 1;

            match body.as_bytes().first() {
                Some(b' ') | None => {
                    old_left -= 1;
                    new_left -= 1;
                }
                Some(b'-') => {
                    old_left -= 1;
                    churn.removed += 1;
                }
                Some(b'+') => {
                    new_left -= 1;
                    churn.added += 1;
                }
                _ => {}
            }
        }

        while lines.get(pos).is_some_and(|l| l.starts_with('\\')) {
            pos += 1;
        }
    }

    Ok(churn)
}
