//! Open changes listed as a dependency forest.
//!
//! Each change is printed as `owner subject url`, in aligned columns, under
//! the change it depends on. Siblings are ordered by their last update.

use std::collections::HashMap;
use std::fmt;

use heatmap_core::Change;

/// Subjects longer than this many characters are cut.
pub const SUBJECT_WIDTH: usize = 70;

/// Columns of indentation per dependency level.
pub const INDENT: usize = 1;

#[derive(Debug, Clone)]
struct Entry {
    id: String,
    updated: i64,
    owner: String,
    subject: String,
    url: String,
    depends: Option<String>,
    children: Vec<usize>,
}

impl Entry {
    fn new(change: &Change) -> Self {
        Self {
            id: change.id.clone(),
            updated: change.last_updated,
            owner: change.owner.display_name().to_string(),
            subject: change.subject.chars().take(SUBJECT_WIDTH).collect(),
            url: change.url.clone().unwrap_or_default(),
            depends: change.depends_on.first().map(|d| d.id.clone()),
            children: Vec::new(),
        }
    }
}

/// Changes arranged so that each one sits below the change it depends on.
///
/// A change whose dependency is not in the listing is a root. A later row
/// for an id already seen replaces the earlier one. Dependency cycles are
/// broken at the first link that would close them.
///
/// # Examples
///
/// ```
/// use heatmap_core::Change;
/// use heatmap_review::changes::ChangeListing;
///
/// let rows = [
///     r#"{"id":"I1","subject":"Base","url":"u1","status":"NEW","lastUpdated":2,
///         "owner":{"username":"ann"},
///         "currentPatchSet":{"revision":"r1","ref":"refs/changes/01/1/1","createdOn":0}}"#,
///     r#"{"id":"I2","subject":"On top","url":"u2","status":"NEW","lastUpdated":1,
///         "owner":{"username":"bo"},"dependsOn":[{"id":"I1"}],
///         "currentPatchSet":{"revision":"r2","ref":"refs/changes/02/2/1","createdOn":0}}"#,
/// ];
/// let changes = rows.iter().map(|r| serde_json::from_str::<Change>(r).unwrap());
///
/// let listing = ChangeListing::new(changes);
/// assert_eq!(listing.lines(), vec!["ann Base   u1", " bo On top u2"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChangeListing {
    entries: Vec<Entry>,
    roots: Vec<usize>,
}

impl ChangeListing {
    /// Arrange `changes` by dependency.
    pub fn new<I>(changes: I) -> Self
    where
        I: IntoIterator<Item = Change>,
    {
        let mut entries: Vec<Entry> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for change in changes {
            let entry = Entry::new(&change);
            match index.get(&entry.id) {
                Some(&i) => entries[i] = entry,
                None => {
                    index.insert(entry.id.clone(), entries.len());
                    entries.push(entry);
                }
            }
        }

        let mut parents: Vec<Option<usize>> = vec![None; entries.len()];
        for i in 0..entries.len() {
            let dep = entries[i]
                .depends
                .as_deref()
                .and_then(|id| index.get(id))
                .copied();
            if let Some(dep) = dep {
                if !reaches(&parents, dep, i) {
                    parents[i] = Some(dep);
                }
            }
        }

        let mut roots = Vec::new();
        for (i, parent) in parents.iter().enumerate() {
            match parent {
                Some(p) => entries[*p].children.push(i),
                None => roots.push(i),
            }
        }

        let updated: Vec<i64> = entries.iter().map(|e| e.updated).collect();
        roots.sort_by_key(|&i| updated[i]);
        for entry in &mut entries {
            entry.children.sort_by_key(|&i| updated[i]);
        }

        Self { entries, roots }
    }

    /// Number of changes listed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no change is listed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rendered rows, parents before their dependents, without trailing
    /// whitespace.
    pub fn lines(&self) -> Vec<String> {
        let mut order = Vec::with_capacity(self.entries.len());
        self.walk(&self.roots, 0, &mut order);

        let owner_width = order
            .iter()
            .map(|&(depth, i)| depth * INDENT + self.entries[i].owner.chars().count())
            .max()
            .unwrap_or(0);
        let subject_width = self
            .entries
            .iter()
            .map(|e| e.subject.chars().count())
            .max()
            .unwrap_or(0);

        order
            .iter()
            .map(|&(depth, i)| {
                let entry = &self.entries[i];
                let indent = depth * INDENT;
                let line = format!(
                    "{:indent$}{:<ow$} {:<sw$} {}",
                    "",
                    entry.owner,
                    entry.subject,
                    entry.url,
                    indent = indent,
                    ow = owner_width - indent,
                    sw = subject_width,
                );
                line.trim_end().to_string()
            })
            .collect()
    }

    fn walk(&self, ids: &[usize], depth: usize, order: &mut Vec<(usize, usize)>) {
        for &i in ids {
            order.push((depth, i));
            self.walk(&self.entries[i].children, depth + 1, order);
        }
    }
}

impl fmt::Display for ChangeListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

/// Whether following accepted parent links up from `from` arrives at `target`.
fn reaches(parents: &[Option<usize>], from: usize, target: usize) -> bool {
    let mut current = Some(from);
    while let Some(i) = current {
        if i == target {
            return true;
        }
        current = parents[i];
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn change(id: &str, owner: &str, subject: &str, updated: i64, depends: Option<&str>) -> Change {
        let mut row = json!({
            "id": id,
            "subject": subject,
            "url": format!("https://r/{id}"),
            "status": "NEW",
            "lastUpdated": updated,
            "owner": {"name": "Someone", "username": owner},
            "currentPatchSet": {"revision": "r", "ref": "refs/changes/01/1/1", "createdOn": 0}
        });
        if let Some(dep) = depends {
            row["dependsOn"] = json!([{"id": dep, "number": "1"}]);
        }
        serde_json::from_value(row).unwrap()
    }

    #[test]
    fn roots_and_children_in_update_order() {
        let listing = ChangeListing::new(vec![
            change("A", "alice", "Base", 30, None),
            change("B", "bob", "Child", 10, Some("A")),
            change("C", "carol", "Other", 20, None),
        ]);
        assert_eq!(
            listing.lines(),
            vec![
                "carol Other https://r/C",
                "alice Base  https://r/A",
                " bob  Child https://r/B",
            ]
        );
    }

    #[test]
    fn deeper_dependents_indent_further() {
        let listing = ChangeListing::new(vec![
            change("C", "cy", "Third", 3, Some("B")),
            change("A", "al", "First", 1, None),
            change("B", "bo", "Second", 2, Some("A")),
            change("D", "di", "Also on first", 4, Some("A")),
        ]);
        let lines = listing.lines();
        let owners: Vec<&str> = lines.iter().map(|l| l.split(' ').find(|s| !s.is_empty()).unwrap()).collect();
        assert_eq!(owners, vec!["al", "bo", "cy", "di"]);
        assert!(lines[0].starts_with("al "));
        assert!(lines[1].starts_with(" bo "));
        assert!(lines[2].starts_with("  cy "));
        assert!(lines[3].starts_with(" di "));
    }

    #[test]
    fn urls_share_one_column() {
        let listing = ChangeListing::new(vec![
            change("A", "a", "Short", 1, None),
            change("B", "someone-long", "A somewhat longer subject", 2, Some("A")),
            change("C", "c", "x", 3, None),
        ]);
        let columns: Vec<usize> = listing
            .lines()
            .iter()
            .map(|l| l.find("https://").unwrap())
            .collect();
        assert!(columns.windows(2).all(|w| w[0] == w[1]), "{columns:?}");
    }

    #[test]
    fn long_subjects_are_truncated() {
        let subject = "x".repeat(SUBJECT_WIDTH + 15);
        let listing = ChangeListing::new(vec![change("A", "al", &subject, 1, None)]);
        let expected = format!("al {} https://r/A", "x".repeat(SUBJECT_WIDTH));
        assert_eq!(listing.lines(), vec![expected]);
    }

    #[test]
    fn unknown_dependency_makes_a_root() {
        let listing = ChangeListing::new(vec![
            change("B", "bo", "Child of merged", 2, Some("GONE")),
            change("A", "al", "Base", 1, None),
        ]);
        let lines = listing.lines();
        assert!(lines[0].starts_with("al "));
        assert!(lines[1].starts_with("bo "));
    }

    #[test]
    fn dependency_cycle_is_still_listed() {
        let listing = ChangeListing::new(vec![
            change("A", "al", "One", 1, Some("B")),
            change("B", "bo", "Two", 2, Some("A")),
            change("S", "sy", "Self", 3, Some("S")),
        ]);
        let lines = listing.lines();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("bo "));
        assert!(lines[1].starts_with(" al "));
        assert!(lines[2].starts_with("sy "));
    }

    #[test]
    fn repeated_id_keeps_latest_row() {
        let listing = ChangeListing::new(vec![
            change("A", "al", "Old subject", 1, None),
            change("A", "al", "New subject", 5, None),
        ]);
        assert_eq!(listing.len(), 1);
        assert_eq!(listing.lines(), vec!["al New subject https://r/A"]);
    }

    #[test]
    fn empty_listing_renders_nothing() {
        let listing = ChangeListing::new(Vec::new());
        assert!(listing.is_empty());
        assert_eq!(listing.to_string(), "");
    }
}
