//! Prefix tree of repository paths carrying churn statistics.
//!
//! Nodes live in an arena owned by [`PathTree`] and are addressed by
//! [`NodeId`]. A node is created the first time a path through it is resolved
//! and is never removed, so ids stay valid for the lifetime of the tree.

use std::collections::BTreeMap;

use heatmap_difflens::churn::Churn;
use serde::Serialize;

/// Handle to a node of a [`PathTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Statistics contributed by open (pending) changes.
///
/// Serialized with the key names heat-map renderers expect
/// (`age_added`, `age_removed`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OpenStats {
    /// Distinct open changes touching this path or below.
    pub touched: u64,
    /// Sum of the ages of those changes.
    pub age: u64,
    /// Lines added by open changes.
    pub added: u64,
    /// Lines removed by open changes.
    pub removed: u64,
    /// Σ added × age.
    #[serde(rename = "age_added")]
    pub age_weighted_added: u64,
    /// Σ removed × age.
    #[serde(rename = "age_removed")]
    pub age_weighted_removed: u64,
}

impl OpenStats {
    /// Account one file's churn from a change of the given age.
    pub fn add_churn(&mut self, churn: Churn, age: u64) {
        self.added += churn.added;
        self.removed += churn.removed;
        self.age_weighted_added += churn.added * age;
        self.age_weighted_removed += churn.removed * age;
    }

    /// Account one change touching this node.
    pub fn add_touch(&mut self, age: u64) {
        self.touched += 1;
        self.age += age;
    }
}

/// Statistics contributed by merged changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergedStats {
    /// Distinct merged changes touching this path or below.
    pub touched: u64,
    /// Sum of their time-to-approval.
    pub age: u64,
    /// Lines added plus lines removed.
    pub changed: u64,
    /// Σ changed × age.
    #[serde(rename = "age_changed")]
    pub age_weighted_changed: u64,
}

impl MergedStats {
    /// Account one file's churn from a change of the given age.
    pub fn add_churn(&mut self, churn: Churn, age: u64) {
        self.changed += churn.changed();
        self.age_weighted_changed += churn.changed() * age;
    }

    /// Account one change touching this node.
    pub fn add_touch(&mut self, age: u64) {
        self.touched += 1;
        self.age += age;
    }
}

/// A directory or file in the tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    name: String,
    path: String,
    parent: Option<NodeId>,
    children: BTreeMap<String, NodeId>,
    /// Open-change statistics.
    pub open: OpenStats,
    /// Merged-change statistics.
    pub merged: MergedStats,
    /// Lines currently present under this path in the working tree.
    pub lines: u64,
}

impl TreeNode {
    fn new(name: &str, path: String, parent: Option<NodeId>) -> Self {
        Self {
            name: name.to_string(),
            path,
            parent,
            children: BTreeMap::new(),
            open: OpenStats::default(),
            merged: MergedStats::default(),
            lines: 0,
        }
    }

    /// Final path segment; `/` for the root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Slash-joined path from the root, e.g. `/nova/api.py`; empty for the root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Parent node, `None` only for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in name order.
    pub fn children(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.children.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Whether the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Path hierarchy rooted at the repository root.
///
/// # Examples
///
/// ```
/// use heatmap_gitpulse::tree::PathTree;
///
/// let mut tree = PathTree::new();
/// let chain = tree.resolve_path("a/nova/api.py", 1);
/// assert_eq!(chain.len(), 3);
/// assert_eq!(tree.node(chain[2]).path(), "/nova/api.py");
/// assert_eq!(tree.resolve_path("a/nova/api.py", 1), chain);
/// ```
#[derive(Debug, Clone)]
pub struct PathTree {
    nodes: Vec<TreeNode>,
}

impl Default for PathTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PathTree {
    /// A tree holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![TreeNode::new("/", String::new(), None)],
        }
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Borrow a node.
    ///
    /// # Panics
    ///
    /// Panics if `id` belongs to a different tree and is out of range.
    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    /// Mutably borrow a node.
    pub fn node_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.nodes[id.0]
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: the root exists from construction.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in creation order; parents precede their children.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TreeNode)> + '_ {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Ancestor chain of `path`, from the root down to the node for `path`
    /// inclusive, creating missing nodes on the way.
    ///
    /// The path is split on `/` and its first `prune_segments` segments are
    /// dropped before descending, e.g. the `a` of `a/nova/api.py`.
    pub fn resolve_path(&mut self, path: &str, prune_segments: usize) -> Vec<NodeId> {
        let mut last = self.root();
        let mut chain = vec![last];
        for name in path.split('/').skip(prune_segments) {
            last = self.child(last, name);
            chain.push(last);
        }
        chain
    }

    fn child(&mut self, parent: NodeId, name: &str) -> NodeId {
        if let Some(&id) = self.nodes[parent.0].children.get(name) {
            return id;
        }

        let id = NodeId(self.nodes.len());
        let path = format!("{}/{}", self.nodes[parent.0].path, name);
        self.nodes.push(TreeNode::new(name, path, Some(parent)));
        self.nodes[parent.0].children.insert(name.to_string(), id);
        id
    }

    /// Look up an existing node by repository-relative path (`nova/api.py`,
    /// `/nova/api.py`); `""` and `"/"` name the root.
    pub fn find(&self, path: &str) -> Option<NodeId> {
        let trimmed = path.strip_prefix('/').unwrap_or(path);
        let mut current = self.root();
        if trimmed.is_empty() {
            return Some(current);
        }
        for name in trimmed.split('/') {
            current = *self.nodes[current.0].children.get(name)?;
        }
        Some(current)
    }

    /// Add a file's current line count to every node from the root down to it,
    /// dropping `prune_segments` leading segments of `path` as
    /// [`PathTree::resolve_path`] does.
    pub fn add_baseline(&mut self, path: &str, lines: u64, prune_segments: usize) {
        for id in self.resolve_path(path, prune_segments) {
            self.nodes[id.0].lines += lines;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tree_has_only_root() {
        let tree = PathTree::new();
        assert_eq!(tree.len(), 1);
        let root = tree.node(tree.root());
        assert_eq!(root.name(), "/");
        assert_eq!(root.path(), "");
        assert!(root.parent().is_none());
        assert!(root.is_leaf());
    }

    #[test]
    fn resolve_creates_chain_with_derived_paths() {
        let mut tree = PathTree::new();
        let chain = tree.resolve_path("a/nova/compute/manager.py", 1);
        let paths: Vec<&str> = chain.iter().map(|&id| tree.node(id).path()).collect();
        assert_eq!(
            paths,
            vec!["", "/nova", "/nova/compute", "/nova/compute/manager.py"]
        );
        assert_eq!(tree.node(chain[3]).name(), "manager.py");
        assert_eq!(tree.node(chain[3]).parent(), Some(chain[2]));
    }

    #[test]
    fn resolve_is_idempotent() {
        let mut tree = PathTree::new();
        let first = tree.resolve_path("a/nova/api.py", 1);
        let count = tree.len();
        let second = tree.resolve_path("a/nova/api.py", 1);
        assert_eq!(first, second);
        assert_eq!(tree.len(), count);
    }

    #[test]
    fn sibling_paths_share_ancestors() {
        let mut tree = PathTree::new();
        let x = tree.resolve_path("nova/x.py", 0);
        let y = tree.resolve_path("nova/y.py", 0);
        assert_eq!(x[..2], y[..2]);
        assert_ne!(x[2], y[2]);
        let names: Vec<&str> = tree.node(x[1]).children().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["x.py", "y.py"]);
    }

    #[test]
    fn pruning_everything_resolves_to_root() {
        let mut tree = PathTree::new();
        assert_eq!(tree.resolve_path("README", 1), vec![tree.root()]);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn find_locates_existing_nodes_only() {
        let mut tree = PathTree::new();
        let chain = tree.resolve_path("nova/api.py", 0);
        assert_eq!(tree.find(""), Some(tree.root()));
        assert_eq!(tree.find("/"), Some(tree.root()));
        assert_eq!(tree.find("nova"), Some(chain[1]));
        assert_eq!(tree.find("/nova/api.py"), Some(chain[2]));
        assert_eq!(tree.find("nova/missing.py"), None);
    }

    #[test]
    fn baseline_rolls_up_to_every_ancestor() {
        let mut tree = PathTree::new();
        tree.add_baseline("nova/api.py", 10, 0);
        tree.add_baseline("nova/compute/manager.py", 30, 0);
        tree.add_baseline("setup.py", 5, 0);

        assert_eq!(tree.node(tree.root()).lines, 45);
        assert_eq!(tree.node(tree.find("nova").unwrap()).lines, 40);
        assert_eq!(tree.node(tree.find("nova/compute").unwrap()).lines, 30);

        for (_, node) in tree.iter() {
            if node.is_leaf() {
                continue;
            }
            let children: u64 = node.children().map(|(_, id)| tree.node(id).lines).sum();
            assert_eq!(node.lines, children, "roll-up broken at {:?}", node.path());
        }
    }

    #[test]
    fn pruned_baseline_lands_beside_pruned_diff_paths() {
        let mut tree = PathTree::new();
        tree.add_baseline("nova/compute/manager.py", 30, 1);
        let chain = tree.resolve_path("a/nova/compute/manager.py", 2);
        assert_eq!(tree.node(chain[2]).path(), "/compute/manager.py");
        assert_eq!(tree.node(chain[2]).lines, 30);
        assert!(tree.find("nova").is_none());
    }

    #[test]
    fn open_stats_accumulate() {
        let mut stats = OpenStats::default();
        stats.add_churn(
            Churn {
                added: 3,
                removed: 1,
            },
            10,
        );
        stats.add_touch(10);
        assert_eq!(
            stats,
            OpenStats {
                touched: 1,
                age: 10,
                added: 3,
                removed: 1,
                age_weighted_added: 30,
                age_weighted_removed: 10,
            }
        );
    }

    #[test]
    fn merged_stats_accumulate() {
        let mut stats = MergedStats::default();
        stats.add_churn(
            Churn {
                added: 3,
                removed: 1,
            },
            50,
        );
        stats.add_touch(50);
        assert_eq!(
            stats,
            MergedStats {
                touched: 1,
                age: 50,
                changed: 4,
                age_weighted_changed: 200,
            }
        );
    }
}
