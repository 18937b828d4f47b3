//! Nested JSON rendering of a [`PathTree`].

use std::collections::BTreeMap;
use std::io::Write;

use heatmap_core::HeatmapError;
use serde::Serialize;

use crate::tree::{MergedStats, NodeId, OpenStats, PathTree};

/// Serializable view of one node and, recursively, its children.
///
/// # Examples
///
/// ```
/// use heatmap_gitpulse::export::document;
/// use heatmap_gitpulse::tree::PathTree;
///
/// let mut tree = PathTree::new();
/// tree.add_baseline("src/lib.rs", 12, 0);
///
/// let json = serde_json::to_value(document(&tree)).unwrap();
/// assert_eq!(json["path"], "/");
/// assert_eq!(json["children"]["src"]["children"]["lib.rs"]["stats"]["lines"], 12);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct NodeDocument<'a> {
    /// Final path segment.
    pub name: &'a str,
    /// Slash-joined path; `/` for the root.
    pub path: &'a str,
    /// Open-change statistics and the baseline line count.
    pub stats: StatsDocument,
    /// Merged-change statistics.
    pub merged: MergedStats,
    /// Children by name; absent for leaves.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<BTreeMap<&'a str, NodeDocument<'a>>>,
}

/// The `stats` object: open-change statistics plus `lines`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatsDocument {
    /// Open-change statistics.
    #[serde(flatten)]
    pub open: OpenStats,
    /// Lines under this path in the working tree.
    pub lines: u64,
}

/// Build the document for the whole tree.
pub fn document(tree: &PathTree) -> NodeDocument<'_> {
    node_document(tree, tree.root())
}

fn node_document(tree: &PathTree, id: NodeId) -> NodeDocument<'_> {
    let node = tree.node(id);
    let children = if node.is_leaf() {
        None
    } else {
        Some(
            node.children()
                .map(|(name, child)| (name, node_document(tree, child)))
                .collect(),
        )
    };

    NodeDocument {
        name: node.name(),
        path: if node.path().is_empty() {
            "/"
        } else {
            node.path()
        },
        stats: StatsDocument {
            open: node.open,
            lines: node.lines,
        },
        merged: node.merged,
        children,
    }
}

/// Render the tree as JSON text, indented when `pretty` is set.
///
/// # Errors
///
/// Returns [`HeatmapError::Serialization`] if encoding fails.
pub fn to_json_string(tree: &PathTree, pretty: bool) -> Result<String, HeatmapError> {
    let doc = document(tree);
    let json = if pretty {
        serde_json::to_string_pretty(&doc)?
    } else {
        serde_json::to_string(&doc)?
    };
    Ok(json)
}

/// Write the tree as JSON to `writer`, followed by a newline.
///
/// # Errors
///
/// Returns [`HeatmapError::Serialization`] or [`HeatmapError::Io`].
pub fn write_json<W: Write>(tree: &PathTree, mut writer: W, pretty: bool) -> Result<(), HeatmapError> {
    let doc = document(tree);
    if pretty {
        serde_json::to_writer_pretty(&mut writer, &doc)?;
    } else {
        serde_json::to_writer(&mut writer, &doc)?;
    }
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
