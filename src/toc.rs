//! Library table of contents: build a tree from the flat node list the
//! content API returns, then walk it for paths and reading order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// One node as returned by the content API, linked to its parent by ID.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FlatNode {
    /// Node identifier within the work.
    pub id: String,
    /// Whether this node holds readable content.
    #[serde(default)]
    pub is_leaf: bool,
    /// Short label such as `Ch. 3`.
    #[serde(default)]
    pub label: Option<String>,
    /// Node type such as `book`, `part`, or `chapter`.
    #[serde(default)]
    pub node_type: String,
    /// Sort key among siblings.
    #[serde(default)]
    pub order: i64,
    /// Parent node ID, absent for the root.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Display title.
    #[serde(default)]
    pub title: String,
}

/// A node of the table-of-contents tree. Each node owns its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocNode {
    /// Child nodes, sorted by `order`.
    pub children: Vec<TocNode>,
    /// Node identifier within the work.
    pub id: String,
    /// Whether this node holds readable content.
    pub is_leaf: bool,
    /// Short label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Node type.
    pub node_type: String,
    /// Sort key among siblings.
    pub order: i64,
    /// Display title.
    pub title: String,
}

impl TocNode {
    /// Depth-first leaf collection into `out`. Stops at the first leaf on each branch.
    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Self>) {
        if self.is_leaf {
            out.push(self);
            return;
        }
        for child in &self.children {
            child.collect_leaves(out);
        }
    }

    /// Nodes from the root down to `node_id`, inclusive.
    pub fn find_path(&self, node_id: &str) -> Option<Vec<&Self>> {
        if self.id == node_id {
            return Some(vec![self]);
        }
        for child in &self.children {
            if let Some(mut path) = child.find_path(node_id) {
                path.insert(0, self);
                return Some(path);
            }
        }
        return None;
    }

    /// Leaf nodes in reading order (depth-first, children by `order`).
    /// Sections without content are never reading stops, even when empty.
    pub fn flatten_leaves(&self) -> Vec<&Self> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        return leaves;
    }

    /// Build the tree from a flat node list.
    ///
    /// The root is the node without a parent. When several nodes lack a parent,
    /// the one with the lowest `order` is chosen; with none, the first node of
    /// type `book` is. Nodes unreachable from the root are dropped.
    ///
    /// # Errors
    ///
    /// Returns `Error::TocMalformed` if the list is empty, no root can be
    /// chosen, or a parent cycle is found.
    pub fn from_flat(nodes: Vec<FlatNode>) -> Result<Self, Error> {
        if nodes.is_empty() {
            return Err(malformed("no nodes"));
        }

        let parentless: Vec<&FlatNode> = nodes.iter().filter(|n| return n.parent_id.is_none()).collect();
        if parentless.len() > 1 {
            tracing::warn!(roots = parentless.len(), "several parentless TOC nodes, using the first by order");
        }
        let root_id = parentless
            .iter()
            .copied()
            .min_by_key(|n| return n.order)
            .or_else(|| return nodes.iter().find(|n| return n.node_type == "book"))
            .map(|n| return n.id.clone())
            .ok_or_else(|| return malformed("no parentless node and no node of type `book`"))?;

        let mut children_by_parent: BTreeMap<String, Vec<FlatNode>> = BTreeMap::new();
        let mut root = None;
        for node in nodes {
            if node.id == root_id && root.is_none() {
                root = Some(node);
            } else if let Some(parent) = node.parent_id.clone() {
                children_by_parent.entry(parent).or_default().push(node);
            }
        }
        for siblings in children_by_parent.values_mut() {
            siblings.sort_by_key(|n| return n.order);
        }

        let root = root.ok_or_else(|| return malformed("root node vanished"))?;
        let total: usize = children_by_parent.values().map(Vec::len).sum();
        let tree = build(root, &mut children_by_parent, 0, total)?;

        let orphans: usize = children_by_parent.values().map(Vec::len).sum();
        if orphans > 0 {
            tracing::warn!(orphans, "dropping TOC nodes unreachable from the root");
        }
        return Ok(tree);
    }

    /// Previous and next leaf around `node_id` in reading order.
    /// Both are `None` when `node_id` is not a leaf of this tree.
    pub fn neighbors(&self, node_id: &str) -> (Option<&Self>, Option<&Self>) {
        let leaves = self.flatten_leaves();
        let Some(index) = leaves.iter().position(|n| return n.id == node_id) else {
            return (None, None);
        };
        let prev = index.checked_sub(1).and_then(|i| return leaves.get(i)).copied();
        let next = leaves.get(index.saturating_add(1)).copied();
        return (prev, next);
    }
}

/// Attach children recursively. `depth` bounds recursion so a parent cycle
/// cannot loop forever.
fn build(
    node: FlatNode,
    children_by_parent: &mut BTreeMap<String, Vec<FlatNode>>,
    depth: usize,
    limit: usize,
) -> Result<TocNode, Error> {
    if depth > limit {
        return Err(malformed("parent cycle"));
    }
    let children = children_by_parent
        .remove(&node.id)
        .unwrap_or_default()
        .into_iter()
        .map(|child| return build(child, children_by_parent, depth.saturating_add(1), limit))
        .collect::<Result<Vec<_>, _>>()?;

    return Ok(TocNode {
        children,
        id: node.id,
        is_leaf: node.is_leaf,
        label: node.label,
        node_type: node.node_type,
        order: node.order,
        title: node.title,
    });
}

/// Build a `TocMalformed` error.
fn malformed(reason: &str) -> Error {
    return Error::TocMalformed {
        reason: reason.to_string(),
    };
}
