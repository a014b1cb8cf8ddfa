//! Immutable tree snapshots and node lookup

use std::fmt;
use std::rc::Rc;

use regex::Regex;

use super::{Node, Value};
use crate::constants::tree::CLASS_PROP;
use crate::error::{HarnessError, Result};
use crate::renderer::TargetId;

/// Child-index path from the root to a node (empty = root)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("/")?;
        let parts: Vec<String> = self.0.iter().map(usize::to_string).collect();
        f.write_str(&parts.join("/"))
    }
}

/// Rendered instance: the settled output of one render of a mounted component
///
/// Each re-render produces a new `RenderedTree`; existing ones never change,
/// so an old tree can be kept around and compared against a newer one.
#[derive(Debug, Clone)]
pub struct RenderedTree {
    root: Rc<Node>,
    target: TargetId,
    revision: u64,
}

impl RenderedTree {
    pub(crate) fn new(root: Node, target: TargetId, revision: u64) -> Self {
        Self {
            root: Rc::new(root),
            target,
            revision,
        }
    }

    /// Target this tree was rendered into
    pub fn target(&self) -> TargetId {
        self.target
    }

    /// Render count of the instance when this tree was produced (1 = first render)
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn node(&self) -> &Node {
        &self.root
    }

    pub fn root(&self) -> NodeRef {
        NodeRef {
            tree: self.clone(),
            path: NodePath::root(),
        }
    }

    pub fn node_at(&self, path: &NodePath) -> Option<&Node> {
        let mut node: &Node = &self.root;
        for &index in path.indices() {
            node = node.children().get(index)?;
        }
        Some(node)
    }

    /// Every node satisfying `pred`, in pre-order
    pub fn find_all(&self, pred: impl Fn(&Node) -> bool) -> Vec<NodeRef> {
        let mut paths = Vec::new();
        collect(&self.root, NodePath::root(), &pred, &mut paths);
        paths
            .into_iter()
            .map(|path| NodeRef {
                tree: self.clone(),
                path,
            })
            .collect()
    }

    /// The single node satisfying `pred`
    ///
    /// `description` names the query in the error when zero or several
    /// nodes match.
    pub fn find(&self, description: &str, pred: impl Fn(&Node) -> bool) -> Result<NodeRef> {
        let mut matches = self.find_all(pred);
        match matches.len() {
            0 => Err(HarnessError::NodeNotFound(description.to_string())),
            1 => Ok(matches.remove(0)),
            count => Err(HarnessError::AmbiguousQuery {
                query: description.to_string(),
                count,
            }),
        }
    }

    pub fn find_by_type(&self, tag: &str) -> Result<NodeRef> {
        self.find(&format!("type <{tag}>"), |n| n.tag() == tag)
    }

    pub fn find_all_by_type(&self, tag: &str) -> Vec<NodeRef> {
        self.find_all(|n| n.tag() == tag)
    }

    pub fn find_by_prop(&self, key: &str, value: impl Into<Value>) -> Result<NodeRef> {
        let value = value.into();
        self.find(&format!("prop {key}={value:?}"), |n| {
            n.props().get(key) == Some(&value)
        })
    }

    /// Elements whose own text children match `pattern`
    pub fn find_by_text(&self, pattern: &Regex) -> Vec<NodeRef> {
        self.find_all(|n| {
            !n.is_text()
                && n.children()
                    .iter()
                    .filter_map(Node::as_text)
                    .any(|t| pattern.is_match(t))
        })
    }

    pub fn text_content(&self) -> String {
        self.root.text_content()
    }

    /// Canonical serialization of the whole tree
    pub fn to_canonical(&self) -> String {
        super::serialize::to_canonical(&self.root)
    }
}

fn collect(node: &Node, path: NodePath, pred: &dyn Fn(&Node) -> bool, out: &mut Vec<NodePath>) {
    if pred(node) {
        out.push(path.clone());
    }
    for (index, child) in node.children().iter().enumerate() {
        collect(child, path.child(index), pred, out);
    }
}

/// Handle to one node inside a [`RenderedTree`]
#[derive(Debug, Clone)]
pub struct NodeRef {
    tree: RenderedTree,
    path: NodePath,
}

impl NodeRef {
    pub fn tree(&self) -> &RenderedTree {
        &self.tree
    }

    pub fn path(&self) -> &NodePath {
        &self.path
    }

    pub fn node(&self) -> &Node {
        // Paths are only ever built by walking this same immutable tree.
        self.tree
            .node_at(&self.path)
            .unwrap_or_else(|| self.tree.node())
    }

    pub fn tag(&self) -> &str {
        self.node().tag()
    }

    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.node().props().get(key)
    }

    pub fn text_content(&self) -> String {
        self.node().text_content()
    }

    /// Whether the whitespace-separated `className` contains `class`
    pub fn has_class(&self, class: &str) -> bool {
        self.prop(CLASS_PROP)
            .and_then(Value::as_str)
            .is_some_and(|names| names.split_whitespace().any(|c| c == class))
    }

    pub fn children(&self) -> Vec<NodeRef> {
        (0..self.node().children().len())
            .map(|index| NodeRef {
                tree: self.tree.clone(),
                path: self.path.child(index),
            })
            .collect()
    }

    pub fn parent(&self) -> Option<NodeRef> {
        self.path.parent().map(|path| NodeRef {
            tree: self.tree.clone(),
            path,
        })
    }

    /// This node followed by its ancestors up to the root
    pub fn ancestors(&self) -> Vec<NodeRef> {
        let mut chain = vec![self.clone()];
        let mut current = self.parent();
        while let Some(node) = current {
            current = node.parent();
            chain.push(node);
        }
        chain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RenderedTree {
        let root = Node::element("div")
            .prop("className", "btn-group primary")
            .child(Node::element("button").prop("id", "ok").with_text("OK"))
            .child(
                Node::element("span")
                    .child(Node::element("button").prop("id", "cancel").with_text("Cancel")),
            );
        RenderedTree::new(root, TargetId::new_for_test(1), 1)
    }

    #[test]
    fn test_find_all_is_pre_order() {
        let tree = sample();
        let ids: Vec<_> = tree
            .find_all_by_type("button")
            .iter()
            .map(|n| n.prop("id").and_then(Value::as_str).unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["ok", "cancel"]);
    }

    #[test]
    fn test_find_by_type_requires_exactly_one() {
        let tree = sample();
        assert!(matches!(
            tree.find_by_type("button"),
            Err(HarnessError::AmbiguousQuery { count: 2, .. })
        ));
        assert!(matches!(
            tree.find_by_type("table"),
            Err(HarnessError::NodeNotFound(_))
        ));
        assert_eq!(tree.find_by_type("span").unwrap().path().indices(), &[1]);
    }

    #[test]
    fn test_has_class_matches_tokens() {
        let root = sample().root();
        assert!(root.has_class("btn-group"));
        assert!(root.has_class("primary"));
        assert!(!root.has_class("btn"));
    }

    #[test]
    fn test_ancestors_walk_to_root() {
        let tree = sample();
        let cancel = tree.find_by_prop("id", "cancel").unwrap();
        let tags: Vec<_> = cancel.ancestors().iter().map(|n| n.tag().to_string()).collect();
        assert_eq!(tags, vec!["button", "span", "div"]);
    }

    #[test]
    fn test_find_by_text() {
        let tree = sample();
        let re = Regex::new("^Canc").unwrap();
        let found = tree.find_by_text(&re);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].tag(), "button");
    }

    #[test]
    fn test_node_path_display() {
        assert_eq!(NodePath::root().to_string(), "/");
        assert_eq!(NodePath::root().child(1).child(0).to_string(), "/1/0");
    }
}
