use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use crate::span::{SourceSpan, SOURCE_END_ATTR, SOURCE_START_ATTR};

/// Node name reported for text nodes.
pub const TEXT_NODE_NAME: &str = "#text";

const ROOT_NAME: &str = "#fragment";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Index of a node inside an [`HtmlTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Payload of a tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element {
        tag: String,
        /// Attributes keyed by name; ordering differences between renderers disappear here.
        attributes: BTreeMap<String, String>,
    },
    Text(String),
}

impl NodeData {
    pub fn element(tag: impl Into<String>) -> Self {
        Self::Element {
            tag: tag.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
    processed: bool,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Self {
            data,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            processed: false,
        }
    }
}

/// Arena-backed HTML tree.
///
/// Nodes are addressed by [`NodeId`] and never freed; detached nodes simply become
/// unreachable from the root. All traversals use explicit stacks so document depth is
/// bounded only by memory.
#[derive(Debug, Clone)]
pub struct HtmlTree {
    nodes: Vec<Node>,
}

impl Default for HtmlTree {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlTree {
    /// Create a tree holding only the synthetic fragment root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeData::element(ROOT_NAME))],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of allocated nodes, detached ones included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// True when the fragment root has no children.
    pub fn is_empty(&self) -> bool {
        self.nodes[0].first_child.is_none()
    }

    /// Append a new node as the last child of `parent`.
    pub fn append_child(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = self.alloc(data);
        let previous_last = self.nodes[parent.0].last_child;
        {
            let node = &mut self.nodes[id.0];
            node.parent = Some(parent);
            node.prev_sibling = previous_last;
        }
        match previous_last {
            Some(last) => self.nodes[last.0].next_sibling = Some(id),
            None => self.nodes[parent.0].first_child = Some(id),
        }
        self.nodes[parent.0].last_child = Some(id);
        id
    }

    /// Insert a new node as the first child of `parent`.
    pub fn prepend_child(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = self.alloc(data);
        let previous_first = self.nodes[parent.0].first_child;
        {
            let node = &mut self.nodes[id.0];
            node.parent = Some(parent);
            node.next_sibling = previous_first;
        }
        match previous_first {
            Some(first) => self.nodes[first.0].prev_sibling = Some(id),
            None => self.nodes[parent.0].last_child = Some(id),
        }
        self.nodes[parent.0].first_child = Some(id);
        id
    }

    /// Detach every child of `parent`.
    pub fn clear_children(&mut self, parent: NodeId) {
        let mut current = self.nodes[parent.0].first_child.take();
        self.nodes[parent.0].last_child = None;
        while let Some(id) = current {
            let node = &mut self.nodes[id.0];
            current = node.next_sibling.take();
            node.parent = None;
            node.prev_sibling = None;
        }
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0].data
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].first_child
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].next_sibling
    }

    /// Iterate the direct children of `id` in document order.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.first_child(id),
        }
    }

    pub fn is_text(&self, id: NodeId) -> bool {
        matches!(self.data(id), NodeData::Text(_))
    }

    /// Tag name for elements, [`TEXT_NODE_NAME`] for text.
    pub fn node_name(&self, id: NodeId) -> &str {
        match self.data(id) {
            NodeData::Element { tag, .. } => tag,
            NodeData::Text(_) => TEXT_NODE_NAME,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.data(id) {
            NodeData::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            NodeData::Text(_) => None,
        }
    }

    pub fn attributes(&self, id: NodeId) -> Option<&BTreeMap<String, String>> {
        match self.data(id) {
            NodeData::Element { attributes, .. } => Some(attributes),
            NodeData::Text(_) => None,
        }
    }

    /// Set an attribute on an element. Text nodes are left untouched.
    pub fn set_attr(&mut self, id: NodeId, name: impl Into<String>, value: impl Into<String>) {
        if let NodeData::Element { attributes, .. } = &mut self.nodes[id.0].data {
            attributes.insert(name.into(), value.into());
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            NodeData::Text(text) => Some(text),
            NodeData::Element { .. } => None,
        }
    }

    /// Replace the content of a text node. Elements are left untouched.
    pub fn set_text(&mut self, id: NodeId, value: impl Into<String>) {
        if let NodeData::Text(text) = &mut self.nodes[id.0].data {
            *text = value.into();
        }
    }

    pub fn is_processed(&self, id: NodeId) -> bool {
        self.nodes[id.0].processed
    }

    pub fn mark_processed(&mut self, id: NodeId) {
        self.nodes[id.0].processed = true;
    }

    /// Line provenance injected by the legacy renderer, if present and well-formed.
    pub fn source_span(&self, id: NodeId) -> Option<SourceSpan> {
        SourceSpan::from_attributes(
            self.attr(id, SOURCE_START_ATTR),
            self.attr(id, SOURCE_END_ATTR),
        )
    }

    /// Concatenated text content of `id` and its descendants.
    pub fn inner_text(&self, id: NodeId) -> String {
        let mut out = String::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let NodeData::Text(text) = self.data(current) {
                out.push_str(text);
                continue;
            }
            let children: Vec<NodeId> = self.children(current).collect();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Markup of the children of `id`; the text itself for text nodes.
    pub fn inner_html(&self, id: NodeId) -> String {
        if let NodeData::Text(text) = self.data(id) {
            return text.clone();
        }
        let mut out = String::new();
        for child in self.children(id) {
            self.write_markup(child, &mut out);
        }
        out
    }

    /// Markup of `id` including its own tag.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_markup(id, &mut out);
        out
    }

    fn write_markup(&self, id: NodeId, out: &mut String) {
        enum Step {
            Open(NodeId),
            Close(NodeId),
        }

        let mut stack = vec![Step::Open(id)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Open(current) => match self.data(current) {
                    NodeData::Text(text) => out.push_str(&htmlize::escape_text(text.as_str())),
                    NodeData::Element { tag, attributes } => {
                        out.push('<');
                        out.push_str(tag);
                        for (key, value) in attributes {
                            out.push(' ');
                            out.push_str(key);
                            out.push_str("=\"");
                            out.push_str(&htmlize::escape_attribute(value.as_str()));
                            out.push('"');
                        }
                        if self.first_child(current).is_none()
                            && VOID_ELEMENTS.contains(&tag.as_str())
                        {
                            out.push_str("/>");
                            continue;
                        }
                        out.push('>');
                        stack.push(Step::Close(current));
                        let children: Vec<NodeId> = self.children(current).collect();
                        stack.extend(children.into_iter().rev().map(Step::Open));
                    }
                },
                Step::Close(current) => {
                    out.push_str("</");
                    out.push_str(self.node_name(current));
                    out.push('>');
                }
            }
        }
    }

    fn alloc(&mut self, data: NodeData) -> NodeId {
        self.nodes.push(Node::new(data));
        NodeId(self.nodes.len() - 1)
    }
}

impl Display for HtmlTree {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner_html(self.root()))
    }
}

/// Iterator over the direct children of a node.
pub struct Children<'a> {
    tree: &'a HtmlTree,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.tree.next_sibling(current);
        Some(current)
    }
}
