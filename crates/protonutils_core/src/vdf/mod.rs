//! In-memory KeyValues tree shared by the text and binary readers.
//!
//! Nodes live in an arena owned by [`Tree`] and refer to each other by
//! [`NodeId`]. Every node keeps the raw bytes it was parsed from, so a tree
//! that was not modified writes back exactly the bytes it was read from.

pub mod binary;
pub mod path;
pub mod text;

use std::fmt;

pub use binary::{INNER_OFFSET_SHORTCUTS, ShortcutEntry, ShortcutsView, parse_binary_shortcuts};
pub use path::{lookup, lookup_from};
pub use text::parse_text;

const DEFAULT_SEPARATOR: &[u8] = b"\t\t";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A key or value as it appears in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub(crate) text: String,
    pub(crate) raw: Vec<u8>,
}

impl Token {
    pub(crate) fn quoted(text: &str) -> Self {
        let mut raw = Vec::with_capacity(text.len() + 2);
        raw.push(b'"');
        for b in text.bytes() {
            if b == b'"' || b == b'\\' {
                raw.push(b'\\');
            }
            raw.push(b);
        }
        raw.push(b'"');
        Self {
            text: text.to_string(),
            raw,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Body {
    Leaf {
        separator: Vec<u8>,
        value: Token,
    },
    Interior {
        /// Trivia between the key and `{`.
        open: Vec<u8>,
        children: Vec<NodeId>,
        /// Trivia between the last child and `}`.
        close: Vec<u8>,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct NodeData {
    pub(crate) leading: Vec<u8>,
    pub(crate) key: Token,
    pub(crate) body: Body,
    pub(crate) parent: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<NodeData>,
    root: NodeId,
    trailing: Vec<u8>,
}

impl Tree {
    pub(crate) fn from_parts(nodes: Vec<NodeData>, root: NodeId, trailing: Vec<u8>) -> Self {
        Self {
            nodes,
            root,
            trailing,
        }
    }

    /// An empty tree holding a single interior root.
    pub fn with_root(name: &str) -> Self {
        let root = NodeData {
            leading: Vec::new(),
            key: Token::quoted(name),
            body: Body::Interior {
                open: b"\n".to_vec(),
                children: Vec::new(),
                close: b"\n".to_vec(),
            },
            parent: None,
        };
        Self::from_parts(vec![root], NodeId(0), b"\n".to_vec())
    }

    pub fn root(&self) -> NodeRef<'_> {
        self.node(self.root)
    }

    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { tree: self, id }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        text::write_text(self)
    }

    pub(crate) fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.0]
    }

    pub(crate) fn root_id(&self) -> NodeId {
        self.root
    }

    pub(crate) fn trailing(&self) -> &[u8] {
        &self.trailing
    }

    fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut cursor = self.data(id).parent;
        while let Some(parent) = cursor {
            depth += 1;
            cursor = self.data(parent).parent;
        }
        depth
    }

    /// Replaces the value of a leaf. Returns false for interior nodes.
    pub(crate) fn set_value(&mut self, id: NodeId, value: &str) -> bool {
        match &mut self.data_mut(id).body {
            Body::Leaf { value: current, .. } => {
                if current.text != value {
                    *current = Token::quoted(value);
                }
                true
            }
            Body::Interior { .. } => false,
        }
    }

    pub(crate) fn append_leaf(&mut self, parent: NodeId, key: &str, value: &str) -> Option<NodeId> {
        let separator = self.sibling_separator(parent);
        self.append_child(
            parent,
            key,
            Body::Leaf {
                separator,
                value: Token::quoted(value),
            },
        )
    }

    pub(crate) fn append_interior(&mut self, parent: NodeId, key: &str) -> Option<NodeId> {
        let break_line = [b"\n".as_slice(), &indent(self.depth(parent) + 1)].concat();
        self.append_child(
            parent,
            key,
            Body::Interior {
                open: break_line.clone(),
                children: Vec::new(),
                close: break_line,
            },
        )
    }

    /// Detaches `child` from `parent`. The arena slot stays allocated but is
    /// no longer reachable from the root.
    pub(crate) fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let Body::Interior { children, .. } = &mut self.data_mut(parent).body else {
            return false;
        };
        let Some(index) = children.iter().position(|&c| c == child) else {
            return false;
        };
        children.remove(index);
        self.data_mut(child).parent = None;
        true
    }

    fn append_child(&mut self, parent: NodeId, key: &str, body: Body) -> Option<NodeId> {
        let depth = self.depth(parent);
        let leading = self.sibling_leading(parent, depth + 1)?;
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            leading,
            key: Token::quoted(key),
            body,
            parent: Some(parent),
        });

        let Body::Interior { children, close, .. } = &mut self.data_mut(parent).body else {
            return None;
        };
        if children.is_empty() && !close.contains(&b'\n') {
            *close = [b"\n".as_slice(), &indent(depth)].concat();
        }
        children.push(id);
        Some(id)
    }

    /// Leading trivia for a new child, copied from the line layout of the
    /// last existing child when there is one.
    fn sibling_leading(&self, parent: NodeId, depth: usize) -> Option<Vec<u8>> {
        let Body::Interior { children, .. } = &self.data(parent).body else {
            return None;
        };
        let fallback = [b"\n".as_slice(), &indent(depth)].concat();
        let Some(&last) = children.last() else {
            return Some(fallback);
        };
        let leading = &self.data(last).leading;
        let layout = match leading.iter().rposition(|&b| b == b'\n') {
            Some(pos) => [b"\n".as_slice(), &leading[pos + 1..]].concat(),
            None => leading.clone(),
        };
        if layout.is_empty() || !layout.iter().all(u8::is_ascii_whitespace) {
            return Some(fallback);
        }
        Some(layout)
    }

    fn sibling_separator(&self, parent: NodeId) -> Vec<u8> {
        self.node(parent)
            .children()
            .find_map(|child| match &self.data(child.id).body {
                Body::Leaf { separator, .. } if separator.iter().all(u8::is_ascii_whitespace) => {
                    Some(separator.clone())
                }
                _ => None,
            })
            .unwrap_or_else(|| DEFAULT_SEPARATOR.to_vec())
    }
}

fn indent(depth: usize) -> Vec<u8> {
    vec![b'\t'; depth]
}

/// Borrowed view of one node.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a Tree,
    id: NodeId,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &'a str {
        &self.tree.data(self.id).key.text
    }

    pub fn value(&self) -> Option<&'a str> {
        match &self.tree.data(self.id).body {
            Body::Leaf { value, .. } => Some(&value.text),
            Body::Interior { .. } => None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.tree.data(self.id).body, Body::Leaf { .. })
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        let children: &'a [NodeId] = match &tree.data(self.id).body {
            Body::Interior { children, .. } => children,
            Body::Leaf { .. } => &[],
        };
        children.iter().map(move |&id| NodeRef { tree, id })
    }

    /// First direct child with the given name.
    pub fn child(&self, name: &str) -> Option<NodeRef<'a>> {
        self.children().find(|child| child.name() == name)
    }

    /// Value of the first direct child leaf with the given name.
    pub fn field(&self, name: &str) -> Option<&'a str> {
        self.children()
            .filter(|child| child.name() == name)
            .find_map(|child| child.value())
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.tree
            .data(self.id)
            .parent
            .map(|id| NodeRef { tree: self.tree, id })
    }

    /// Names from the root down to this node, joined with `/`.
    pub fn path(&self) -> String {
        let mut names = vec![self.name()];
        let mut cursor = self.parent();
        while let Some(node) = cursor {
            names.push(node.name());
            cursor = node.parent();
        }
        names.reverse();
        names.join("/")
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("path", &self.path())
            .field("value", &self.value())
            .finish()
    }
}
