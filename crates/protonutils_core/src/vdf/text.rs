//! Text KeyValues grammar used by `config.vdf`, `localconfig.vdf`,
//! `loginusers.vdf` and app manifests.
//!
//! The parser is a single pass over the buffer. Whitespace and `//` comments
//! are captured as trivia and attached to the node that follows them, which
//! is what lets [`write_text`] reproduce the input byte for byte.

use tracing::debug;

use super::{Body, NodeData, NodeId, Token, Tree};
use crate::core_api::CoreError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub fn parse_text(bytes: &[u8]) -> Result<Tree, CoreError> {
    let mut parser = Parser {
        src: bytes,
        pos: 0,
        nodes: Vec::new(),
    };

    let leading = parser.trivia();
    match parser.peek() {
        None => return Err(CoreError::parse(parser.pos, "empty document")),
        Some(b'}') => return Err(CoreError::parse(parser.pos, "unexpected '}'")),
        Some(_) => {}
    }

    let root = parser.document(leading)?;
    let trailing = parser.trivia();
    if parser.pos < bytes.len() {
        return Err(CoreError::parse(
            parser.pos,
            "unexpected content after root node",
        ));
    }

    debug!(nodes = parser.nodes.len(), bytes = bytes.len(), "parsed text config");
    Ok(Tree::from_parts(parser.nodes, root, trailing))
}

pub fn write_text(tree: &Tree) -> Vec<u8> {
    enum Step {
        Node(NodeId),
        Close(NodeId),
    }

    let mut out = Vec::new();
    let mut pending = vec![Step::Node(tree.root_id())];
    while let Some(step) = pending.pop() {
        match step {
            Step::Node(id) => {
                let node = tree.data(id);
                out.extend_from_slice(&node.leading);
                out.extend_from_slice(&node.key.raw);
                match &node.body {
                    Body::Leaf { separator, value } => {
                        out.extend_from_slice(separator);
                        out.extend_from_slice(&value.raw);
                    }
                    Body::Interior { open, children, .. } => {
                        out.extend_from_slice(open);
                        out.push(b'{');
                        pending.push(Step::Close(id));
                        pending.extend(children.iter().rev().map(|&child| Step::Node(child)));
                    }
                }
            }
            Step::Close(id) => {
                if let Body::Interior { close, .. } = &tree.data(id).body {
                    out.extend_from_slice(close);
                }
                out.push(b'}');
            }
        }
    }
    out.extend_from_slice(tree.trailing());
    out
}

/// Outcome of reading one key and what follows it.
enum Element {
    Leaf(NodeId),
    /// A block whose `{` sits at the given offset; its children follow.
    Block(NodeId, usize),
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
    nodes: Vec<NodeData>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn trivia(&mut self) -> Vec<u8> {
        let start = self.pos;
        if self.pos == 0 && self.src.starts_with(UTF8_BOM) {
            self.pos = UTF8_BOM.len();
        }
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'/') if self.src.get(self.pos + 1) == Some(&b'/') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
        self.src[start..self.pos].to_vec()
    }

    /// Reads the root element and everything below it. Open blocks are kept
    /// on an explicit stack, so nesting depth is limited only by memory.
    fn document(&mut self, leading: Vec<u8>) -> Result<NodeId, CoreError> {
        let (root, open_offset) = match self.element(leading, None)? {
            Element::Leaf(id) => return Ok(id),
            Element::Block(id, offset) => (id, offset),
        };

        let mut open = vec![(root, open_offset)];
        while let Some(&(block, open_offset)) = open.last() {
            let trivia = self.trivia();
            match self.peek() {
                None => {
                    return Err(CoreError::parse(
                        open_offset,
                        "unbalanced braces: block is never closed",
                    ));
                }
                Some(b'}') => {
                    self.pos += 1;
                    if let Body::Interior { close, .. } = &mut self.nodes[block.0].body {
                        *close = trivia;
                    }
                    open.pop();
                }
                Some(_) => {
                    let child = match self.element(trivia, Some(block))? {
                        Element::Leaf(id) => id,
                        Element::Block(id, offset) => {
                            open.push((id, offset));
                            id
                        }
                    };
                    if let Body::Interior { children, .. } = &mut self.nodes[block.0].body {
                        children.push(child);
                    }
                }
            }
        }
        Ok(root)
    }

    /// Reads a key and either its value or the `{` opening its block.
    fn element(&mut self, leading: Vec<u8>, parent: Option<NodeId>) -> Result<Element, CoreError> {
        let key = self.token()?;
        let after_key = self.trivia();

        match self.peek() {
            None => Err(CoreError::parse(
                self.pos,
                format!("expected value or '{{' after key \"{}\"", key.text),
            )),
            Some(b'}') => Err(CoreError::parse(
                self.pos,
                format!("unexpected '}}' after key \"{}\"", key.text),
            )),
            Some(b'{') => {
                let open_offset = self.pos;
                self.pos += 1;
                let id = self.push(NodeData {
                    leading,
                    key,
                    body: Body::Interior {
                        open: after_key,
                        children: Vec::new(),
                        close: Vec::new(),
                    },
                    parent,
                });
                Ok(Element::Block(id, open_offset))
            }
            Some(_) => {
                let value = self.token()?;
                Ok(Element::Leaf(self.push(NodeData {
                    leading,
                    key,
                    body: Body::Leaf {
                        separator: after_key,
                        value,
                    },
                    parent,
                })))
            }
        }
    }

    fn push(&mut self, node: NodeData) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn token(&mut self) -> Result<Token, CoreError> {
        let start = self.pos;
        match self.peek() {
            None => Err(CoreError::parse(start, "unexpected end of input")),
            Some(b'{') => Err(CoreError::parse(start, "expected key, found '{'")),
            Some(b'}') => Err(CoreError::parse(start, "expected key, found '}'")),
            Some(b'"') => self.quoted(start),
            Some(_) => {
                while let Some(b) = self.peek() {
                    if b.is_ascii_whitespace() || matches!(b, b'"' | b'{' | b'}') {
                        break;
                    }
                    self.pos += 1;
                }
                let raw = self.src[start..self.pos].to_vec();
                Ok(Token {
                    text: String::from_utf8_lossy(&raw).into_owned(),
                    raw,
                })
            }
        }
    }

    fn quoted(&mut self, start: usize) -> Result<Token, CoreError> {
        self.pos += 1;
        let mut text = Vec::new();
        loop {
            match self.peek() {
                None => return Err(CoreError::parse(start, "unterminated string")),
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    let Some(&escaped) = self.src.get(self.pos + 1) else {
                        return Err(CoreError::parse(start, "unterminated string"));
                    };
                    match escaped {
                        b'n' => text.push(b'\n'),
                        b't' => text.push(b'\t'),
                        b'r' => text.push(b'\r'),
                        b'\\' | b'"' => text.push(escaped),
                        other => text.extend_from_slice(&[b'\\', other]),
                    }
                    self.pos += 2;
                }
                Some(b) => {
                    text.push(b);
                    self.pos += 1;
                }
            }
        }
        Ok(Token {
            text: String::from_utf8_lossy(&text).into_owned(),
            raw: self.src[start..self.pos].to_vec(),
        })
    }
}
