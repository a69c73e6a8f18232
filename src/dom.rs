//! Mutable HTML document tree.
//!
//! html5ever does the parsing; its reference-counted DOM is immediately
//! converted into a flat arena tree that the rest of the crate can query
//! and mutate without `Rc<RefCell>` plumbing. Serialization walks the
//! arena back into a string.
//!
//! The tree supports exactly what the optimizer needs: element lookup by
//! tag name in document order, attribute get/set, ancestor checks, and
//! replacing a node with a pre-rendered markup fragment (emitted verbatim
//! on serialization).
//!
//! Parsing is spec-tolerant — html5ever recovers from almost anything —
//! so the error path here only fires for input the decoder itself rejects.
//! Note that parsing normalizes: a bare fragment comes back wrapped in
//! `<html><head></head><body>…</body></html>`, exactly as a browser would
//! build it.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData as RcNodeData, RcDom};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum DomError {
    #[error("failed to parse HTML: {0}")]
    Parse(#[from] std::io::Error),
}

/// Handle to a node in a [`Document`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(usize);

#[derive(Debug)]
enum NodeData {
    Document,
    Doctype {
        name: String,
        public_id: String,
        system_id: String,
    },
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
    /// Pre-rendered markup emitted verbatim in place of a replaced node.
    Fragment(String),
}

#[derive(Debug)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// An HTML document as a flat arena of nodes; index 0 is the document
/// root.
#[derive(Debug)]
pub struct Document {
    nodes: Vec<Node>,
}

/// Elements with no closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Elements whose text children serialize unescaped.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

impl Document {
    /// Parse an HTML string.
    pub fn parse(html: &str) -> Result<Self, DomError> {
        let rcdom = parse_document(RcDom::default(), Default::default())
            .from_utf8()
            .read_from(&mut html.as_bytes())?;

        let mut document = Document {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
        };
        document.convert_children(&rcdom.document, NodeId(0));
        debug!(nodes = document.nodes.len(), "parsed HTML document");
        Ok(document)
    }

    fn convert_children(&mut self, handle: &Handle, parent: NodeId) {
        for child in handle.children.borrow().iter() {
            match &child.data {
                RcNodeData::Document => {}
                RcNodeData::Doctype {
                    name,
                    public_id,
                    system_id,
                } => {
                    self.append(
                        parent,
                        NodeData::Doctype {
                            name: name.to_string(),
                            public_id: public_id.to_string(),
                            system_id: system_id.to_string(),
                        },
                    );
                }
                RcNodeData::Text { contents } => {
                    self.append(parent, NodeData::Text(contents.borrow().to_string()));
                }
                RcNodeData::Comment { contents } => {
                    self.append(parent, NodeData::Comment(contents.to_string()));
                }
                RcNodeData::Element {
                    name,
                    attrs,
                    template_contents,
                    ..
                } => {
                    let attrs = attrs
                        .borrow()
                        .iter()
                        .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                        .collect();
                    let id = self.append(
                        parent,
                        NodeData::Element {
                            name: name.local.to_string(),
                            attrs,
                        },
                    );
                    if let Some(contents) = template_contents.borrow().as_ref() {
                        self.convert_children(contents, id);
                    }
                    self.convert_children(child, id);
                }
                RcNodeData::ProcessingInstruction { .. } => {}
            }
        }
    }

    fn append(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            data,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// All elements with the given tag name, in document order.
    pub fn elements(&self, tag: &str) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect_elements(NodeId(0), tag, &mut out);
        out
    }

    fn collect_elements(&self, id: NodeId, tag: &str, out: &mut Vec<NodeId>) {
        if let NodeData::Element { name, .. } = &self.nodes[id.0].data
            && name == tag
        {
            out.push(id);
        }
        for &child in &self.nodes[id.0].children {
            self.collect_elements(child, tag, out);
        }
    }

    /// Attribute value on an element node.
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id.0].data {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    /// Set (or add) an attribute on an element node.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes[id.0].data {
            match attrs.iter_mut().find(|(key, _)| key == name) {
                Some(entry) => entry.1 = value.to_string(),
                None => attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    /// Whether any ancestor of `id` is an element with the given tag.
    pub fn has_ancestor(&self, id: NodeId, tag: &str) -> bool {
        let mut current = self.nodes[id.0].parent;
        while let Some(ancestor) = current {
            if let NodeData::Element { name, .. } = &self.nodes[ancestor.0].data
                && name == tag
            {
                return true;
            }
            current = self.nodes[ancestor.0].parent;
        }
        false
    }

    /// Replace a node with pre-rendered markup, emitted verbatim on
    /// serialization. Returns `false` when the node has no parent (or was
    /// already detached), leaving the tree untouched.
    pub fn replace_with_fragment(&mut self, id: NodeId, markup: String) -> bool {
        let Some(parent) = self.nodes[id.0].parent else {
            return false;
        };
        let Some(position) = self.nodes[parent.0]
            .children
            .iter()
            .position(|&child| child == id)
        else {
            return false;
        };

        let fragment = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            data: NodeData::Fragment(markup),
        });
        self.nodes[parent.0].children[position] = fragment;
        self.nodes[id.0].parent = None;
        true
    }

    /// Serialize the document back to an HTML string.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        for &child in &self.nodes[0].children {
            self.write_node(child, &mut out, false);
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String, raw_text: bool) {
        match &self.nodes[id.0].data {
            NodeData::Document => {}
            NodeData::Doctype {
                name,
                public_id,
                system_id,
            } => {
                out.push_str("<!DOCTYPE ");
                out.push_str(name);
                if !public_id.is_empty() {
                    out.push_str(" PUBLIC \"");
                    out.push_str(public_id);
                    out.push_str("\" \"");
                    out.push_str(system_id);
                    out.push('"');
                } else if !system_id.is_empty() {
                    out.push_str(" SYSTEM \"");
                    out.push_str(system_id);
                    out.push('"');
                }
                out.push('>');
            }
            NodeData::Text(text) => {
                if raw_text {
                    out.push_str(text);
                } else {
                    escape_text_into(text, out);
                }
            }
            NodeData::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeData::Fragment(markup) => out.push_str(markup),
            NodeData::Element { name, attrs } => {
                out.push('<');
                out.push_str(name);
                for (key, value) in attrs {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');

                if VOID_ELEMENTS.contains(&name.as_str()) {
                    return;
                }
                let raw = RAW_TEXT_ELEMENTS.contains(&name.as_str());
                for &child in &self.nodes[id.0].children {
                    self.write_node(child, out, raw);
                }
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
        }
    }
}

/// Escape text content: `&`, `<`, `>`.
fn escape_text_into(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

/// Escape an attribute value: `&`, `<`, `>`, `"`, `'`.
pub(crate) fn escape_attr(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
