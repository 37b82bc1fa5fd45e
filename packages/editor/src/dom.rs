//! # Page Tree
//!
//! Arena-backed element tree for a rendered page.
//!
//! The editor never re-renders a page; it receives the tree the static-site
//! renderer produced and mutates it in place. Captured fragments are restored
//! as [`Node::Raw`] spans so that a capture → restore round trip reproduces
//! the serialized markup byte for byte.

use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Handle into a [`Dom`] arena. Stable for the lifetime of the tree;
/// detaching a node does not invalidate other handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

/// Node payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element {
        tag: String,
        attributes: BTreeMap<String, String>,
        classes: Vec<String>,
    },
    Text(String),
    /// Verbatim markup, emitted untouched by the serializer.
    Raw(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    node: Node,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// One rendered document.
#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<NodeData>,
    root: NodeId,
}

/// Tags serialized without a closing tag.
const VOID_TAGS: &[&str] = &["img", "hr", "br", "input", "meta", "link"];

impl Dom {
    /// Create a document with a root element of the given tag.
    pub fn new(root_tag: impl Into<String>) -> Self {
        let mut dom = Dom {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        let root = dom.create_element(root_tag);
        dom.root = root;
        dom
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        self.push(Node::Element {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            classes: Vec::new(),
        })
    }

    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.push(Node::Text(content.into()))
    }

    pub fn create_raw(&mut self, markup: impl Into<String>) -> NodeId {
        self.push(Node::Raw(markup.into()))
    }

    fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            node,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0].node
    }

    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].node {
            Node::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes[id.0].children.clone()
    }

    /* ── structure ─────────────────────────────────────────────── */

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(0, child);
    }

    /// Insert `new` as the next sibling of `sibling`.
    pub fn insert_after(&mut self, sibling: NodeId, new: NodeId) {
        let parent = self.nodes[sibling.0]
            .parent
            .expect("insert_after target must be attached");
        self.detach(new);
        let pos = self.nodes[parent.0]
            .children
            .iter()
            .position(|&c| c == sibling)
            .expect("sibling not found under its parent");
        self.nodes[new.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(pos + 1, new);
    }

    /// Detach a node from its parent. The node and its subtree stay in the
    /// arena but disappear from traversal and serialization.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != id);
        }
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.nodes[id.0].parent.is_some()
    }

    /* ── attributes & classes ──────────────────────────────────── */

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id.0].node {
            Node::Element { attributes, .. } => attributes.get(name).map(String::as_str),
            _ => None,
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Node::Element { attributes, .. } = &mut self.nodes[id.0].node {
            attributes.insert(name.to_string(), value.into());
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Node::Element { attributes, .. } = &mut self.nodes[id.0].node {
            attributes.remove(name);
        }
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        match &self.nodes[id.0].node {
            Node::Element { classes, .. } => classes.iter().any(|c| c == class),
            _ => false,
        }
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Node::Element { classes, .. } = &mut self.nodes[id.0].node {
            if !classes.iter().any(|c| c == class) {
                classes.push(class.to_string());
            }
        }
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if let Node::Element { classes, .. } = &mut self.nodes[id.0].node {
            classes.retain(|c| c != class);
        }
    }

    /* ── traversal ─────────────────────────────────────────────── */

    /// All attached nodes in document order (depth-first from the root).
    pub fn descendants(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect(self.root, &mut out);
        out
    }

    /// Attached subtree of `id` in document order, including `id` itself.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.collect(id, &mut out);
        out
    }

    fn collect(&self, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        for child in &self.nodes[id.0].children {
            self.collect(*child, out);
        }
    }

    /// Ancestors of `id`, nearest first, excluding `id`.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.nodes[id.0].parent;
        while let Some(p) = cur {
            out.push(p);
            cur = self.nodes[p.0].parent;
        }
        out
    }

    /// First attached element matching the predicate, in document order.
    pub fn find(&self, pred: impl Fn(&Dom, NodeId) -> bool) -> Option<NodeId> {
        self.descendants().into_iter().find(|&id| pred(self, id))
    }

    /// All attached elements with the given tag, in document order.
    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.descendants()
            .into_iter()
            .filter(|&id| self.tag(id) == Some(tag))
            .collect()
    }

    /// All attached elements carrying the given attribute, in document order.
    pub fn elements_with_attr(&self, name: &str) -> Vec<NodeId> {
        self.descendants()
            .into_iter()
            .filter(|&id| self.attr(id, name).is_some())
            .collect()
    }

    /* ── markup ────────────────────────────────────────────────── */

    /// Serialized markup of the node's children.
    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in &self.nodes[id.0].children {
            self.serialize(*child, &mut out);
        }
        out
    }

    /// Replace the node's content with a verbatim markup span.
    pub fn set_inner_html(&mut self, id: NodeId, markup: &str) {
        for child in self.children(id) {
            self.detach(child);
        }
        let raw = self.create_raw(markup);
        self.append_child(id, raw);
    }

    /// Serialized markup of the node itself.
    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.serialize(id, &mut out);
        out
    }

    /// Full document: doctype line plus the root element.
    pub fn document_html(&self) -> String {
        format!("<!DOCTYPE html>\n{}", self.outer_html(self.root))
    }

    fn serialize(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].node {
            Node::Text(content) => out.push_str(&escape_text(content)),
            Node::Raw(markup) => out.push_str(markup),
            Node::Element {
                tag,
                attributes,
                classes,
            } => {
                let _ = write!(out, "<{}", tag);
                if !classes.is_empty() {
                    let _ = write!(out, " class=\"{}\"", escape_attr(&classes.join(" ")));
                }
                for (name, value) in attributes {
                    let _ = write!(out, " {}=\"{}\"", name, escape_attr(value));
                }
                out.push('>');
                if VOID_TAGS.contains(&tag.as_str()) {
                    return;
                }
                for child in &self.nodes[id.0].children {
                    self.serialize(*child, out);
                }
                let _ = write!(out, "</{}>", tag);
            }
        }
    }
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Dom, NodeId) {
        let mut dom = Dom::new("body");
        let p = dom.create_element("p");
        let text = dom.create_text("hello");
        dom.append_child(p, text);
        let body = dom.root();
        dom.append_child(body, p);
        (dom, p)
    }

    #[test]
    fn serializes_attributes_and_classes() {
        let (mut dom, p) = sample();
        dom.set_attr(p, "data-edit-id", "0");
        dom.add_class(p, "lead");
        assert_eq!(
            dom.outer_html(p),
            "<p class=\"lead\" data-edit-id=\"0\">hello</p>"
        );
    }

    #[test]
    fn inner_html_round_trips_through_raw() {
        let (mut dom, p) = sample();
        let em = dom.create_element("em");
        let t = dom.create_text("x < y");
        dom.append_child(em, t);
        dom.append_child(p, em);

        let captured = dom.inner_html(p);
        dom.set_inner_html(p, "scribble");
        dom.set_inner_html(p, &captured);
        assert_eq!(dom.inner_html(p), captured);
    }

    #[test]
    fn detach_removes_from_traversal() {
        let (mut dom, p) = sample();
        assert!(dom.descendants().contains(&p));
        dom.detach(p);
        assert!(!dom.descendants().contains(&p));
        assert!(!dom.is_attached(p));
    }

    #[test]
    fn insert_after_places_sibling() {
        let (mut dom, p) = sample();
        let hr = dom.create_element("hr");
        dom.insert_after(p, hr);
        let kids = dom.children(dom.root());
        assert_eq!(kids, vec![p, hr]);
        assert_eq!(dom.outer_html(hr), "<hr>");
    }

    #[test]
    fn document_order_is_depth_first() {
        let mut dom = Dom::new("body");
        let section = dom.create_element("section");
        let h = dom.create_element("h2");
        let p = dom.create_element("p");
        let root = dom.root();
        dom.append_child(root, section);
        dom.append_child(section, h);
        dom.append_child(section, p);
        let order = dom.descendants();
        let pos = |id| order.iter().position(|&n| n == id).unwrap();
        assert!(pos(section) < pos(h));
        assert!(pos(h) < pos(p));
    }
}
