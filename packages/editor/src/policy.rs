//! # Editability Policy
//!
//! Decides which elements of a page are free-text editable and where new
//! blocks may be inserted.
//!
//! The policy is two fixed selector lists: an allow-list of content roles and
//! a deny-list of chrome, interactive widgets and editor-injected UI. Both
//! are evaluated in a single depth-first scan that tags every node with a
//! boolean, so classification is a pure function of the tree — no repeated
//! ancestor walks per node.

use crate::dom::{Dom, NodeId};
use std::collections::HashMap;

/// Structural selector: element tag or class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    Tag(&'static str),
    Class(&'static str),
}

impl Selector {
    pub fn matches(&self, dom: &Dom, id: NodeId) -> bool {
        match self {
            Selector::Tag(tag) => dom.tag(id) == Some(tag),
            Selector::Class(class) => dom.has_class(id, class),
        }
    }
}

/// Content roles eligible for in-place editing.
pub const EDITABLE: &[Selector] = &[
    Selector::Tag("h1"),
    Selector::Tag("h2"),
    Selector::Tag("h3"),
    Selector::Tag("h4"),
    Selector::Tag("p"),
    Selector::Tag("li"),
    Selector::Tag("blockquote"),
    Selector::Tag("figcaption"),
    Selector::Tag("td"),
    Selector::Tag("th"),
    Selector::Class("section-label"),
    Selector::Class("aside-label"),
    Selector::Class("caption-title"),
    Selector::Class("caption-sub"),
    Selector::Class("page-summary"),
];

/// Regions whose contents must never become editable: navigation, links and
/// buttons, tag pills, dynamic widget containers, modal chrome, and every
/// piece of UI the editor itself injects.
pub const EXCLUDED: &[Selector] = &[
    Selector::Tag("nav"),
    Selector::Tag("footer"),
    Selector::Tag("a"),
    Selector::Tag("button"),
    Selector::Class("btn"),
    Selector::Class("tag-pill"),
    Selector::Class("filter-pill"),
    Selector::Class("breadcrumb"),
    Selector::Class("widget"),
    Selector::Class("modal"),
    Selector::Class(crate::blocks::INSERTER_CLASS),
    Selector::Class(crate::blocks::TOOLBAR_CLASS),
    Selector::Class(crate::blocks::PICKER_CLASS),
    Selector::Class(crate::blocks::DROPZONE_CLASS),
];

/// Containers that accept block insertion between their children.
pub const INSERT_CONTAINERS: &[Selector] = &[
    Selector::Class("prose-section"),
    Selector::Class("event-body"),
    Selector::Class("page-section"),
];

fn matches_any(dom: &Dom, id: NodeId, selectors: &[Selector]) -> bool {
    selectors.iter().any(|s| s.matches(dom, id))
}

/// Tag every attached node with its editability in one pass.
///
/// A node is editable iff it matches the allow-list and neither it nor any
/// ancestor matches the deny-list.
pub fn classify(dom: &Dom) -> HashMap<NodeId, bool> {
    let mut map = HashMap::new();
    scan(dom, dom.root(), false, &mut map);
    map
}

fn scan(dom: &Dom, id: NodeId, under_excluded: bool, map: &mut HashMap<NodeId, bool>) {
    let excluded = under_excluded || matches_any(dom, id, EXCLUDED);
    map.insert(id, !excluded && matches_any(dom, id, EDITABLE));
    for child in dom.children(id) {
        scan(dom, child, excluded, map);
    }
}

/// Editable nodes in document order.
pub fn editable_nodes(dom: &Dom) -> Vec<NodeId> {
    let map = classify(dom);
    dom.descendants()
        .into_iter()
        .filter(|id| map.get(id).copied().unwrap_or(false))
        .collect()
}

/// Closest-ancestor deny check for nodes outside the allow-list, e.g. figures
/// picking up an image toolbar.
pub fn is_excluded(dom: &Dom, id: NodeId) -> bool {
    matches_any(dom, id, EXCLUDED)
        || dom
            .ancestors(id)
            .into_iter()
            .any(|a| matches_any(dom, a, EXCLUDED))
}

/// Insertion containers in document order.
pub fn insert_containers(dom: &Dom) -> Vec<NodeId> {
    dom.descendants()
        .into_iter()
        .filter(|&id| matches_any(dom, id, INSERT_CONTAINERS))
        .collect()
}
