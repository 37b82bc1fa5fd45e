//! # Identity Assigner
//!
//! Gives every editable node a reproducible ordinal so that saved fragments
//! can be re-applied onto a freshly rendered copy of the same page.
//!
//! The ordinal is the node's position in document order among the currently
//! matching set, so it is stable across content edits but not across
//! structural changes — callers re-run [`assign`] after every insertion or
//! removal.

use crate::dom::{Dom, NodeId};
use crate::policy;

/// Attribute carrying the ordinal, as a decimal string.
pub const IDENTITY_ATTR: &str = "data-edit-id";

/// Re-scan the page and label every editable node with its ordinal.
/// Returns the number of labeled nodes. An empty match set is a no-op.
pub fn assign(dom: &mut Dom) -> usize {
    clear(dom);
    let nodes = policy::editable_nodes(dom);
    for (ordinal, id) in nodes.iter().enumerate() {
        dom.set_attr(*id, IDENTITY_ATTR, ordinal.to_string());
    }
    nodes.len()
}

/// Remove every identity label.
pub fn clear(dom: &mut Dom) {
    for id in dom.elements_with_attr(IDENTITY_ATTR) {
        dom.remove_attr(id, IDENTITY_ATTR);
    }
}

/// The node's assigned ordinal, if labeled.
pub fn identity(dom: &Dom, id: NodeId) -> Option<u32> {
    dom.attr(id, IDENTITY_ATTR)?.parse().ok()
}

/// Labeled node for a given ordinal.
pub fn node_with_identity(dom: &Dom, ordinal: u32) -> Option<NodeId> {
    let wanted = ordinal.to_string();
    dom.find(|d, id| d.attr(id, IDENTITY_ATTR) == Some(wanted.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Dom {
        let mut dom = Dom::new("body");
        let root = dom.root();
        for tag in ["h1", "p", "p"] {
            let el = dom.create_element(tag);
            dom.append_child(root, el);
        }
        dom
    }

    #[test]
    fn assigns_document_order_ordinals() {
        let mut dom = page();
        assert_eq!(assign(&mut dom), 3);
        let ids: Vec<_> = policy::editable_nodes(&dom)
            .into_iter()
            .map(|n| identity(&dom, n).unwrap())
            .collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn reassignment_is_idempotent_on_unchanged_tree() {
        let mut dom = page();
        assign(&mut dom);
        let before: Vec<_> = policy::editable_nodes(&dom)
            .into_iter()
            .map(|n| identity(&dom, n))
            .collect();
        assign(&mut dom);
        let after: Vec<_> = policy::editable_nodes(&dom)
            .into_iter()
            .map(|n| identity(&dom, n))
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn structural_change_relabels() {
        let mut dom = page();
        assign(&mut dom);
        let first = policy::editable_nodes(&dom)[0];
        let inserted = dom.create_element("p");
        dom.insert_after(first, inserted);
        assign(&mut dom);
        assert_eq!(identity(&dom, inserted), Some(1));
        assert_eq!(node_with_identity(&dom, 1), Some(inserted));
    }

    #[test]
    fn clear_removes_labels() {
        let mut dom = page();
        assign(&mut dom);
        clear(&mut dom);
        assert!(dom.elements_with_attr(IDENTITY_ATTR).is_empty());
    }

    #[test]
    fn empty_match_set_is_noop() {
        let mut dom = Dom::new("body");
        assert_eq!(assign(&mut dom), 0);
    }
}
