//! # Content Blocks & Insertion Engine
//!
//! Materializes new content blocks between existing children of designated
//! container regions.
//!
//! Inserters are real elements living in the tree while a session is active;
//! they are stripped (or ignored by the cleaner) on exit. Every insertion
//! invalidates ordinals of later nodes, so the session re-runs the identity
//! assigner after each insertion or batch.

use crate::dom::{Dom, NodeId};
use crate::policy;

pub const INSERTER_CLASS: &str = "pw-inserter";
pub const TOOLBAR_CLASS: &str = "pw-toolbar";
pub const PICKER_CLASS: &str = "pw-picker";
pub const DROPZONE_CLASS: &str = "pw-dropzone";
pub const PLACEHOLDER_CLASS: &str = "pw-upload-placeholder";
pub const EDITING_BODY_CLASS: &str = "pw-editing";
/// Layout class flipped by the orientation toggle.
pub const PORTRAIT_CLASS: &str = "img-portrait";

pub const PARAGRAPH_PLACEHOLDER: &str = "Start writing…";
pub const HEADING_PLACEHOLDER: &str = "New heading";
pub const CAPTION_PLACEHOLDER: &str = "Image caption…";
pub const NOTE_PLACEHOLDER: &str = "Note text…";

/// The fixed menu of insertable block variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Heading,
    ImageFigure,
    Divider,
    Note,
}

/// Where editing focus lands after an insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Focus {
    pub node: NodeId,
    /// Placeholder text is fully selected for immediate overwrite.
    pub select_all: bool,
}

/// Result of materializing one block.
#[derive(Debug, Clone, Copy)]
pub struct Insertion {
    pub node: NodeId,
    pub focus: Option<Focus>,
}

/// One insertion point marker.
pub fn make_inserter(dom: &mut Dom) -> NodeId {
    let ins = dom.create_element("div");
    dom.add_class(ins, INSERTER_CLASS);
    ins
}

/// Expose an inserter before and after every direct child of each designated
/// container, without doubling up on re-entry. Returns how many were added.
pub fn place_inserters(dom: &mut Dom) -> usize {
    let mut added = 0;
    for container in policy::insert_containers(dom) {
        let children: Vec<NodeId> = dom
            .children(container)
            .into_iter()
            .filter(|&c| !dom.has_class(c, INSERTER_CLASS))
            .collect();
        if children.is_empty() {
            continue;
        }
        for child in &children {
            let next_is_inserter = dom
                .children(container)
                .iter()
                .skip_while(|&&c| c != *child)
                .nth(1)
                .map(|&n| dom.has_class(n, INSERTER_CLASS))
                .unwrap_or(false);
            if !next_is_inserter {
                let ins = make_inserter(dom);
                dom.insert_after(*child, ins);
                added += 1;
            }
        }
        let first = dom.children(container)[0];
        if !dom.has_class(first, INSERTER_CLASS) {
            let ins = make_inserter(dom);
            dom.prepend_child(container, ins);
            added += 1;
        }
    }
    added
}

/// Materialize a block skeleton right after the invoked inserter and append a
/// fresh inserter after the new block. The caller records the node as
/// session-inserted and requests a new identity pass.
pub fn insert_block(dom: &mut Dom, inserter: NodeId, kind: BlockKind) -> Insertion {
    let insertion = materialize(dom, kind);
    dom.insert_after(inserter, insertion.node);
    let next = make_inserter(dom);
    dom.insert_after(insertion.node, next);
    insertion
}

fn materialize(dom: &mut Dom, kind: BlockKind) -> Insertion {
    match kind {
        BlockKind::Paragraph => {
            let p = dom.create_element("p");
            let text = dom.create_text(PARAGRAPH_PLACEHOLDER);
            dom.append_child(p, text);
            dom.set_attr(p, "contenteditable", "true");
            Insertion {
                node: p,
                focus: Some(Focus {
                    node: p,
                    select_all: true,
                }),
            }
        }
        BlockKind::Heading => {
            let h = dom.create_element("h3");
            let text = dom.create_text(HEADING_PLACEHOLDER);
            dom.append_child(h, text);
            dom.set_attr(h, "contenteditable", "true");
            Insertion {
                node: h,
                focus: Some(Focus {
                    node: h,
                    select_all: true,
                }),
            }
        }
        BlockKind::ImageFigure => Insertion {
            node: empty_figure(dom),
            focus: None,
        },
        BlockKind::Divider => {
            let div = dom.create_element("div");
            dom.add_class(div, "divider");
            Insertion {
                node: div,
                focus: None,
            }
        }
        BlockKind::Note => {
            let aside = dom.create_element("div");
            dom.add_class(aside, "aside");
            let label = dom.create_element("div");
            dom.add_class(label, "aside-label");
            dom.set_attr(label, "contenteditable", "true");
            let label_text = dom.create_text("NOTE");
            dom.append_child(label, label_text);
            let body = dom.create_element("p");
            dom.set_attr(body, "contenteditable", "true");
            let body_text = dom.create_text(NOTE_PLACEHOLDER);
            dom.append_child(body, body_text);
            dom.append_child(aside, label);
            dom.append_child(aside, body);
            Insertion {
                node: aside,
                focus: Some(Focus {
                    node: body,
                    select_all: true,
                }),
            }
        }
    }
}

/// New image figure in the empty-placeholder state: clicking the placeholder
/// starts the upload flow, the caption is immediately editable.
pub fn empty_figure(dom: &mut Dom) -> NodeId {
    let fig = dom.create_element("figure");
    dom.add_class(fig, "img-block");
    let placeholder = dom.create_element("div");
    dom.add_class(placeholder, PLACEHOLDER_CLASS);
    let hint = dom.create_text("Click to upload an image");
    dom.append_child(placeholder, hint);
    dom.append_child(fig, placeholder);
    let caption = dom.create_element("figcaption");
    dom.set_attr(caption, "contenteditable", "true");
    let cap_text = dom.create_text(CAPTION_PLACEHOLDER);
    dom.append_child(caption, cap_text);
    dom.append_child(fig, caption);
    attach_toolbar(dom, fig);
    fig
}

/// Toolbar actions available on every figure during a session.
pub const TOOLBAR_ACTIONS: &[&str] = &["replace", "rotate-cw", "rotate-ccw", "toggle", "delete"];

/// Attach the image toolbar to every non-excluded figure encountered during
/// session activation.
pub fn attach_toolbars(dom: &mut Dom) -> usize {
    let figures: Vec<NodeId> = dom
        .elements_by_tag("figure")
        .into_iter()
        .filter(|&f| !policy::is_excluded(dom, f))
        .collect();
    let mut attached = 0;
    for fig in figures {
        if attach_toolbar(dom, fig) {
            attached += 1;
        }
    }
    attached
}

/// Attach the toolbar to one figure. Returns false when already present.
pub fn attach_toolbar(dom: &mut Dom, fig: NodeId) -> bool {
    let present = dom
        .children(fig)
        .iter()
        .any(|&c| dom.has_class(c, TOOLBAR_CLASS));
    if present {
        return false;
    }
    let toolbar = dom.create_element("div");
    dom.add_class(toolbar, TOOLBAR_CLASS);
    for action in TOOLBAR_ACTIONS {
        let btn = dom.create_element("button");
        dom.set_attr(btn, "data-action", *action);
        dom.append_child(toolbar, btn);
    }
    dom.append_child(fig, toolbar);
    true
}

/// Presentational only: flips the portrait layout class, pixel data is
/// untouched. Returns true when the figure is now portrait.
pub fn toggle_orientation(dom: &mut Dom, fig: NodeId) -> bool {
    if dom.has_class(fig, PORTRAIT_CLASS) {
        dom.remove_class(fig, PORTRAIT_CLASS);
        false
    } else {
        dom.add_class(fig, PORTRAIT_CLASS);
        true
    }
}

/// Remove a figure after the one confirming prompt the editor is allowed.
/// Returns true when the figure was removed.
pub fn delete_figure(dom: &mut Dom, fig: NodeId, confirmed: bool) -> bool {
    if confirmed {
        dom.detach(fig);
    }
    confirmed
}

/// Strip every editing affordance: inserters, pickers, toolbars.
pub fn remove_affordances(dom: &mut Dom) {
    let injected: Vec<NodeId> = dom
        .descendants()
        .into_iter()
        .filter(|&id| {
            dom.has_class(id, INSERTER_CLASS)
                || dom.has_class(id, TOOLBAR_CLASS)
                || dom.has_class(id, PICKER_CLASS)
        })
        .collect();
    for id in injected {
        dom.detach(id);
    }
}
