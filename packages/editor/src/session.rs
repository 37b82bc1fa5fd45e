//! # Edit Session
//!
//! State machine governing one page's editing lifecycle:
//! `Idle → Active → {Saving, Discarding} → Idle`.
//!
//! The session is an explicit value owned by the page controller — every
//! snapshot map lives here, never in ambient state — so discard/restore is
//! testable on its own. While active the author mutates the tree freely; no
//! diffing happens until exit. Saving fans out to three sinks: the markup
//! file, the structured data file, and the local cache, each reported
//! independently.

use crate::blocks::{self, BlockKind, Insertion, EDITING_BODY_CLASS, PLACEHOLDER_CLASS};
use crate::cache::{storage_key, LocalCache};
use crate::dom::{Dom, NodeId};
use crate::errors::EditorError;
use crate::identity::{self, IDENTITY_ATTR};
use crate::image;
use crate::policy;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Attribute binding an element to a dot path in the structured data file.
pub const DATA_KEY_ATTR: &str = "data-key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active,
}

/// Outcome of an enter attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnterOutcome {
    Entered,
    AlreadyActive,
    /// Prompt dismissed or submitted empty — silent, no wrong-secret notice.
    Cancelled,
    WrongSecret,
}

/// Per-sink save outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkResult {
    Saved,
    /// The gateway was unreachable; the local cache holds the content.
    SavedLocallyOnly,
    Failed(String),
}

/// Aggregated result of one save. The data sink is only reported when it had
/// pending changes.
#[derive(Debug, Clone)]
pub struct SaveReport {
    pub data: Option<SinkResult>,
    pub markup: SinkResult,
    pub cache: SinkResult,
}

impl SaveReport {
    /// Short per-sink summary suitable for a transient notice.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(data) = &self.data {
            parts.push(match data {
                SinkResult::Saved => "data ✓".to_string(),
                _ => "data ✗".to_string(),
            });
        }
        parts.push(match &self.markup {
            SinkResult::Saved => "markup ✓".to_string(),
            SinkResult::SavedLocallyOnly => "kept locally".to_string(),
            SinkResult::Failed(_) => "markup ✗".to_string(),
        });
        parts.push(match &self.cache {
            SinkResult::Saved => "cached".to_string(),
            _ => "cache ✗".to_string(),
        });
        format!("Saved  {}", parts.join(" · "))
    }
}

/// Server side of a save, one method per endpoint. Implementations are
/// best-effort; the session downgrades failures instead of aborting.
pub trait Gateway {
    fn write_markup(&self, page_path: &str, html: &str) -> Result<(), EditorError>;
    fn patch_data(&self, changes: &BTreeMap<String, String>) -> Result<(), EditorError>;
    /// Returns the stored root-relative path.
    fn upload_image(&self, dir: &str, filename: &str, base64: &str)
        -> Result<String, EditorError>;
    fn rotate_image(&self, image_path: &str, degrees: i32) -> Result<(), EditorError>;
}

/// One page's edit session. Exactly one may be active per page.
pub struct EditSession {
    page_path: String,
    state: SessionState,
    originals_by_identity: BTreeMap<u32, String>,
    originals_by_key_path: BTreeMap<String, String>,
    inserted: Vec<NodeId>,
}

impl EditSession {
    pub fn new(page_path: impl Into<String>) -> Self {
        Self {
            page_path: page_path.into(),
            state: SessionState::Idle,
            originals_by_identity: BTreeMap::new(),
            originals_by_key_path: BTreeMap::new(),
            inserted: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn page_path(&self) -> &str {
        &self.page_path
    }

    /// Enter editing. No-op when already active. When a shared secret is
    /// configured the prompt runs first; a dismissed or empty answer cancels
    /// silently, a wrong answer is reported as such.
    pub fn enter(
        &mut self,
        dom: &mut Dom,
        configured_secret: Option<&str>,
        prompt: impl FnOnce() -> Option<String>,
    ) -> EnterOutcome {
        if self.is_active() {
            return EnterOutcome::AlreadyActive;
        }
        if let Some(secret) = configured_secret {
            match prompt() {
                None => return EnterOutcome::Cancelled,
                Some(answer) if answer.is_empty() => return EnterOutcome::Cancelled,
                Some(answer) if answer != secret => return EnterOutcome::WrongSecret,
                Some(_) => {}
            }
        }

        if let Some(body) = body_node(dom) {
            dom.add_class(body, EDITING_BODY_CLASS);
        }

        // bound nodes first: their key paths are independent of ordinals
        self.originals_by_key_path.clear();
        for node in dom.elements_with_attr(DATA_KEY_ATTR) {
            if let Some(key) = dom.attr(node, DATA_KEY_ATTR) {
                // shared key paths: last write wins, both represent one value
                self.originals_by_key_path
                    .insert(key.to_string(), dom.inner_html(node));
            }
        }

        identity::assign(dom);
        self.originals_by_identity.clear();
        for node in dom.elements_with_attr(IDENTITY_ATTR) {
            if let Some(ordinal) = identity::identity(dom, node) {
                self.originals_by_identity
                    .insert(ordinal, dom.inner_html(node));
                dom.set_attr(node, "contenteditable", "true");
            }
        }
        for node in dom.elements_with_attr(DATA_KEY_ATTR) {
            if !policy::is_excluded(dom, node) {
                dom.set_attr(node, "contenteditable", "true");
            }
        }

        blocks::place_inserters(dom);
        blocks::attach_toolbars(dom);

        self.inserted.clear();
        self.state = SessionState::Active;
        EnterOutcome::Entered
    }

    /// Insert a block at an inserter, track it for discard, and relabel the
    /// page — ordinals of later nodes shift on every structural change.
    pub fn insert_block(
        &mut self,
        dom: &mut Dom,
        inserter: NodeId,
        kind: BlockKind,
    ) -> Result<Insertion, EditorError> {
        if !self.is_active() {
            return Err(EditorError::NotActive);
        }
        let insertion = blocks::insert_block(dom, inserter, kind);
        self.inserted.push(insertion.node);
        identity::assign(dom);
        Ok(insertion)
    }

    /// Process and upload a source file into a figure. On any failure the
    /// figure keeps its prior state.
    pub fn upload_to_figure(
        &mut self,
        dom: &mut Dom,
        fig: NodeId,
        bytes: &[u8],
        original_name: &str,
        gateway: &dyn Gateway,
        now_millis: u64,
    ) -> Result<(), EditorError> {
        if !self.is_active() {
            return Err(EditorError::NotActive);
        }
        let artifact = image::process_image(bytes, original_name, now_millis)?;
        let dir = image::image_dir(&self.page_path);
        let stored = gateway.upload_image(
            dir.trim_start_matches('/'),
            &artifact.filename,
            &artifact.base64,
        )?;
        image::apply_upload(dom, fig, &artifact, &stored, &self.page_path, now_millis);
        Ok(())
    }

    /// Multi-file drop: one populated figure appended per file, one identity
    /// pass for the whole batch. Per-file failures are logged and skipped.
    pub fn insert_image_figures(
        &mut self,
        dom: &mut Dom,
        container: NodeId,
        files: &[(String, Vec<u8>)],
        gateway: &dyn Gateway,
        now_millis: u64,
    ) -> Result<usize, EditorError> {
        if !self.is_active() {
            return Err(EditorError::NotActive);
        }
        let mut uploaded = 0;
        for (name, bytes) in files {
            let fig = blocks::empty_figure(dom);
            dom.append_child(container, fig);
            self.inserted.push(fig);
            match self.upload_to_figure(dom, fig, bytes, name, gateway, now_millis) {
                Ok(()) => uploaded += 1,
                Err(e) => {
                    tracing::warn!(file = %name, error = %e, "image upload skipped");
                }
            }
        }
        identity::assign(dom);
        Ok(uploaded)
    }

    /// Rotate the figure's stored image through the gateway, then force a
    /// refetch with a new cache token.
    pub fn rotate_figure(
        &mut self,
        dom: &mut Dom,
        fig: NodeId,
        degrees: i32,
        gateway: &dyn Gateway,
        now_millis: u64,
    ) -> Result<(), EditorError> {
        if !self.is_active() {
            return Err(EditorError::NotActive);
        }
        let img = dom
            .children(fig)
            .into_iter()
            .find(|&c| dom.tag(c) == Some("img"))
            .ok_or_else(|| EditorError::Gateway("figure has no image".to_string()))?;
        let src = dom
            .attr(img, "src")
            .unwrap_or_default()
            .split('?')
            .next()
            .unwrap_or_default()
            .to_string();
        let abs = image::absolute_from(&self.page_path, &src);
        gateway.rotate_image(&abs, degrees)?;
        dom.set_attr(img, "src", image::cache_busted(&src, now_millis));
        Ok(())
    }

    /// Exit discarding: inserted nodes go first so the surviving node set
    /// matches the one captured at enter, then ordinals are restored by a
    /// fresh pass and every snapshot is replayed.
    pub fn exit_discard(&mut self, dom: &mut Dom) {
        if !self.is_active() {
            return;
        }
        self.state = SessionState::Idle;

        for node in std::mem::take(&mut self.inserted) {
            dom.detach(node);
        }
        blocks::remove_affordances(dom);

        identity::assign(dom);
        for node in dom.elements_with_attr(IDENTITY_ATTR) {
            if let Some(ordinal) = identity::identity(dom, node) {
                if let Some(markup) = self.originals_by_identity.get(&ordinal) {
                    let markup = markup.clone();
                    dom.set_inner_html(node, &markup);
                }
            }
        }
        for node in dom.elements_with_attr(DATA_KEY_ATTR) {
            let key = dom.attr(node, DATA_KEY_ATTR).unwrap_or_default().to_string();
            if let Some(markup) = self.originals_by_key_path.get(&key) {
                let markup = markup.clone();
                dom.set_inner_html(node, &markup);
            }
        }

        self.strip_editing_marks(dom);
        self.clear_maps();
    }

    /// Exit saving: affordances are stripped, content stays as edited, and
    /// the three sinks are written best-effort. The local cache is
    /// unconditional and last — a gateway failure downgrades the result
    /// rather than aborting.
    pub fn exit_save(
        &mut self,
        dom: &mut Dom,
        gateway: &dyn Gateway,
        cache: &mut dyn LocalCache,
    ) -> Result<SaveReport, EditorError> {
        if !self.is_active() {
            return Err(EditorError::NotActive);
        }
        self.state = SessionState::Idle;

        blocks::remove_affordances(dom);

        let changes = self.bound_changes(dom);
        let data = if changes.is_empty() {
            None
        } else {
            Some(match gateway.patch_data(&changes) {
                Ok(()) => SinkResult::Saved,
                Err(e) => {
                    tracing::warn!(error = %e, "data patch failed");
                    SinkResult::Failed(e.to_string())
                }
            })
        };

        let cleaned = clean_markup(dom);
        let markup = match gateway.write_markup(&self.page_path, &cleaned) {
            Ok(()) => SinkResult::Saved,
            Err(e) => {
                tracing::warn!(error = %e, "markup write failed, keeping local copy");
                SinkResult::SavedLocallyOnly
            }
        };

        let mut snapshot = BTreeMap::new();
        for node in dom.elements_with_attr(IDENTITY_ATTR) {
            if let Some(ordinal) = identity::identity(dom, node) {
                snapshot.insert(ordinal.to_string(), dom.inner_html(node));
            }
        }
        let cache_result = match serde_json::to_string(&snapshot) {
            Ok(json) => match cache.set(&storage_key(&self.page_path), &json) {
                Ok(()) => SinkResult::Saved,
                Err(e) => SinkResult::Failed(e.to_string()),
            },
            Err(e) => SinkResult::Failed(e.to_string()),
        };

        self.strip_editing_marks(dom);
        self.clear_maps();

        Ok(SaveReport {
            data,
            markup,
            cache: cache_result,
        })
    }

    /// Key path → new markup, only where it differs from the enter snapshot.
    fn bound_changes(&self, dom: &Dom) -> BTreeMap<String, String> {
        let mut changes = BTreeMap::new();
        for node in dom.elements_with_attr(DATA_KEY_ATTR) {
            let key = match dom.attr(node, DATA_KEY_ATTR) {
                Some(k) => k.to_string(),
                None => continue,
            };
            let current = dom.inner_html(node);
            if let Some(original) = self.originals_by_key_path.get(&key) {
                if *original != current {
                    changes.insert(key, current);
                }
            }
        }
        changes
    }

    fn strip_editing_marks(&self, dom: &mut Dom) {
        for node in dom.elements_with_attr("contenteditable") {
            dom.remove_attr(node, "contenteditable");
        }
        identity::clear(dom);
        if let Some(body) = body_node(dom) {
            dom.remove_class(body, EDITING_BODY_CLASS);
        }
    }

    fn clear_maps(&mut self) {
        self.originals_by_identity.clear();
        self.originals_by_key_path.clear();
        self.inserted.clear();
    }
}

fn body_node(dom: &Dom) -> Option<NodeId> {
    if dom.tag(dom.root()) == Some("body") {
        Some(dom.root())
    } else {
        dom.elements_by_tag("body").into_iter().next()
    }
}

fn cache_token_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"\?t=\d+$").unwrap())
}

/// Cleaned full-document markup for the write-markup sink: editor UI,
/// identity and contenteditable attributes, empty upload placeholders and
/// cache-busting tokens all removed. Works on a clone; the live tree is not
/// altered.
pub fn clean_markup(dom: &Dom) -> String {
    let mut copy = dom.clone();
    blocks::remove_affordances(&mut copy);

    // an upload placeholder with no image means the whole figure is empty
    for node in copy.descendants() {
        if !copy.has_class(node, PLACEHOLDER_CLASS) || !copy.is_attached(node) {
            continue;
        }
        let figure = copy
            .ancestors(node)
            .into_iter()
            .find(|&a| copy.tag(a) == Some("figure"));
        match figure {
            Some(fig) => {
                let has_img = copy
                    .subtree(fig)
                    .into_iter()
                    .any(|n| copy.tag(n) == Some("img"));
                if has_img {
                    copy.detach(node);
                } else {
                    copy.detach(fig);
                }
            }
            None => copy.detach(node),
        }
    }

    for node in copy.descendants() {
        copy.remove_attr(node, IDENTITY_ATTR);
        copy.remove_attr(node, "contenteditable");
    }
    if let Some(body) = body_node(&copy) {
        copy.remove_class(body, EDITING_BODY_CLASS);
    }
    for img in copy.elements_by_tag("img") {
        if let Some(src) = copy.attr(img, "src") {
            let stripped = cache_token_regex().replace(src, "").into_owned();
            copy.set_attr(img, "src", stripped);
        }
    }

    copy.document_html()
}

/// Replay the local cache for a page onto a freshly rendered tree. Runs
/// after identity assignment and before any session; best-effort, a corrupt
/// entry leaves the rendered markup untouched. Returns replayed node count.
pub fn replay_cached(dom: &mut Dom, cache: &dyn LocalCache, page_path: &str) -> usize {
    let raw = match cache.get(&storage_key(page_path)) {
        Some(raw) => raw,
        None => return 0,
    };
    let saved: BTreeMap<String, String> = match serde_json::from_str(&raw) {
        Ok(map) => map,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring corrupt local cache entry");
            return 0;
        }
    };
    let mut replayed = 0;
    for node in dom.elements_with_attr(IDENTITY_ATTR) {
        let ordinal = match dom.attr(node, IDENTITY_ATTR) {
            Some(o) => o.to_string(),
            None => continue,
        };
        if let Some(markup) = saved.get(&ordinal) {
            let markup = markup.clone();
            dom.set_inner_html(node, &markup);
            replayed += 1;
        }
    }
    replayed
}
