//! # Pagewright Editor
//!
//! Headless core of the in-place static-site editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ dom: rendered page as an arena tree         │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ policy + identity: who is editable, and     │
//! │ under which stable ordinal                  │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ session: enter → mutate/insert/upload →     │
//! │ exit(save | discard)                        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ sinks: markup file + data file (gateway),   │
//! │ local cache (always)                        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core principles
//!
//! 1. **The rendered tree is the medium**: the editor mutates markup in
//!    place, it never re-renders.
//! 2. **Identity is ordinal**: stable across content edits, recomputed after
//!    every structural change.
//! 3. **Saves never abort**: gateway failures downgrade to a local-cache
//!    outcome, reported per sink.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pagewright_editor::{Dom, EditSession, MemoryCache, identity, session};
//!
//! // page load: label, then replay anything kept locally
//! identity::assign(&mut dom);
//! session::replay_cached(&mut dom, &cache, "/days/day1/");
//!
//! // edit round
//! let mut session = EditSession::new("/days/day1/");
//! session.enter(&mut dom, None, || None);
//! // ... author mutates the tree ...
//! let report = session.exit_save(&mut dom, &gateway, &mut cache)?;
//! println!("{}", report.summary());
//! ```

pub mod blocks;
pub mod cache;
pub mod client;
pub mod dom;
pub mod errors;
pub mod identity;
pub mod image;
pub mod policy;
pub mod session;

pub use blocks::{BlockKind, Focus, Insertion};
pub use cache::{FileCache, LocalCache, MemoryCache};
pub use client::HttpGateway;
pub use dom::{Dom, Node, NodeId};
pub use errors::EditorError;
pub use image::ImageArtifact;
pub use session::{EditSession, EnterOutcome, Gateway, SaveReport, SessionState, SinkResult};
