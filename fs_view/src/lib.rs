//! # Wiki Filesystem View
//!
//! This crate presents a wiki (pages in nested spaces, attachments, and the
//! legacy parent/child page relation) as a tree addressed by slash-separated
//! paths.
//!
//! ## Philosophy
//!
//! - **Paths are views, not authority**: resolving a path never grants
//!   access; every listing and change is checked against the access policy
//! - **Views are recomputed, never stored**: grouping directories are
//!   synthesized per request and die with it
//! - **The only cycle is in user data**: the node chain is acyclic by
//!   construction; the legacy page relation is guarded explicitly
//!
//! ## Design
//!
//! - [`NodeTable`] is a request-scoped arena; a node refers to its parent by
//!   [`NodeId`], never by an owning pointer
//! - [`NodeKind`] is a tagged variant; behaviour is selected by `match`
//! - [`resolve`] decodes one token per node, left to right
//! - [`members`] lists a node's children, bucketing large listings with
//!   [`GroupingStrategy`]
//! - [`RequestContext`] carries the repository, the access policy, the
//!   request intent and the per-user temp store for one request

pub mod config;
pub mod consts;
pub mod context;
pub mod directory;
pub mod enumerate;
pub mod error;
pub mod export;
pub mod grouping;
pub mod node;
pub mod path;
pub mod resolver;

pub use config::{ConfigError, ViewConfig};
pub use context::{AccessChecker, Intent, MoveSource, Principal, RequestContext, TempStore};
pub use directory::{DirectoryEntry, EntryKind};
pub use enumerate::{creates_cycle, members};
pub use error::ViewError;
pub use export::{file_content, render_xml};
pub use grouping::{GroupName, GroupingStrategy, GroupingThresholds};
pub use node::{Capabilities, Node, NodeId, NodeKind, NodeTable, ViewKind, WikiFileFormat};
pub use path::{PathError, PathResolver};
pub use resolver::{resolve, resolve_path};
