//! # Wiki View Service
//!
//! This service runs requests against the wiki view: listing, reading,
//! creating, removing and renaming through paths.
//!
//! ## Philosophy
//!
//! - Every request resolves its paths from scratch; nothing outlives it but
//!   the repository and the caller's scratch files
//! - The service never escalates authority: each change is checked against
//!   the caller's policy before the first write
//! - Multi-page changes are not transactional; a failure midway is reported
//!   with how far the change got
//!
//! ## Operations
//!
//! - `ls(path)`: List a collection
//! - `stat(path)`: Get node metadata
//! - `read(path)`: Read a file
//! - `mkcol(path)`: Create a space or page
//! - `put(path, data)`: Upload an attachment, page text, or scratch file
//! - `delete(path)`: Remove a node
//! - `rename(from, to)`: Move a page, space, or attachment

pub mod mutation;
pub mod operations;
pub mod service;
pub mod session;

pub use mutation::{add_member, move_node, remove_member};
pub use operations::{Caller, StatInfo, WikiViewOperations};
pub use service::WikiViewService;
pub use session::{Clock, ManualClock, SessionStore, SystemClock, UserStorage};
