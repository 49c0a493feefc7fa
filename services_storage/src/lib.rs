//! # Storage Service
//!
//! This crate defines the repository port the wiki view reads and writes
//! through, plus reference implementations of it.
//!
//! ## Philosophy
//!
//! - **The view owns no state**: every page, space and attachment lives in
//!   the repository; the view only asks questions and issues writes.
//! - **One write, one unit of work**: each call is individually consistent.
//!   Nothing here groups several calls into a transaction.
//! - **Missing is not an error on read**: fetching an absent page yields a
//!   fresh, unsaved [`Document`] that can be filled in and saved.
//!
//! ## Design
//!
//! - [`Repository`]: the object-safe port (queries, CRUD, attachment bytes)
//! - [`InMemoryRepository`]: a complete in-process implementation
//! - [`FailingRepository`]: wraps any repository and injects write failures

pub mod document;
pub mod failing_repository;
pub mod memory;
pub mod repository;

pub use document::Document;
pub use failing_repository::{FailingRepository, FailurePolicy};
pub use memory::InMemoryRepository;
pub use repository::{Repository, StorageError};
