//! # Core Types
//!
//! This crate defines the value types shared by every layer of the wiki view.
//!
//! ## Philosophy
//!
//! - **References are values**: a page, space or attachment is named by an
//!   immutable reference, never by a live handle.
//! - **One canonical spelling**: every reference has exactly one serialized
//!   form, and two references are equal iff their serialized forms are equal.
//! - **Relative is not resolved**: a page reference may lack its enclosing
//!   space while it is being parsed, but resolution refuses such a reference.
//!
//! ## Key Types
//!
//! - [`SpaceRef`]: a (possibly nested) space
//! - [`PageRef`]: a page, optionally qualified by its space
//! - [`AttachmentRef`]: a file attached to a page
//! - [`EntityRef`]: any of the above, as seen by the access policy
//! - [`RequestId`]: correlates log lines of one request

pub mod ids;
pub mod refs;
pub mod serialize;

pub use ids::RequestId;
pub use refs::{AttachmentRef, EntityRef, PageRef, RefError, SpaceRef};
pub use serialize::{
    parse_attachment_ref, parse_page_ref, parse_space_ref, serialize_attachment, serialize_page,
    serialize_space,
};
