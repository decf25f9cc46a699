//! Foundation types for Cairn.
//!
//! This crate provides the identity and structural types shared by every
//! other Cairn crate: the content-addressed [`ObjectId`], the three object
//! kinds a store can hold, namespaced schema names, and access-group roles.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- Content-addressed identifier (BLAKE3 hash, `co_<hex>` text form)
//! - [`ObjectKind`] -- Discriminant for map, ordered-list, and append-log objects
//! - [`SchemaName`] -- Validated namespaced schema name (`ns/schema/task`)
//! - [`Role`] -- Membership role inside an access group

pub mod error;
pub mod kind;
pub mod name;
pub mod object;

pub use error::TypeError;
pub use kind::{ObjectKind, Role};
pub use name::SchemaName;
pub use object::ObjectId;
