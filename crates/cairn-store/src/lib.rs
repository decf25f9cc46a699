//! Object store substrate for Cairn.
//!
//! This crate defines the contract the schema/index layers consume from the
//! underlying replicated object store, and ships an in-memory backend that
//! satisfies it. Objects are identified by the hash of their header and come
//! in three kinds: maps, ordered lists, and append-only logs.
//!
//! # Key Types
//!
//! - [`CoStore`] -- the substrate trait (single write entry point, reads,
//!   availability and durability waits, live subscriptions)
//! - [`Header`] -- immutable object header; `meta["$schema"]` carries the
//!   schema reference
//! - [`Content`] / [`Op`] -- tagged object content and the mutations on it
//! - [`WriteMessage`] -- the unit every write (local or remote) flows through
//! - [`WriteMiddleware`] / [`Next`] -- explicit interception of the write path
//! - [`InMemoryCoStore`] -- `HashMap`-based backend for tests and embedding
//!
//! # Design Rules
//!
//! 1. Every mutation, local or remote, is a [`WriteMessage`] passed to
//!    [`CoStore::write`]; middlewares see all of them.
//! 2. Headers are immutable; the object ID is derived from the header.
//! 3. Remote ops for an object whose header has not arrived are buffered and
//!    the object stays unavailable until the header lands.
//! 4. Merge semantics are the substrate's business; this crate applies ops
//!    in arrival order.

pub mod content;
pub mod error;
pub mod groups;
pub mod header;
pub mod memory;
pub mod message;
pub mod middleware;
pub mod traits;

pub use content::{Content, Op};
pub use error::{StoreError, StoreResult};
pub use groups::{
    add_member, create_account, create_group, extend_group, member_role, remove_member,
    revoke_extension,
};
pub use header::{meta, object_type, Header, Meta, SCHEMA_KEY, TYPE_KEY};
pub use memory::InMemoryCoStore;
pub use message::{WriteMessage, WriteOrigin};
pub use middleware::{Next, WriteMiddleware};
pub use traits::{CoStore, ObjectHandle};
