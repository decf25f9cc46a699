//! Schema model for Cairn.
//!
//! Schemas are stored objects: a name, the kind of object they describe, an
//! indexing flag, and a [`Shape`] constraining content. Schemas reference
//! each other through `{"$co": "<name or id>"}` shapes; during seeding those
//! symbolic names are rewritten to object IDs.
//!
//! # Key Types
//!
//! - [`SchemaDefinition`] -- name, kind, indexing flag, and shape
//! - [`Shape`] / [`SchemaRef`] -- the constraint AST
//! - [`ShapeVisitor`] / [`ShapeVisitorMut`] -- typed traversal of references
//! - [`ValidationMode`] / [`Violation`] -- validation results
//! - [`meta`] -- the self-describing meta-schema

pub mod definition;
pub mod error;
pub mod meta;
pub mod shape;
pub mod validate;
pub mod visit;

pub use definition::SchemaDefinition;
pub use error::{SchemaError, SchemaResult};
pub use meta::{is_meta_schema_name, meta_schema, META_SCHEMA_NAME, SELF_PLACEHOLDER};
pub use shape::{SchemaRef, Shape};
pub use validate::{validate, ValidationMode, Violation};
pub use visit::{collect_refs, resolve_refs, walk, walk_mut, ShapeVisitor, ShapeVisitorMut};
