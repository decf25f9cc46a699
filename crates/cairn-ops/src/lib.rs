//! CRUD operation layer for Cairn.
//!
//! Every operation resolves the schema of its target from the object's
//! header, validates before mutating, and waits (bounded) for durable
//! persistence after mutating.
//!
//! # Key Types
//!
//! - [`Operations`] -- `create`, `read`, `update`, `delete`, `append`
//! - [`LiveValue`] -- every read is a standing subscription
//! - [`Evaluator`] / [`BasicEvaluator`] -- expressions in partial updates
//! - [`OpsConfig`] -- durability bound
//!
//! # Updates
//!
//! `update(id, partial)` evaluates expressions in `partial` against
//! `{"existing": <current content>}`, validates the *merged* object in full,
//! and writes only the evaluated delta.

pub mod config;
pub mod error;
pub mod expr;
pub mod live;
pub mod ops;

pub use config::OpsConfig;
pub use error::{OpsError, OpsResult};
pub use expr::{BasicEvaluator, EvalError, Evaluator};
pub use live::{LiveValue, ReadTarget};
pub use ops::{AppendOutcome, Created, Deleted, Operations, SchemaResolution, Updated};
