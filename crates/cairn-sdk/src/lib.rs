//! High-level SDK for Cairn.
//!
//! [`Cairn`] owns one store instance together with everything layered on
//! it: the schema registry, the index manager, the write hook that keeps
//! indexes current, the CRUD operations, and the seeder. This is the main
//! entry point for applications embedding Cairn.

pub mod config;
pub mod error;
pub mod instance;

pub use config::CairnConfig;
pub use error::{SdkError, SdkResult};
pub use instance::{Cairn, IndexSummary};

// Re-export key types
pub use cairn_index::{HookStats, IndexConfig, ReconcileReport};
pub use cairn_ops::{LiveValue, Operations, OpsConfig, ReadTarget};
pub use cairn_seed::{SeedBundle, SeedConfig, SeedReport, SeedSummary};
pub use cairn_types::{ObjectId, ObjectKind, SchemaName};
