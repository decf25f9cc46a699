//! Index manager and write-path indexing for Cairn.
//!
//! Every non-internal object ends up in exactly one place: the index list of
//! its schema (when that schema has indexing enabled) or the unclassified
//! list (when it has no schema). Objects of schemas without indexing, and
//! the registry/index machinery itself, are never indexed.
//!
//! # Key Types
//!
//! - [`IndexManager`] -- classification, get-or-create of index lists,
//!   idempotent indexing and removal, reconciliation
//! - [`IndexingHook`] -- [`WriteMiddleware`](cairn_store::WriteMiddleware)
//!   that schedules indexing after writes
//! - [`IndexState`] -- per-store in-flight set with RAII release
//! - [`Classification`] / [`IndexOutcome`] -- decisions and results
//!
//! # Feedback loops
//!
//! Indexing writes to index lists and registry maps. Those writes re-enter
//! the hook, which recognises them as internal in a synchronous pre-check
//! and never schedules work for them.

pub mod classify;
pub mod config;
pub mod error;
pub mod hook;
pub mod manager;
pub mod reconcile;
pub mod state;

pub use classify::Classification;
pub use config::IndexConfig;
pub use error::{IndexError, IndexResult};
pub use hook::{HookStats, IndexingHook};
pub use manager::{IndexManager, IndexOutcome};
pub use reconcile::ReconcileReport;
pub use state::{InFlightGuard, IndexState};
