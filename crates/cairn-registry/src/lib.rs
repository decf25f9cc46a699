//! Schema registry for Cairn.
//!
//! Every principal owns one registry root. The root links the structures
//! the schema and index layers share:
//!
//! ```text
//! account["registry"] -> root
//! root["schemas"]      -> map  name -> schema object ID
//! root["indexes"]      -> map  schema object ID -> index list ID
//! root["unclassified"] -> list of object IDs with no schema
//! root["manifest"]     -> list of instance IDs created by the last seed
//! ```
//!
//! # Key Types
//!
//! - [`Registry`] -- get-or-create of the root, registration and lookup
//! - [`RegistryRoot`] -- the resolved IDs of the root's children
//! - [`RegistryState`] -- per-store state: internal IDs, cached root,
//!   meta-schema ID
//! - [`RegisterOutcome`] -- what a registration attempt did
//!
//! # Design Rules
//!
//! 1. The root is created at most once. An existing reference that cannot
//!    be loaded right now is never replaced; callers get `None`.
//! 2. A name maps to one schema ID forever. Registering a different ID
//!    under a taken name is refused.
//! 3. Registry and index objects are recorded as internal *before* their
//!    creating write, so the write path can recognise them.

pub mod error;
pub mod registry;
pub mod root;
pub mod state;

pub use error::{RegistryError, RegistryResult};
pub use registry::{RegisterOutcome, Registry};
pub use root::{ChildRef, RegistryRoot};
pub use state::RegistryState;
