//! Seeding pipeline for Cairn.
//!
//! A [`SeedBundle`] carries schema definitions, configuration objects and
//! data records. [`Seeder::seed`] writes them in order:
//!
//! 1. the meta-schema, patched to reference its own ID
//! 2. bundle schemas, created in dependency order and then rewritten so
//!    every `{"$co": "<name>"}` reference holds an object ID
//! 3. configs, by category, in two passes so configs may reference each
//!    other
//! 4. data records, with `{"$nested": ..}` fields created first
//!
//! and finishes with an index sweep over everything it created.
//!
//! # Key Types
//!
//! - [`Seeder`] -- runs a bundle against one store
//! - [`SeedBundle`] -- the input format
//! - [`DependencyGraph`] -- schema ordering, cycles tolerated
//! - [`SeedReport`] -- seeded summary or skip reason
//!
//! # Design Rules
//!
//! - A bootstrapped store is never reseeded unless the bundle sets
//!   `force_fresh_seed`.
//! - Schema problems abort the seed. Record problems are collected unless
//!   [`SeedConfig::halt_on_record_error`] is set.
//! - Reseeding keeps schema object IDs stable and replaces instances.

pub mod bundle;
pub mod config;
pub mod error;
pub mod graph;
pub mod report;
pub mod seeder;

pub use bundle::{ConfigCategory, ConfigSpec, DataRecord, SeedBundle, SeedOptions};
pub use config::SeedConfig;
pub use error::{SeedError, SeedResult};
pub use graph::DependencyGraph;
pub use report::{RecordFailure, RecordKind, SeedReport, SeedSummary};
pub use seeder::Seeder;
