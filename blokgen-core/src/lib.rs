//! Embeddable core library for blokgen.
//!
//! Provides a clap-free, I/O-abstracted entry point for generating TypeScript declarations
//! from component schemas and for running reversible content migrations.
//!
//! # Port traits
//!
//! All I/O is abstracted behind port traits in [`ports`]:
//! - [`SchemaSource`](ports::SchemaSource) - load component schemas
//! - [`WritePort`](ports::WritePort) - write files and create directories
//! - [`ContentApi`](ports::ContentApi) - read and update remote entries
//! - [`RollbackStore`](ports::RollbackStore) - the rollback snapshot directory
//!
//! The [`adapters`] module provides filesystem and in-memory implementations; [`http`] holds the
//! management API client.
//!
//! # Entry points
//!
//! - [`run_generate`](pipeline::run_generate) - render the declaration artifact
//! - [`run_migration`](pipeline::run_migration) - snapshot, transform and push entries
//! - [`run_rollback`](pipeline::run_rollback) - replay a snapshot

pub mod adapters;
pub mod http;
pub mod pipeline;
pub mod ports;
pub mod script;
pub mod settings;

// Re-exports so embedders don't need the lower crates directly.
pub use blokgen_domain::{CustomFieldTypeParser, FieldTypeTable, GeneratedType, TypeOrigin};
pub use blokgen_migrate::{
    BatchState, MigrateError, MigrationReport, RollbackReport, RollbackRetention,
};
pub use blokgen_render::CompileOptions;
pub use blokgen_types::{ComponentSchema, ContentEntry, MigrationTarget};
