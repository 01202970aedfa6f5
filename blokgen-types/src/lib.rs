//! Shared DTOs (schemas-as-code) for the blokgen workspace.
//!
//! # Design constraints
//! - Component schemas are read from CMS exports; be tolerant of extra and null fields.
//! - Rollback snapshots are written to disk and must stay readable across releases.
//! - Prefer adding optional fields over changing semantics.

pub mod component;
pub mod entry;
pub mod rollback;

mod nullable;

pub use component::{ComponentSchema, FieldDescriptor, FieldKind, FieldOption, TAB_MARKER};
pub use entry::{ContentEntry, MigrationTarget};
pub use rollback::{ROLLBACK_DIR, RollbackSnapshot, is_rollback_file_for, rollback_file_name};

/// Schema identifiers.
pub mod schema {
    pub const BLOKGEN_ROLLBACK_V1: &str = "blokgen.rollback.v1";
}
