//! Migration runner for remote content, with snapshot-based rollback.
//!
//! Responsibilities:
//! - Fetch the entries a component + field migration touches and transform them in memory.
//! - Snapshot the pre-image of every entry about to change, atomically, before the first push.
//! - Push changes sequentially; replay a snapshot verbatim to undo a batch.

mod error;
mod ports;
mod runner;

pub use error::{MigrateError, MigrateResult, TransportError, TransportOp};
pub use ports::{
    ApiCredentials, ContentApi, EntryTransform, InMemoryContentApi, InMemoryRollbackStore,
    RollbackStore,
};
pub use runner::{
    BatchState, MigrationOptions, MigrationReport, RollbackReport, RollbackRetention,
    apply_migration, create_rollback_file, existing_rollback_files, rollback_migration,
};
