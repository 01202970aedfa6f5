//! Error types for blokgen-migrate.
//!
//! Two classes, mirrored in the exit code:
//! - Rollback-state conflicts (exit code 2): a snapshot already exists, or none exists to restore.
//!   The caller has to decide what to do with the rollback directory before retrying.
//! - Runtime errors (exit code 1): transport, storage, transform and snapshot parse failures.

use blokgen_types::MigrationTarget;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrateError {
    /// A snapshot for this component + field already exists; applying again would overwrite
    /// the only copy of the previous pre-image.
    #[error("rollback conflict: `{file}` already exists for {target}")]
    RollbackConflict { target: MigrationTarget, file: String },

    /// Rollback requested but no snapshot for this component + field is on disk.
    #[error("no rollback file found for {target}")]
    RollbackNotFound { target: MigrationTarget },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("rollback store: {0:#}")]
    Store(anyhow::Error),

    #[error("transform failed for entry {entry_id}: {source:#}")]
    Transform {
        entry_id: String,
        source: anyhow::Error,
    },

    #[error("`{file}` is not a readable rollback snapshot")]
    Snapshot {
        file: String,
        #[source]
        source: serde_json::Error,
    },
}

impl MigrateError {
    /// True for the rollback-state errors the caller must resolve by hand.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            MigrateError::RollbackConflict { .. } | MigrateError::RollbackNotFound { .. }
        )
    }

    pub fn exit_code(&self) -> u8 {
        if self.is_conflict() { 2 } else { 1 }
    }
}

pub type MigrateResult<T> = Result<T, MigrateError>;

/// Which remote call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportOp {
    Fetch,
    Push,
}

impl fmt::Display for TransportOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportOp::Fetch => f.write_str("fetch"),
            TransportOp::Push => f.write_str("push"),
        }
    }
}

/// A remote API call failed. Carries enough context to retry the entry by hand.
#[derive(Debug, Error)]
#[error(
    "{op} failed for {component}.{field} (entry {}): {message}",
    .entry_id.as_deref().unwrap_or("-")
)]
pub struct TransportError {
    pub op: TransportOp,
    pub component: String,
    pub field: String,
    pub entry_id: Option<String>,
    pub message: String,
}

impl TransportError {
    pub fn new(op: TransportOp, target: &MigrationTarget, entry_id: Option<String>, err: &anyhow::Error) -> Self {
        Self {
            op,
            component: target.component.clone(),
            field: target.field.clone(),
            entry_id,
            message: format!("{err:#}"),
        }
    }
}
