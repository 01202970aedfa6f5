use crate::entry::{ContentEntry, MigrationTarget};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rollback snapshots live here, relative to the working directory.
pub const ROLLBACK_DIR: &str = "migrations/rollback";

pub fn rollback_file_name(component: &str, field: &str) -> String {
    format!("rollback_{component}_{field}.json")
}

/// True when `file_name` is the snapshot for exactly this component + field pair.
pub fn is_rollback_file_for(file_name: &str, component: &str, field: &str) -> bool {
    file_name == rollback_file_name(component, field)
}

/// Pre-image of every entry a migration batch is about to mutate.
///
/// Written once before the first push, never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    pub component: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    #[serde(default)]
    pub created: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub entries: Vec<ContentEntry>,
}

impl RollbackSnapshot {
    pub fn new(target: &MigrationTarget, entries: Vec<ContentEntry>) -> Self {
        Self {
            schema: Some(crate::schema::BLOKGEN_ROLLBACK_V1.to_string()),
            component: target.component.clone(),
            field: Some(target.field.clone()),
            created: true,
            created_at: Some(Utc::now()),
            entries,
        }
    }
}
