//! Port traits abstracting all I/O away from the pipelines.
//!
//! The migration ports ([`ContentApi`], [`RollbackStore`]) live in `blokgen-migrate` and are
//! re-exported here so embedders only need this crate.

use blokgen_types::ComponentSchema;
use camino::Utf8Path;

pub use blokgen_migrate::{ContentApi, EntryTransform, RollbackStore};

/// Source of component schemas for a generation run.
///
/// An unreadable source is an error; a single malformed component is reported in
/// [`LoadedComponents::rejected`] and the rest are still loaded.
pub trait SchemaSource {
    fn load_components(&self) -> anyhow::Result<LoadedComponents>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadedComponents {
    pub components: Vec<ComponentSchema>,
    pub rejected: Vec<RejectedComponent>,
}

impl LoadedComponents {
    pub fn extend(&mut self, other: LoadedComponents) {
        self.components.extend(other.components);
        self.rejected.extend(other.rejected);
    }
}

/// A component entry that could not be read as a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedComponent {
    /// The entry's `name`, or `#<index>` when it has none.
    pub component: String,
    pub reason: String,
}

/// File-system write operations.
pub trait WritePort {
    fn write_file(&self, path: &Utf8Path, contents: &[u8]) -> anyhow::Result<()>;
    fn create_dir_all(&self, path: &Utf8Path) -> anyhow::Result<()>;
}
