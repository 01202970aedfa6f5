//! Clap-free settings for the generate, migrate and rollback pipelines.

use blokgen_migrate::RollbackRetention;
use blokgen_render::CompileOptions;
use blokgen_types::ROLLBACK_DIR;
use camino::Utf8PathBuf;

/// Settings for the generate pipeline.
#[derive(Debug, Clone)]
pub struct GenerateSettings {
    /// Component export file, or a directory of component JSON files.
    pub source: Utf8PathBuf,

    /// Write target; `None` keeps the artifact in memory.
    pub destination_file_path: Option<Utf8PathBuf>,

    // Naming
    pub type_names_prefix: String,
    pub type_names_suffix: String,

    /// JSON table of custom field plugin id -> schema fragment.
    pub custom_field_types_parser_path: Option<Utf8PathBuf>,

    /// Handed to the TypeScript compiler verbatim.
    pub compiler: CompileOptions,
}

impl Default for GenerateSettings {
    fn default() -> Self {
        Self {
            source: Utf8PathBuf::from("components.json"),
            destination_file_path: None,
            type_names_prefix: String::new(),
            type_names_suffix: "Storyblok".to_string(),
            custom_field_types_parser_path: None,
            compiler: CompileOptions::default(),
        }
    }
}

/// Settings for the migrate pipeline.
#[derive(Debug, Clone)]
pub struct MigrateSettings {
    pub rollback_dir: Utf8PathBuf,
    pub dry_run: bool,
}

impl Default for MigrateSettings {
    fn default() -> Self {
        Self {
            rollback_dir: Utf8PathBuf::from(ROLLBACK_DIR),
            dry_run: true,
        }
    }
}

/// Settings for the rollback pipeline.
#[derive(Debug, Clone)]
pub struct RollbackSettings {
    pub rollback_dir: Utf8PathBuf,
    pub retention: RollbackRetention,
}

impl Default for RollbackSettings {
    fn default() -> Self {
        Self {
            rollback_dir: Utf8PathBuf::from(ROLLBACK_DIR),
            retention: RollbackRetention::default(),
        }
    }
}
