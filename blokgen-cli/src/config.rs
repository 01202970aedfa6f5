//! Configuration file loading for blokgen.
//!
//! Discovers and loads `blokgen.toml` from the working root and merges it with CLI arguments
//! (CLI takes precedence). Relative paths in the file resolve against the root.

use anyhow::Context;
use blokgen_core::http::DEFAULT_BASE_URL;
use blokgen_core::settings::{GenerateSettings, MigrateSettings, RollbackSettings};
use blokgen_core::{CompileOptions, RollbackRetention};
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use serde::Deserialize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "blokgen.toml";

/// Top-level configuration from blokgen.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlokgenConfig {
    pub generate: GenerateConfig,
    pub migrate: MigrateConfig,
    pub api: ApiConfig,
}

/// `[generate]` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    /// Component export file or directory.
    pub source: Option<Utf8PathBuf>,
    pub destination_file_path: Option<Utf8PathBuf>,
    pub type_names_prefix: Option<String>,
    pub type_names_suffix: Option<String>,
    pub custom_field_types_parser_path: Option<Utf8PathBuf>,

    /// `[generate.compiler]`, handed to the TypeScript compiler as is.
    pub compiler: CompileOptions,
}

/// `[migrate]` section. Shared by `migrate`, `rollback` and `list-rollbacks`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MigrateConfig {
    pub rollback_dir: Option<Utf8PathBuf>,

    /// Directory holding `change_<component>_<field>.toml` scripts.
    pub scripts_dir: Option<Utf8PathBuf>,

    /// What `rollback` does with a snapshot once it has been replayed.
    pub retention: RollbackRetention,
}

/// `[api]` section. The token is never read from the file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub space_id: Option<String>,
    pub base_url: Option<String>,
}

/// Discover the blokgen.toml config file under `root`.
pub fn discover_config(root: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = root.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse a blokgen.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<BlokgenConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

pub fn parse_config(contents: &str) -> anyhow::Result<BlokgenConfig> {
    let config: BlokgenConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load config from `root`, or return the default if there is none.
pub fn load_or_default(root: &Utf8Path) -> anyhow::Result<BlokgenConfig> {
    match discover_config(root) {
        Some(path) => load_config(&path),
        None => Ok(BlokgenConfig::default()),
    }
}

/// `generate` flags that override the file.
#[derive(Debug, Clone, Default)]
pub struct GenerateOverrides {
    pub source: Option<Utf8PathBuf>,
    pub destination_file_path: Option<Utf8PathBuf>,
    pub type_names_prefix: Option<String>,
    pub type_names_suffix: Option<String>,
    pub custom_field_types_parser_path: Option<Utf8PathBuf>,
}

/// Resolved content API location. The token travels separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub space_id: String,
    pub base_url: String,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: BlokgenConfig,
    root: Utf8PathBuf,
}

impl ConfigMerger {
    pub fn new(config: BlokgenConfig, root: &Utf8Path) -> Self {
        Self {
            config,
            root: root.to_path_buf(),
        }
    }

    fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        self.root.join(path)
    }

    pub fn merge_generate(&self, cli: GenerateOverrides) -> GenerateSettings {
        let file = &self.config.generate;
        let defaults = GenerateSettings::default();

        GenerateSettings {
            source: cli
                .source
                .or_else(|| file.source.as_deref().map(|p| self.resolve(p)))
                .unwrap_or_else(|| self.resolve(&defaults.source)),
            destination_file_path: cli.destination_file_path.or_else(|| {
                file.destination_file_path
                    .as_deref()
                    .map(|p| self.resolve(p))
            }),
            type_names_prefix: cli
                .type_names_prefix
                .or_else(|| file.type_names_prefix.clone())
                .unwrap_or(defaults.type_names_prefix),
            type_names_suffix: cli
                .type_names_suffix
                .or_else(|| file.type_names_suffix.clone())
                .unwrap_or(defaults.type_names_suffix),
            custom_field_types_parser_path: cli.custom_field_types_parser_path.or_else(|| {
                file.custom_field_types_parser_path
                    .as_deref()
                    .map(|p| self.resolve(p))
            }),
            compiler: file.compiler.clone(),
        }
    }

    pub fn rollback_dir(&self, cli: Option<Utf8PathBuf>) -> Utf8PathBuf {
        cli.or_else(|| self.config.migrate.rollback_dir.as_deref().map(|p| self.resolve(p)))
            .unwrap_or_else(|| self.resolve(&MigrateSettings::default().rollback_dir))
    }

    /// Where the script for `file_name` lives when `--script` is not given.
    pub fn script_path(&self, file_name: &str) -> Utf8PathBuf {
        let dir = self
            .config
            .migrate
            .scripts_dir
            .as_deref()
            .map(|p| self.resolve(p))
            .unwrap_or_else(|| self.resolve(Utf8Path::new(blokgen_core::script::MIGRATIONS_DIR)));
        dir.join(file_name)
    }

    /// Dry run unless `apply` is set.
    pub fn merge_migrate(&self, rollback_dir: Option<Utf8PathBuf>, apply: bool) -> MigrateSettings {
        MigrateSettings {
            rollback_dir: self.rollback_dir(rollback_dir),
            dry_run: !apply,
        }
    }

    /// `--delete` wins over a `keep` retention in the file.
    pub fn merge_rollback(&self, rollback_dir: Option<Utf8PathBuf>, delete: bool) -> RollbackSettings {
        RollbackSettings {
            rollback_dir: self.rollback_dir(rollback_dir),
            retention: if delete {
                RollbackRetention::Delete
            } else {
                self.config.migrate.retention
            },
        }
    }

    pub fn merge_api(
        &self,
        space_id: Option<String>,
        base_url: Option<String>,
    ) -> anyhow::Result<ApiSettings> {
        let space_id = space_id
            .or_else(|| self.config.api.space_id.clone())
            .context("no space id: pass --space or set [api] space_id in blokgen.toml")?;
        let base_url = base_url
            .or_else(|| self.config.api.base_url.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Ok(ApiSettings { space_id, base_url })
    }
}
