//! Core generate, migrate and rollback pipelines, extracted from the CLI.
//!
//! These entry points are I/O-agnostic: schemas, files, the content API and the rollback
//! directory are all reached through port traits.

use crate::adapters::load_custom_field_types;
use crate::ports::{
    ContentApi, EntryTransform, RejectedComponent, RollbackStore, SchemaSource, WritePort,
};
use crate::settings::{GenerateSettings, MigrateSettings, RollbackSettings};
use anyhow::Context;
use blokgen_domain::{
    CustomFieldTypeParser, GeneratedType, Generator, GeneratorConfig, SchemaCompilationError,
    TypeNamer,
};
use blokgen_migrate::{
    MigrateError, MigrationOptions, MigrationReport, RollbackReport, apply_migration,
    rollback_migration,
};
use blokgen_types::MigrationTarget;
use camino::Utf8PathBuf;
use sha2::{Digest, Sha256};
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

/// First line of every generated artifact.
pub const IMPORT_PREAMBLE: &str = "import type { StoryblokStory } from \"storyblok-generate-ts\";\n";

/// Error type for pipeline results. Exit code 2 = rollback state or drift, 1 = tool error.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error(transparent)]
    Migration(#[from] MigrateError),
    #[error("{path} is out of date; run `blokgen generate` to refresh it")]
    Drift { path: Utf8PathBuf },
    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl ToolError {
    pub fn exit_code(&self) -> u8 {
        match self {
            ToolError::Migration(err) => err.exit_code(),
            ToolError::Drift { .. } => 2,
            ToolError::Internal(_) => 1,
        }
    }
}

/// Outcome of `run_generate`.
#[derive(Debug)]
pub struct GenerateOutcome {
    pub artifact: String,
    pub sha256: String,
    pub types: Vec<GeneratedType>,
    pub failures: Vec<SchemaCompilationError>,
    /// Components dropped before generation because their schema could not be read.
    pub rejected: Vec<RejectedComponent>,
}

impl GenerateOutcome {
    /// True when any component is missing from the artifact.
    pub fn is_incomplete(&self) -> bool {
        !self.failures.is_empty() || !self.rejected.is_empty()
    }
}

/// Join the preamble and declarations with newlines.
pub fn emit_artifact<'a>(declarations: impl IntoIterator<Item = &'a str>) -> String {
    std::iter::once(IMPORT_PREAMBLE)
        .chain(declarations)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run the generate pipeline. Nothing is written; see [`write_generate_artifact`].
///
/// `custom` overrides the table named by `settings.custom_field_types_parser_path`.
pub fn run_generate(
    settings: &GenerateSettings,
    source: &dyn SchemaSource,
    custom: Option<Box<dyn CustomFieldTypeParser + Send + Sync>>,
) -> Result<GenerateOutcome, ToolError> {
    let loaded = source.load_components().context("load component schemas")?;

    let config = GeneratorConfig {
        namer: TypeNamer::new(&settings.type_names_prefix, &settings.type_names_suffix),
        compile: settings.compiler.clone(),
    };
    let mut generator = Generator::new(config);
    match (custom, &settings.custom_field_types_parser_path) {
        (Some(parser), _) => generator = generator.with_custom_field_types(parser),
        (None, Some(path)) => {
            let table = load_custom_field_types(path).context("load custom field types")?;
            generator = generator.with_custom_field_types(Box::new(table));
        }
        (None, None) => {}
    }

    let generation = generator.generate(&loaded.components);
    let artifact = emit_artifact(generation.declarations());
    let sha256 = sha256_hex(artifact.as_bytes());
    info!(
        types = generation.types.len(),
        failures = generation.failures.len(),
        rejected = loaded.rejected.len(),
        sha256 = %sha256,
        "artifact rendered"
    );

    Ok(GenerateOutcome {
        artifact,
        sha256,
        types: generation.types,
        failures: generation.failures,
        rejected: loaded.rejected,
    })
}

/// Write the artifact to `settings.destination_file_path`, replacing it whole.
///
/// Returns the path written, or `None` when no destination is configured.
pub fn write_generate_artifact(
    outcome: &GenerateOutcome,
    settings: &GenerateSettings,
    writer: &dyn WritePort,
) -> anyhow::Result<Option<Utf8PathBuf>> {
    let Some(dest) = &settings.destination_file_path else {
        debug!("no destination configured; artifact kept in memory");
        return Ok(None);
    };
    writer.write_file(dest, outcome.artifact.as_bytes())?;
    info!(path = %dest, bytes = outcome.artifact.len(), "artifact written");
    Ok(Some(dest.clone()))
}

/// Unified diff from `existing` to the freshly rendered artifact, `None` when identical.
pub fn artifact_drift(outcome: &GenerateOutcome, existing: &str) -> Option<String> {
    if existing == outcome.artifact {
        return None;
    }
    let patch = diffy::create_patch(existing, &outcome.artifact);
    Some(patch.to_string())
}

pub async fn run_migration(
    settings: &MigrateSettings,
    target: &MigrationTarget,
    api: &dyn ContentApi,
    store: &dyn RollbackStore,
    transform: &dyn EntryTransform,
) -> Result<MigrationReport, ToolError> {
    let run_id = Uuid::new_v4();
    let span = info_span!(
        "migrate",
        %run_id,
        migration = %target,
        dry_run = settings.dry_run,
        rollback_dir = %settings.rollback_dir
    );
    let opts = MigrationOptions {
        dry_run: settings.dry_run,
    };
    let report = apply_migration(api, store, target, transform, &opts)
        .instrument(span)
        .await?;
    Ok(report)
}

pub async fn run_rollback(
    settings: &RollbackSettings,
    target: &MigrationTarget,
    api: &dyn ContentApi,
    store: &dyn RollbackStore,
) -> Result<RollbackReport, ToolError> {
    let run_id = Uuid::new_v4();
    let span = info_span!(
        "rollback",
        %run_id,
        migration = %target,
        retention = ?settings.retention,
        rollback_dir = %settings.rollback_dir
    );
    let report = rollback_migration(api, store, target, settings.retention)
        .instrument(span)
        .await?;
    Ok(report)
}

/// Every snapshot file in the rollback directory, sorted.
pub fn list_rollbacks(store: &dyn RollbackStore) -> anyhow::Result<Vec<String>> {
    let mut files: Vec<String> = store
        .list()
        .context("list rollback directory")?
        .into_iter()
        .filter(|name| name.starts_with("rollback_") && name.ends_with(".json"))
        .collect();
    files.sort();
    Ok(files)
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
