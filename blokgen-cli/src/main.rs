use anyhow::Context;
use blokgen_cli::config::{self, ConfigMerger, GenerateOverrides};
use blokgen_core::adapters::{FsRollbackStore, FsSchemaSource, FsWritePort};
use blokgen_core::http::HttpContentApi;
use blokgen_core::pipeline::{
    ToolError, artifact_drift, list_rollbacks, run_generate, run_migration, run_rollback,
    write_generate_artifact,
};
use blokgen_core::script::{MigrationScript, script_file_name};
use blokgen_core::{BatchState, MigrationTarget};
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use fs_err as fs;
use std::future::Future;
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "blokgen",
    version,
    about = "TypeScript types from Storyblok component schemas, and reversible content migrations."
)]
struct Cli {
    /// Working root: blokgen.toml and relative config paths resolve against it.
    #[arg(long, global = true, default_value = ".")]
    root: Utf8PathBuf,

    /// Explicit config file (default: <root>/blokgen.toml when present).
    #[arg(long, global = true)]
    config: Option<Utf8PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate the TypeScript declaration file from component schemas.
    Generate(GenerateArgs),
    /// Transform every entry using a component (default: dry-run).
    Migrate(MigrateArgs),
    /// Restore the entries captured by a migration snapshot.
    Rollback(RollbackArgs),
    /// List the snapshot files in the rollback directory.
    ListRollbacks(ListRollbacksArgs),
}

#[derive(Debug, Parser)]
struct GenerateArgs {
    /// Component export file, or a directory of component JSON files.
    #[arg(long)]
    source: Option<Utf8PathBuf>,

    /// Output file. Without one the artifact goes to stdout.
    #[arg(long)]
    destination: Option<Utf8PathBuf>,

    #[arg(long)]
    prefix: Option<String>,

    #[arg(long)]
    suffix: Option<String>,

    /// JSON table mapping custom field plugin ids to schema fragments.
    #[arg(long)]
    custom_field_types: Option<Utf8PathBuf>,

    /// Fail with exit code 2 and print a diff if the destination is out of date. Writes nothing.
    #[arg(long, default_value_t = false)]
    check: bool,
}

#[derive(Debug, Args)]
struct TargetArgs {
    /// Component whose bloks are migrated.
    #[arg(long)]
    component: String,

    /// Field the migration is about; names the snapshot file.
    #[arg(long)]
    field: String,
}

#[derive(Debug, Args)]
struct ApiArgs {
    /// Management API OAuth token.
    #[arg(long, env = "BLOKGEN_OAUTH_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Space id (default: [api] space_id).
    #[arg(long)]
    space: Option<String>,

    /// Management API base URL.
    #[arg(long)]
    base_url: Option<String>,
}

#[derive(Debug, Parser)]
struct MigrateArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Migration script (default: migrations/change_<component>_<field>.toml).
    #[arg(long)]
    script: Option<Utf8PathBuf>,

    /// Snapshot and push changes. If omitted, only reports what would change.
    #[arg(long, default_value_t = false)]
    apply: bool,

    #[arg(long)]
    rollback_dir: Option<Utf8PathBuf>,

    #[command(flatten)]
    api: ApiArgs,
}

#[derive(Debug, Parser)]
struct RollbackArgs {
    #[command(flatten)]
    target: TargetArgs,

    /// Remove the snapshot once every entry has been restored.
    #[arg(long, default_value_t = false)]
    delete: bool,

    #[arg(long)]
    rollback_dir: Option<Utf8PathBuf>,

    #[command(flatten)]
    api: ApiArgs,
}

#[derive(Debug, Parser)]
struct ListRollbacksArgs {
    #[arg(long)]
    rollback_dir: Option<Utf8PathBuf>,

    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = real_main(cli) {
        error!("{}", e);
        return ExitCode::from(e.exit_code());
    }
    ExitCode::SUCCESS
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn real_main(cli: Cli) -> Result<(), ToolError> {
    let file_config = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => config::load_or_default(&cli.root).context("load blokgen.toml config")?,
    };
    let merger = ConfigMerger::new(file_config, &cli.root);

    match cli.cmd {
        Command::Generate(args) => cmd_generate(&merger, args),
        Command::Migrate(args) => cmd_migrate(&merger, args),
        Command::Rollback(args) => cmd_rollback(&merger, args),
        Command::ListRollbacks(args) => cmd_list_rollbacks(&merger, args),
    }
}

fn cmd_generate(merger: &ConfigMerger, args: GenerateArgs) -> Result<(), ToolError> {
    let settings = merger.merge_generate(GenerateOverrides {
        source: args.source,
        destination_file_path: args.destination,
        type_names_prefix: args.prefix,
        type_names_suffix: args.suffix,
        custom_field_types_parser_path: args.custom_field_types,
    });
    debug!(
        "merged config: source={}, destination={:?}, prefix={:?}, suffix={:?}",
        settings.source,
        settings.destination_file_path,
        settings.type_names_prefix,
        settings.type_names_suffix
    );

    let source = FsSchemaSource::new(settings.source.clone());
    let outcome = run_generate(&settings, &source, None)?;
    if outcome.is_incomplete() {
        warn!(
            failures = outcome.failures.len(),
            rejected = outcome.rejected.len(),
            "some components were skipped; the artifact is incomplete and unions that name a \
             skipped component reference a type it does not declare"
        );
    }

    if args.check {
        let dest = settings
            .destination_file_path
            .clone()
            .context("--check needs a destination (--destination or [generate] destination_file_path)")?;
        let existing = if dest.exists() {
            fs::read_to_string(&dest).with_context(|| format!("read {}", dest))?
        } else {
            String::new()
        };
        return match artifact_drift(&outcome, &existing) {
            Some(diff) => {
                print!("{}", diff);
                Err(ToolError::Drift { path: dest })
            }
            None => {
                info!(path = %dest, "artifact is up to date");
                Ok(())
            }
        };
    }

    match write_generate_artifact(&outcome, &settings, &FsWritePort)? {
        Some(path) => info!("wrote {} types to {}", outcome.types.len(), path),
        None => print!("{}", outcome.artifact),
    }
    Ok(())
}

fn cmd_migrate(merger: &ConfigMerger, args: MigrateArgs) -> Result<(), ToolError> {
    let target = MigrationTarget::new(args.target.component, args.target.field);
    let script_path = args
        .script
        .unwrap_or_else(|| merger.script_path(&script_file_name(&target)));
    let script = MigrationScript::load(target.clone(), &script_path)?;
    debug!(script = %script_path, ops = script.ops().len(), "loaded migration script");

    let settings = merger.merge_migrate(args.rollback_dir, args.apply);
    let api = content_api(merger, args.api)?;
    let store = FsRollbackStore::new(settings.rollback_dir.clone());

    let report = block_on(run_migration(&settings, &target, &api, &store, &script))??;

    match report.state {
        BatchState::Pending => {
            println!(
                "dry-run: {} of {} entries would change for {}",
                report.changed.len(),
                report.fetched,
                target
            );
            for id in &report.changed {
                println!("  {}", id);
            }
            if !report.changed.is_empty() {
                println!("Re-run with --apply to snapshot and push these entries.");
            }
        }
        _ => match &report.snapshot_file {
            Some(file) => println!(
                "migrated {}: pushed {} of {} entries (rollback snapshot {})",
                target, report.pushed, report.fetched, file
            ),
            None => println!("nothing to migrate for {}", target),
        },
    }
    Ok(())
}

fn cmd_rollback(merger: &ConfigMerger, args: RollbackArgs) -> Result<(), ToolError> {
    let target = MigrationTarget::new(args.target.component, args.target.field);
    let settings = merger.merge_rollback(args.rollback_dir, args.delete);
    let store = FsRollbackStore::new(settings.rollback_dir.clone());
    let api = content_api(merger, args.api)?;

    let report = block_on(run_rollback(&settings, &target, &api, &store))??;

    println!(
        "restored {} entries for {} from {}",
        report.restored,
        target,
        report.files.join(", ")
    );
    if report.removed {
        println!("snapshot removed");
    }
    Ok(())
}

fn cmd_list_rollbacks(merger: &ConfigMerger, args: ListRollbacksArgs) -> Result<(), ToolError> {
    let store = FsRollbackStore::new(merger.rollback_dir(args.rollback_dir));
    let files = list_rollbacks(&store)?;

    match args.format {
        OutputFormat::Text => {
            if files.is_empty() {
                println!("No rollback snapshots in {}", store.dir());
            }
            for file in &files {
                println!("{}", file);
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&files).context("serialize json")?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn content_api(merger: &ConfigMerger, args: ApiArgs) -> anyhow::Result<HttpContentApi> {
    let api = merger.merge_api(args.space, args.base_url)?;
    let token = args
        .token
        .context("no OAuth token: pass --token or set BLOKGEN_OAUTH_TOKEN")?;
    debug!(space = %api.space_id, base_url = %api.base_url, "content api");
    Ok(HttpContentApi::new(&api.base_url, &api.space_id, token))
}

fn block_on<F: Future>(fut: F) -> anyhow::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start async runtime")?;
    Ok(runtime.block_on(fut))
}
