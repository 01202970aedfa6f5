use anyhow::Context;
use blokgen_core::script::{MIGRATIONS_DIR, script_file_name};
use blokgen_types::{MigrationTarget, ROLLBACK_DIR};
use clap::{Parser, Subcommand};
use fs_err as fs;
use std::path::Path;
use std::process::Command as ProcessCommand;

const SCRIPT_TEMPLATE: &str = r#"# Ops run in order on every `{component}` blok found in an entry's content.
# `field` defaults to "{field}".
#
# [[ops]]
# op = "rename"
# to = "new_name"
#
# [[ops]]
# op = "default"
# value = ""
"#;

#[derive(Debug, Parser)]
#[command(name = "xtask", about = "Workspace helper tasks")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print schema identifiers used by blokgen.
    PrintSchemas,
    /// Create the migrations layout and an empty script for one component + field.
    InitMigration {
        #[arg(long)]
        component: String,
        #[arg(long)]
        field: String,
        #[arg(long, default_value = ".")]
        root: String,
    },
    /// Bless golden fixtures (overwrite expected outputs).
    BlessFixtures,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::PrintSchemas => {
            println!("{}", blokgen_types::schema::BLOKGEN_ROLLBACK_V1);
        }
        Command::InitMigration {
            component,
            field,
            root,
        } => {
            let root = Path::new(&root);
            let rollback = root.join(ROLLBACK_DIR);
            fs::create_dir_all(&rollback)
                .with_context(|| format!("create {}", rollback.display()))?;

            let target = MigrationTarget::new(component, field);
            let script = root.join(MIGRATIONS_DIR).join(script_file_name(&target));
            if script.exists() {
                anyhow::bail!("{} already exists", script.display());
            }
            let body = SCRIPT_TEMPLATE
                .replace("{component}", &target.component)
                .replace("{field}", &target.field);
            fs::write(&script, body)?;
            println!("initialized {}", script.display());
        }
        Command::BlessFixtures => {
            let status = ProcessCommand::new("cargo")
                .args(["test", "-p", "blokgen-core", "--test", "golden_fixtures"])
                .env("BLOKGEN_BLESS", "1")
                .status()
                .context("run golden fixture blessing")?;
            if !status.success() {
                anyhow::bail!("bless-fixtures failed");
            }
        }
    }
    Ok(())
}
