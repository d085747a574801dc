//! Raise a project's version in the translation repository's `version.json`.
//!
//! Clients only download new tables after this runs, since a matching
//! version keeps them on their cached copy.
//!
//! Usage:
//!   cargo run --bin bump-version -- --id 48TangTang
//!   cargo run --bin bump-version -- --id 48TangTang --type minor
//!   cargo run --bin bump-version -- --list

use anyhow::{bail, Result};
use cdn_localization::registry::{BumpKind, ProjectRegistry};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bump-version")]
#[command(about = "Bump a project's version in version.json")]
struct Cli {
    /// Project id (e.g. 48TangTang)
    #[arg(long, required_unless_present = "list")]
    id: Option<String>,

    /// Size of the change
    #[arg(long = "type", value_enum, default_value_t = BumpKind::Patch)]
    kind: BumpKind,

    /// List registered projects and exit
    #[arg(long)]
    list: bool,

    /// Path to version.json
    #[arg(long, default_value = "version.json")]
    file: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cdn_localization=warn".parse()?),
        )
        .init();

    let cli = Cli::parse();

    if !cli.file.exists() {
        bail!("{} not found", cli.file.display());
    }
    let mut registry = ProjectRegistry::load(&cli.file)?;

    if cli.list {
        print_projects(&registry);
        return Ok(());
    }

    let Some(id) = cli.id else {
        bail!("--id is required");
    };

    if !registry.contains(&id) {
        print_projects(&registry);
        bail!("Project not found: {}", id);
    }

    let (old, new) = registry.bump(&id, cli.kind)?;
    registry.save()?;

    println!("Project: {}", id);
    println!("Version: {} → {} ({})", old, new, cli.kind);
    println!("✓ {} updated", cli.file.display());
    println!("\nCDN caches can take up to 24 hours to pick up the new manifest.");

    Ok(())
}

fn print_projects(registry: &ProjectRegistry) {
    println!("\nRegistered projects:\n");
    println!("  Project ID             Version");
    println!("  ─────────────────────────────");
    for (id, version) in registry.projects() {
        println!("  {:<22} {}", id, version);
    }
    println!();
}
