//! Register a new project in the translation repository.
//!
//! Creates `{repo}/{id}/{ko,en,cn}.json` holding empty tables and adds the
//! project to `version.json` at 1.0.0.
//!
//! Usage:
//!   cargo run --bin setup-project -- --id 52NewProject --repo ../kakao_localization

use anyhow::Result;
use cdn_localization::registry::{scaffold_project, validate_project_id, ProjectRegistry};
use cdn_localization::remote::DEFAULT_CDN_BASE_URL;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "setup-project")]
#[command(about = "Create the folder and manifest entry for a new project")]
struct Cli {
    /// Project id in <number><CamelCaseName> form (e.g. 52NewProject)
    #[arg(long)]
    id: String,

    /// Root of the translation repository
    #[arg(long, default_value = ".")]
    repo: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cdn_localization=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let mut registry = ProjectRegistry::load_or_default(cli.repo.join("version.json"))?;

    if let Err(e) = validate_project_id(&cli.id) {
        let next = registry.next_project_number();
        eprintln!("Hint: the next project number is {} (e.g. {}NewProject)", next, next);
        return Err(e.into());
    }

    println!("[Step 1] Create project folder");
    if scaffold_project(&cli.repo, &cli.id)? {
        println!("✓ Created {}", cli.repo.join(&cli.id).display());
    } else {
        println!("Project folder already exists, left unchanged");
    }

    println!("[Step 2] Update version.json");
    if registry.add_project(&cli.id)? {
        registry.save()?;
        println!("✓ {} = 1.0.0", cli.id);
    } else {
        println!(
            "{} is already registered at {}",
            cli.id,
            registry.get(&cli.id).unwrap_or("?")
        );
    }

    println!("\nCDN URL:");
    println!("  {}/{}/ko.json\n", DEFAULT_CDN_BASE_URL, cli.id);
    Ok(())
}
