use anyhow::{Context, Result};
use cdn_localization::config::Config;
use cdn_localization::retry::RetryConfig;
use cdn_localization::storage::DirStorage;
use cdn_localization::{CdnClient, LoadResult, ServiceHost};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cdn_localization=info".parse()?),
        )
        .init();

    info!("Starting localization load");

    // Load configuration from environment
    let config = Config::from_env()?;
    let endpoints = config.endpoints();
    info!("Project: {}", config.project_id);
    info!("Base URL: {}", endpoints.base_url);
    info!("Version URL: {}", endpoints.version_url);

    let storage = DirStorage::open(&config.storage_dir)
        .with_context(|| format!("Failed to open cache at {}", config.storage_dir.display()))?;

    let host = ServiceHost::new();
    let service = host.activate(
        config.service_settings(),
        CdnClient::new(endpoints),
        Arc::new(storage),
    )?;

    // Step 1: Active language first, then the rest in the background
    let bulk = if !config.version_gated {
        service.initialize_simple().await
    } else if config.startup_retries > 1 {
        let retry = RetryConfig::startup(config.startup_retries);
        let active = service
            .resolve_with_retry(service.current_language(), &retry)
            .await;
        service.finish_initialization(active)
    } else {
        service.initialize().await
    };

    // Step 2: Wait for the background loads
    let mut results = vec![bulk.active];
    match bulk.background.await {
        Ok(rest) => results.extend(rest),
        Err(e) => warn!("Background load task failed: {}", e),
    }

    print_results(&results);

    let failed = results.iter().filter(|r| !r.success).count();
    if failed > 0 {
        warn!("{} of {} languages have no data", failed, results.len());
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&service.metrics().report())?
    );

    service.destroy();
    info!("Localization load finished");
    Ok(())
}

fn print_results(results: &[LoadResult]) {
    println!("\nLanguage           Source  Keys  Version");
    println!("─────────────────────────────────────────");
    for result in results {
        let source = if result.success {
            result.source.to_string()
        } else {
            "none".to_string()
        };
        println!(
            "{:<18} {:<7} {:>4}  {}",
            format!("{} ({})", result.language.native_name(), result.language.code()),
            source,
            result.key_count,
            result.version.as_deref().unwrap_or("-")
        );
    }
    println!();
}
