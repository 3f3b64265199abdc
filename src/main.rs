use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use waste_monitor::api::{self, AppState};
use waste_monitor::client::DashboardClient;
use waste_monitor::config::AppConfig;
use waste_monitor::geo::{GeoDataCache, HttpGeoSource};
use waste_monitor::models::{CacheStatus, DatasetKey};
use waste_monitor::render::render_datasets;

#[derive(Parser)]
#[command(name = "wastemon")]
#[command(about = "Waste monitoring dashboard service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the dashboard service
    Serve {
        /// Port for HTTP API (overrides WASTE_MONITOR_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Fetch one boundary dataset and print a summary
    Fetch {
        /// Dataset key, e.g. kelurahan-boundaries
        dataset: String,
    },
    /// Show dataset cache state of a running service
    Status {
        /// API base URL (defaults to WASTE_MONITOR_URL)
        #[arg(long)]
        url: Option<String>,
    },
    /// List registered datasets
    Datasets,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "waste_monitor=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    let state = AppState::from_config(&config)?;

    // The store stays pending until accounts load; a bad file aborts startup.
    let count = state
        .identity
        .load_accounts_file(&config.accounts_file)
        .await
        .with_context(|| {
            format!(
                "Failed to load accounts from {}",
                config.accounts_file.display()
            )
        })?;
    tracing::info!(count, path = %config.accounts_file.display(), "Loaded accounts");

    let cache = Arc::clone(&state.cache);
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", config.port)).await?;
    tracing::info!(
        "Waste monitor listening on http://127.0.0.1:{}",
        config.port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    cache.log_stats();
    Ok(())
}

async fn fetch(config: AppConfig, dataset: String) -> anyhow::Result<()> {
    let key = DatasetKey::new(dataset);
    if !config.datasets.contains(&key) {
        anyhow::bail!("Unknown dataset: {}", key);
    }

    let source = HttpGeoSource::with_timeout(
        config.geo_base_url.clone(),
        config.datasets.clone(),
        config.geo_timeout,
    )?;
    let cache = GeoDataCache::new(Arc::new(source));
    let entry = cache.request(&key).settled().await;

    match (entry.status, entry.data) {
        (CacheStatus::Loaded, Some(data)) => {
            println!("{}: {} features", key, data.len());
            Ok(())
        }
        _ => anyhow::bail!(
            "{}: {}",
            key,
            entry.error_message.unwrap_or_else(|| "fetch did not settle".to_string())
        ),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = AppConfig::from_env()?;

    match cli.command {
        Some(Commands::Serve { port }) => {
            let config = AppConfig {
                port: port.unwrap_or(config.port),
                ..config
            };
            serve(config).await?;
        }
        Some(Commands::Fetch { dataset }) => fetch(config, dataset).await?,
        Some(Commands::Status { url }) => {
            let client = match url {
                Some(url) => DashboardClient::new(url, std::env::var("WASTE_MONITOR_TOKEN").ok()),
                None => DashboardClient::from_env(),
            };
            let states = client.datasets().await?;
            print!("{}", render_datasets(&states));
        }
        Some(Commands::Datasets) => {
            for (key, path) in config.datasets.iter() {
                println!("{}\t{}", key, path);
            }
        }
        None => serve(config).await?,
    }

    Ok(())
}
