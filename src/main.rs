use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use groupie_tracker::{
    cache::SnapshotCache,
    config::Config,
    ingestor::{ArtistAggregator, BuildStateManager, RefreshScheduler},
    query::{ArtistQueryService, FilterEngine},
    sources::HttpSourceClient,
    web::WebServer,
};

#[derive(Parser)]
#[command(name = "groupie-tracker")]
#[command(version)]
#[command(about = "Aggregates and serves artist, location and concert data")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Artist listing URL (overrides config file)
    #[arg(short = 'u', long, value_name = "URL")]
    base_url: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging with specified level
    let log_filter = if cli.log_level == "trace" {
        format!("groupie_tracker={},tower_http=trace", cli.log_level)
    } else {
        format!("groupie_tracker={}", cli.log_level)
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Groupie Tracker v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration from specified file
    std::env::set_var("CONFIG_FILE", &cli.config);
    let mut config = Config::load()?;
    info!("Configuration loaded from: {}", cli.config);

    // Override config with CLI arguments
    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(base_url) = cli.base_url {
        config.source.base_url = base_url;
        config.validate()?;
    }

    info!("Using artist source: {}", config.source.base_url);

    let state_manager = BuildStateManager::new();
    let client = Arc::new(HttpSourceClient::new(&config.source));
    let aggregator = ArtistAggregator::from_config(client, &config, state_manager.clone());
    let cache = SnapshotCache::new(Arc::new(aggregator), state_manager)
        .with_build_timeout(config.cache.build_timeout());

    // The catalogue is built before the server accepts any request
    let startup_build_at = Utc::now();
    match cache.rebuild().await {
        Ok(report) => info!(
            "Initial snapshot ready: {} artists in {} ms",
            report.artists, report.duration_ms
        ),
        Err(e) if config.cache.fail_on_startup_error => {
            error!("Initial snapshot build failed: {}", e);
            return Err(e.into());
        }
        Err(e) => warn!(
            "Initial snapshot build failed, serving 'not ready' until a retry succeeds: {}",
            e
        ),
    }

    let scheduler = RefreshScheduler::from_config(cache.clone(), &config.cache)?
        .with_last_attempt(startup_build_at);
    tokio::spawn(async move {
        if let Err(e) = scheduler.start().await {
            error!("Refresh scheduler failed: {}", e);
        }
    });

    let query_service =
        ArtistQueryService::new(cache.clone(), FilterEngine::new(config.filter.text_match));
    info!("Text search mode: {:?}", config.filter.text_match);

    let web_server = WebServer::new(&config, cache, query_service)?;

    info!(
        "Starting web server on {}:{}",
        web_server.host(),
        web_server.port()
    );
    web_server.serve().await?;

    Ok(())
}
