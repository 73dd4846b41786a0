use clap::Parser;
use crypto_arb::{
    init_logging, AppConfig, ArbitrageEngine, FeedRegistry, PlanSink, PriceFeed, TableReporter,
};
use log::{error, info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::watch;

/// Cross-exchange arbitrage monitor
#[derive(Debug, Parser)]
#[command(name = "arbitrage_monitor", version, about)]
struct Args {
    /// Path to the TOML config
    #[arg(short, long, env = "ARB_CONFIG", default_value = "config.toml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "ARB_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Also append logs to this file
    #[arg(long, env = "ARB_LOG_FILE")]
    log_file: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(&args.log_level, args.log_file.as_deref())?;

    let config = AppConfig::load(&args.config)?;
    if config.strategies.is_empty() {
        info!("No strategies configured in {}, nothing to do", args.config);
        return Ok(());
    }

    info!("Setting up exchange feeds and strategy engines...");
    let registry = FeedRegistry::with_defaults();
    let engine_configs = config.engine_configs(&registry)?;

    // Connectivity check, one per exchange
    let mut checked = HashSet::new();
    for (_, engine_config) in &engine_configs {
        for feed in [&engine_config.feed_a, &engine_config.feed_b] {
            if !checked.insert(feed.name()) {
                continue;
            }
            match feed.ping().await {
                Ok(()) => info!("Exchange {} is reachable", feed.name()),
                Err(e) => warn!("Exchange {} failed health check: {}", feed.name(), e),
            }
        }
    }

    let reporter = Arc::new(TableReporter::stdout());
    reporter.write_header()?;
    let sink: Arc<dyn PlanSink> = reporter;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut engines = Vec::with_capacity(engine_configs.len());
    for (name, engine_config) in engine_configs {
        info!("Starting strategy {} ({:?})", name, engine_config);
        let engine = ArbitrageEngine::new(engine_config, sink.clone());
        let shutdown = shutdown_rx.clone();
        engines.push((
            name,
            tokio::spawn(async move { engine.run(shutdown).await }),
        ));
    }

    // Wait for CTRL-C
    tokio::signal::ctrl_c().await?;
    info!("Shutdown requested, stopping {} engines", engines.len());
    let _ = shutdown_tx.send(true);

    for (name, handle) in engines {
        match handle.await {
            Ok(Ok(())) => info!("Strategy {} stopped", name),
            Ok(Err(e)) => error!("Strategy {} failed: {}", name, e),
            Err(e) => error!("Strategy {} task panicked: {}", name, e),
        }
    }

    Ok(())
}
