//! Parametrix node binary
//!
//! Restores the ledgers from the configured snapshot, serves them through the
//! ledger actor until Ctrl+C, then writes a fresh snapshot.

use std::sync::Arc;

use anyhow::Result;
use prometheus::Encoder;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use parametrix_node::{HeightClock, LedgerActor, LedgerMetrics, NodeConfig, NodeSnapshot};
use parametrix_oracle::OracleLedger;
use parametrix_policy::PolicyLedger;

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::load()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)))
        .init();

    info!("Starting Parametrix node v{}", parametrix_common::VERSION);
    info!(?config, "Loaded configuration");

    let actor = match NodeSnapshot::load(&config.snapshot_path)? {
        Some(snapshot) => {
            info!(
                height = snapshot.height,
                digest = %snapshot.digest()?,
                "Restoring ledgers from snapshot"
            );
            LedgerActor::from_snapshot(snapshot)
        }
        None => {
            info!(owner = %config.owner, "No snapshot found, starting fresh ledgers");
            LedgerActor::new(
                PolicyLedger::new(config.owner.as_str()),
                OracleLedger::new(config.owner.as_str()),
                Arc::new(HeightClock::default()),
            )
        }
    };

    let registry = prometheus::Registry::new();
    let actor = if config.metrics_enabled {
        let metrics = LedgerMetrics::new()?;
        metrics.register(&registry)?;
        actor.with_metrics(metrics)
    } else {
        actor
    };

    let (handle, task) = actor.spawn(config.channel_capacity);
    info!(capacity = config.channel_capacity, "Ledger actor running");

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");

    let snapshot = handle.snapshot().await?;
    snapshot.save(&config.snapshot_path)?;
    info!(height = snapshot.height, digest = %snapshot.digest()?, "Final state persisted");

    if config.metrics_enabled {
        let mut buffer = Vec::new();
        prometheus::TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
        info!(metrics = %String::from_utf8_lossy(&buffer), "Ledger call counters");
    }

    drop(handle);
    task.await?;

    info!("Shutting down Parametrix node");
    Ok(())
}
