//! Headless playback binary for BioSim topics.
//!
//! Loads configuration, resolves one built-in topic, and lets its
//! playback clock run while every render snapshot is written to the log.
//! A view layer would consume the same snapshots from the `watch` channel.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `biosim-config.yaml` (or `BIOSIM_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Load the topic's phase table (and catalog metadata, if configured)
//! 4. Start playback and the snapshot logger
//! 5. Run for `session.run_seconds`, or until Ctrl-C
//! 6. Stop playback and log the reset snapshot

mod error;
mod snapshot_log;

use std::path::PathBuf;
use std::time::Duration;

use biosim_core::catalog::{CatalogProvider, StaticCatalog};
use biosim_core::config::{BiosimConfig, LogFormat, LoggingConfig};
use biosim_core::{Playback, TopicLibrary};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Application entry point for the playback binary.
///
/// # Errors
///
/// Returns an error if configuration, topic lookup, or playback startup
/// fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Config comes first so the log level and format can be read from it.
    let config = load_config()?;
    init_tracing(&config.logging);

    info!("biosim-engine starting");
    info!(
        topic = config.session.topic,
        run_seconds = config.session.run_seconds,
        time_scale = config.playback.time_scale,
        seed = ?config.playback.seed,
        "Configuration loaded"
    );

    run(config).await?;

    info!("biosim-engine shutdown complete");
    Ok(())
}

/// Resolve the configured topic and play it until the session ends.
async fn run(config: BiosimConfig) -> Result<(), EngineError> {
    if let Some(path) = &config.session.catalog {
        let catalog = StaticCatalog::from_file(path)?;
        describe_topic(&catalog, &config.session.topic);
    }

    let library = TopicLibrary::builtin()?;
    let topic = library.get(&config.session.topic)?;
    info!(
        topic = topic.id(),
        phase_count = topic.phase_count(),
        policy = topic.policy().as_str(),
        "Phase table loaded"
    );

    let playback = Playback::new(topic, config.playback)?;
    let logger = snapshot_log::spawn(playback.subscribe());
    playback.set_running(true)?;

    wait_for_end(config.session.run_seconds).await?;

    playback.set_running(false)?;
    snapshot_log::log_snapshot(&playback.snapshot());
    drop(playback);

    match logger.await {
        Ok(observed) => info!(observed, "Snapshot logger finished"),
        Err(e) => warn!(error = %e, "Snapshot logger task failed"),
    }
    Ok(())
}

/// Log the catalog entry for `topic`, if the host catalog has one.
fn describe_topic(catalog: &impl CatalogProvider, topic: &str) {
    let Some(meta) = catalog.simulation(topic) else {
        warn!(topic, "Topic has no catalog entry");
        return;
    };
    let chapter = catalog
        .chapter(meta.chapter_id)
        .map_or("", |c| c.title.as_str());
    info!(
        name = meta.name,
        chapter,
        kind = ?meta.kind,
        duration = meta.duration,
        difficulty = meta.difficulty,
        key_points = meta.key_points.len(),
        "Catalog entry found"
    );
}

/// Wait for the run timer or Ctrl-C, whichever comes first.
///
/// A `run_seconds` of zero waits for Ctrl-C only.
async fn wait_for_end(run_seconds: u64) -> Result<(), EngineError> {
    let timer = async {
        if run_seconds == 0 {
            std::future::pending::<()>().await;
        } else {
            tokio::time::sleep(Duration::from_secs(run_seconds)).await;
        }
    };
    tokio::select! {
        () = timer => {
            info!(run_seconds, "Run time elapsed");
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Interrupt received");
        }
    }
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));
    match logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}

/// Load configuration from `BIOSIM_CONFIG` or `biosim-config.yaml`.
///
/// A missing file is not an error: defaults are used, and environment
/// overrides still apply.
fn load_config() -> Result<BiosimConfig, EngineError> {
    let config_path = std::env::var_os("BIOSIM_CONFIG")
        .map_or_else(|| PathBuf::from("biosim-config.yaml"), PathBuf::from);
    if config_path.exists() {
        Ok(BiosimConfig::from_file(&config_path)?)
    } else {
        let mut config = BiosimConfig::default();
        config.apply_env_overrides()?;
        Ok(config)
    }
}
