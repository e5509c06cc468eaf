#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs the AI War tick server.

mod config;

use std::{fs, path::PathBuf, sync::Arc};

use aiwar_adapter_store::DirectoryStore;
use aiwar_system_scheduler::RhaiSandbox;
use aiwar_system_tick::{Stores, TickLoop};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, Overrides};

/// Runs the AI War tick server against a data directory.
#[derive(Debug, Parser)]
#[command(name = "aiwar", version, about)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Directory holding scripts, player output and the latest map.
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,
    /// Stop after this many ticks instead of running until interrupted.
    #[arg(long)]
    ticks: Option<u64>,
    /// Grid width in cells.
    #[arg(long)]
    width: Option<u32>,
    /// Grid height in cells.
    #[arg(long)]
    height: Option<u32>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            data_dir: self.data_dir.clone(),
            width: self.width,
            height: self.height,
        }
    }
}

/// Entry point for the AI War command-line interface.
#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_deref())?.with_overrides(cli.overrides());
    config.validate().context("invalid configuration")?;

    let store = DirectoryStore::open(&config.store.data_dir).with_context(|| {
        format!(
            "failed to open data directory {}",
            config.store.data_dir.display()
        )
    })?;
    let mut sandbox = RhaiSandbox::new(config.sandbox.max_operations);
    if let Some(path) = &config.sandbox.prelude {
        let prelude = fs::read_to_string(path)
            .with_context(|| format!("failed to read prelude {}", path.display()))?;
        sandbox = sandbox.with_prelude(prelude);
    }

    let size = config.grid_size();
    info!(
        width = size.width(),
        height = size.height(),
        data_dir = %config.store.data_dir.display(),
        ticks = ?cli.ticks,
        "starting tick loop"
    );
    let mut game = TickLoop::new(
        size,
        config.tick_config(),
        sandbox,
        Stores::shared(Arc::new(store)),
    );
    game.run(cli.ticks, shutdown_signal())
        .await
        .context("tick loop aborted")?;
    info!("stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
