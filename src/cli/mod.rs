//! # Command Line Interface
//!
//! Offline translation of fixture files: seed an in-memory store, translate a
//! change event or a reload request, print the resulting snapshots.

pub mod fixture;
pub mod output;

use crate::config::AppConfig;
use crate::observability::{init_observability, log_config_info};
use crate::services::TranslationService;
use crate::xds::SnapshotCache;
use anyhow::Context;
use clap::{Parser, Subcommand};
use fixture::Fixture;
use output::{print_output, OutputFormat};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "deltaplane")]
#[command(about = "Incremental configuration delta translation for proxy node groups")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate the fixture's change event into per-node-group snapshots
    Translate {
        /// Fixture file (YAML or JSON)
        #[arg(long)]
        fixture: PathBuf,
    },

    /// Rebuild the resource kinds named by the fixture's reload entries
    Reload {
        /// Fixture file (YAML or JSON)
        #[arg(long)]
        fixture: PathBuf,
    },
}

/// Run CLI commands
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if cli.verbose {
        config.observability.log_level = "debug".to_string();
    }
    init_observability(&config.observability)?;
    log_config_info(&config);

    let fixture_path = match &cli.command {
        Commands::Translate { fixture } | Commands::Reload { fixture } => fixture,
    };
    let fixture = Fixture::load(fixture_path)
        .with_context(|| format!("Failed to load fixture '{}'", fixture_path.display()))?;

    let service = TranslationService::new(
        Arc::new(fixture.store()),
        Arc::new(SnapshotCache::new(config.translation.snapshot_channel_capacity)),
        &config.translation,
    );

    match cli.command {
        Commands::Translate { .. } => {
            service.handle_change_event(&fixture.change_event()?)?;
        }
        Commands::Reload { .. } => {
            service.handle_reload(&fixture.reload_request()?)?;
        }
    }

    print_output(&service.cache().snapshots()?, cli.output)
}
