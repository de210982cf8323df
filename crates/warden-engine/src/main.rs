//! # Warden
//!
//! Headless runner for the Warden adversary engine.
//!
//! Usage: `warden [CONFIG] [--json-logs]`. The config defaults to
//! `warden.toml` in the working directory.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use warden_engine::archetype_loader::ArchetypeLoader;
use warden_engine::config::{EngineConfig, CONFIG_FILE};
use warden_engine::scenario::{write_event_dump, Runner, Scenario};

/// Main entry point.
fn main() -> Result<()> {
    let mut config_path = CONFIG_FILE.to_string();
    let mut json_logs = false;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--json-logs" => json_logs = true,
            _ => config_path = arg,
        }
    }

    let filter = EnvFilter::from_default_env().add_directive("warden=info".parse()?);
    if json_logs {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry().with(fmt::layer()).with(filter).init();
    }

    info!("Warden starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = EngineConfig::load_from(&config_path);

    let mut loader = ArchetypeLoader::new(&config.archetype_dir);
    loader.load_all().context("reading archetype directory")?;
    let mut archetypes = loader.into_registry();
    let builtin = archetypes.fill_from_builtin();
    info!("{} archetypes available ({} built in)", archetypes.len(), builtin);

    let mut runner = Runner::new(&config, Scenario::for_kind(config.scenario), &archetypes)?;
    let summary = runner.run();
    info!(
        "Scenario {} finished after {} ticks ({:.1}s): {} attacks, {} hits, {} strikes, {} removed, {} items dropped",
        summary.scenario,
        summary.ticks,
        summary.sim_time,
        summary.attacks_started,
        summary.hits_landed,
        summary.strikes_landed,
        summary.removed,
        summary.items_dropped
    );
    info!(
        "Player health {:.0}, {} agents alive",
        summary.player_health, summary.agents_alive
    );

    if let Some(path) = &config.event_dump {
        write_event_dump(path, runner.events())?;
    }

    info!("Warden shutdown complete");
    Ok(())
}
