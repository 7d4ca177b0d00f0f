//! Updraft binary: wire the three game engines and run their clocks
//!
//! Request routing, authentication, and persistent balances live outside
//! this process; the binary injects an in-memory balance store and a
//! logging spectator channel so the engines can be observed standalone.

use std::env;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use updraft::{ConfigLoader, ConnectionRegistry, InMemoryBalanceStore, PushEvent, RoundEngine};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("updraft=info")),
        )
        .init();

    let loader = match env::var("UPDRAFT_CONFIG") {
        Ok(path) => ConfigLoader::new().with_path(path),
        Err(_) => ConfigLoader::new(),
    };
    let config = match loader.load() {
        Ok(config) => config,
        Err(e) => {
            error!("configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let balances = Arc::new(InMemoryBalanceStore::new());
    let registry = Arc::new(ConnectionRegistry::new());

    // A spectator channel so broadcast traffic is visible in the logs
    let (spectator_tx, mut spectator_rx) = mpsc::unbounded_channel();
    registry.connect("spectator", spectator_tx);
    tokio::spawn(async move {
        while let Some(event) = spectator_rx.recv().await {
            match &event {
                PushEvent::RoundState(snapshot) => {
                    debug!(game = %snapshot.game, phase = ?snapshot.phase, "state broadcast")
                }
                other => debug!(event = ?other, "push event"),
            }
        }
    });

    let engines = [
        RoundEngine::crash(&config, balances.clone(), registry.clone()),
        RoundEngine::color_draw(&config, balances.clone(), registry.clone()),
        RoundEngine::battle(&config, balances.clone(), registry.clone()),
    ];
    for engine in engines {
        tokio::spawn(engine.run());
    }

    info!("engines running, press ctrl-c to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {}", e);
    }
    info!("shutting down");
}
