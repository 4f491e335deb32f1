//! tankd, the oil storage tank session server.
//!
//! Usage: tankd <tank-count>

use std::sync::Arc;

use anyhow::{Context, Result};

use tank_core::config::TankdConfig;
use tank_core::conduit::ConduitProvider;

use tankd::{ServerState, SessionListener};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let count = tank_count(std::env::args().nth(1))?;

    if let Err(e) = TankdConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = TankdConfig::load().context("failed to load config")?;
    tracing::info!(
        tanks = count,
        time_unit_ms = config.server.time_unit_ms,
        "tankd starting"
    );

    let state = ServerState::with_tanks(count, &config.tank, config.server.time_unit());

    #[cfg(target_os = "linux")]
    {
        let provider = tank_core::conduit::SysvQueues::new(config.server.ipc_mode);
        serve(Arc::new(provider), state).await
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = state;
        anyhow::bail!("tankd needs SysV message queues, which this platform does not provide")
    }
}

fn tank_count(arg: Option<String>) -> Result<usize> {
    let raw = arg.context("usage: tankd <tank-count>")?;
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => anyhow::bail!("tank count must be a positive integer, got {raw:?}"),
    }
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
async fn serve<P: ConduitProvider>(provider: Arc<P>, state: ServerState) -> Result<()> {
    // ── Shutdown channel ─────────────────────────────────────────────────────
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    let listener = SessionListener::bind(provider, state, shutdown_tx.subscribe())
        .context("failed to create the rendezvous pair")?;

    {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("shutdown signal received");
            let _ = shutdown.send(());
        });
    }

    listener.run().await.context("session listener failed")?;
    tracing::info!("shutting down");
    Ok(())
}
