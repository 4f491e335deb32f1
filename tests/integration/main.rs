//! tankd integration test harness.
//!
//! Each test starts a real `SessionListener` on its own in-process
//! `MemoryBus`, so tests never share conduits and need no SysV queues.
//! One transfer time unit is 1 ms, which keeps simulated pumping fast.
//!
//!   cargo test --test integration

mod commands;
mod sessions;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use tank_core::conduit::{MemoryBus, MemoryConduit};
use tank_core::config::TankDefaults;
use tank_core::transport::{MessageChannel, Transport, TransportError};
use tank_core::wire::InterleavedKeys;
use tank_services::client;
use tankd::{ServerState, SessionListener};

// ── Harness ───────────────────────────────────────────────────────────────────

pub type Channel = MessageChannel<MemoryConduit>;

/// How long a test is willing to wait for something that should happen.
pub const PATIENCE: Duration = Duration::from_secs(5);

/// A running listener and the handles tests inspect it through.
pub struct Server {
    pub bus: MemoryBus,
    pub state: ServerState,
    shutdown: broadcast::Sender<()>,
    task: JoinHandle<std::result::Result<(), TransportError>>,
}

impl Server {
    /// Stop the listener and return how it ended.
    pub async fn stop(self) -> std::result::Result<(), TransportError> {
        let _ = self.shutdown.send(());
        self.task.await.expect("listener task panicked")
    }
}

/// Start a listener serving `tanks` factory-default tanks.
pub fn start_server(tanks: usize) -> Server {
    let bus = MemoryBus::new();
    let state = ServerState::with_tanks(tanks, &TankDefaults::default(), Duration::from_millis(1));
    let (shutdown, _) = broadcast::channel(1);
    let listener = SessionListener::bind(Arc::new(bus.clone()), state.clone(), shutdown.subscribe())
        .expect("rendezvous pair should bind");
    let task = tokio::spawn(listener.run());
    Server {
        bus,
        state,
        shutdown,
        task,
    }
}

/// Full client handshake on `tank`, bounded by `PATIENCE`.
pub async fn connect(server: &Server, tank: usize) -> Result<Channel> {
    tokio::time::timeout(
        PATIENCE,
        client::connect(&server.bus, &InterleavedKeys, tank, Some(PATIENCE)),
    )
    .await
    .context("handshake did not finish")?
    .context("handshake failed")
}

/// Send one command and return the reply.
pub async fn send(channel: &mut Channel, line: &str) -> Result<String> {
    tokio::time::timeout(PATIENCE, client::request(channel, line))
        .await
        .with_context(|| format!("no reply to {line:?}"))?
        .with_context(|| format!("transport failed on {line:?}"))
}

/// Send each line and assert it is answered with `success`.
pub async fn expect_success(channel: &mut Channel, lines: &[&str]) -> Result<()> {
    for line in lines {
        let reply = send(channel, line).await?;
        assert_eq!(reply, "success", "reply to {line:?}");
    }
    Ok(())
}

/// End the session the way a well-behaved client does.
pub async fn disconnect(mut channel: Channel) -> Result<()> {
    channel
        .write(b"disconnect")
        .await
        .context("failed to send disconnect")
}

/// Poll until the server has released every session.
pub async fn wait_for_idle(server: &Server) -> Result<()> {
    tokio::time::timeout(PATIENCE, async {
        while !server.state.sessions.is_empty() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .context("sessions were never released")
}
