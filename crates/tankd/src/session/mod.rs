//! Session management: admission, the accept loop, per-session workers.

pub mod handshake;
pub mod listener;
pub mod worker;

use std::sync::Arc;
use std::time::Duration;

use tank_core::config::TankDefaults;
use tank_core::wire::{InterleavedKeys, KeyScheme};
use tank_services::{new_session_table, CommandTable, SessionTable, TankRegistry};

/// Everything a listener and its workers share.
#[derive(Clone)]
pub struct ServerState {
    pub tanks: Arc<TankRegistry>,
    pub sessions: SessionTable,
    pub commands: Arc<CommandTable>,
    pub keys: Arc<dyn KeyScheme>,
}

impl ServerState {
    pub fn new(tanks: TankRegistry) -> Self {
        Self {
            tanks: Arc::new(tanks),
            sessions: new_session_table(),
            commands: Arc::new(CommandTable::new()),
            keys: Arc::new(InterleavedKeys),
        }
    }

    /// `count` tanks built from `defaults`.
    pub fn with_tanks(count: usize, defaults: &TankDefaults, time_unit: Duration) -> Self {
        Self::new(TankRegistry::new(count, defaults, time_unit))
    }
}
