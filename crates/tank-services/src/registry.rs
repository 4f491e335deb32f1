//! Tank registry: the fixed set of tanks created at startup.
//!
//! Each tank sits behind its own `tokio::sync::Mutex`. A session takes an
//! owned guard (`TankLease`) once, before it is accepted, and holds it until
//! it ends; dropping the lease on any exit path frees the tank. The mutex
//! queues waiters in FIFO order, so a busy tank cannot starve a waiter.
//!
//! There is no lease timeout: an idle client keeps its tank indefinitely.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};

use tank_core::config::TankDefaults;

use crate::session::AdmissionError;
use crate::tank::Tank;

/// Exclusive access to one tank for the lifetime of a session.
pub type TankLease = OwnedMutexGuard<Tank>;

pub struct TankRegistry {
    tanks: Vec<Arc<Mutex<Tank>>>,
}

impl TankRegistry {
    /// `count` identical tanks seeded from `defaults`.
    pub fn new(count: usize, defaults: &TankDefaults, time_unit: Duration) -> Self {
        Self::from_tanks((0..count).map(|_| Tank::new(defaults, time_unit)))
    }

    pub fn from_tanks(tanks: impl IntoIterator<Item = Tank>) -> Self {
        Self {
            tanks: tanks
                .into_iter()
                .map(|tank| Arc::new(Mutex::new(tank)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tanks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tanks.is_empty()
    }

    /// Turn a client's textual tank request into a valid index.
    pub fn resolve(&self, request: &str) -> Result<usize, AdmissionError> {
        let wanted = request.trim();
        match wanted.parse::<usize>() {
            Ok(index) if index < self.tanks.len() => Ok(index),
            _ => Err(AdmissionError::IncorrectTankId(wanted.to_string())),
        }
    }

    /// Wait until `index` is free and lease it. `None` if out of range.
    pub async fn lease(&self, index: usize) -> Option<TankLease> {
        let tank = self.tanks.get(index)?.clone();
        Some(tank.lock_owned().await)
    }

    /// Whether some session currently holds `index`.
    pub fn is_leased(&self, index: usize) -> bool {
        self.tanks
            .get(index)
            .is_some_and(|tank| tank.try_lock().is_err())
    }
}
