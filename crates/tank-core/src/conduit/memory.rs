//! In-process conduit bus.
//!
//! Used by tests and by anything that runs the server and its clients in
//! one process. Mirrors message-queue semantics: anyone holding a key may
//! send or receive, and the owner's drop removes the queue.

use std::io;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use dashmap::DashMap;
use tokio::sync::mpsc;

use super::{removed, size_mismatch, Conduit, ConduitProvider};
use crate::wire::ConduitKey;

struct Slot {
    tx: Mutex<Option<mpsc::UnboundedSender<Bytes>>>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Bytes>>,
}

impl Slot {
    fn new() -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            tx: Mutex::new(Some(tx)),
            rx: tokio::sync::Mutex::new(rx),
        })
    }

    fn close(&self) {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

/// Registry of live in-process conduits. Cheap to clone.
#[derive(Clone, Default)]
pub struct MemoryBus {
    conduits: Arc<DashMap<ConduitKey, Arc<Slot>>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.conduits.is_empty()
    }

    pub fn contains(&self, key: ConduitKey) -> bool {
        self.conduits.contains_key(&key)
    }
}

impl ConduitProvider for MemoryBus {
    type Conduit = MemoryConduit;

    fn create(&self, key: ConduitKey) -> io::Result<MemoryConduit> {
        let slot = self.conduits.entry(key).or_insert_with(Slot::new).clone();
        Ok(MemoryConduit {
            key,
            slot,
            owner: Some(self.clone()),
        })
    }

    fn open(&self, key: ConduitKey) -> io::Result<MemoryConduit> {
        let slot = self
            .conduits
            .get(&key)
            .map(|s| s.clone())
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("no conduit at key {key}"))
            })?;
        Ok(MemoryConduit {
            key,
            slot,
            owner: None,
        })
    }
}

/// Handle to one in-process conduit.
pub struct MemoryConduit {
    key: ConduitKey,
    slot: Arc<Slot>,
    /// Set when this handle created the conduit and must remove it.
    owner: Option<MemoryBus>,
}

impl Conduit for MemoryConduit {
    async fn send(&self, unit: Bytes) -> io::Result<()> {
        let tx = self.slot.tx.lock().unwrap_or_else(PoisonError::into_inner);
        match tx.as_ref() {
            Some(tx) => tx
                .send(unit)
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "conduit closed")),
            None => Err(removed()),
        }
    }

    async fn recv(&mut self, len: usize) -> io::Result<Bytes> {
        let mut rx = self.slot.rx.lock().await;
        match rx.recv().await {
            Some(unit) if unit.len() == len => Ok(unit),
            Some(unit) => Err(size_mismatch(len, unit.len())),
            None => Err(removed()),
        }
    }
}

impl Drop for MemoryConduit {
    fn drop(&mut self) {
        if let Some(bus) = self.owner.take() {
            self.slot.close();
            bus.conduits
                .remove_if(&self.key, |_, slot| Arc::ptr_eq(slot, &self.slot));
        }
    }
}
