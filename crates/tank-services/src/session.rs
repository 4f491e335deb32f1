//! Session table. Tracks which session ids are live and what they hold.
//!
//! A session id selects a conduit pair, so two live sessions must never
//! share one. Ids are reserved here before their conduits are created and
//! released when the session ends, on every exit path.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use tank_core::transport::TransportError;
use tank_core::wire::{ChannelKeys, KeyScheme, SessionId};

/// Why a connection never became a session.
#[derive(Debug, thiserror::Error)]
pub enum AdmissionError {
    #[error("failed to initialize session conduits: {0}")]
    FailedInitialization(#[source] io::Error),
    #[error("incorrect tank id: {0:?}")]
    IncorrectTankId(String),
    #[error("server did not accept the session")]
    FailedAccepted,
    #[error("no reply from server within {0:?}")]
    TimedOut(Duration),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Metadata about a live session.
#[derive(Debug, Clone)]
pub struct SessionMeta {
    pub session_id: SessionId,
    /// Index of the tank this session is bound to.
    pub tank: usize,
    pub keys: ChannelKeys,
    /// When the id was reserved, before any wait for the tank.
    pub established_at: Instant,
}

/// The session table, shared between the listener and every worker.
pub type SessionTable = Arc<DashMap<SessionId, SessionMeta>>;

/// Create a new empty session table.
pub fn new_session_table() -> SessionTable {
    Arc::new(DashMap::new())
}

/// Reserve a fresh id for a session on `tank`, redrawing while the drawn id
/// is already live.
pub fn reserve_session(table: &SessionTable, scheme: &dyn KeyScheme, tank: usize) -> SessionMeta {
    loop {
        let session_id = SessionId::random();
        if let Entry::Vacant(slot) = table.entry(session_id) {
            let meta = SessionMeta {
                session_id,
                tank,
                keys: scheme.keys(session_id),
                established_at: Instant::now(),
            };
            slot.insert(meta.clone());
            return meta;
        }
    }
}

/// Releases a session's table entry when dropped.
pub struct SessionGuard {
    table: SessionTable,
    session_id: SessionId,
}

impl SessionGuard {
    pub fn new(table: SessionTable, session_id: SessionId) -> Self {
        Self { table, session_id }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.table.remove(&self.session_id);
        tracing::debug!(session_id = %self.session_id, "session released");
    }
}
