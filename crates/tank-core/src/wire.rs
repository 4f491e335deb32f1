//! Wire constants and endpoint identity.
//!
//! A logical message is two physical units on a conduit: an 8-byte
//! little-endian length, then exactly that many payload bytes.
//!
//! Both ends of a duplex pair compute the same conduit keys from a session
//! id without any extra coordination. The mapping lives behind `KeyScheme`
//! so it can be swapped without touching the handshake or the transport.

use std::fmt;
use std::str::FromStr;

use rand::Rng;

/// Width of the length prefix that precedes every payload.
pub const LEN_PREFIX_SIZE: usize = std::mem::size_of::<u64>();

/// Largest payload a single frame may carry. Matches the default SysV
/// `MSGMAX`, so every frame fits one queue message.
pub const MAX_FRAME_PAYLOAD: u64 = 8192;

/// Literal the server writes on the private pair once the tank is leased.
pub const ACCEPTED_MARKER: &str = "-- accepted --";

// ── Session identifiers ──────────────────────────────────────────────────────

/// Identifies one admitted session. Also selects its private conduit pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u32);

impl SessionId {
    /// Largest representable id. Reserved for the rendezvous pair.
    pub const RENDEZVOUS: SessionId = SessionId((1 << 30) - 1);

    /// Draw a fresh id, never the rendezvous id and never zero.
    pub fn random() -> Self {
        Self(rand::thread_rng().gen_range(1..Self::RENDEZVOUS.0))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn is_rendezvous(self) -> bool {
        self == Self::RENDEZVOUS
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid session id: {0:?}")]
pub struct InvalidSessionId(pub String);

impl FromStr for SessionId {
    type Err = InvalidSessionId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u32>() {
            Ok(v) if v != 0 && v <= Self::RENDEZVOUS.0 => Ok(Self(v)),
            _ => Err(InvalidSessionId(s.to_string())),
        }
    }
}

// ── Conduit keys ─────────────────────────────────────────────────────────────

/// Which way a conduit carries messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToClient = 0,
    ToServer = 1,
}

/// Identifier of one one-directional conduit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConduitKey(pub u32);

impl fmt::Display for ConduitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// The two conduit keys that make up one duplex pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelKeys {
    pub to_client: ConduitKey,
    pub to_server: ConduitKey,
}

/// Maps a session id to its conduit keys.
///
/// Implementations must be injective across ids: two live sessions may
/// never share a conduit.
pub trait KeyScheme: Send + Sync {
    fn keys(&self, session: SessionId) -> ChannelKeys;
}

/// Default scheme: `id << 1 | direction`.
///
/// Ids are below 2^30, so every key fits a positive `i32` (a valid SysV
/// `key_t`) and never equals `IPC_PRIVATE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterleavedKeys;

impl InterleavedKeys {
    fn key(session: SessionId, direction: Direction) -> ConduitKey {
        ConduitKey(session.get() << 1 | direction as u32)
    }
}

impl KeyScheme for InterleavedKeys {
    fn keys(&self, session: SessionId) -> ChannelKeys {
        ChannelKeys {
            to_client: Self::key(session, Direction::ToClient),
            to_server: Self::key(session, Direction::ToServer),
        }
    }
}
