//! tank-core: shared wire constants, session identifiers, conduits, and
//! the length-framed transport. Every other tankd crate depends on this one.

pub mod conduit;
pub mod config;
pub mod transport;
pub mod wire;

pub use conduit::{Conduit, ConduitProvider, MemoryBus};
pub use transport::{MessageChannel, Transport, TransportError};
pub use wire::{ChannelKeys, ConduitKey, InterleavedKeys, KeyScheme, SessionId};
