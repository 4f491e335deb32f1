//! One-directional message conduits.
//!
//! A conduit is a queue of discrete units addressed by a `ConduitKey`. The
//! server creates (and owns) both conduits of a pair; the client opens them
//! by key. Dropping an owned conduit removes it, which fails any receive
//! still waiting on the other side.

mod memory;
#[cfg(target_os = "linux")]
mod sysv;

pub use memory::{MemoryBus, MemoryConduit};
#[cfg(target_os = "linux")]
pub use sysv::{SysvConduit, SysvQueues};

use std::future::Future;
use std::io;

use bytes::Bytes;

use crate::wire::ConduitKey;

pub trait Conduit: Send + Sync + 'static {
    /// Enqueue one unit.
    fn send(&self, unit: Bytes) -> impl Future<Output = io::Result<()>> + Send;

    /// Dequeue one unit, which must be exactly `len` bytes long.
    fn recv(&mut self, len: usize) -> impl Future<Output = io::Result<Bytes>> + Send;
}

/// Creates and opens conduits by key.
pub trait ConduitProvider: Send + Sync + 'static {
    type Conduit: Conduit;

    /// Create the conduit (or adopt an existing one) and take ownership of it.
    fn create(&self, key: ConduitKey) -> io::Result<Self::Conduit>;

    /// Open a conduit someone else created. Fails if it does not exist.
    fn open(&self, key: ConduitKey) -> io::Result<Self::Conduit>;
}

/// Whether `err` means the conduit no longer exists, as opposed to one bad
/// unit passing through it.
pub fn is_removed(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::ConnectionAborted
}

pub(crate) fn removed() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionAborted, "conduit removed")
}

pub(crate) fn size_mismatch(expected: usize, got: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("expected a {expected}-byte unit, received {got} bytes"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_removal_counts_as_removed() {
        assert!(is_removed(&removed()));
        assert!(!is_removed(&size_mismatch(8, 3)));
        assert!(!is_removed(&io::Error::from(io::ErrorKind::Interrupted)));
    }
}
