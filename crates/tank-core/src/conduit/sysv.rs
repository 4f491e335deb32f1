//! SysV message-queue conduits.
//!
//! This is the backend the `tankd` and `tank-ctl` processes talk over. Each
//! conduit key is used directly as the queue's `key_t`. The queue calls
//! block, so every send and receive runs on the blocking pool.

use std::io;
use std::mem::size_of;

use bytes::Bytes;
use libc::{c_int, c_long};

use super::{removed, size_mismatch, Conduit, ConduitProvider};
use crate::wire::{ConduitKey, MAX_FRAME_PAYLOAD};

/// Every unit is sent with this message type and received by it.
const MTYPE: c_long = 1;
const MTYPE_SIZE: usize = size_of::<c_long>();

/// Receive buffer floor. Anything longer than a legal unit is truncated
/// into it and reported as a size mismatch rather than left in the queue.
const RECV_CAPACITY: usize = MAX_FRAME_PAYLOAD as usize + 1;

/// Opens SysV queues with the given permission bits.
#[derive(Debug, Clone, Copy)]
pub struct SysvQueues {
    mode: c_int,
}

impl SysvQueues {
    pub fn new(mode: u32) -> Self {
        Self {
            mode: (mode & 0o777) as c_int,
        }
    }

    fn get(&self, key: ConduitKey, flags: c_int, owner: bool) -> io::Result<SysvConduit> {
        let ipc_key = libc::key_t::try_from(key.0).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, format!("key {key} exceeds key_t"))
        })?;
        // SAFETY: msgget only reads its integer arguments.
        let qid = unsafe { libc::msgget(ipc_key, flags | self.mode) };
        if qid == -1 {
            return Err(io::Error::last_os_error());
        }
        tracing::trace!(%key, qid, owner, "message queue opened");
        Ok(SysvConduit { qid, owner })
    }
}

impl Default for SysvQueues {
    fn default() -> Self {
        Self::new(0o600)
    }
}

impl ConduitProvider for SysvQueues {
    type Conduit = SysvConduit;

    fn create(&self, key: ConduitKey) -> io::Result<SysvConduit> {
        self.get(key, libc::IPC_CREAT, true)
    }

    fn open(&self, key: ConduitKey) -> io::Result<SysvConduit> {
        self.get(key, 0, false)
    }
}

/// Handle to one SysV queue.
#[derive(Debug)]
pub struct SysvConduit {
    qid: c_int,
    /// The creating side removes the queue on drop.
    owner: bool,
}

impl Conduit for SysvConduit {
    async fn send(&self, unit: Bytes) -> io::Result<()> {
        let qid = self.qid;
        tokio::task::spawn_blocking(move || msg_send(qid, &unit))
            .await
            .map_err(io::Error::other)?
    }

    async fn recv(&mut self, len: usize) -> io::Result<Bytes> {
        let qid = self.qid;
        tokio::task::spawn_blocking(move || msg_recv(qid, len))
            .await
            .map_err(io::Error::other)?
    }
}

impl Drop for SysvConduit {
    fn drop(&mut self) {
        if self.owner {
            // SAFETY: IPC_RMID ignores the buffer argument.
            let rc = unsafe { libc::msgctl(self.qid, libc::IPC_RMID, std::ptr::null_mut()) };
            if rc == -1 {
                let error = io::Error::last_os_error();
                tracing::warn!(qid = self.qid, %error, "failed to remove message queue");
            }
        }
    }
}

fn msg_send(qid: c_int, data: &[u8]) -> io::Result<()> {
    let mut buf = Vec::with_capacity(MTYPE_SIZE + data.len());
    buf.extend_from_slice(&MTYPE.to_ne_bytes());
    buf.extend_from_slice(data);
    loop {
        // SAFETY: buf is an mtype followed by data.len() bytes of mtext.
        let rc = unsafe { libc::msgsnd(qid, buf.as_ptr().cast(), data.len(), 0) };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(queue_error(err));
        }
    }
}

fn msg_recv(qid: c_int, len: usize) -> io::Result<Bytes> {
    let capacity = len.max(RECV_CAPACITY);
    let mut buf = vec![0u8; MTYPE_SIZE + capacity];
    loop {
        // SAFETY: buf has room for an mtype plus `capacity` bytes of mtext.
        let rc = unsafe {
            libc::msgrcv(qid, buf.as_mut_ptr().cast(), capacity, MTYPE, libc::MSG_NOERROR)
        };
        if rc >= 0 {
            let got = rc as usize;
            if got != len {
                return Err(size_mismatch(len, got));
            }
            buf.truncate(MTYPE_SIZE + len);
            return Ok(Bytes::from(buf.split_off(MTYPE_SIZE)));
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(queue_error(err));
        }
    }
}

/// A queue removed under a waiting call fails it with `EIDRM`; later calls
/// on the stale id fail with `EINVAL`.
fn queue_error(err: io::Error) -> io::Error {
    match err.raw_os_error() {
        Some(libc::EIDRM | libc::EINVAL) => removed(),
        _ => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conduit::is_removed;
    use crate::transport::{MessageChannel, Transport};
    use crate::wire::{InterleavedKeys, KeyScheme, SessionId};

    fn queues() -> SysvQueues {
        SysvQueues::default()
    }

    #[tokio::test]
    async fn messages_round_trip_over_queues() {
        let keys = InterleavedKeys.keys(SessionId::random());
        let mut server = MessageChannel::server(&queues(), keys).unwrap();
        let mut client = MessageChannel::client(&queues(), keys).unwrap();

        client.write(b"get level of oil products").await.unwrap();
        assert_eq!(server.read_text().await.unwrap(), "get level of oil products");

        server.write(b"").await.unwrap();
        assert!(client.read().await.unwrap().is_empty());

        let big = vec![b'x'; MAX_FRAME_PAYLOAD as usize];
        server.write(&big).await.unwrap();
        assert_eq!(client.read().await.unwrap().len(), big.len());
    }

    #[tokio::test]
    async fn receive_wants_the_exact_size() {
        let key = InterleavedKeys.keys(SessionId::random()).to_server;
        let owned = queues().create(key).unwrap();
        let mut peer = queues().open(key).unwrap();

        owned.send(Bytes::from_static(b"abc")).await.unwrap();
        let err = peer.recv(8).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        // The mismatched unit is consumed, not left at the head of the queue.
        owned.send(Bytes::from_static(b"abcdefgh")).await.unwrap();
        assert_eq!(&peer.recv(8).await.unwrap()[..], b"abcdefgh");

        owned.send(Bytes::from_static(b"abcdefghijkl")).await.unwrap();
        let err = peer.recv(8).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(!is_removed(&err));
    }

    #[tokio::test]
    async fn owner_drop_removes_the_queue() {
        let key = InterleavedKeys.keys(SessionId::random()).to_client;
        let owned = queues().create(key).unwrap();
        let mut peer = queues().open(key).unwrap();

        let pending = tokio::spawn(async move { peer.recv(8).await });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        drop(owned);

        let err = pending.await.unwrap().unwrap_err();
        assert!(is_removed(&err), "unexpected error: {err}");
        assert!(queues().open(key).is_err());
    }

    #[tokio::test]
    async fn non_owner_drop_keeps_the_queue() {
        let key = InterleavedKeys.keys(SessionId::random()).to_server;
        let _owned = queues().create(key).unwrap();
        drop(queues().open(key).unwrap());
        assert!(queues().open(key).is_ok());
    }
}
