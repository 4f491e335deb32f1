//! Length-framed duplex transport.
//!
//! Each message is written as two units on the outgoing conduit: the 8-byte
//! little-endian payload length, then the payload. Reading mirrors this: one
//! receive sized for the length, one sized exactly to it. There is no
//! partial-message recovery; after any error the channel is unusable and the
//! owning session ends.

use std::future::Future;
use std::io;

use bytes::Bytes;

use crate::conduit::{Conduit, ConduitProvider};
use crate::wire::{ChannelKeys, LEN_PREFIX_SIZE, MAX_FRAME_PAYLOAD};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("read error: {0}")]
    Read(#[source] io::Error),
    #[error("write error: {0}")]
    Write(#[source] io::Error),
}

impl TransportError {
    /// True when a conduit of the pair is gone, so no later message can
    /// succeed either. Framing errors leave the pair usable.
    pub fn is_closed(&self) -> bool {
        let (Self::Read(e) | Self::Write(e)) = self;
        crate::conduit::is_removed(e)
    }
}

/// Message-level read/write capability. The session worker and the command
/// loop only ever see this trait.
pub trait Transport: Send {
    fn read(&mut self) -> impl Future<Output = Result<Bytes, TransportError>> + Send;

    fn write(&mut self, message: &[u8]) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Read one message and decode it as text. Invalid UTF-8 is replaced.
    fn read_text(&mut self) -> impl Future<Output = Result<String, TransportError>> + Send {
        async move {
            let bytes = self.read().await?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}

/// A duplex pair of conduits speaking the framed protocol.
pub struct MessageChannel<C> {
    outgoing: C,
    incoming: C,
}

impl<C: Conduit> MessageChannel<C> {
    pub fn new(outgoing: C, incoming: C) -> Self {
        Self { outgoing, incoming }
    }

    /// Server end: create both conduits and take ownership of them.
    pub fn server<P>(provider: &P, keys: ChannelKeys) -> io::Result<Self>
    where
        P: ConduitProvider<Conduit = C>,
    {
        Ok(Self::new(
            provider.create(keys.to_client)?,
            provider.create(keys.to_server)?,
        ))
    }

    /// Client end: open the conduits the server created.
    pub fn client<P>(provider: &P, keys: ChannelKeys) -> io::Result<Self>
    where
        P: ConduitProvider<Conduit = C>,
    {
        Ok(Self::new(
            provider.open(keys.to_server)?,
            provider.open(keys.to_client)?,
        ))
    }
}

impl<C: Conduit> Transport for MessageChannel<C> {
    async fn read(&mut self) -> Result<Bytes, TransportError> {
        let prefix = self
            .incoming
            .recv(LEN_PREFIX_SIZE)
            .await
            .map_err(TransportError::Read)?;
        let mut len_bytes = [0u8; LEN_PREFIX_SIZE];
        len_bytes.copy_from_slice(&prefix);
        let len = u64::from_le_bytes(len_bytes);
        if len > MAX_FRAME_PAYLOAD {
            return Err(TransportError::Read(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("frame too large: {len} bytes (max {MAX_FRAME_PAYLOAD})"),
            )));
        }
        self.incoming
            .recv(len as usize)
            .await
            .map_err(TransportError::Read)
    }

    async fn write(&mut self, message: &[u8]) -> Result<(), TransportError> {
        let len = message.len() as u64;
        if len > MAX_FRAME_PAYLOAD {
            return Err(TransportError::Write(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("frame too large: {len} bytes (max {MAX_FRAME_PAYLOAD})"),
            )));
        }
        self.outgoing
            .send(Bytes::copy_from_slice(&len.to_le_bytes()))
            .await
            .map_err(TransportError::Write)?;
        self.outgoing
            .send(Bytes::copy_from_slice(message))
            .await
            .map_err(TransportError::Write)
    }
}
