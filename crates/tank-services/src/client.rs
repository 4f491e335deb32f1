//! Client side of the session handshake.
//!
//! 1. Open the rendezvous pair and send the tank index as decimal text.
//! 2. Read back the session id, then open the private pair it names.
//! 3. Wait for the acceptance marker. This wait has no timeout: it lasts
//!    as long as another session holds the tank.
//!
//! Steps 1–2 and step 3 are separate calls so a caller can tell its user
//! the tank is busy before blocking.

use std::time::Duration;

use tank_core::conduit::ConduitProvider;
use tank_core::transport::{MessageChannel, Transport, TransportError};
use tank_core::wire::{KeyScheme, SessionId, ACCEPTED_MARKER};

use crate::session::AdmissionError;

/// A session the server has allocated but not yet accepted.
pub struct PendingSession<C> {
    session_id: SessionId,
    channel: MessageChannel<C>,
}

impl<C> PendingSession<C>
where
    C: tank_core::conduit::Conduit,
{
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Block until the server has leased the tank to this session.
    pub async fn accepted(mut self) -> Result<MessageChannel<C>, AdmissionError> {
        let marker = self.channel.read_text().await?;
        if marker != ACCEPTED_MARKER {
            tracing::warn!(session_id = %self.session_id, %marker, "unexpected acceptance reply");
            return Err(AdmissionError::FailedAccepted);
        }
        tracing::debug!(session_id = %self.session_id, "session accepted");
        Ok(self.channel)
    }
}

/// Ask the server for `tank` and open the private pair it allocates.
///
/// `timeout` bounds only the wait for the session id; `None` waits forever.
pub async fn request_session<P>(
    provider: &P,
    scheme: &dyn KeyScheme,
    tank: usize,
    timeout: Option<Duration>,
) -> Result<PendingSession<P::Conduit>, AdmissionError>
where
    P: ConduitProvider,
{
    let mut rendezvous = MessageChannel::client(provider, scheme.keys(SessionId::RENDEZVOUS))
        .map_err(AdmissionError::FailedInitialization)?;
    rendezvous.write(tank.to_string().as_bytes()).await?;

    let reply = match timeout {
        Some(limit) => tokio::time::timeout(limit, rendezvous.read_text())
            .await
            .map_err(|_| AdmissionError::TimedOut(limit))??,
        None => rendezvous.read_text().await?,
    };
    let session_id: SessionId = reply.parse().map_err(|e| {
        tracing::warn!(%reply, error = %e, "server sent an unusable session id");
        AdmissionError::FailedAccepted
    })?;
    tracing::debug!(%session_id, tank, "session id received");

    let channel = MessageChannel::client(provider, scheme.keys(session_id))
        .map_err(AdmissionError::FailedInitialization)?;
    Ok(PendingSession {
        session_id,
        channel,
    })
}

/// Full client handshake: request, then wait for acceptance.
pub async fn connect<P>(
    provider: &P,
    scheme: &dyn KeyScheme,
    tank: usize,
    timeout: Option<Duration>,
) -> Result<MessageChannel<P::Conduit>, AdmissionError>
where
    P: ConduitProvider,
{
    request_session(provider, scheme, tank, timeout)
        .await?
        .accepted()
        .await
}

/// Send one command line and wait for its reply.
pub async fn request<T: Transport>(
    transport: &mut T,
    command: &str,
) -> Result<String, TransportError> {
    transport.write(command.as_bytes()).await?;
    transport.read_text().await
}
