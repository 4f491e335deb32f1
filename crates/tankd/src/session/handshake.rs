//! Server side of the session handshake.
//!
//! Runs on the rendezvous pair, one client at a time:
//!   client → tank index (decimal text)
//!   server: validate index, reserve a session id, create its private pair
//!   server → session id (decimal text)
//!
//! An invalid index gets no reply; the client's own timeout ends its wait.
//! No tank is locked here. The worker takes the lease afterwards, so a busy
//! tank never stalls admission of other clients.

use tank_core::conduit::ConduitProvider;
use tank_core::transport::{MessageChannel, Transport};
use tank_services::session::{reserve_session, SessionGuard, SessionMeta};
use tank_services::AdmissionError;

use super::ServerState;

/// A client that passed the handshake and now has a private transport.
pub struct Admission<T> {
    pub meta: SessionMeta,
    pub guard: SessionGuard,
    pub transport: T,
}

/// Admit the next client waiting on `rendezvous`.
///
/// `AdmissionError::Transport` means the rendezvous pair itself failed;
/// every other error only concerns this one client.
pub async fn admit<R, P>(
    rendezvous: &mut R,
    provider: &P,
    state: &ServerState,
) -> Result<Admission<MessageChannel<P::Conduit>>, AdmissionError>
where
    R: Transport,
    P: ConduitProvider,
{
    let request = rendezvous.read_text().await?;
    let tank = state.tanks.resolve(&request)?;
    tracing::info!(tank, "tank requested");

    let meta = reserve_session(&state.sessions, state.keys.as_ref(), tank);
    let guard = SessionGuard::new(state.sessions.clone(), meta.session_id);
    tracing::info!(session_id = %meta.session_id, tank, "session id generated");

    let transport =
        MessageChannel::server(provider, meta.keys).map_err(AdmissionError::FailedInitialization)?;
    rendezvous
        .write(meta.session_id.to_string().as_bytes())
        .await?;

    Ok(Admission {
        meta,
        guard,
        transport,
    })
}
