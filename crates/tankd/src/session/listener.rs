//! Accept loop on the rendezvous pair.
//!
//! Admits one client at a time and hands each admitted session to its own
//! task; the loop never waits on a session. A bad request, including a
//! malformed frame on the rendezvous pair, only costs that client its
//! session. The loop ends when the rendezvous pair itself is removed.

use std::sync::Arc;

use tokio::sync::broadcast;

use tank_core::conduit::ConduitProvider;
use tank_core::transport::{MessageChannel, TransportError};
use tank_core::wire::SessionId;
use tank_services::AdmissionError;

use super::handshake::admit;
use super::{worker, ServerState};

pub struct SessionListener<P: ConduitProvider> {
    provider: Arc<P>,
    rendezvous: MessageChannel<P::Conduit>,
    state: ServerState,
    shutdown: broadcast::Receiver<()>,
}

impl<P: ConduitProvider> SessionListener<P> {
    /// Create the rendezvous pair. Clients can connect as soon as this returns.
    pub fn bind(
        provider: Arc<P>,
        state: ServerState,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<Self, AdmissionError> {
        let keys = state.keys.keys(SessionId::RENDEZVOUS);
        let rendezvous = MessageChannel::server(provider.as_ref(), keys)
            .map_err(AdmissionError::FailedInitialization)?;
        tracing::info!(
            to_server = %keys.to_server,
            to_client = %keys.to_client,
            "rendezvous pair created"
        );
        Ok(Self {
            provider,
            rendezvous,
            state,
            shutdown,
        })
    }

    pub async fn run(mut self) -> Result<(), TransportError> {
        loop {
            tracing::info!("waiting for connection");
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("session listener shutting down");
                    return Ok(());
                }

                result = admit(&mut self.rendezvous, self.provider.as_ref(), &self.state) => {
                    match result {
                        Ok(admission) => {
                            tokio::spawn(worker::serve(admission, self.state.clone()));
                        }
                        Err(AdmissionError::Transport(e)) if e.is_closed() => {
                            tracing::error!(error = %e, "rendezvous pair removed");
                            return Err(e);
                        }
                        Err(AdmissionError::Transport(e)) => {
                            tracing::warn!(error = %e, "bad request on the rendezvous pair");
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "admission failed");
                        }
                    }
                }
            }
        }
    }
}
