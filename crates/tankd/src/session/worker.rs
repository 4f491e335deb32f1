//! Per-session worker.
//!
//! Leases the session's tank (waiting in line if another session has it),
//! tells the client it is accepted, then runs read → interpret → reply
//! until the client disconnects or the transport fails. The lease and the
//! session-table entry are both released when this returns.
//!
//! There is no idle timeout. A client that stops sending keeps its tank
//! until its conduits fail.

use tank_core::transport::Transport;
use tank_core::wire::ACCEPTED_MARKER;

use crate::dispatch::{self, Step};

use super::handshake::Admission;
use super::ServerState;

pub async fn serve<T: Transport>(admission: Admission<T>, state: ServerState) {
    let Admission {
        meta,
        guard: _guard,
        mut transport,
    } = admission;
    let session_id = meta.session_id;

    if state.tanks.is_leased(meta.tank) {
        tracing::info!(%session_id, tank = meta.tank, "waiting for tank release");
    }
    let Some(mut tank) = state.tanks.lease(meta.tank).await else {
        tracing::error!(
            %session_id,
            tank = meta.tank,
            "admitted for a tank that does not exist"
        );
        return;
    };

    if let Err(e) = transport.write(ACCEPTED_MARKER.as_bytes()).await {
        tracing::warn!(%session_id, error = %e, "failed to send acceptance");
        return;
    }
    tracing::info!(
        %session_id,
        tank = meta.tank,
        waited_ms = meta.established_at.elapsed().as_millis() as u64,
        "session accepted"
    );

    loop {
        let line = match transport.read_text().await {
            Ok(line) => line,
            Err(e) => {
                tracing::info!(%session_id, error = %e, "session transport closed");
                return;
            }
        };
        tracing::debug!(%session_id, command = %line, "command received");

        let outcome = state.commands.interpret(&line, &mut tank).await;
        match dispatch::render(outcome) {
            Step::Reply(reply) => {
                if let Err(e) = transport.write(reply.as_bytes()).await {
                    tracing::warn!(%session_id, error = %e, "failed to send reply");
                    return;
                }
                tracing::info!(%session_id, command = %line, "command processed");
            }
            Step::Close => {
                tracing::info!(
                    %session_id,
                    tank = meta.tank,
                    lifetime_ms = meta.established_at.elapsed().as_millis() as u64,
                    "client disconnected"
                );
                return;
            }
        }
    }
}
