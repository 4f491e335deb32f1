use std::time::Duration;

use bytes::Bytes;

use crate::*;
use tank_core::conduit::{Conduit, ConduitProvider};
use tank_core::wire::{InterleavedKeys, KeyScheme, SessionId};
use tank_services::AdmissionError;

/// The second session on a tank is accepted only after the first leaves,
/// and it sees the state the first one left behind.
#[tokio::test]
async fn test_same_tank_sessions_are_serialized() -> Result<()> {
    let server = start_server(1);

    let mut first = connect(&server, 0).await?;
    expect_success(&mut first, &["set level of oil products 500"]).await?;

    let pending =
        client::request_session(&server.bus, &InterleavedKeys, 0, Some(PATIENCE)).await?;
    let accepted = pending.accepted();
    tokio::pin!(accepted);

    let early = tokio::time::timeout(Duration::from_millis(100), &mut accepted).await;
    assert!(early.is_err(), "second session accepted while the first held the tank");

    // The first session keeps working while the second one waits.
    assert_eq!(send(&mut first, "get level of oil products").await?, "500");
    disconnect(first).await?;

    let mut second = tokio::time::timeout(PATIENCE, accepted)
        .await
        .context("second session never accepted")??;
    assert_eq!(send(&mut second, "get level of oil products").await?, "500");
    disconnect(second).await?;

    wait_for_idle(&server).await?;
    server.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_different_tanks_are_independent() -> Result<()> {
    let server = start_server(2);

    let mut a = connect(&server, 0).await?;
    let mut b = connect(&server, 1).await?;
    assert_eq!(server.state.sessions.len(), 2);

    expect_success(&mut a, &["set download speed 7"]).await?;
    assert_eq!(send(&mut b, "get download speed").await?, "100");
    assert_eq!(send(&mut a, "get download speed").await?, "7");

    disconnect(a).await?;
    disconnect(b).await?;
    wait_for_idle(&server).await?;
    Ok(())
}

/// A bad tank index gets no reply; the client gives up on its own and
/// the server keeps admitting others.
#[tokio::test]
async fn test_incorrect_tank_id_is_dropped_silently() -> Result<()> {
    let server = start_server(2);
    let limit = Duration::from_millis(100);

    let result = client::request_session(&server.bus, &InterleavedKeys, 2, Some(limit)).await;
    assert!(matches!(result, Err(AdmissionError::TimedOut(_))));
    assert!(server.state.sessions.is_empty());

    let mut channel = connect(&server, 1).await?;
    assert_eq!(send(&mut channel, "get working state").await?, "non-work");
    disconnect(channel).await?;
    Ok(())
}

#[tokio::test]
async fn test_session_ids_are_unique_and_released() -> Result<()> {
    let server = start_server(3);

    let mut channels = Vec::new();
    for tank in 0..3 {
        channels.push(connect(&server, tank).await?);
    }
    let mut ids: Vec<SessionId> = server.state.sessions.iter().map(|e| *e.key()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 3);
    assert!(ids.iter().all(|id| !id.is_rendezvous()));

    for channel in channels {
        disconnect(channel).await?;
    }
    wait_for_idle(&server).await?;
    for tank in 0..3 {
        assert!(!server.state.tanks.is_leased(tank));
    }
    Ok(())
}

/// A malformed frame on a session's conduit is a read error: the session
/// ends and the tank is free for the next client.
#[tokio::test]
async fn test_transport_failure_releases_tank() -> Result<()> {
    let server = start_server(1);

    let _stalled = connect(&server, 0).await?;
    let keys = server
        .state
        .sessions
        .iter()
        .next()
        .map(|entry| entry.keys)
        .context("session should be live")?;
    let raw = server.bus.open(keys.to_server)?;
    raw.send(Bytes::copy_from_slice(&u64::MAX.to_le_bytes())).await?;

    wait_for_idle(&server).await?;
    assert!(!server.state.tanks.is_leased(0));

    let mut next = connect(&server, 0).await?;
    assert_eq!(send(&mut next, "get unloading pump status").await?, "inactive");
    disconnect(next).await?;
    Ok(())
}

#[tokio::test]
async fn test_shutdown_stops_listener() -> Result<()> {
    let server = start_server(1);
    let channel = connect(&server, 0).await?;
    disconnect(channel).await?;
    server.stop().await?;
    Ok(())
}

/// Garbage on the rendezvous pair costs nothing but the garbage: the
/// listener keeps admitting well-formed clients afterwards.
#[tokio::test]
async fn test_malformed_rendezvous_units_are_survived() -> Result<()> {
    let server = start_server(1);
    let rendezvous = InterleavedKeys.keys(SessionId::RENDEZVOUS);
    let raw = server.bus.open(rendezvous.to_server)?;

    raw.send(Bytes::from_static(b"abc")).await?;
    let mut first = connect(&server, 0).await?;
    assert_eq!(send(&mut first, "get working state").await?, "non-work");
    disconnect(first).await?;

    raw.send(Bytes::copy_from_slice(&u64::MAX.to_le_bytes())).await?;
    let mut second = connect(&server, 0).await?;
    assert_eq!(send(&mut second, "get loading pump status").await?, "inactive");
    disconnect(second).await?;

    wait_for_idle(&server).await?;
    server.stop().await?;
    Ok(())
}
