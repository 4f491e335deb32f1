//! tankd serves a fixed set of oil storage tanks to local clients.
//!
//! A client asks for a tank over the well-known rendezvous pair, gets a
//! private conduit pair, and then owns that tank until it disconnects.

pub mod dispatch;
pub mod session;

pub use session::listener::SessionListener;
pub use session::ServerState;
