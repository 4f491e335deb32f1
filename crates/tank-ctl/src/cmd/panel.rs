//! Status panel: the eight read-only queries, rendered as one block.

use std::fmt::Write as _;

use tank_core::transport::{Transport, TransportError};
use tank_core::wire::SessionId;
use tank_services::client::request;

/// (label, query command), in display order.
const QUERIES: [(&str, &str); 8] = [
    ("working state", "get working state"),
    ("level of oil products", "get level of oil products"),
    ("lower permissible level", "get lower permissible level"),
    ("upper acceptable level", "get upper acceptable level"),
    ("download speed", "get download speed"),
    ("unloading speed", "get unloading speed"),
    ("loading pump", "get loading pump status"),
    ("unloading pump", "get unloading pump status"),
];

/// One reading of every query, in `QUERIES` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    values: Vec<String>,
}

impl Snapshot {
    pub async fn fetch<T: Transport>(transport: &mut T) -> Result<Self, TransportError> {
        let mut values = Vec::with_capacity(QUERIES.len());
        for (_, command) in QUERIES {
            values.push(request(transport, command).await?);
        }
        Ok(Self { values })
    }

    pub fn render(&self, tank: usize, session_id: SessionId) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "═══════════════════════════════════════");
        let _ = writeln!(out, "  Oil Tank {tank}  (session {session_id})");
        let _ = writeln!(out, "═══════════════════════════════════════");
        for ((label, _), value) in QUERIES.iter().zip(&self.values) {
            let _ = writeln!(out, "  {label:<24}: {value}");
        }
        out
    }
}
