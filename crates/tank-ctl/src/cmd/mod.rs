//! CLI command modules.

pub mod panel;
pub mod session;
