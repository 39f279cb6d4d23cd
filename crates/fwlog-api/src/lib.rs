//! HTTP API for firewall log upload and query.

pub mod config;
pub mod server;
