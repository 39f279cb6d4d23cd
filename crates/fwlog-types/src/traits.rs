//! Traits for GeoIP backends and log stores, plus the error taxonomy.

use crate::{GeoLocation, LogPage, LogQuery, LogRecord, StoredLog};
use async_trait::async_trait;
use std::net::IpAddr;

/// IP → location lookup shared by all enrichment calls.
///
/// Implementations are read-only after construction and safe to call
/// concurrently. Backends only implement [`GeoLookup::lookup_addr`]; the
/// provided [`GeoLookup::lookup`] handles parsing, private/loopback
/// exclusion, and absorbs backend errors.
pub trait GeoLookup: Send + Sync {
    /// Query the backing database. `Ok(None)` means "address not found".
    fn lookup_addr(&self, addr: IpAddr) -> Result<Option<GeoLocation>, GeoLookupError>;

    /// Resolve an IP literal. Never fails: invalid text, loopback and
    /// private IPv4 ranges, misses, and backend faults all yield `None`.
    fn lookup(&self, ip: &str) -> Option<GeoLocation> {
        let addr: IpAddr = ip.parse().ok()?;
        if is_private_or_loopback(addr) {
            return None;
        }
        match self.lookup_addr(addr) {
            Ok(found) => found,
            Err(e) => {
                tracing::error!(ip = %addr, error = %e, "GeoIP lookup failed");
                None
            }
        }
    }
}

/// Loopback (v4 and v6) or one of 10/8, 172.16/12, 192.168/16.
///
/// IPv6 unique-local addresses are not excluded.
pub fn is_private_or_loopback(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_private(),
        IpAddr::V6(v6) => v6.is_loopback(),
    }
}

/// Persistence for accepted records.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Insert all records in one transaction; returns their ids in input order.
    async fn insert_batch(&self, records: &[LogRecord]) -> Result<Vec<i64>, StoreError>;

    /// Get one record by id.
    async fn get(&self, id: i64) -> Result<Option<StoredLog>, StoreError>;

    /// Filtered page, newest first.
    async fn query(&self, query: &LogQuery) -> Result<LogPage<StoredLog>, StoreError>;
}

/// Structural failure of the uploaded delimited text. Aborts the whole ingestion.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("missing header row")]
    MissingHeader,
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("malformed CSV at line {line}: {message}")]
    Malformed { line: u64, message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("decode: {0}")]
    Decode(#[from] DecodeError),
}

#[derive(Debug, thiserror::Error)]
pub enum GeoLookupError {
    #[error("geoip database error: {0}")]
    Database(String),
    #[error("geoip error: {0}")]
    Other(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("log store error: {0}")]
    Other(String),
}
