//! IP validation and GeoIP enrichment of decoded records.

use crate::DecodedRecord;
use fwlog_types::{GeoLookup, LogRecord, RejectedRow};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::warn;

/// Result of enriching one batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrichmentOutcome {
    /// Records that passed validation, in input order.
    pub accepted: Vec<LogRecord>,
    pub rejected: Vec<RejectedRow>,
    pub source_enriched: usize,
    pub destination_enriched: usize,
}

/// Validates IP fields and attaches source/destination geolocation.
#[derive(Clone)]
pub struct EnrichmentPipeline {
    geo: Arc<dyn GeoLookup>,
}

impl EnrichmentPipeline {
    pub fn new(geo: Arc<dyn GeoLookup>) -> Self {
        Self { geo }
    }

    /// Enrich a batch. Rows with an invalid source or destination IP are
    /// dropped and reported; nothing here fails the batch.
    pub fn enrich<I>(&self, decoded: I) -> EnrichmentOutcome
    where
        I: IntoIterator<Item = DecodedRecord>,
    {
        let decoded = decoded.into_iter();
        let mut outcome = EnrichmentOutcome {
            accepted: Vec::with_capacity(decoded.size_hint().0),
            ..EnrichmentOutcome::default()
        };

        for DecodedRecord { line, mut record, .. } in decoded {
            if let Err(reason) = validate_ips(&record) {
                warn!(
                    line,
                    source_ip = %record.source_ip,
                    destination_ip = %record.destination_ip,
                    "Skipping entry due to invalid IP format"
                );
                outcome.rejected.push(RejectedRow { line, reason });
                continue;
            }

            record.source_geo = self.geo.lookup(&record.source_ip);
            record.destination_geo = self.geo.lookup(&record.destination_ip);
            outcome.source_enriched += usize::from(record.source_geo.is_some());
            outcome.destination_enriched += usize::from(record.destination_geo.is_some());
            outcome.accepted.push(record);
        }
        outcome
    }
}

fn validate_ips(record: &LogRecord) -> Result<(), String> {
    let mut invalid = Vec::new();
    if record.source_ip.parse::<IpAddr>().is_err() {
        invalid.push(format!("invalid source IP '{}'", record.source_ip));
    }
    if record.destination_ip.parse::<IpAddr>().is_err() {
        invalid.push(format!("invalid destination IP '{}'", record.destination_ip));
    }
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(invalid.join("; "))
    }
}
