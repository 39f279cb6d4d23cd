//! End-to-end ingestion of one uploaded file.

use crate::{DecodedRecord, EnrichmentPipeline, RecordDecoder};
use fwlog_types::{GeoLookup, IngestError, IngestStatus, IngestSummary, LogRecord};
use std::io::Read;
use std::sync::Arc;
use tracing::info;

/// Accepted records plus diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestReport {
    pub records: Vec<LogRecord>,
    pub summary: IngestSummary,
}

/// Decode → enrich → report. Persistence is left to the caller.
#[derive(Clone)]
pub struct IngestionService {
    pipeline: EnrichmentPipeline,
}

impl IngestionService {
    pub fn new(geo: Arc<dyn GeoLookup>) -> Self {
        Self {
            pipeline: EnrichmentPipeline::new(geo),
        }
    }

    /// Ingest a whole file.
    ///
    /// The file is decoded completely before enrichment starts, so a
    /// structural failure anywhere returns `Err` and nothing else. A valid
    /// file with no acceptable rows is `Ok` with
    /// [`IngestStatus::NothingToPersist`].
    pub fn ingest<R: Read>(&self, reader: R) -> Result<IngestReport, IngestError> {
        let decoded: Vec<DecodedRecord> =
            RecordDecoder::new(reader)?.collect::<Result<_, _>>()?;
        let rows_decoded = decoded.len();
        let degraded_timestamp_lines: Vec<u64> = decoded
            .iter()
            .filter(|d| d.timestamp_degraded)
            .map(|d| d.line)
            .collect();

        let outcome = self.pipeline.enrich(decoded);
        let status = if outcome.accepted.is_empty() {
            IngestStatus::NothingToPersist
        } else {
            IngestStatus::Accepted
        };
        let summary = IngestSummary {
            status,
            rows_decoded,
            rows_accepted: outcome.accepted.len(),
            rejected_rows: outcome.rejected,
            degraded_timestamp_lines,
            source_enriched: outcome.source_enriched,
            destination_enriched: outcome.destination_enriched,
        };
        info!(
            rows_decoded,
            rows_accepted = summary.rows_accepted,
            rows_rejected = summary.rejected_rows.len(),
            degraded_timestamps = summary.degraded_timestamp_lines.len(),
            "Ingestion finished"
        );

        Ok(IngestReport {
            records: outcome.accepted,
            summary,
        })
    }
}
