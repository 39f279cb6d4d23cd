//! Firewall log ingestion: CSV decoding, IP validation, GeoIP enrichment.
//!
//! [`IngestionService::ingest`] runs the whole sequence over one uploaded
//! file; [`RecordDecoder`] and [`EnrichmentPipeline`] are its stages.

mod decoder;
mod pipeline;
mod service;
mod timestamp;

pub use decoder::{DecodedRecord, RecordDecoder};
pub use fwlog_types::{DecodeError, IngestError, IngestStatus, IngestSummary, LogRecord, RejectedRow};
pub use pipeline::{EnrichmentOutcome, EnrichmentPipeline};
pub use service::{IngestReport, IngestionService};
pub use timestamp::{parse_epoch_timestamp, EPOCH_START};
