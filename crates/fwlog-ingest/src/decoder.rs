//! CSV → [`LogRecord`] decoding.

use crate::timestamp::{parse_epoch_timestamp, EPOCH_START};
use fwlog_types::{normalize_header, DecodeError, LogRecord};
use std::borrow::Cow;
use std::io::Read;
use tracing::debug;

const TIMESTAMP: &str = "Timestamp";
const SOURCE_IP: &str = "Source IP";
const DESTINATION_IP: &str = "Destination IP";
const SOURCE_PORT: &str = "Source Port";
const DESTINATION_PORT: &str = "Destination Port";
const ACTION: &str = "Action";

/// A decoded row plus what the decoder noticed about it.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedRecord {
    /// 1-based physical line in the input.
    pub line: u64,
    pub record: LogRecord,
    /// The timestamp field did not parse and the epoch start was substituted.
    pub timestamp_degraded: bool,
}

/// Field indexes resolved from the header row.
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    timestamp: usize,
    source_ip: usize,
    destination_ip: usize,
    action: usize,
    source_port: Option<usize>,
    destination_port: Option<usize>,
}

impl ColumnMap {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, DecodeError> {
        let normalized: Vec<String> = headers.iter().map(normalize_header).collect();
        let find = |name: &str| {
            let wanted = normalize_header(name);
            normalized.iter().position(|h| *h == wanted)
        };

        let mut missing = Vec::new();
        let mut required = |name: &str| {
            let idx = find(name);
            if idx.is_none() {
                missing.push(name.to_string());
            }
            idx.unwrap_or_default()
        };
        let timestamp = required(TIMESTAMP);
        let source_ip = required(SOURCE_IP);
        let destination_ip = required(DESTINATION_IP);
        let action = required(ACTION);
        if !missing.is_empty() {
            return Err(DecodeError::MissingColumns(missing));
        }

        Ok(Self {
            timestamp,
            source_ip,
            destination_ip,
            action,
            source_port: find(SOURCE_PORT),
            destination_port: find(DESTINATION_PORT),
        })
    }
}

/// Lazy decoder over CSV text with a header row.
///
/// Construction reads and validates the header; iteration yields one
/// [`DecodedRecord`] per data row. Bad timestamps and ports degrade per row,
/// and invalid UTF-8 in a data field is replaced with U+FFFD. A read failure
/// ends the stream with a [`DecodeError`].
pub struct RecordDecoder<R> {
    rows: csv::ByteRecordsIntoIter<R>,
    columns: ColumnMap,
    failed: bool,
}

impl<R: Read> RecordDecoder<R> {
    pub fn new(reader: R) -> Result<Self, DecodeError> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv.headers().map_err(|e| malformed(&e))?;
        if headers.iter().all(|h| h.trim().is_empty()) {
            return Err(DecodeError::MissingHeader);
        }
        let columns = ColumnMap::resolve(headers)?;
        Ok(Self {
            rows: csv.into_byte_records(),
            columns,
            failed: false,
        })
    }

    fn decode_row(&self, row: &csv::ByteRecord) -> DecodedRecord {
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        if row.iter().any(|f| std::str::from_utf8(f).is_err()) {
            debug!(line, "Invalid UTF-8 in row, replacing bad bytes");
        }

        let raw_timestamp = text(row, self.columns.timestamp);
        let (timestamp, timestamp_degraded) = match parse_epoch_timestamp(&raw_timestamp) {
            Some(ts) => (ts, false),
            None => {
                debug!(line, value = %raw_timestamp, "Unparseable timestamp, using epoch start");
                (EPOCH_START, true)
            }
        };

        let port = |idx: Option<usize>, column: &str| {
            let raw = idx.map(|i| text(row, i)).unwrap_or_default();
            if raw.is_empty() {
                return None;
            }
            match raw.parse::<u16>() {
                Ok(p) => Some(p),
                Err(_) => {
                    debug!(line, column, value = %raw, "Unparseable port, treating as absent");
                    None
                }
            }
        };
        let source_port = port(self.columns.source_port, SOURCE_PORT);
        let destination_port = port(self.columns.destination_port, DESTINATION_PORT);

        let record = LogRecord::new(
            timestamp,
            text(row, self.columns.source_ip),
            text(row, self.columns.destination_ip),
            text(row, self.columns.action),
        )
        .with_ports(source_port, destination_port);

        DecodedRecord {
            line,
            record,
            timestamp_degraded,
        }
    }
}

/// Field as text; missing cells are empty.
fn text(row: &csv::ByteRecord, idx: usize) -> Cow<'_, str> {
    row.get(idx)
        .map(String::from_utf8_lossy)
        .unwrap_or(Cow::Borrowed(""))
}

impl<R: Read> Iterator for RecordDecoder<R> {
    type Item = Result<DecodedRecord, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.rows.next()? {
            Ok(row) => Some(Ok(self.decode_row(&row))),
            Err(e) => {
                self.failed = true;
                Some(Err(malformed(&e)))
            }
        }
    }
}

fn malformed(e: &csv::Error) -> DecodeError {
    DecodeError::Malformed {
        line: e.position().map(|p| p.line()).unwrap_or(0),
        message: e.to_string(),
    }
}
