//! Request, response, and query DTOs shared by the store and HTTP layers.

use crate::{GeoLocation, LogRecord, StoredLog};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 50;
/// Page size used when the caller asks for zero or a negative size.
pub const FALLBACK_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 200;

/// Base response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseResponse<T> {
    #[serde(default = "default_code")]
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub data: Option<T>,
}

fn default_code() -> i32 {
    200
}

/// Flat wire form of a stored record (one column per field, nulls when unset).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: i64,
    /// RFC 3339, millisecond precision, `Z` suffix.
    pub timestamp: String,
    pub source_ip: String,
    pub destination_ip: String,
    pub source_port: Option<u16>,
    pub destination_port: Option<u16>,
    pub action: String,
    pub source_geo_country: Option<String>,
    pub source_geo_city: Option<String>,
    pub source_latitude: Option<f64>,
    pub source_longitude: Option<f64>,
    pub destination_geo_country: Option<String>,
    pub destination_geo_city: Option<String>,
    pub destination_latitude: Option<f64>,
    pub destination_longitude: Option<f64>,
}

impl From<&StoredLog> for LogEntry {
    fn from(stored: &StoredLog) -> Self {
        let r = &stored.record;
        let (src_country, src_city, src_lat, src_lon) = split_geo(r.source_geo.as_ref());
        let (dst_country, dst_city, dst_lat, dst_lon) = split_geo(r.destination_geo.as_ref());
        Self {
            id: stored.id,
            timestamp: r.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            source_ip: r.source_ip.clone(),
            destination_ip: r.destination_ip.clone(),
            source_port: r.source_port,
            destination_port: r.destination_port,
            action: r.action.clone(),
            source_geo_country: src_country,
            source_geo_city: src_city,
            source_latitude: src_lat,
            source_longitude: src_lon,
            destination_geo_country: dst_country,
            destination_geo_city: dst_city,
            destination_latitude: dst_lat,
            destination_longitude: dst_lon,
        }
    }
}

type FlatGeo = (Option<String>, Option<String>, Option<f64>, Option<f64>);

fn split_geo(geo: Option<&GeoLocation>) -> FlatGeo {
    match geo {
        Some(g) => (
            Some(g.country.clone()),
            Some(g.city.clone()),
            Some(g.latitude),
            Some(g.longitude),
        ),
        None => (None, None, None, None),
    }
}

/// Filter and page selection for listing stored logs.
///
/// Filters combine with AND; blank text filters are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct LogQuery {
    /// Case-insensitive substring of the source IP.
    pub source_ip: Option<String>,
    /// Case-insensitive substring of the destination IP.
    pub destination_ip: Option<String>,
    /// Case-insensitive exact action.
    pub action: Option<String>,
    /// Inclusive lower bound.
    pub start: Option<DateTime<Utc>>,
    /// Upper bound; the whole day starting at `end` is included.
    pub end: Option<DateTime<Utc>>,
    pub page: u32,
    pub page_size: u32,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            source_ip: None,
            destination_ip: None,
            action: None,
            start: None,
            end: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl LogQuery {
    /// Set page number and size from raw request values, clamping like the list endpoint does.
    pub fn paged(mut self, page: Option<i64>, page_size: Option<i64>) -> Self {
        self.page = normalize_page(page);
        self.page_size = normalize_page_size(page_size);
        self
    }

    pub fn source_ip_filter(&self) -> Option<&str> {
        non_blank(self.source_ip.as_deref())
    }

    pub fn destination_ip_filter(&self) -> Option<&str> {
        non_blank(self.destination_ip.as_deref())
    }

    pub fn action_filter(&self) -> Option<&str> {
        non_blank(self.action.as_deref())
    }

    /// Exclusive upper bound: one day past `end`.
    pub fn end_exclusive(&self) -> Option<DateTime<Utc>> {
        self.end.map(|end| end + Duration::days(1))
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    /// In-process evaluation of the filters (stores without a query engine use this).
    pub fn matches(&self, record: &LogRecord) -> bool {
        if let Some(needle) = self.source_ip_filter() {
            if !contains_ignore_case(&record.source_ip, needle) {
                return false;
            }
        }
        if let Some(needle) = self.destination_ip_filter() {
            if !contains_ignore_case(&record.destination_ip, needle) {
                return false;
            }
        }
        if let Some(action) = self.action_filter() {
            if !record.action.eq_ignore_ascii_case(action) {
                return false;
            }
        }
        if let Some(start) = self.start {
            if record.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end_exclusive() {
            if record.timestamp >= end {
                return false;
            }
        }
        true
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}

pub fn normalize_page(page: Option<i64>) -> u32 {
    match page {
        Some(p) if p > 0 => u32::try_from(p).unwrap_or(u32::MAX),
        _ => 1,
    }
}

pub fn normalize_page_size(page_size: Option<i64>) -> u32 {
    match page_size {
        None => DEFAULT_PAGE_SIZE,
        Some(s) if s <= 0 => FALLBACK_PAGE_SIZE,
        Some(s) if s > i64::from(MAX_PAGE_SIZE) => MAX_PAGE_SIZE,
        Some(s) => s as u32,
    }
}

/// Parse a date filter: RFC 3339, `YYYY-MM-DDTHH:MM:SS` (UTC), or `YYYY-MM-DD` (midnight UTC).
pub fn parse_date_bound(value: &str) -> Result<DateTime<Utc>, String> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(format!("invalid date: {value}"))
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogPage<T> {
    pub total_items: u64,
    pub page_size: u32,
    pub current_page: u32,
    pub total_pages: u64,
    pub items: Vec<T>,
}

impl<T> LogPage<T> {
    pub fn new(query: &LogQuery, total_items: u64, items: Vec<T>) -> Self {
        let page_size = query.page_size.max(1);
        Self {
            total_items,
            page_size,
            current_page: query.page,
            total_pages: total_items.div_ceil(u64::from(page_size)),
            items,
        }
    }

    pub fn map_items<U, F: FnMut(T) -> U>(self, f: F) -> LogPage<U> {
        LogPage {
            total_items: self.total_items,
            page_size: self.page_size,
            current_page: self.current_page,
            total_pages: self.total_pages,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

/// Whether an ingestion produced anything to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    Accepted,
    NothingToPersist,
}

/// A decoded row dropped by validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedRow {
    /// 1-based physical line in the uploaded file.
    pub line: u64,
    pub reason: String,
}

/// Diagnostics for one ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub status: IngestStatus,
    pub rows_decoded: usize,
    pub rows_accepted: usize,
    #[serde(default)]
    pub rejected_rows: Vec<RejectedRow>,
    /// Lines whose timestamp did not parse and were set to the epoch start.
    #[serde(default)]
    pub degraded_timestamp_lines: Vec<u64>,
    pub source_enriched: usize,
    pub destination_enriched: usize,
}

/// Payload of a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResult {
    pub upload_id: String,
    pub saved: usize,
    pub summary: IngestSummary,
}

pub type UploadResponse = BaseResponse<UploadResult>;
