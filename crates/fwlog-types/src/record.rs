//! Firewall log record and its geolocation enrichment.

use chrono::{DateTime, Utc};

/// Geolocation for one direction of a log record.
///
/// Country, city and coordinates are set together or not at all, so a record
/// holds an `Option<GeoLocation>` per direction instead of four loose fields.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoLocation {
    pub country: String,
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoLocation {
    /// Build a location; `None` when the coordinates are outside ±90 / ±180.
    pub fn new(
        country: impl Into<String>,
        city: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Option<Self> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        Some(Self {
            country: country.into(),
            city: city.into(),
            latitude,
            longitude,
        })
    }
}

/// One firewall log line after decoding (and, later, enrichment).
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub source_ip: String,
    pub destination_ip: String,
    pub source_port: Option<u16>,
    pub destination_port: Option<u16>,
    pub action: String,
    pub source_geo: Option<GeoLocation>,
    pub destination_geo: Option<GeoLocation>,
}

impl LogRecord {
    /// Record without ports or enrichment.
    pub fn new(
        timestamp: DateTime<Utc>,
        source_ip: impl Into<String>,
        destination_ip: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            source_ip: source_ip.into(),
            destination_ip: destination_ip.into(),
            source_port: None,
            destination_port: None,
            action: action.into(),
            source_geo: None,
            destination_geo: None,
        }
    }

    pub fn with_ports(mut self, source_port: Option<u16>, destination_port: Option<u16>) -> Self {
        self.source_port = source_port;
        self.destination_port = destination_port;
        self
    }
}

/// A persisted record with its store-assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredLog {
    pub id: i64,
    pub record: LogRecord,
}
