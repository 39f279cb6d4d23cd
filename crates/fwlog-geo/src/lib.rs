//! GeoIP lookup backends.
//!
//! - [`MaxMindGeoLookup`] - GeoLite2/GeoIP2 City database via `maxminddb`
//! - [`CidrGeoLookup`] - longest-prefix CIDR table loaded from CSV
//! - [`DisabledGeoLookup`] - used when no database is configured or it fails to open
//!
//! [`GeoIpConfig::open`] picks the backend from configuration.

mod cidr;
mod config;
mod maxmind;

pub use cidr::CidrGeoLookup;
pub use config::{default_base_dir, DisabledGeoLookup, GeoIpConfig};
pub use fwlog_types::{is_private_or_loopback, GeoLocation, GeoLookup, GeoLookupError};
pub use maxmind::MaxMindGeoLookup;
