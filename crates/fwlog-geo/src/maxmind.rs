//! MaxMind City database backend.

use fwlog_types::{GeoLocation, GeoLookup, GeoLookupError};
use maxminddb::{geoip2, MaxMindDBError, Reader};
use std::net::IpAddr;
use std::path::Path;
use tracing::debug;

/// Names are read from this locale.
const LOCALE: &str = "en";

/// Lookup backed by a GeoLite2/GeoIP2 City database held in memory.
pub struct MaxMindGeoLookup {
    reader: Reader<Vec<u8>>,
}

impl MaxMindGeoLookup {
    /// Open a `.mmdb` file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GeoLookupError> {
        let reader = Reader::open_readfile(path.as_ref())
            .map_err(|e| GeoLookupError::Database(e.to_string()))?;
        Ok(Self { reader })
    }

    /// Database type from the metadata section, e.g. "GeoLite2-City".
    pub fn database_type(&self) -> &str {
        &self.reader.metadata.database_type
    }
}

impl std::fmt::Debug for MaxMindGeoLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaxMindGeoLookup")
            .field("database_type", &self.database_type())
            .finish_non_exhaustive()
    }
}

impl GeoLookup for MaxMindGeoLookup {
    fn lookup_addr(&self, addr: IpAddr) -> Result<Option<GeoLocation>, GeoLookupError> {
        location_from_lookup(addr, self.reader.lookup::<geoip2::City>(addr))
    }
}

/// Map a reader result: a miss is `Ok(None)`, other reader errors are faults.
fn location_from_lookup(
    addr: IpAddr,
    result: Result<geoip2::City<'_>, MaxMindDBError>,
) -> Result<Option<GeoLocation>, GeoLookupError> {
    match result {
        Ok(city) => {
            let location = location_from_city(&city);
            if location.is_none() {
                debug!(ip = %addr, "GeoIP record incomplete, skipping");
            }
            Ok(location)
        }
        Err(MaxMindDBError::AddressNotFoundError(_)) => {
            debug!(ip = %addr, "GeoIP address not found");
            Ok(None)
        }
        Err(e) => Err(GeoLookupError::Database(e.to_string())),
    }
}

/// All four parts or nothing.
fn location_from_city(city: &geoip2::City<'_>) -> Option<GeoLocation> {
    let country = city.country.as_ref()?.names.as_ref()?.get(LOCALE)?;
    let city_name = city.city.as_ref()?.names.as_ref()?.get(LOCALE)?;
    let location = city.location.as_ref()?;
    GeoLocation::new(*country, *city_name, location.latitude?, location.longitude?)
}
