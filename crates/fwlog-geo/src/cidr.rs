//! CIDR table backend: longest-prefix match over networks loaded from CSV.

use fwlog_types::{normalize_header, GeoLocation, GeoLookup, GeoLookupError};
use ip_network::IpNetwork;
use ip_network_table::IpNetworkTable;
use std::fs::File;
use std::io::Read;
use std::net::IpAddr;
use std::path::Path;
use tracing::{debug, info};

const NETWORK: &str = "network";
const COUNTRY: &str = "country";
const CITY: &str = "city";
const LATITUDE: &str = "latitude";
const LONGITUDE: &str = "longitude";

/// Lookup table keyed by IPv4/IPv6 networks.
///
/// CSV layout: `network,country,city,latitude,longitude`, where `network` is
/// CIDR notation or a bare address (treated as /32 or /128).
pub struct CidrGeoLookup {
    table: IpNetworkTable<GeoLocation>,
    ipv4_count: usize,
    ipv6_count: usize,
}

impl std::fmt::Debug for CidrGeoLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CidrGeoLookup")
            .field("ipv4_count", &self.ipv4_count)
            .field("ipv6_count", &self.ipv6_count)
            .finish_non_exhaustive()
    }
}

impl Default for CidrGeoLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl CidrGeoLookup {
    pub fn new() -> Self {
        Self {
            table: IpNetworkTable::new(),
            ipv4_count: 0,
            ipv6_count: 0,
        }
    }

    /// Insert a network ("10.0.0.0/8", "2001:db8::/32") or single address.
    /// A network that is already present has its location replaced.
    pub fn insert(&mut self, network: &str, location: GeoLocation) -> Result<(), GeoLookupError> {
        let network = parse_network(network.trim())?;
        let is_v4 = matches!(network, IpNetwork::V4(_));
        if self.table.insert(network, location).is_none() {
            if is_v4 {
                self.ipv4_count += 1;
            } else {
                self.ipv6_count += 1;
            }
        }
        Ok(())
    }

    /// Load from a CSV file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, GeoLookupError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| GeoLookupError::Database(format!("{}: {e}", path.display())))?;
        let table = Self::from_csv_reader(file)?;
        info!(
            path = %path.display(),
            ipv4_entries = table.ipv4_count,
            ipv6_entries = table.ipv6_count,
            "Loaded CIDR GeoIP table"
        );
        Ok(table)
    }

    /// Load from CSV text. Rows with an invalid network or coordinates are skipped.
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, GeoLookupError> {
        let mut csv = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv
            .headers()
            .map_err(|e| GeoLookupError::Database(format!("failed to read CSV header: {e}")))?
            .clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| normalize_header(h) == name)
                .ok_or_else(|| GeoLookupError::Database(format!("missing column '{name}'")))
        };
        let network_idx = column(NETWORK)?;
        let country_idx = column(COUNTRY)?;
        let city_idx = column(CITY)?;
        let lat_idx = column(LATITUDE)?;
        let lon_idx = column(LONGITUDE)?;

        let mut table = Self::new();
        let mut skipped = 0usize;
        for row in csv.records() {
            let row = row.map_err(|e| GeoLookupError::Database(e.to_string()))?;
            let line = row.position().map(|p| p.line()).unwrap_or(0);
            let field = |idx: usize| row.get(idx).unwrap_or("");
            let location = match (
                field(lat_idx).parse::<f64>(),
                field(lon_idx).parse::<f64>(),
            ) {
                (Ok(lat), Ok(lon)) => GeoLocation::new(field(country_idx), field(city_idx), lat, lon),
                _ => None,
            };
            let Some(location) = location else {
                debug!(line, "Skipping CIDR entry with invalid coordinates");
                skipped += 1;
                continue;
            };
            if let Err(e) = table.insert(field(network_idx), location) {
                debug!(line, error = %e, "Skipping invalid CIDR entry");
                skipped += 1;
            }
        }
        if skipped > 0 {
            debug!(skipped, "CIDR table rows skipped");
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.ipv4_count + self.ipv6_count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn parse_network(text: &str) -> Result<IpNetwork, GeoLookupError> {
    if let Ok(network) = text.parse::<IpNetwork>() {
        return Ok(network);
    }
    let ip: IpAddr = text
        .parse()
        .map_err(|_| GeoLookupError::Other(format!("invalid IP or CIDR notation: {text}")))?;
    let prefix = match ip {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    };
    IpNetwork::new(ip, prefix).map_err(|e| GeoLookupError::Other(e.to_string()))
}

impl GeoLookup for CidrGeoLookup {
    fn lookup_addr(&self, addr: IpAddr) -> Result<Option<GeoLocation>, GeoLookupError> {
        Ok(self
            .table
            .longest_match(addr)
            .map(|(_, location)| location.clone()))
    }
}
