//! GeoIP database configuration and backend selection.

use crate::{CidrGeoLookup, MaxMindGeoLookup};
use fwlog_types::{GeoLocation, GeoLookup, GeoLookupError};
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Lookup that never finds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledGeoLookup;

impl GeoLookup for DisabledGeoLookup {
    fn lookup_addr(&self, _addr: IpAddr) -> Result<Option<GeoLocation>, GeoLookupError> {
        Ok(None)
    }
}

/// Where the GeoIP database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoIpConfig {
    /// Database path; relative paths are resolved against `base_dir`.
    pub db_path: Option<String>,
    pub base_dir: PathBuf,
}

impl GeoIpConfig {
    pub fn new(db_path: Option<String>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            db_path,
            base_dir: base_dir.into(),
        }
    }

    /// Absolute (or base-relative) path, `None` when the path is blank.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        let path = self.db_path.as_deref().map(str::trim).filter(|p| !p.is_empty())?;
        Some(self.base_dir.join(path))
    }

    /// Open the configured backend. Any problem degrades to [`DisabledGeoLookup`].
    ///
    /// Paths ending in `.csv` load a [`CidrGeoLookup`]; anything else is opened
    /// as a MaxMind database.
    pub fn open(&self) -> Arc<dyn GeoLookup> {
        let Some(path) = self.resolved_path() else {
            error!("GeoIP database path is not configured; enrichment disabled");
            return Arc::new(DisabledGeoLookup);
        };
        if !path.is_file() {
            error!(path = %path.display(), "GeoIP database file not found; enrichment disabled");
            return Arc::new(DisabledGeoLookup);
        }

        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        let opened: Result<Arc<dyn GeoLookup>, GeoLookupError> = if is_csv {
            CidrGeoLookup::open(&path).map(|t| Arc::new(t) as Arc<dyn GeoLookup>)
        } else {
            MaxMindGeoLookup::open(&path).map(|r| {
                info!(
                    path = %path.display(),
                    database_type = r.database_type(),
                    "GeoIP database opened"
                );
                Arc::new(r) as Arc<dyn GeoLookup>
            })
        };

        match opened {
            Ok(lookup) => lookup,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to open GeoIP database; enrichment disabled");
                Arc::new(DisabledGeoLookup)
            }
        }
    }
}

/// Directory of the running executable, falling back to the working directory.
pub fn default_base_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}
