//! Process configuration read from the environment.

use fwlog_geo::{default_base_dir, GeoIpConfig};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}: invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Runtime settings for the API binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen: SocketAddr,
    pub geoip: GeoIpConfig,
    /// SQLite file; `None` keeps logs in memory.
    pub database_path: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Read `FWLOG_LISTEN`, `FWLOG_GEOIP_DB`, `FWLOG_BASE_DIR`, `FWLOG_DATABASE`
    /// and `FWLOG_MAX_UPLOAD_BYTES`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let listen_raw = get("FWLOG_LISTEN").unwrap_or_else(|| DEFAULT_LISTEN.to_string());
        let listen: SocketAddr = listen_raw.parse().map_err(|_| ConfigError::Invalid {
            var: "FWLOG_LISTEN",
            value: listen_raw.clone(),
        })?;

        let base_dir = get("FWLOG_BASE_DIR")
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_base_dir);

        let max_upload_bytes: usize = match get("FWLOG_MAX_UPLOAD_BYTES") {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "FWLOG_MAX_UPLOAD_BYTES",
                value: raw,
            })?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            listen,
            geoip: GeoIpConfig::new(get("FWLOG_GEOIP_DB"), base_dir),
            database_path: get("FWLOG_DATABASE")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            max_upload_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&'static str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<&'static str, String> =
            vars.iter().map(|(k, v)| (*k, v.to_string())).collect();
        AppConfig::from_lookup(|var| map.get(var).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[("FWLOG_BASE_DIR", "/srv/fwlog")]).unwrap();
        assert_eq!(cfg.listen, DEFAULT_LISTEN.parse::<SocketAddr>().unwrap());
        assert_eq!(cfg.max_upload_bytes, DEFAULT_MAX_UPLOAD_BYTES);
        assert!(cfg.database_path.is_none());
        assert!(cfg.geoip.resolved_path().is_none());
    }

    #[test]
    fn geoip_path_is_relative_to_base_dir() {
        let cfg = config(&[
            ("FWLOG_BASE_DIR", "/srv/fwlog"),
            ("FWLOG_GEOIP_DB", "GeoLite2-City.mmdb"),
            ("FWLOG_DATABASE", "logs.db"),
            ("FWLOG_LISTEN", "127.0.0.1:9000"),
        ])
        .unwrap();
        assert_eq!(
            cfg.geoip.resolved_path().unwrap(),
            PathBuf::from("/srv/fwlog/GeoLite2-City.mmdb")
        );
        assert_eq!(cfg.database_path, Some(PathBuf::from("logs.db")));
        assert_eq!(cfg.listen.port(), 9000);
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = config(&[("FWLOG_LISTEN", "nowhere")]).unwrap_err();
        assert!(err.to_string().contains("FWLOG_LISTEN"));
        assert!(config(&[("FWLOG_MAX_UPLOAD_BYTES", "lots")]).is_err());
    }
}
