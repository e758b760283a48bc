use log::warn;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

// Defaults
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_SHEETS_BASE: &str = "https://docs.google.com/spreadsheets/d";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024; // 10 MiB

/// Server settings
///
/// Every field can be overridden through a `FILTABLE_*` environment variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    /// Address the HTTP server listens on (`FILTABLE_ADDR`)
    pub bind_addr: String,

    /// Directory holding uploaded CSV files (`FILTABLE_UPLOAD_DIR`)
    pub upload_dir: PathBuf,

    /// Base of Google Sheets export URLs (`FILTABLE_SHEETS_BASE`)
    pub sheets_export_base: String,

    /// Timeout for sheet downloads in seconds (`FILTABLE_FETCH_TIMEOUT`)
    pub fetch_timeout_secs: u64,

    /// Largest accepted upload body (`FILTABLE_MAX_UPLOAD`)
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            sheets_export_base: DEFAULT_SHEETS_BASE.to_string(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl AppConfig {
    /// Read settings from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read settings through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: lookup("FILTABLE_ADDR").unwrap_or(defaults.bind_addr),
            upload_dir: lookup("FILTABLE_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            sheets_export_base: lookup("FILTABLE_SHEETS_BASE")
                .unwrap_or(defaults.sheets_export_base),
            fetch_timeout_secs: parse_or(
                "FILTABLE_FETCH_TIMEOUT",
                lookup("FILTABLE_FETCH_TIMEOUT"),
                defaults.fetch_timeout_secs,
            ),
            max_upload_bytes: parse_or(
                "FILTABLE_MAX_UPLOAD",
                lookup("FILTABLE_MAX_UPLOAD"),
                defaults.max_upload_bytes,
            ),
        }
    }

    /// Command line arguments win over the environment; the first one is the
    /// bind address
    pub fn with_args(mut self, args: &[String]) -> Self {
        if let Some(addr) = args.get(1) {
            self.bind_addr = addr.clone();
        }
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn parse_or<T: FromStr + Copy>(name: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("ignoring unparseable {}={:?}", name, raw);
            default
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn falls_back_to_defaults() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.fetch_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn reads_overrides_and_ignores_garbage() {
        let vars: HashMap<&str, &str> = [
            ("FILTABLE_ADDR", "0.0.0.0:8080"),
            ("FILTABLE_UPLOAD_DIR", "/tmp/filtable"),
            ("FILTABLE_FETCH_TIMEOUT", "five"),
            ("FILTABLE_MAX_UPLOAD", "2048"),
        ]
        .into_iter()
        .collect();

        let config = AppConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()));
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.upload_dir, PathBuf::from("/tmp/filtable"));
        assert_eq!(config.fetch_timeout_secs, 30);
        assert_eq!(config.max_upload_bytes, 2048);
    }

    #[test]
    fn first_argument_is_bind_address() {
        let args = vec!["filtable".to_string(), "127.0.0.1:9000".to_string()];
        let config = AppConfig::default().with_args(&args);
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
    }
}
