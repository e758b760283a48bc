use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FiltableError;

/// Where a listing's data comes from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Uploaded CSV file, identified by its upload key
    Csv,
    /// Google Sheet, identified by its combined id and gid
    Sheets,
}

impl SourceKind {
    /// Path segment used in page and API routes
    pub fn route(&self) -> &'static str {
        match self {
            SourceKind::Csv => "csv",
            SourceKind::Sheets => "sheets",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.route())
    }
}

impl FromStr for SourceKind {
    type Err = FiltableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(SourceKind::Csv),
            "sheets" => Ok(SourceKind::Sheets),
            other => Err(FiltableError::UnknownSourceKind {
                kind: other.to_string(),
            }),
        }
    }
}

/// Wizard page for a freshly uploaded or linked source
pub fn configure_path(kind: SourceKind, id: &str) -> String {
    format!("/{}/{}/configure", kind.route(), id)
}

/// Public listing page carrying its encoded configuration
///
/// `encoded` comes from `encode_config` and is already URL-safe.
pub fn listing_path(kind: SourceKind, id: &str, encoded: &str) -> String {
    format!("/{}/{}?urlConfig={}", kind.route(), id, encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_route_segments() {
        assert_eq!("csv".parse::<SourceKind>().unwrap(), SourceKind::Csv);
        assert_eq!("sheets".parse::<SourceKind>().unwrap(), SourceKind::Sheets);
        assert!(matches!(
            "xlsx".parse::<SourceKind>(),
            Err(FiltableError::UnknownSourceKind { .. })
        ));
    }

    #[test]
    fn builds_listing_path() {
        assert_eq!(
            listing_path(SourceKind::Csv, "grants_1234.csv", "W3t9XQ"),
            "/csv/grants_1234.csv?urlConfig=W3t9XQ"
        );
        assert_eq!(configure_path(SourceKind::Sheets, "abc-0"), "/sheets/abc-0/configure");
    }
}
