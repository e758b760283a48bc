//! Error types for Filtable
//!
//! Structural problems (an empty dataset, a broken share link, a configuration
//! without a title) get their own variant so callers can turn each one into a
//! distinct user-visible state. "No selection" and "no match" are not errors.

use std::string::FromUtf8Error;
use thiserror::Error;

/// Errors raised while decoding a `urlConfig` parameter
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Not valid URL-safe base64
    #[error("configuration is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Decoded bytes are not UTF-8
    #[error("configuration is not valid UTF-8")]
    Utf8(#[from] FromUtf8Error),

    /// Decoded text is not a list of heading configurations
    #[error("configuration is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level error for dataset, configuration and source handling
#[derive(Error, Debug)]
pub enum FiltableError {
    /// Source produced zero rows or zero headings
    #[error("no csv file data")]
    EmptyDataset,

    /// Title is not bound, so the listing cannot be published
    #[error("Select a column header for at least the title")]
    InvalidConfiguration,

    /// Request carried no configuration at all
    #[error("no configuration supplied")]
    MissingConfiguration,

    /// Shared link could not be decoded
    #[error("broken link: {0}")]
    Decode(#[from] DecodeError),

    /// Pasted text is not a Google Sheets link
    #[error("Please input a google sheets link: {link}")]
    InvalidSheetsLink { link: String },

    /// No stored upload under this key
    #[error("upload not found: {key}")]
    UploadNotFound { key: String },

    /// Path segment names neither `csv` nor `sheets`
    #[error("unknown source kind: {kind}")]
    UnknownSourceKind { kind: String },

    /// CSV parsing failed
    #[error("failed to parse csv: {0}")]
    Csv(#[from] csv::Error),

    /// File I/O error in the upload store
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Google Sheets export could not be downloaded
    #[cfg(feature = "web")]
    #[error("failed to fetch google sheet: {0}")]
    Fetch(#[from] reqwest::Error),
}

/// Result type for Filtable operations
pub type Result<T> = std::result::Result<T, FiltableError>;
