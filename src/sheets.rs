//! Google Sheets links
//!
//! A pasted link such as
//! `https://docs.google.com/spreadsheets/d/<id>/edit#gid=<gid>` is reduced to
//! a [`SheetRef`]. The id and gid travel in page routes as one segment,
//! `<id>-<gid>`, and the data itself is read from the sheet's CSV export.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::error::{FiltableError, Result};

lazy_static! {
    static ref SHEET_ID_REGEX: Regex =
        Regex::new(r"/spreadsheets/d/([A-Za-z0-9_-]+)").unwrap();
    static ref GID_REGEX: Regex = Regex::new(r"[#&?]gid=([0-9]+)").unwrap();
}

/// Sheet id plus tab id
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SheetRef {
    pub id: String,
    pub gid: String,
}

/// A link is defined when it has any non-blank content
pub fn is_defined_link(link: &str) -> bool {
    !link.trim().is_empty()
}

/// Pull the sheet id and gid out of a pasted link
///
/// The gid defaults to `0`, the first tab.
///
/// # Errors
/// * `FiltableError::InvalidSheetsLink` if the link has no sheet id
///
/// # Examples
/// ```
/// use filtable::sheets::extract_id_and_gid;
///
/// let sheet = extract_id_and_gid(
///     "https://docs.google.com/spreadsheets/d/1AbC_d-9/edit#gid=42",
/// ).unwrap();
/// assert_eq!(sheet.id, "1AbC_d-9");
/// assert_eq!(sheet.gid, "42");
/// ```
pub fn extract_id_and_gid(link: &str) -> Result<SheetRef> {
    let link = link.trim();
    let id = SHEET_ID_REGEX
        .captures(link)
        .map(|captures| captures[1].to_string())
        .ok_or_else(|| FiltableError::InvalidSheetsLink {
            link: link.to_string(),
        })?;
    let gid = GID_REGEX
        .captures(link)
        .map(|captures| captures[1].to_string())
        .unwrap_or_else(|| "0".to_string());

    Ok(SheetRef { id, gid })
}

/// Join id and gid into one route segment
pub fn combined_id_and_gid(id: &str, gid: &str) -> String {
    format!("{}-{}", id, gid)
}

/// Inverse of [`combined_id_and_gid`]
///
/// Ids may themselves contain `-`, so the gid is everything after the last one.
pub fn split_combined_id_and_gid(combined: &str) -> Result<SheetRef> {
    let invalid = || FiltableError::InvalidSheetsLink {
        link: combined.to_string(),
    };
    let (id, gid) = combined.rsplit_once('-').ok_or_else(invalid)?;
    if id.is_empty() || gid.is_empty() || !gid.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    Ok(SheetRef {
        id: id.to_string(),
        gid: gid.to_string(),
    })
}

/// CSV export URL of one tab
pub fn export_url(base: &str, sheet: &SheetRef) -> String {
    format!(
        "{}/{}/export?format=csv&gid={}",
        base.trim_end_matches('/'),
        sheet.id,
        sheet.gid
    )
}

#[cfg(feature = "web")]
pub use client::SheetsClient;

#[cfg(feature = "web")]
mod client {
    use log::info;
    use std::time::Duration;

    use super::{SheetRef, export_url};
    use crate::dataset::Dataset;
    use crate::error::Result;
    use crate::loader;

    /// Downloads sheet tabs through their CSV export
    #[derive(Clone, Debug)]
    pub struct SheetsClient {
        client: reqwest::Client,
        base_url: String,
    }

    impl SheetsClient {
        pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
            let client = reqwest::Client::builder().timeout(timeout).build()?;
            Ok(SheetsClient {
                client,
                base_url: base_url.into(),
            })
        }

        /// Fetch and parse one tab
        ///
        /// # Errors
        /// * `FiltableError::Fetch` on transport failure or a non-success status
        /// * `FiltableError::EmptyDataset` if the tab has no data
        pub async fn fetch_dataset(&self, sheet: &SheetRef) -> Result<Dataset> {
            let url = export_url(&self.base_url, sheet);
            info!("fetching google sheet {} (gid {})", sheet.id, sheet.gid);

            let bytes = self
                .client
                .get(&url)
                .send()
                .await?
                .error_for_status()?
                .bytes()
                .await?;

            loader::from_bytes(&bytes)
        }
    }
}
