/*!
# Filtable

Turn a CSV file or a Google Sheet into a shareable, filterable listing.

## Overview

A user uploads a CSV file or pastes a Google Sheets link, maps spreadsheet
columns to the parts of a listing card (title, description, numbered texts,
link, filterable tags) in a three step wizard, and receives a share link. The
link carries the whole configuration, so the listing page needs nothing but
the source id and the `urlConfig` parameter.

## Architecture

### Core (always built)
- **Dataset** - Rows keyed by heading, ordered headings, sample first row
- **Loader** - CSV parsing into datasets
- **Configuration** - Typed heading configuration, filter extraction,
  `urlConfig` encoding and wizard previews
- **Filter** - Filter option enumeration, selection state and evaluation
- **Upload store** - Uploaded CSV files on disk, keyed `<title>_<uuid>.csv`
- **Sheets** - Google Sheets link parsing and export URLs

### Backend (`web` feature)
- **Technologies**: Rust, axum, tokio, reqwest
- JSON API used by the browser front end; see [`app`]

## Data flow

```text
CSV / Sheet -> Dataset -> HeadingConfig (wizard) -> ProcessedFilters
            -> FilterOptionsIndex + Filter -> visible rows -> listing cards
```

## REST API Endpoints

- `PUT /api/upload?fileName=` - Store a CSV upload
- `POST /api/link` - Resolve a pasted Google Sheets link
- `GET /api/datasets/{kind}/{id}` - Rows, headings and first row of a source
- `POST /api/datasets/{kind}/{id}/preview` - Preview a listing card
- `POST /api/datasets/{kind}/{id}/publish` - Encode a configuration into a share path
- `POST /api/datasets/{kind}/{id}/listing` - Apply a filter change and list visible rows
*/

pub mod config;
pub mod configuration;
pub mod dataset;
pub mod error;
pub mod filter;
pub mod loader;
pub mod saving;
pub mod sheets;
pub mod source;

#[cfg(feature = "web")]
pub mod app;

pub use configuration::{
    ExtractedFilter, FieldBinding, FilterKeyword, HeadingConfig, ProcessedFilters, Tag,
    decode_config, encode_config, extract_filters, process_extracted_filters,
};
pub use dataset::{Dataset, Row};
pub use error::{DecodeError, FiltableError, Result};
pub use filter::{
    Filter, FilterChange, FilterOptionsIndex, apply_filter, currently_selected_filters,
    enumerate_all_filter_options,
};
pub use source::SourceKind;
