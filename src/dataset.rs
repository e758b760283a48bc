use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{FiltableError, Result};

/// One record of a dataset, keyed by heading
pub type Row = BTreeMap<String, String>;

/// In-memory snapshot of one CSV file or Google Sheet
///
/// Rows keep their source order and headings keep their column order. A
/// dataset always has at least one row and one heading; the first row is the
/// sample used by the configuration wizard's preview.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(rename = "data")]
    rows: Vec<Row>,
    headings: Vec<String>,
    title: Option<String>,
}

impl Dataset {
    /// Build a dataset, refusing empty input
    ///
    /// Duplicate headings are collapsed to their first occurrence. Rows missing
    /// a heading get an empty cell so every row shares the same heading set.
    ///
    /// # Errors
    /// * `FiltableError::EmptyDataset` if there are no rows or no headings
    pub fn new(headings: Vec<String>, rows: Vec<Row>) -> Result<Self> {
        let mut distinct: Vec<String> = Vec::with_capacity(headings.len());
        for heading in headings {
            if !distinct.contains(&heading) {
                distinct.push(heading);
            }
        }

        if distinct.is_empty() || rows.is_empty() {
            return Err(FiltableError::EmptyDataset);
        }

        let rows = rows
            .into_iter()
            .map(|mut row| {
                for heading in &distinct {
                    row.entry(heading.clone()).or_default();
                }
                row
            })
            .collect();

        Ok(Dataset {
            rows,
            headings: distinct,
            title: None,
        })
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn headings(&self) -> &[String] {
        &self.headings
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The representative sample row
    pub fn first_row(&self) -> &Row {
        // `new` guarantees at least one row
        &self.rows[0]
    }

    pub fn has_heading(&self, heading: &str) -> bool {
        self.headings.iter().any(|h| h == heading)
    }
}

/// Look up a cell, resolving unknown headings to `None`
pub fn cell<'a>(row: &'a Row, heading: &str) -> Option<&'a str> {
    row.get(heading).map(String::as_str)
}
