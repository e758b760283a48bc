use csv::{ReaderBuilder, Trim};
use log::debug;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::dataset::{Dataset, Row};
use crate::error::Result;

/// Load a dataset from any CSV reader
///
/// The first record is the header row. Records may be shorter or longer than
/// the header; missing cells become empty strings and surplus cells are
/// dropped. Records whose cells are all empty are skipped. Header names are
/// trimmed, cell values are kept verbatim. When a header repeats, the first
/// column with that name wins.
///
/// # Arguments
/// * `reader` - Source of CSV bytes
///
/// # Returns
/// * `Result<Dataset>` - The parsed dataset, or `EmptyDataset` / `Csv` errors
///
/// # Examples
/// ```
/// use filtable::loader::from_reader;
///
/// let dataset = from_reader("Name,Category\nA,X\nB,Y\n".as_bytes()).unwrap();
/// assert_eq!(dataset.headings(), ["Name", "Category"]);
/// assert_eq!(dataset.len(), 2);
/// ```
pub fn from_reader<R: Read>(reader: R) -> Result<Dataset> {
    let mut csv_reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(reader);

    let headings: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        // Rows of only empty cells (trailing ",,,") are not listings
        if record.iter().all(str::is_empty) {
            continue;
        }
        // A repeated heading keeps its first column
        let mut row = Row::new();
        for (heading, value) in headings.iter().zip(record.iter()) {
            row.entry(heading.clone())
                .or_insert_with(|| value.to_string());
        }
        rows.push(row);
    }

    debug!(
        "parsed csv with {} headings and {} rows",
        headings.len(),
        rows.len()
    );

    Dataset::new(headings, rows)
}

/// Load a dataset from an in-memory CSV body (uploads, sheet exports)
pub fn from_bytes(bytes: &[u8]) -> Result<Dataset> {
    from_reader(bytes)
}

/// Load a dataset from a CSV file on disk
///
/// # Examples
/// ```no_run
/// use filtable::loader::from_csv;
///
/// match from_csv("data.csv") {
///     Ok(dataset) => println!("Loaded {} rows", dataset.len()),
///     Err(e) => eprintln!("Error loading CSV: {}", e),
/// }
/// ```
pub fn from_csv(filepath: impl AsRef<Path>) -> Result<Dataset> {
    let file = File::open(filepath)?;
    from_reader(file)
}
