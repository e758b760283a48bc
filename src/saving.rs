use log::info;
use std::fs::{self, create_dir_all};
use std::path::Path;
use uuid::Uuid;

use crate::dataset::Dataset;
use crate::error::{FiltableError, Result};
use crate::loader;

const UPLOAD_EXTENSION: &str = ".csv";

/// Store an uploaded CSV and return its key
///
/// The body is parsed before anything is written, so an empty or malformed
/// file never gets a key. Keys have the shape `<title>_<uuid>.csv`.
///
/// # Arguments
/// * `dir` - Upload directory, created if missing
/// * `file_name` - Name of the file as picked by the user
/// * `bytes` - Raw CSV body
///
/// # Errors
/// * `FiltableError::EmptyDataset` / `FiltableError::Csv` for unusable content
/// * `FiltableError::Io` if the file cannot be written
pub fn save_upload(dir: impl AsRef<Path>, file_name: &str, bytes: &[u8]) -> Result<String> {
    let dataset = loader::from_bytes(bytes)?;

    let key = format!("{}_{}{}", sanitize_title(file_name), Uuid::new_v4(), UPLOAD_EXTENSION);
    let dir = dir.as_ref();
    create_dir_all(dir)?;
    fs::write(dir.join(&key), bytes)?;

    info!(
        "stored upload {} ({} rows, {} headings)",
        key,
        dataset.len(),
        dataset.headings().len()
    );
    Ok(key)
}

/// Load a stored upload by key
///
/// # Errors
/// * `FiltableError::UploadNotFound` for unknown keys or keys that try to
///   leave the upload directory
pub fn load_upload(dir: impl AsRef<Path>, key: &str) -> Result<Dataset> {
    let not_found = || FiltableError::UploadNotFound {
        key: key.to_string(),
    };

    if key.contains(['/', '\\']) || key.contains("..") || !key.ends_with(UPLOAD_EXTENSION) {
        return Err(not_found());
    }

    let path = dir.as_ref().join(key);
    if !path.is_file() {
        return Err(not_found());
    }

    let (title, _) = split_title_and_uuid(key);
    Ok(loader::from_csv(path)?.with_title(title))
}

/// Split an upload key into its title and uuid parts
///
/// Keys without a uuid part give the whole stem as title and an empty uuid.
pub fn split_title_and_uuid(key: &str) -> (String, String) {
    let stem = key.strip_suffix(UPLOAD_EXTENSION).unwrap_or(key);
    match stem.rsplit_once('_') {
        Some((title, uuid)) => (title.to_string(), uuid.to_string()),
        None => (stem.to_string(), String::new()),
    }
}

/// File stem reduced to `[A-Za-z0-9-]`, never empty
fn sanitize_title(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();

    let title: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    let title = title.trim_matches('-');

    if title.is_empty() {
        "listing".to_string()
    } else {
        title.to_string()
    }
}
