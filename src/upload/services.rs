use std::path::{Path, PathBuf};

use anyhow::Context;
use bytes::Bytes;
use calamine::{open_workbook_auto, Data, Reader};
use tracing::info;

use crate::{
    error::AppError,
    table::{Cell, Table},
};

/// Spreadsheet types the parser understands.
pub const ALLOWED_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

pub fn file_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

pub fn allowed_file(filename: &str) -> bool {
    file_extension(filename)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Strip path components and anything outside `[A-Za-z0-9._-]` from a
/// client-supplied filename. Falls back to `upload.<ext>` when nothing
/// usable survives.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_start_matches('.').to_string();
    if trimmed.is_empty() {
        let ext = file_extension(filename).unwrap_or_else(|| "xlsx".into());
        format!("upload.{ext}")
    } else {
        trimmed
    }
}

/// Validate the client filename, then persist the bytes under `dir`.
/// Nothing is written when validation fails. Same-named uploads
/// overwrite, last write wins.
pub async fn save_upload(dir: &Path, filename: &str, bytes: Bytes) -> Result<PathBuf, AppError> {
    if filename.is_empty() {
        return Err(AppError::NoFileSelected);
    }
    if !allowed_file(filename) {
        return Err(AppError::DisallowedFileType);
    }

    let safe_name = sanitize_filename(filename);
    let path = dir.join(&safe_name);
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("create upload dir {}", dir.display()))?;
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("write upload {}", path.display()))?;
    info!(path = %path.display(), size = bytes.len(), "upload saved");
    Ok(path)
}

/// Parse the first worksheet of a saved workbook into a table. The first
/// row is the header.
pub fn read_table(path: &Path) -> Result<Table, AppError> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("open workbook {}", path.display()))
        .map_err(AppError::Internal)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| AppError::FeatureSchema("workbook has no worksheets".into()))?
        .with_context(|| format!("read worksheet from {}", path.display()))
        .map_err(AppError::Internal)?;

    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| AppError::FeatureSchema("worksheet is empty".into()))?;

    let columns: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(i, cell)| match convert_cell(cell).to_text() {
            Some(name) if !name.is_empty() => name,
            _ => format!("column_{i}"),
        })
        .collect();

    let data = rows
        .map(|row| row.iter().map(convert_cell).collect())
        .collect();

    Ok(Table::new(columns, data))
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Int(v) => Cell::Int(*v),
        Data::Float(v) => Cell::Float(*v),
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => Cell::Float(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) | Data::Empty => Cell::Empty,
    }
}
