//! CSV ingestion.
//!
//! Reads a whole delimited file (plain or gzip-compressed by `.gz`
//! extension) into a [`Table`], normalizing the header row first.

use csv::ReaderBuilder;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::schema::normalize_headers;
use crate::table::Table;

pub(crate) fn is_gzip(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("gz")
}

fn open(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path).map_err(|e| PipelineError::missing_input(path, e))?;
    let reader = BufReader::new(file);
    if is_gzip(path) {
        Ok(Box::new(GzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

/// Reads `path` into a table with normalized, collision-checked column names.
///
/// # Errors
///
/// [`PipelineError::MissingInput`] if the file cannot be opened or has no
/// header row, [`PipelineError::ColumnCollision`] if normalization merges two
/// headers, and [`PipelineError::Csv`] for malformed records.
#[tracing::instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn read_table(path: impl AsRef<Path>, delimiter: u8) -> Result<Table> {
    let path = path.as_ref();
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(open(path)?);

    let raw_headers: Vec<String> = rdr.headers()?.iter().map(String::from).collect();
    if raw_headers.iter().all(|h| h.trim().is_empty()) {
        return Err(PipelineError::missing_input(path, "file has no header row"));
    }
    let headers = normalize_headers(&raw_headers)?;

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(String::from).collect());
    }

    let table = Table::from_rows(headers, rows);
    info!(
        rows = table.len(),
        columns = table.width(),
        "Input table loaded"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    #[test]
    fn test_missing_file_is_missing_input() {
        let err = read_table("/definitely/not/here.csv", b',').unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput { .. }));
    }

    #[test]
    fn test_reads_and_normalizes_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.csv");
        std::fs::write(&path, " Order ID ,City,Order Value\n1,Pune,250\n2,Delhi,\n").unwrap();

        let table = read_table(&path, b',').unwrap();
        assert_eq!(table.names(), vec!["order_id", "city", "order_value"]);
        assert_eq!(table.numeric("order_value").unwrap(), &[Some(250.0), None]);
    }

    #[test]
    fn test_reads_gzip_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.csv.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"order_id;city\n7;Mumbai\n").unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let table = read_table(&path, b';').unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.text("city").unwrap(), &[Some("Mumbai".to_string())]);
    }

    #[test]
    fn test_header_collision_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dup.csv");
        std::fs::write(&path, "City,city\nPune,Pune\n").unwrap();

        let err = read_table(&path, b',').unwrap_err();
        assert!(matches!(err, PipelineError::ColumnCollision { .. }));
    }
}
