//! Persistence for the cleaned table and its run metadata.
//!
//! Files are written to a temporary sibling and renamed over the target, so
//! a failed run never leaves a partial or corrupt file behind.

use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::pipeline::CleaningReport;
use crate::table::Table;

/// Logs a cleaning report using Rust's debug pretty-print format.
pub fn print_pretty(report: &CleaningReport) {
    debug!("{:#?}", report);
}

/// Logs a cleaning report as pretty-printed JSON.
pub fn print_json(report: &CleaningReport) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

/// Path of the JSON sidecar describing the run that produced `output`.
pub fn metadata_path(output: &Path) -> PathBuf {
    let mut name = OsString::from(output.as_os_str());
    name.push(".meta.json");
    PathBuf::from(name)
}

/// Creates a temp file beside `target` and lets `fill` write it. The target
/// is untouched until the returned file is persisted.
fn stage<F>(target: &Path, fill: F) -> Result<NamedTempFile>
where
    F: FnOnce(&mut NamedTempFile) -> Result<()>,
{
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    fill(&mut tmp)?;
    tmp.as_file().sync_all()?;
    Ok(tmp)
}

fn persist(tmp: NamedTempFile, target: &Path) -> Result<()> {
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

/// Writes a temp file beside `target` with `fill`, then atomically replaces
/// `target`.
pub(crate) fn write_atomically<F>(target: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut NamedTempFile) -> Result<()>,
{
    persist(stage(target, fill)?, target)
}

/// Serializes `table` as CSV with a header row and no index column.
pub fn write_table<W: Write>(table: &Table, writer: W, delimiter: u8) -> Result<()> {
    let mut wtr = WriterBuilder::new().delimiter(delimiter).from_writer(writer);
    wtr.write_record(table.names())?;
    for row in 0..table.len() {
        wtr.write_record(table.row_strings(row))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the cleaned table and its metadata sidecar.
///
/// Both files are fully written before either replaces its target, and the
/// sidecar is persisted first: a failure leaves the previous table in place.
#[tracing::instrument(skip_all, fields(output = %config.output.display(), rows = table.len()))]
pub fn write_cleaned(table: &Table, report: &CleaningReport, config: &PipelineConfig) -> Result<()> {
    let delimiter = config.delimiter_byte();
    let meta_bytes = serde_json::to_vec_pretty(report)?;

    let staged_table = stage(&config.output, |tmp| {
        if config.gzip_output {
            let mut encoder = GzEncoder::new(tmp.as_file_mut(), Compression::default());
            write_table(table, &mut encoder, delimiter)?;
            encoder.finish()?;
        } else {
            write_table(table, tmp.as_file_mut(), delimiter)?;
        }
        Ok(())
    })?;

    let meta = metadata_path(&config.output);
    let staged_meta = stage(&meta, |tmp| {
        tmp.write_all(&meta_bytes)?;
        Ok(())
    })?;

    persist(staged_meta, &meta)?;
    persist(staged_table, &config.output)?;

    info!(meta = %meta.display(), "Cleaned table written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_rows(
            vec!["order_id".to_string(), "city".to_string(), "profit".to_string()],
            vec![
                vec!["1".to_string(), "Pune".to_string(), "110".to_string()],
                vec!["2".to_string(), "".to_string(), "2.5".to_string()],
            ],
        )
    }

    #[test]
    fn test_write_table_format() {
        let mut buf = Vec::new();
        write_table(&sample(), &mut buf, b',').unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "order_id,city,profit\n1,Pune,110\n2,,2.5\n");
    }

    #[test]
    fn test_metadata_path() {
        assert_eq!(
            metadata_path(Path::new("data/clean.csv")),
            PathBuf::from("data/clean.csv.meta.json")
        );
    }

    #[test]
    fn test_write_atomically_replaces_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("out.csv");

        write_atomically(&target, |tmp| {
            tmp.write_all(b"old")?;
            Ok(())
        })
        .unwrap();
        write_atomically(&target, |tmp| {
            tmp.write_all(b"new")?;
            Ok(())
        })
        .unwrap();

        assert_eq!(std::fs::read_to_string(&target).unwrap(), "new");
        let leftovers = std::fs::read_dir(target.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_failed_fill_leaves_target_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("out.csv");
        std::fs::write(&target, "previous").unwrap();

        let result = write_atomically(&target, |tmp| {
            tmp.write_all(b"partial")?;
            Err(crate::error::PipelineError::schema("boom"))
        });

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&target).unwrap(), "previous");
    }

    #[test]
    fn test_sidecar_failure_keeps_previous_table() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("cleaned.csv");
        std::fs::write(&output, "previous").unwrap();
        // a directory in the sidecar's place makes its rename fail
        std::fs::create_dir(metadata_path(&output)).unwrap();

        let config = PipelineConfig::default().with_paths(dir.path().join("raw.csv"), &output);
        let table = Table::from_rows(
            vec!["order_id".to_string(), "order_value".to_string()],
            vec![vec!["1".to_string(), "200".to_string()]],
        );
        let report = crate::pipeline::clean(table.clone(), &config).unwrap().report;

        assert!(write_cleaned(&table, &report, &config).is_err());
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "previous");
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 2);
    }
}
