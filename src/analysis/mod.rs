//! Read-only analysis over the persisted cleaned table.
//!
//! This module groups and aggregates the cleaned output for exploratory
//! reporting and for a dashboard summary. Every section tolerates missing
//! optional columns and reports a placeholder instead of failing.

pub mod aggregate;
pub mod dashboard;
pub mod report;
pub mod types;
pub mod utility;

use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::reader::read_table;
use crate::table::Table;

/// Order-amount columns understood by the analysis layer, most preferred first.
pub const AMOUNT_COLUMNS: &[&str] = &["order_value", "total_amount"];

pub fn amount_column(table: &Table) -> Option<&'static str> {
    AMOUNT_COLUMNS
        .iter()
        .copied()
        .find(|c| table.numeric(c).is_some())
}

/// Loads the cleaned table written by the pipeline with `delimiter`.
pub fn load_cleaned(path: &Path, delimiter: u8) -> Result<Table> {
    if !path.exists() {
        return Err(PipelineError::missing_input(
            path,
            "cleaned table not found, run the clean command first",
        ));
    }
    read_table(path, delimiter)
}
