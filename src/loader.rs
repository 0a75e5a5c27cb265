//! Database load contract for the cleaned table.
//!
//! Produces a full replace-load script for a fixed `food_orders` schema:
//! drop, create, then batched multi-row inserts. Every row is validated
//! against the schema before anything is written, so a bad value aborts the
//! load with no script on disk.

use serde::Serialize;
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::output::write_atomically;
use crate::reader::read_table;
use crate::table::{ColumnData, Table, format_number};
use crate::temporal::{TIMESTAMP_FORMAT, parse_timestamp};

pub const DEFAULT_TABLE: &str = "food_orders";
pub const DEFAULT_CHUNK_SIZE: usize = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    BigInt,
    Varchar(usize),
    Float,
    DateTime,
}

impl SqlType {
    fn ddl(&self) -> String {
        match self {
            SqlType::BigInt => "BIGINT".to_string(),
            SqlType::Varchar(len) => format!("VARCHAR({len})"),
            SqlType::Float => "FLOAT".to_string(),
            SqlType::DateTime => "DATETIME".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub sql_type: SqlType,
}

const fn col(name: &'static str, sql_type: SqlType) -> ColumnSpec {
    ColumnSpec { name, sql_type }
}

/// Target schema of the `food_orders` table.
pub const FOOD_ORDERS_SCHEMA: &[ColumnSpec] = &[
    col("order_id", SqlType::BigInt),
    col("customer_id", SqlType::BigInt),
    col("restaurant_name", SqlType::Varchar(255)),
    col("city", SqlType::Varchar(100)),
    col("order_date", SqlType::DateTime),
    col("order_value", SqlType::Float),
    col("discount", SqlType::Float),
    col("delivery_time", SqlType::Float),
    col("delivery_rating", SqlType::Float),
    col("order_status", SqlType::Varchar(50)),
    col("payment_mode", SqlType::Varchar(50)),
    col("estimated_delivery_cost", SqlType::Float),
    col("estimated_platform_cost", SqlType::Float),
    col("profit", SqlType::Float),
    col("profit_margin_pct", SqlType::Float),
    col("day_type", SqlType::Varchar(20)),
    col("peak_hour", SqlType::Varchar(10)),
    col("age_group", SqlType::Varchar(20)),
    col("delivery_performance", SqlType::Varchar(20)),
];

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl SqlValue {
    fn literal(&self) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Int(v) => v.to_string(),
            SqlValue::Float(v) => format_number(*v),
            SqlValue::Text(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub table: String,
    pub rows: usize,
    pub insert_statements: usize,
    /// Schema columns absent from the cleaned file, loaded as NULL.
    pub missing_columns: Vec<String>,
    /// Cleaned columns with no place in the schema.
    pub ignored_columns: Vec<String>,
}

fn validate_identifier(name: &str) -> Result<()> {
    let ok = !name.is_empty()
        && name.len() <= 64
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if ok {
        Ok(())
    } else {
        Err(PipelineError::config(format!("invalid table name '{name}'")))
    }
}

fn load_error(row: usize, column: &str, message: impl Into<String>) -> PipelineError {
    PipelineError::Load {
        row,
        column: column.to_string(),
        message: message.into(),
    }
}

fn convert(spec: &ColumnSpec, data: &ColumnData, row: usize) -> Result<SqlValue> {
    if data.is_null(row) {
        return Ok(SqlValue::Null);
    }

    match (spec.sql_type, data) {
        (SqlType::BigInt, ColumnData::Numeric(values)) => {
            let v = values[row].unwrap_or_default();
            if v.fract() != 0.0 || v.abs() > i64::MAX as f64 {
                return Err(load_error(row, spec.name, format!("{v} is not an integer")));
            }
            Ok(SqlValue::Int(v as i64))
        }
        (SqlType::Float, ColumnData::Numeric(values)) => {
            Ok(SqlValue::Float(values[row].unwrap_or_default()))
        }
        (SqlType::BigInt | SqlType::Float, ColumnData::Text(values)) => Err(load_error(
            row,
            spec.name,
            format!("'{}' is not numeric", values[row].as_deref().unwrap_or_default()),
        )),
        (SqlType::Varchar(max), _) => {
            let text = match data {
                ColumnData::Text(values) => values[row].clone().unwrap_or_default(),
                ColumnData::Numeric(values) => values[row].map(format_number).unwrap_or_default(),
            };
            let len = text.chars().count();
            if len > max {
                return Err(load_error(
                    row,
                    spec.name,
                    format!("{len} characters exceeds VARCHAR({max})"),
                ));
            }
            Ok(SqlValue::Text(text))
        }
        (SqlType::DateTime, ColumnData::Text(values)) => {
            let raw = values[row].as_deref().unwrap_or_default();
            let ts = parse_timestamp(raw)
                .ok_or_else(|| load_error(row, spec.name, format!("'{raw}' is not a datetime")))?;
            Ok(SqlValue::Text(ts.format(TIMESTAMP_FORMAT).to_string()))
        }
        (SqlType::DateTime, ColumnData::Numeric(_)) => {
            Err(load_error(row, spec.name, "numeric value is not a datetime"))
        }
    }
}

/// Converts every row of `table` into typed values for `schema`.
pub fn prepare_rows(table: &Table, schema: &[ColumnSpec]) -> Result<Vec<Vec<SqlValue>>> {
    let columns: Vec<Option<&ColumnData>> = schema
        .iter()
        .map(|spec| table.column(spec.name).map(|c| &c.data))
        .collect();

    (0..table.len())
        .map(|row| {
            schema
                .iter()
                .zip(&columns)
                .map(|(spec, data)| match data {
                    Some(data) => convert(spec, data, row),
                    None => Ok(SqlValue::Null),
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect()
}

/// Renders a drop/create/insert script for `rows`.
pub fn render_script(
    table_name: &str,
    schema: &[ColumnSpec],
    rows: &[Vec<SqlValue>],
    chunk_size: usize,
) -> String {
    let mut sql = String::new();
    let _ = writeln!(sql, "DROP TABLE IF EXISTS `{table_name}`;");
    let _ = writeln!(sql, "CREATE TABLE `{table_name}` (");
    let defs: Vec<String> = schema
        .iter()
        .map(|spec| format!("    `{}` {}", spec.name, spec.sql_type.ddl()))
        .collect();
    let _ = writeln!(sql, "{}\n);", defs.join(",\n"));

    let column_list = schema
        .iter()
        .map(|spec| format!("`{}`", spec.name))
        .collect::<Vec<_>>()
        .join(", ");

    for chunk in rows.chunks(chunk_size.max(1)) {
        let _ = writeln!(sql, "INSERT INTO `{table_name}` ({column_list}) VALUES");
        let tuples: Vec<String> = chunk
            .iter()
            .map(|row| {
                let values: Vec<String> = row.iter().map(SqlValue::literal).collect();
                format!("({})", values.join(", "))
            })
            .collect();
        let _ = writeln!(sql, "{};", tuples.join(",\n"));
    }

    sql
}

/// Reads a cleaned table written with `delimiter` and writes a full
/// replace-load script for it.
///
/// # Errors
///
/// [`PipelineError::MissingInput`] when the cleaned file does not exist and
/// [`PipelineError::Load`] when any value violates the schema. Nothing is
/// written in either case.
#[tracing::instrument(skip(input, output), fields(input = %input.display(), output = %output.display()))]
pub fn write_load_script(
    input: &Path,
    output: &Path,
    table_name: &str,
    chunk_size: usize,
    delimiter: u8,
) -> Result<LoadSummary> {
    validate_identifier(table_name)?;
    if !input.exists() {
        return Err(PipelineError::missing_input(
            input,
            "cleaned table not found, run the clean command first",
        ));
    }

    let table = read_table(input, delimiter)?;
    let rows = prepare_rows(&table, FOOD_ORDERS_SCHEMA)?;

    let missing_columns: Vec<String> = FOOD_ORDERS_SCHEMA
        .iter()
        .filter(|spec| !table.has(spec.name))
        .map(|spec| spec.name.to_string())
        .collect();
    let ignored_columns: Vec<String> = table
        .names()
        .into_iter()
        .filter(|name| FOOD_ORDERS_SCHEMA.iter().all(|spec| spec.name != *name))
        .map(String::from)
        .collect();
    if !missing_columns.is_empty() {
        warn!(columns = ?missing_columns, "Schema columns missing from cleaned table, loading NULL");
    }

    let script = render_script(table_name, FOOD_ORDERS_SCHEMA, &rows, chunk_size);
    write_atomically(output, |tmp| {
        tmp.write_all(script.as_bytes())?;
        Ok(())
    })?;

    let summary = LoadSummary {
        table: table_name.to_string(),
        rows: rows.len(),
        insert_statements: rows.len().div_ceil(chunk_size.max(1)),
        missing_columns,
        ignored_columns,
    };
    info!(rows = summary.rows, statements = summary.insert_statements, "Load script written");
    Ok(summary)
}
