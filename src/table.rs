//! Column-oriented in-memory table.
//!
//! Raw CSV cells are typed per column on construction: a column is numeric
//! when every non-missing cell parses as a finite float, text otherwise.

use tracing::debug;

/// Cell spellings treated as missing, compared case-insensitively after trimming.
const MISSING_TOKENS: &[&str] = &["", "na", "n/a", "nan", "null", "none"];

pub fn is_missing(raw: &str) -> bool {
    let trimmed = raw.trim();
    MISSING_TOKENS
        .iter()
        .any(|token| trimmed.eq_ignore_ascii_case(token))
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Formats a float with the shortest representation that round-trips.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // avoid "-0"
        return "0".to_string();
    }
    format!("{value}")
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn null_count(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.iter().filter(|x| x.is_none()).count(),
            ColumnData::Text(v) => v.iter().filter(|x| x.is_none()).count(),
        }
    }

    pub fn is_null(&self, row: usize) -> bool {
        match self {
            ColumnData::Numeric(v) => v[row].is_none(),
            ColumnData::Text(v) => v[row].is_none(),
        }
    }

    fn infer(raw: Vec<String>) -> Self {
        let numeric = raw
            .iter()
            .filter(|cell| !is_missing(cell))
            .all(|cell| parse_number(cell).is_some());

        if numeric {
            ColumnData::Numeric(
                raw.iter()
                    .map(|cell| {
                        if is_missing(cell) {
                            None
                        } else {
                            parse_number(cell)
                        }
                    })
                    .collect(),
            )
        } else {
            ColumnData::Text(
                raw.into_iter()
                    .map(|cell| {
                        if is_missing(&cell) {
                            None
                        } else {
                            Some(cell.trim().to_string())
                        }
                    })
                    .collect(),
            )
        }
    }

    /// Converts a text column to numeric in place, nulling cells that do not
    /// parse. Returns how many non-missing cells were nulled.
    fn coerce_numeric(&mut self) -> usize {
        let ColumnData::Text(values) = self else {
            return 0;
        };
        let mut nulled = 0;
        let numbers = values
            .iter()
            .map(|cell| {
                let cell = cell.as_deref()?;
                let parsed = parse_number(cell);
                if parsed.is_none() {
                    nulled += 1;
                }
                parsed
            })
            .collect();
        *self = ColumnData::Numeric(numbers);
        nulled
    }

    fn retain(&mut self, keep: &[bool]) {
        fn filter<T>(values: &mut Vec<T>, keep: &[bool]) {
            let mut i = 0;
            values.retain(|_| {
                let k = keep[i];
                i += 1;
                k
            });
        }
        match self {
            ColumnData::Numeric(v) => filter(v, keep),
            ColumnData::Text(v) => filter(v, keep),
        }
    }

    fn cell(&self, row: usize) -> String {
        match self {
            ColumnData::Numeric(v) => v[row].map(format_number).unwrap_or_default(),
            ColumnData::Text(v) => v[row].clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: &str, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.to_string(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn text(name: &str, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.to_string(),
            data: ColumnData::Text(values),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: usize,
}

impl Table {
    /// Builds a table from already-normalized headers and raw string rows.
    ///
    /// Short rows are padded with missing cells.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let row_count = rows.len();
        let mut raw_columns: Vec<Vec<String>> = vec![Vec::with_capacity(row_count); headers.len()];
        for row in rows {
            for (i, column) in raw_columns.iter_mut().enumerate() {
                column.push(row.get(i).cloned().unwrap_or_default());
            }
        }

        let columns = headers
            .into_iter()
            .zip(raw_columns)
            .map(|(name, raw)| {
                let data = ColumnData::infer(raw);
                debug!(
                    column = %name,
                    numeric = matches!(data, ColumnData::Numeric(_)),
                    nulls = data.null_count(),
                    "Typed column"
                );
                Column { name, data }
            })
            .collect();

        Self {
            columns,
            rows: row_count,
        }
    }

    pub fn len(&self) -> usize {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn has(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn numeric(&self, name: &str) -> Option<&[Option<f64>]> {
        match &self.column(name)?.data {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Text(_) => None,
        }
    }

    pub fn numeric_mut(&mut self, name: &str) -> Option<&mut Vec<Option<f64>>> {
        match &mut self.column_mut(name)?.data {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Text(_) => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&[Option<String>]> {
        match &self.column(name)?.data {
            ColumnData::Text(v) => Some(v),
            ColumnData::Numeric(_) => None,
        }
    }

    /// Forces column `name` to numeric; `None` when the column is absent.
    ///
    /// Unparsable cells become missing and are counted in the result.
    pub fn coerce_numeric(&mut self, name: &str) -> Option<usize> {
        let nulled = self.column_mut(name)?.data.coerce_numeric();
        if nulled > 0 {
            debug!(column = name, nulled, "Coerced column to numeric");
        }
        Some(nulled)
    }

    /// Replaces a same-named column in place, or appends a new one.
    pub fn upsert(&mut self, column: Column) {
        debug_assert_eq!(column.data.len(), self.rows);
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
    }

    /// Keeps only rows whose flag is `true`.
    pub fn retain_rows(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.rows);
        for column in &mut self.columns {
            column.data.retain(keep);
        }
        self.rows = keep.iter().filter(|k| **k).count();
    }

    /// Renders one row as CSV-ready strings, missing cells as empty.
    pub fn row_strings(&self, row: usize) -> Vec<String> {
        self.columns.iter().map(|c| c.data.cell(row)).collect()
    }
}
