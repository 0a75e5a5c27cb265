//! Missing-value repair.
//!
//! Numeric columns are filled with their own median, text columns with their
//! own mode. Identifier columns are never filled: rows missing one are
//! dropped before imputation runs.

use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

use crate::table::{ColumnData, Table};

/// Median of the non-missing values, averaging the middle pair for even counts.
pub fn median(values: &[Option<f64>]) -> Option<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(|a, b| a.total_cmp(b));
    let mid = present.len() / 2;
    if present.len() % 2 == 0 {
        Some((present[mid - 1] + present[mid]) / 2.0)
    } else {
        Some(present[mid])
    }
}

/// Most frequent non-missing value; ties go to the lexicographically smallest.
pub fn mode(values: &[Option<String>]) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for value in values.iter().flatten() {
        *counts.entry(value.as_str()).or_default() += 1;
    }

    let mut best: Option<(&str, usize)> = None;
    for (value, count) in counts {
        // BTreeMap iterates in sorted order, so strict `>` keeps the smallest tie.
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.to_string())
}

/// Removes rows missing any identifier column that exists in the table.
///
/// Returns the number of rows dropped.
pub fn drop_rows_missing_ids(table: &mut Table, id_columns: &[String]) -> usize {
    let present: Vec<&String> = id_columns.iter().filter(|c| table.has(c)).collect();
    if present.is_empty() {
        return 0;
    }

    let keep: Vec<bool> = (0..table.len())
        .map(|row| {
            present.iter().all(|name| {
                table
                    .column(name)
                    .is_some_and(|column| !column.data.is_null(row))
            })
        })
        .collect();

    let dropped = keep.iter().filter(|k| !**k).count();
    if dropped > 0 {
        warn!(dropped, "Dropped rows with missing identifiers");
        table.retain_rows(&keep);
    }
    dropped
}

/// Fills missing cells in every column except those named in `skip`.
///
/// Returns the number of cells filled per column. Columns with no
/// non-missing values cannot be imputed and are left untouched.
pub fn impute_missing(table: &mut Table, skip: &HashSet<&str>) -> BTreeMap<String, usize> {
    let mut filled = BTreeMap::new();

    for column in table.columns_mut() {
        if skip.contains(column.name.as_str()) {
            continue;
        }
        let nulls = column.data.null_count();
        if nulls == 0 {
            continue;
        }

        let imputed = match &mut column.data {
            ColumnData::Numeric(values) => median(values).map(|m| {
                debug!(column = %column.name, median = m, nulls, "Filling with median");
                values.iter_mut().filter(|v| v.is_none()).for_each(|v| *v = Some(m));
            }),
            ColumnData::Text(values) => mode(values).map(|m| {
                debug!(column = %column.name, mode = %m, nulls, "Filling with mode");
                values
                    .iter_mut()
                    .filter(|v| v.is_none())
                    .for_each(|v| *v = Some(m.clone()));
            }),
        };

        match imputed {
            Some(()) => {
                filled.insert(column.name.clone(), nulls);
            }
            None => warn!(column = %column.name, "Column has no values to impute from"),
        }
    }

    filled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(values: &[Option<&str>]) -> Vec<Option<String>> {
        values.iter().map(|v| v.map(String::from)).collect()
    }

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table::from_rows(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[Some(3.0), None, Some(1.0), Some(2.0)]), Some(2.0));
        assert_eq!(median(&[Some(4.0), Some(1.0), Some(2.0), Some(3.0)]), Some(2.5));
        assert_eq!(median(&[None, None]), None);
    }

    #[test]
    fn test_mode_picks_most_frequent() {
        let values = owned(&[Some("Card"), Some("UPI"), None, Some("UPI")]);
        assert_eq!(mode(&values), Some("UPI".to_string()));
    }

    #[test]
    fn test_mode_tie_breaks_to_smallest() {
        let values = owned(&[Some("Zomato"), Some("Cash"), Some("Zomato"), Some("Cash")]);
        assert_eq!(mode(&values), Some("Cash".to_string()));

        let reversed = owned(&[Some("Cash"), Some("Zomato"), Some("Cash"), Some("Zomato")]);
        assert_eq!(mode(&reversed), Some("Cash".to_string()));
    }

    #[test]
    fn test_drop_rows_missing_ids() {
        let mut t = table(
            &["order_id", "customer_id", "city"],
            &[&["1", "10", "Pune"], &["", "11", "Pune"], &["3", "NA", "Goa"], &["4", "13", ""]],
        );
        let ids = vec!["order_id".to_string(), "customer_id".to_string()];

        assert_eq!(drop_rows_missing_ids(&mut t, &ids), 2);
        assert_eq!(t.len(), 2);
        assert_eq!(t.numeric("order_id").unwrap(), &[Some(1.0), Some(4.0)]);
    }

    #[test]
    fn test_impute_fills_numeric_and_text() {
        let mut t = table(
            &["order_id", "discount", "city"],
            &[&["1", "10", "Pune"], &["2", "", "Pune"], &["3", "30", ""]],
        );
        let filled = impute_missing(&mut t, &HashSet::new());

        assert_eq!(t.numeric("discount").unwrap(), &[Some(10.0), Some(20.0), Some(30.0)]);
        assert_eq!(t.text("city").unwrap()[2].as_deref(), Some("Pune"));
        assert_eq!(filled.get("discount"), Some(&1));
        assert_eq!(filled.get("city"), Some(&1));
        assert!(!filled.contains_key("order_id"));
    }

    #[test]
    fn test_impute_respects_skip_list() {
        let mut t = table(&["profit", "city"], &[&["5", "Pune"], &["", "Pune"]]);
        let skip: HashSet<&str> = ["profit"].into_iter().collect();
        impute_missing(&mut t, &skip);

        assert_eq!(t.numeric("profit").unwrap(), &[Some(5.0), None]);
    }

    #[test]
    fn test_all_missing_column_is_left_alone() {
        let mut t = table(&["notes"], &[&[""], &[""]]);
        let filled = impute_missing(&mut t, &HashSet::new());
        assert!(filled.is_empty());
        assert_eq!(t.numeric("notes").unwrap(), &[None, None]);
    }
}
