//! Group-by aggregates over a cleaned table.
//!
//! Rows with a missing group key are left out, as are missing values inside
//! a group. Results are ordered by key (numerically for numeric keys) unless
//! re-ranked with [`top_n`] or produced by [`value_counts`].

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::analysis::types::{GroupValue, Groups, Section};
use crate::analysis::utility::mean;
use crate::table::{ColumnData, Table, format_number};

struct Grouping {
    rows: BTreeMap<String, Vec<usize>>,
    numeric: bool,
}

fn group(table: &Table, key: &str) -> Option<Grouping> {
    let column = table.column(key)?;
    let mut rows: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    let numeric = match &column.data {
        ColumnData::Text(values) => {
            for (row, value) in values.iter().enumerate() {
                if let Some(v) = value {
                    rows.entry(v.clone()).or_default().push(row);
                }
            }
            false
        }
        ColumnData::Numeric(values) => {
            for (row, value) in values.iter().enumerate() {
                if let Some(v) = value {
                    rows.entry(format_number(*v)).or_default().push(row);
                }
            }
            true
        }
    };
    Some(Grouping { rows, numeric })
}

fn key_order(a: &str, b: &str, numeric: bool) -> Ordering {
    if numeric {
        if let (Ok(x), Ok(y)) = (a.parse::<f64>(), b.parse::<f64>()) {
            return x.total_cmp(&y);
        }
    }
    a.cmp(b)
}

fn finish(grouping: &Grouping, f: impl Fn(&[usize]) -> Option<f64>) -> Vec<GroupValue> {
    let mut out: Vec<GroupValue> = grouping
        .rows
        .iter()
        .filter_map(|(key, rows)| {
            f(rows).map(|value| GroupValue {
                key: key.clone(),
                value,
            })
        })
        .collect();
    out.sort_by(|a, b| key_order(&a.key, &b.key, grouping.numeric));
    out
}

fn with_values<'a>(
    table: &'a Table,
    key: &str,
    value: &str,
) -> Result<(Grouping, &'a [Option<f64>]), Groups> {
    let grouping = group(table, key).ok_or_else(|| Section::missing(key))?;
    let values = table.numeric(value).ok_or_else(|| Section::missing(value))?;
    Ok((grouping, values))
}

/// Sum of `value` per `key`.
pub fn sum_by(table: &Table, key: &str, value: &str) -> Groups {
    let (grouping, values) = match with_values(table, key, value) {
        Ok(found) => found,
        Err(section) => return section,
    };
    Section::Available {
        data: finish(&grouping, |rows| {
            Some(rows.iter().filter_map(|&r| values[r]).sum())
        }),
    }
}

/// Mean of `value` per `key`, skipping groups with no values.
pub fn mean_by(table: &Table, key: &str, value: &str) -> Groups {
    let (grouping, values) = match with_values(table, key, value) {
        Ok(found) => found,
        Err(section) => return section,
    };
    Section::Available {
        data: finish(&grouping, |rows| {
            let present: Vec<f64> = rows.iter().filter_map(|&r| values[r]).collect();
            (!present.is_empty()).then(|| mean(&present))
        }),
    }
}

/// Number of rows per `key`.
pub fn count_by(table: &Table, key: &str) -> Groups {
    match group(table, key) {
        Some(grouping) => Section::Available {
            data: finish(&grouping, |rows| Some(rows.len() as f64)),
        },
        None => Section::missing(key),
    }
}

/// Counts of each distinct value, most frequent first.
pub fn value_counts(table: &Table, column: &str) -> Groups {
    count_by(table, column).map(|mut groups| {
        groups.sort_by(|a, b| b.value.total_cmp(&a.value));
        groups
    })
}

/// Fraction of rows per `key` whose `column` equals `target`.
pub fn rate_by(table: &Table, key: &str, column: &str, target: &str) -> Groups {
    let Some(grouping) = group(table, key) else {
        return Section::missing(key);
    };
    let Some(values) = table.text(column) else {
        return Section::missing(column);
    };
    Section::Available {
        data: finish(&grouping, |rows| {
            let hits = rows
                .iter()
                .filter(|&&r| values[r].as_deref() == Some(target))
                .count();
            Some(hits as f64 / rows.len() as f64)
        }),
    }
}

/// Keeps the `n` largest groups, largest first; ties keep key order.
pub fn top_n(groups: Groups, n: usize) -> Groups {
    groups.map(|mut data| {
        data.sort_by(|a, b| b.value.total_cmp(&a.value));
        data.truncate(n);
        data
    })
}

/// Sum over a whole numeric column, or `None` when absent.
pub fn column_sum(table: &Table, column: &str) -> Option<f64> {
    table
        .numeric(column)
        .map(|values| values.iter().flatten().sum())
}

/// Mean over a whole numeric column, or `None` when absent.
pub fn column_mean(table: &Table, column: &str) -> Option<f64> {
    table.numeric(column).map(|values| {
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        mean(&present)
    })
}

/// Copy of `table` restricted to rows where `column` equals `target`.
pub fn filter_eq(table: &Table, column: &str, target: &str) -> Option<Table> {
    let values = table.text(column)?;
    let keep: Vec<bool> = values
        .iter()
        .map(|v| v.as_deref() == Some(target))
        .collect();
    let mut filtered = table.clone();
    filtered.retain_rows(&keep);
    Some(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> Table {
        let rows = [
            ["1", "Pune", "100", "13", "Delivered"],
            ["2", "Delhi", "300", "9", "Cancelled"],
            ["3", "Pune", "50", "13", "Delivered"],
            ["4", "", "70", "20", "Cancelled"],
        ];
        Table::from_rows(
            ["customer_id", "city", "order_value", "hour", "order_status"]
                .iter()
                .map(|h| h.to_string())
                .collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn pairs(groups: &Groups) -> Vec<(String, f64)> {
        groups
            .data()
            .unwrap()
            .iter()
            .map(|g| (g.key.clone(), g.value))
            .collect()
    }

    #[test]
    fn test_sum_by_skips_missing_keys() {
        let result = sum_by(&orders(), "city", "order_value");
        assert_eq!(
            pairs(&result),
            vec![("Delhi".to_string(), 300.0), ("Pune".to_string(), 150.0)]
        );
    }

    #[test]
    fn test_numeric_keys_sort_numerically() {
        let result = count_by(&orders(), "hour");
        assert_eq!(
            pairs(&result),
            vec![
                ("9".to_string(), 1.0),
                ("13".to_string(), 2.0),
                ("20".to_string(), 1.0)
            ]
        );
    }

    #[test]
    fn test_missing_column_is_unavailable() {
        let result = mean_by(&orders(), "age_group", "order_value");
        assert_eq!(
            result,
            Section::Unavailable {
                reason: "column 'age_group' not available".to_string()
            }
        );
    }

    #[test]
    fn test_top_n_ranks_by_value() {
        let result = top_n(sum_by(&orders(), "customer_id", "order_value"), 2);
        assert_eq!(
            pairs(&result),
            vec![("2".to_string(), 300.0), ("1".to_string(), 100.0)]
        );
    }

    #[test]
    fn test_rate_by() {
        let result = rate_by(&orders(), "city", "order_status", "Cancelled");
        assert_eq!(
            pairs(&result),
            vec![("Delhi".to_string(), 1.0), ("Pune".to_string(), 0.0)]
        );
    }

    #[test]
    fn test_value_counts_most_frequent_first() {
        let result = value_counts(&orders(), "order_status");
        assert_eq!(
            pairs(&result),
            vec![("Cancelled".to_string(), 2.0), ("Delivered".to_string(), 2.0)]
        );
    }

    #[test]
    fn test_filter_eq() {
        let cancelled = filter_eq(&orders(), "order_status", "Cancelled").unwrap();
        assert_eq!(cancelled.len(), 2);
        assert_eq!(column_sum(&cancelled, "order_value"), Some(370.0));
        assert_eq!(column_mean(&orders(), "order_value"), Some(130.0));
    }
}
