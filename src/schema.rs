//! Column-name normalization and order-amount column resolution.

use std::collections::HashMap;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::table::Table;

/// Trims, lowercases and replaces spaces with underscores.
pub fn normalize_column_name(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

/// Normalizes a header row, failing if two raw names collapse onto one.
pub fn normalize_headers<S: AsRef<str>>(raw: &[S]) -> Result<Vec<String>> {
    let mut seen: HashMap<String, &str> = HashMap::with_capacity(raw.len());
    let mut normalized = Vec::with_capacity(raw.len());

    for header in raw {
        let header = header.as_ref();
        let name = normalize_column_name(header);
        if let Some(first) = seen.get(&name) {
            return Err(PipelineError::ColumnCollision {
                column: name,
                first: first.to_string(),
                second: header.to_string(),
            });
        }
        if name != header {
            debug!(raw = header, normalized = %name, "Renamed column");
        }
        seen.insert(name.clone(), header);
        normalized.push(name);
    }

    Ok(normalized)
}

/// Picks the first preferred order-amount column present in the table.
///
/// Stray unparsable cells are expected to have been nulled already; a column
/// that is still text, or holds no number at all, cannot drive the monetary
/// derivations and is reported as a schema error.
pub fn resolve_amount_column(table: &Table, preferences: &[String]) -> Result<String> {
    let name = preferences
        .iter()
        .find(|candidate| table.has(candidate))
        .ok_or_else(|| {
            PipelineError::schema(format!(
                "no order amount column found (looked for {})",
                preferences.join(", ")
            ))
        })?;

    let values = table.numeric(name).ok_or_else(|| {
        PipelineError::schema(format!("order amount column '{name}' is not numeric"))
    })?;
    if !values.is_empty() && values.iter().all(Option::is_none) {
        return Err(PipelineError::schema(format!(
            "order amount column '{name}' has no numeric values"
        )));
    }

    info!(column = %name, "Resolved order amount column");
    Ok(name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(normalize_column_name("  Order Value "), "order_value");
        assert_eq!(normalize_column_name("Delivery Rating"), "delivery_rating");
        assert_eq!(normalize_column_name("CITY"), "city");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let raw = vec!["Order ID", " Customer Age", "payment mode"];
        let once = normalize_headers(&raw).unwrap();
        let twice = normalize_headers(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_collision_is_an_error() {
        let raw = vec!["Order Value", "order_value", "city"];
        let err = normalize_headers(&raw).unwrap_err();
        match err {
            PipelineError::ColumnCollision {
                column,
                first,
                second,
            } => {
                assert_eq!(column, "order_value");
                assert_eq!(first, "Order Value");
                assert_eq!(second, "order_value");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    fn table(headers: &[&str], row: &[&str]) -> Table {
        Table::from_rows(
            headers.iter().map(|h| h.to_string()).collect(),
            vec![row.iter().map(|c| c.to_string()).collect()],
        )
    }

    fn prefs() -> Vec<String> {
        vec!["order_value".to_string(), "total_amount".to_string()]
    }

    #[test]
    fn test_prefers_order_value() {
        let t = table(&["total_amount", "order_value"], &["10", "20"]);
        assert_eq!(resolve_amount_column(&t, &prefs()).unwrap(), "order_value");
    }

    #[test]
    fn test_falls_back_to_total_amount() {
        let t = table(&["total_amount"], &["10"]);
        assert_eq!(resolve_amount_column(&t, &prefs()).unwrap(), "total_amount");
    }

    #[test]
    fn test_missing_amount_column_is_schema_error() {
        let t = table(&["city"], &["Pune"]);
        let err = resolve_amount_column(&t, &prefs()).unwrap_err();
        assert!(matches!(err, PipelineError::Schema { .. }));
    }

    #[test]
    fn test_text_amount_column_is_schema_error() {
        let t = table(&["order_value"], &["lots"]);
        assert!(matches!(
            resolve_amount_column(&t, &prefs()),
            Err(PipelineError::Schema { .. })
        ));
    }

    #[test]
    fn test_amount_column_without_numbers_is_schema_error() {
        let mut t = table(&["order_value"], &["Rs 250"]);
        assert_eq!(t.coerce_numeric("order_value"), Some(1));
        assert!(matches!(
            resolve_amount_column(&t, &prefs()),
            Err(PipelineError::Schema { .. })
        ));
    }
}
