use chrono::Utc;
use tracing::info;

use crate::analysis::aggregate::{column_mean, column_sum, mean_by, sum_by, top_n, value_counts};
use crate::analysis::amount_column;
use crate::analysis::report::{CANCELLED, cancellation_reasons};
use crate::analysis::types::{Dashboard, Kpis, Section};
use crate::analysis::utility::pct;
use crate::table::Table;

/// Candidate category columns, first match wins.
pub const CATEGORY_COLUMNS: &[&str] = &["cuisine", "food_type", "category", "restaurant_type"];

/// Row filters; an empty list keeps every value.
#[derive(Debug, Clone, Default)]
pub struct Filters {
    pub cities: Vec<String>,
    pub categories: Vec<String>,
}

pub fn category_column(table: &Table) -> Option<&'static str> {
    CATEGORY_COLUMNS.iter().copied().find(|c| table.has(c))
}

pub fn kpis(table: &Table) -> Kpis {
    let amount = amount_column(table);
    let cancelled = table
        .text("order_status")
        .map(|s| s.iter().filter(|v| v.as_deref() == Some(CANCELLED)).count());

    Kpis {
        total_orders: table.len(),
        total_revenue: amount.and_then(|a| column_sum(table, a)).unwrap_or(0.0),
        avg_order_value: amount.and_then(|a| column_mean(table, a)).unwrap_or(0.0),
        avg_delivery_time: column_mean(table, "delivery_time").unwrap_or(0.0),
        cancellation_rate_pct: cancelled.map(|c| pct(c, table.len())).unwrap_or(0.0),
        avg_delivery_rating: column_mean(table, "delivery_rating").unwrap_or(0.0),
        avg_profit_margin_pct: column_mean(table, "profit_margin_pct").unwrap_or(0.0),
    }
}

fn keep_matching(table: &mut Table, column: &str, allowed: &[String]) {
    if allowed.is_empty() {
        return;
    }
    let Some(values) = table.text(column) else {
        return;
    };
    let keep: Vec<bool> = values
        .iter()
        .map(|v| v.as_ref().is_some_and(|v| allowed.contains(v)))
        .collect();
    table.retain_rows(&keep);
}

pub fn apply_filters(table: &Table, filters: &Filters) -> Table {
    let mut filtered = table.clone();
    keep_matching(&mut filtered, "city", &filters.cities);
    if let Some(category) = category_column(table) {
        keep_matching(&mut filtered, category, &filters.categories);
    }
    filtered
}

/// Builds the dashboard summary. KPIs cover every row; panels cover the
/// filtered rows.
#[tracing::instrument(skip(table), fields(rows = table.len()))]
pub fn build_dashboard(table: &Table, filters: &Filters) -> Dashboard {
    let filtered = apply_filters(table, filters);
    let category = category_column(table);
    info!(filtered_rows = filtered.len(), category = ?category, "Dashboard filters applied");

    let revenue_by_city = match amount_column(&filtered) {
        Some(amount) => sum_by(&filtered, "city", amount),
        None => Section::missing("order_value"),
    };

    Dashboard {
        generated_at: Utc::now(),
        columns: table.names().into_iter().map(String::from).collect(),
        kpis: kpis(table),
        category_column: category.map(String::from),
        filtered_rows: filtered.len(),
        revenue_by_city,
        orders_by_category: match category {
            Some(c) => value_counts(&filtered, c),
            None => Section::Unavailable {
                reason: "cuisine / category data not available".to_string(),
            },
        },
        delivery_performance: value_counts(&filtered, "delivery_performance"),
        payment_modes: value_counts(&filtered, "payment_mode"),
        cancellation_reasons: cancellation_reasons(&filtered),
        top_rated_restaurants: top_n(mean_by(&filtered, "restaurant_name", "delivery_rating"), 10),
    }
}
