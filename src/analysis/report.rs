use chrono::Utc;
use tracing::info;

use crate::analysis::aggregate::{count_by, filter_eq, mean_by, rate_by, sum_by, top_n, value_counts};
use crate::analysis::amount_column;
use crate::analysis::types::{EdaReport, GroupValue, Groups, Section};
use crate::table::{Column, Table};
use crate::temporal::parse_timestamp;

pub const CANCELLED: &str = "Cancelled";

fn by_amount(table: &Table, f: impl FnOnce(&str) -> Groups) -> Groups {
    match amount_column(table) {
        Some(amount) => f(amount),
        None => Section::missing("order_value"),
    }
}

/// Revenue per calendar month (`YYYY-MM`) of `order_date`.
pub fn monthly_revenue(table: &Table) -> Groups {
    let Some(dates) = table.text("order_date") else {
        return Section::missing("order_date");
    };
    let months: Vec<Option<String>> = dates
        .iter()
        .map(|d| {
            d.as_deref()
                .and_then(parse_timestamp)
                .map(|ts| ts.format("%Y-%m").to_string())
        })
        .collect();

    let mut with_month = table.clone();
    with_month.upsert(Column::text("month", months));
    by_amount(&with_month, |amount| sum_by(&with_month, "month", amount))
}

/// Reasons given for cancelled orders, most frequent first.
pub fn cancellation_reasons(table: &Table) -> Groups {
    if !table.has("cancellation_reason") {
        return Section::missing("cancellation_reason");
    }
    match filter_eq(table, "order_status", CANCELLED) {
        Some(cancelled) => value_counts(&cancelled, "cancellation_reason"),
        None => Section::missing("order_status"),
    }
}

/// Builds the exploratory report; absent columns degrade per section.
#[tracing::instrument(skip(table), fields(rows = table.len()))]
pub fn build_report(table: &Table, limit: usize) -> EdaReport {
    let report = EdaReport {
        generated_at: Utc::now(),
        rows: table.len(),
        top_customers_by_revenue: by_amount(table, |a| top_n(sum_by(table, "customer_id", a), limit)),
        avg_order_value_by_age_group: by_amount(table, |a| mean_by(table, "age_group", a)),
        orders_by_day_type: count_by(table, "day_type"),
        monthly_revenue: monthly_revenue(table),
        avg_profit_by_discount_applied: mean_by(table, "discount_applied", "profit"),
        revenue_by_city: by_amount(table, |a| top_n(sum_by(table, "city", a), usize::MAX)),
        avg_delivery_time_by_city: mean_by(table, "city", "delivery_time"),
        avg_rating_by_delivery_performance: mean_by(table, "delivery_performance", "delivery_rating"),
        top_restaurants_by_rating: top_n(mean_by(table, "restaurant_name", "delivery_rating"), limit),
        cancellation_rate_by_restaurant: rate_by(table, "restaurant_name", "order_status", CANCELLED),
        orders_by_hour: count_by(table, "hour"),
        payment_modes: value_counts(table, "payment_mode"),
        cancellation_reasons: cancellation_reasons(table),
    };

    let unavailable = [
        &report.top_customers_by_revenue,
        &report.avg_order_value_by_age_group,
        &report.orders_by_day_type,
        &report.monthly_revenue,
        &report.avg_profit_by_discount_applied,
        &report.revenue_by_city,
        &report.avg_delivery_time_by_city,
        &report.avg_rating_by_delivery_performance,
        &report.top_restaurants_by_rating,
        &report.cancellation_rate_by_restaurant,
        &report.orders_by_hour,
        &report.payment_modes,
        &report.cancellation_reasons,
    ]
    .iter()
    .filter(|s| s.data().is_none())
    .count();
    info!(unavailable, "EDA report built");

    report
}

/// Renders grouped values as aligned `key  value` lines.
pub fn format_groups(title: &str, groups: &Groups) -> String {
    match groups {
        Section::Available { data } => {
            let width = data.iter().map(|g| g.key.len()).max().unwrap_or(0);
            let mut out = format!("{title}\n");
            for GroupValue { key, value } in data {
                out.push_str(&format!("  {key:<width$}  {value:.2}\n"));
            }
            out
        }
        Section::Unavailable { reason } => format!("{title}\n  ({reason})\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleaned() -> Table {
        let rows = [
            ["1", "10", "Pune", "Spice Hub", "200", "2024-01-05 13:00:00", "Delivered", "", "4.5", "Weekday", "13"],
            ["2", "11", "Delhi", "Tandoor", "100", "2024-01-20 20:00:00", "Cancelled", "Late", "2", "Weekend", "20"],
            ["3", "10", "Pune", "Tandoor", "50", "2024-02-02 09:00:00", "Cancelled", "Late", "3", "Weekday", "9"],
        ];
        Table::from_rows(
            [
                "order_id", "customer_id", "city", "restaurant_name", "order_value", "order_date",
                "order_status", "cancellation_reason", "delivery_rating", "day_type", "hour",
            ]
            .iter()
            .map(|h| h.to_string())
            .collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_monthly_revenue() {
        let result = monthly_revenue(&cleaned());
        let data = result.data().unwrap();
        assert_eq!(data[0].key, "2024-01");
        assert_eq!(data[0].value, 300.0);
        assert_eq!(data[1].key, "2024-02");
        assert_eq!(data[1].value, 50.0);
    }

    #[test]
    fn test_cancellation_reasons_only_counts_cancelled() {
        let result = cancellation_reasons(&cleaned());
        let data = result.data().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data[0].key, "Late");
        assert_eq!(data[0].value, 2.0);
    }

    #[test]
    fn test_report_degrades_missing_columns() {
        let report = build_report(&cleaned(), 10);

        assert_eq!(report.rows, 3);
        assert!(report.avg_order_value_by_age_group.data().is_none());
        assert!(report.avg_profit_by_discount_applied.data().is_none());
        let top = report.top_customers_by_revenue.data().unwrap();
        assert_eq!(top[0].key, "10");
        assert_eq!(top[0].value, 250.0);
        let rates = report.cancellation_rate_by_restaurant.data().unwrap();
        assert_eq!(rates.iter().find(|g| g.key == "Tandoor").unwrap().value, 1.0);
    }

    #[test]
    fn test_report_serializes_placeholders() {
        let report = build_report(&cleaned(), 10);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["avg_order_value_by_age_group"]["status"], "unavailable");
        assert_eq!(json["orders_by_day_type"]["status"], "available");
    }

    #[test]
    fn test_format_groups() {
        let groups = count_by(&cleaned(), "day_type");
        assert_eq!(
            format_groups("Orders", &groups),
            "Orders\n  Weekday  2.00\n  Weekend  1.00\n"
        );
        assert_eq!(
            format_groups("Ages", &Section::missing("age_group")),
            "Ages\n  (column 'age_group' not available)\n"
        );
    }
}
