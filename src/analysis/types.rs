//! Data types produced by the analysis and dashboard layers.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A section of a report that may be missing its source columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Section<T> {
    Available { data: T },
    Unavailable { reason: String },
}

impl<T> Section<T> {
    pub fn missing(column: &str) -> Self {
        Section::Unavailable {
            reason: format!("column '{column}' not available"),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Section<U> {
        match self {
            Section::Available { data } => Section::Available { data: f(data) },
            Section::Unavailable { reason } => Section::Unavailable { reason },
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Section::Available { data } => Some(data),
            Section::Unavailable { .. } => None,
        }
    }
}

/// One group of a grouped aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupValue {
    pub key: String,
    pub value: f64,
}

pub type Groups = Section<Vec<GroupValue>>;

/// Exploratory business report over the cleaned table.
#[derive(Debug, Serialize)]
pub struct EdaReport {
    pub generated_at: DateTime<Utc>,
    pub rows: usize,

    // customers and orders
    pub top_customers_by_revenue: Groups,
    pub avg_order_value_by_age_group: Groups,
    pub orders_by_day_type: Groups,

    // revenue and profit
    pub monthly_revenue: Groups,
    pub avg_profit_by_discount_applied: Groups,
    pub revenue_by_city: Groups,

    // delivery
    pub avg_delivery_time_by_city: Groups,
    pub avg_rating_by_delivery_performance: Groups,

    // restaurants
    pub top_restaurants_by_rating: Groups,
    pub cancellation_rate_by_restaurant: Groups,

    // operations
    pub orders_by_hour: Groups,
    pub payment_modes: Groups,
    pub cancellation_reasons: Groups,
}

/// Headline metrics; each is 0 when its source column is absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Kpis {
    pub total_orders: usize,
    pub total_revenue: f64,
    pub avg_order_value: f64,
    pub avg_delivery_time: f64,
    pub cancellation_rate_pct: f64,
    pub avg_delivery_rating: f64,
    pub avg_profit_margin_pct: f64,
}

/// Dashboard summary: KPIs over all rows, panels over the filtered rows.
#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub generated_at: DateTime<Utc>,
    pub columns: Vec<String>,
    pub kpis: Kpis,
    pub category_column: Option<String>,
    pub filtered_rows: usize,
    pub revenue_by_city: Groups,
    pub orders_by_category: Groups,
    pub delivery_performance: Groups,
    pub payment_modes: Groups,
    pub cancellation_reasons: Groups,
    pub top_rated_restaurants: Groups,
}
