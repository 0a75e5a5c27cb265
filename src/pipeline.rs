//! Cleaning and feature-derivation pipeline.
//!
//! One pass over an in-memory table: identifier validation, imputation,
//! range correction, derived metrics, calendar features and binning. The
//! cleaned table is only persisted once every stage has succeeded.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::impute::{drop_rows_missing_ids, impute_missing};
use crate::metrics::{CostModel, derive_metrics};
use crate::output::write_cleaned;
use crate::range::{RangeCorrections, clamp_column, clip_to_quantiles};
use crate::reader::read_table;
use crate::schema::resolve_amount_column;
use crate::table::{Column, ColumnData, Table, format_number};
use crate::temporal::extract_features;

pub const DISCOUNT: &str = "discount";
pub const DISTANCE_KM: &str = "distance_km";
pub const DELIVERY_TIME: &str = "delivery_time";
pub const DELIVERY_RATING: &str = "delivery_rating";
pub const ORDER_DATE: &str = "order_date";
pub const CUSTOMER_AGE: &str = "customer_age";

/// Input columns that are always numeric, besides ids and amount columns.
pub const NUMERIC_COLUMNS: &[&str] = &[DISCOUNT, DISTANCE_KM, DELIVERY_TIME, DELIVERY_RATING, CUSTOMER_AGE];

/// Columns the pipeline derives, in output order.
///
/// Same-named input columns are passed through untouched by imputation and
/// overwritten with recomputed values.
pub const DERIVED_COLUMNS: &[&str] = &[
    "estimated_delivery_cost",
    "estimated_platform_cost",
    "profit",
    "profit_margin_pct",
    "day_type",
    "hour",
    "peak_hour",
    "age_group",
    "delivery_performance",
];

/// Audit record of a single pipeline run, persisted beside the output.
#[derive(Debug, Clone, Serialize)]
pub struct CleaningReport {
    pub started_at: DateTime<Utc>,
    pub input: PathBuf,
    pub output: PathBuf,
    pub rows_in: usize,
    pub rows_out: usize,
    pub rows_dropped_missing_id: usize,
    /// Non-numeric cells nulled per numeric column, before imputation.
    pub non_numeric_nulled: BTreeMap<String, usize>,
    pub amount_column: String,
    /// `discount` when the column exists, `zero` otherwise.
    pub discount_source: String,
    /// `distance_km` when the column exists, the default distance otherwise.
    pub distance_source: String,
    pub imputed: BTreeMap<String, usize>,
    pub corrections: RangeCorrections,
    pub unparsable_dates: usize,
    pub delimiter: char,
    pub columns: Vec<String>,
}

/// Result of cleaning a table in memory.
#[derive(Debug)]
pub struct Cleaned {
    pub table: Table,
    pub report: CleaningReport,
}

/// Reads the configured input, cleans it and writes the output.
///
/// # Errors
///
/// Fails without writing anything when the input is missing, the headers
/// collide, or no order amount column can be resolved.
#[tracing::instrument(skip(config), fields(input = %config.input.display(), output = %config.output.display()))]
pub fn run(config: &PipelineConfig) -> Result<CleaningReport> {
    config.validate()?;
    let table = read_table(&config.input, config.delimiter_byte())?;
    let Cleaned { table, report } = clean(table, config)?;
    write_cleaned(&table, &report, config)?;
    info!(
        rows_in = report.rows_in,
        rows_out = report.rows_out,
        amount_column = %report.amount_column,
        "Pipeline completed"
    );
    Ok(report)
}

/// Applies every cleaning and derivation stage to `table`.
pub fn clean(mut table: Table, config: &PipelineConfig) -> Result<Cleaned> {
    let started_at = Utc::now();
    let rows_in = table.len();

    let non_numeric_nulled = coerce_numeric_columns(&mut table, config);
    let amount_column = resolve_amount_column(&table, &config.amount_columns)?;

    let rows_dropped_missing_id = drop_rows_missing_ids(&mut table, &config.id_columns);

    let skip: HashSet<&str> = DERIVED_COLUMNS
        .iter()
        .copied()
        .chain(config.id_columns.iter().map(String::as_str))
        .collect();
    let imputed = impute_missing(&mut table, &skip);

    let corrections = correct_ranges(&mut table, config);
    corrections.log();

    add_metrics(&mut table, config, &amount_column);
    let unparsable_dates = add_temporal_features(&mut table, config);
    add_bins(&mut table, config);

    let report = CleaningReport {
        started_at,
        input: config.input.clone(),
        output: config.output.clone(),
        rows_in,
        rows_out: table.len(),
        rows_dropped_missing_id,
        non_numeric_nulled,
        amount_column,
        discount_source: source_name(&table, DISCOUNT, "zero"),
        distance_source: source_name(
            &table,
            DISTANCE_KM,
            &format!("default {}", format_number(config.default_distance_km)),
        ),
        imputed,
        corrections,
        unparsable_dates,
        delimiter: config.delimiter,
        columns: table.names().into_iter().map(String::from).collect(),
    };

    Ok(Cleaned { table, report })
}

fn source_name(table: &Table, column: &str, fallback: &str) -> String {
    if table.numeric(column).is_some() {
        column.to_string()
    } else {
        fallback.to_string()
    }
}

/// Nulls unparsable cells in columns that must hold numbers, so a stray
/// value is imputed instead of turning the whole column into text.
fn coerce_numeric_columns(table: &mut Table, config: &PipelineConfig) -> BTreeMap<String, usize> {
    let names: Vec<&str> = config
        .id_columns
        .iter()
        .chain(&config.amount_columns)
        .map(String::as_str)
        .chain(NUMERIC_COLUMNS.iter().copied())
        .collect();

    let mut nulled = BTreeMap::new();
    for name in names {
        if let Some(count) = table.coerce_numeric(name).filter(|c| *c > 0) {
            warn!(column = name, count, "Non-numeric values set to null");
            nulled.insert(name.to_string(), count);
        }
    }
    nulled
}

fn correct_ranges(table: &mut Table, config: &PipelineConfig) -> RangeCorrections {
    let mut corrections = RangeCorrections::default();

    if let Some(ratings) = table.numeric_mut(DELIVERY_RATING) {
        corrections.rating_clamped = clamp_column(ratings, config.rating_min, config.rating_max);
    }

    if let Some(times) = table.numeric_mut(DELIVERY_TIME) {
        if let Some((bounds, changed)) = clip_to_quantiles(
            times,
            config.delivery_time_lower_quantile,
            config.delivery_time_upper_quantile,
        ) {
            corrections.delivery_time_bounds = Some(bounds);
            corrections.delivery_time_clipped = changed;
        }
    }

    corrections
}

fn add_metrics(table: &mut Table, config: &PipelineConfig, amount_column: &str) {
    let model = CostModel {
        delivery_cost_rate: config.delivery_cost_rate,
        platform_fee_rate: config.platform_fee_rate,
        default_distance_km: config.default_distance_km,
    };

    let columns = {
        let amount = table.numeric(amount_column).unwrap_or_default();
        let discount = table.numeric(DISCOUNT);
        let distance = table.numeric(DISTANCE_KM);
        derive_metrics(&model, amount, discount, distance)
    };

    table.upsert(Column::numeric("estimated_delivery_cost", columns.estimated_delivery_cost));
    table.upsert(Column::numeric("estimated_platform_cost", columns.estimated_platform_cost));
    table.upsert(Column::numeric("profit", columns.profit));
    table.upsert(Column::numeric("profit_margin_pct", columns.profit_margin_pct));
}

fn add_temporal_features(table: &mut Table, config: &PipelineConfig) -> usize {
    let raw: Vec<Option<String>> = match table.column(ORDER_DATE).map(|c| &c.data) {
        None => {
            info!("No order_date column, skipping calendar features");
            return 0;
        }
        Some(ColumnData::Text(values)) => values.clone(),
        Some(ColumnData::Numeric(values)) => {
            values.iter().map(|v| v.map(format_number)).collect()
        }
    };

    let features = extract_features(&raw, &config.peak_windows);
    if features.unparsable > 0 {
        warn!(count = features.unparsable, "Unparsable order dates set to null");
    }

    table.upsert(Column::text(ORDER_DATE, features.order_date));
    table.upsert(Column::text("day_type", features.day_type));
    table.upsert(Column::numeric("hour", features.hour));
    table.upsert(Column::text("peak_hour", features.peak_hour));
    features.unparsable
}

fn add_bins(table: &mut Table, config: &PipelineConfig) {
    if let Some(ages) = table.numeric(CUSTOMER_AGE) {
        let labels = config.age_bins.apply(ages);
        table.upsert(Column::text("age_group", labels));
    }
    if let Some(times) = table.numeric(DELIVERY_TIME) {
        let labels = config.delivery_bins.apply(times);
        table.upsert(Column::text("delivery_performance", labels));
    }
}
