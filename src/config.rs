//! Pipeline configuration.
//!
//! Every constant the cleaning rules depend on lives here so callers can
//! override them from a JSON file instead of editing code:
//!
//! ```json
//! {
//!   "input": "data/orders.csv",
//!   "output": "data/cleaned_orders.csv",
//!   "platform_fee_rate": 0.12,
//!   "amount_columns": ["order_value", "total_amount", "bill_amount"]
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::binning::Bins;
use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub delimiter: char,
    /// Gzip-compress the cleaned table.
    pub gzip_output: bool,

    /// Candidate order-amount columns, most preferred first.
    pub amount_columns: Vec<String>,
    /// Columns that must be present on every row and are never imputed.
    pub id_columns: Vec<String>,

    pub delivery_cost_rate: f64,
    pub platform_fee_rate: f64,
    pub default_distance_km: f64,

    pub rating_min: f64,
    pub rating_max: f64,
    pub delivery_time_lower_quantile: f64,
    pub delivery_time_upper_quantile: f64,

    /// Inclusive `(start, end)` hour windows counted as peak.
    pub peak_windows: Vec<(u32, u32)>,
    pub age_bins: Bins,
    pub delivery_bins: Bins,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data/ONLINE_FOOD_DELIVERY_ANALYSIS.csv"),
            output: PathBuf::from("data/cleaned_food_delivery.csv"),
            delimiter: ',',
            gzip_output: false,
            amount_columns: vec!["order_value".to_string(), "total_amount".to_string()],
            id_columns: vec!["order_id".to_string(), "customer_id".to_string()],
            delivery_cost_rate: 5.0,
            platform_fee_rate: 0.10,
            default_distance_km: 5.0,
            rating_min: 0.0,
            rating_max: 5.0,
            delivery_time_lower_quantile: 0.05,
            delivery_time_upper_quantile: 0.95,
            peak_windows: vec![(12, 14), (19, 21)],
            age_bins: Bins::age_groups(),
            delivery_bins: Bins::delivery_performance(),
        }
    }
}

impl PipelineConfig {
    /// Loads overrides from a JSON file; unspecified keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::config(format!("cannot read {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_paths(mut self, input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        self.input = input.into();
        self.output = output.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.amount_columns.is_empty() {
            return Err(PipelineError::config("amount_columns must not be empty"));
        }
        ascii_delimiter(self.delimiter)?;
        for (name, rate) in [
            ("delivery_cost_rate", self.delivery_cost_rate),
            ("platform_fee_rate", self.platform_fee_rate),
            ("default_distance_km", self.default_distance_km),
        ] {
            if !rate.is_finite() || rate < 0.0 {
                return Err(PipelineError::config(format!(
                    "{name} must be a non-negative number, got {rate}"
                )));
            }
        }
        if self.rating_min > self.rating_max {
            return Err(PipelineError::config("rating_min must not exceed rating_max"));
        }
        let (lo, hi) = (
            self.delivery_time_lower_quantile,
            self.delivery_time_upper_quantile,
        );
        if !(0.0..=1.0).contains(&lo) || !(0.0..=1.0).contains(&hi) || lo > hi {
            return Err(PipelineError::config(format!(
                "delivery_time quantiles must satisfy 0 <= lower <= upper <= 1, got {lo}..{hi}"
            )));
        }
        if self
            .peak_windows
            .iter()
            .any(|&(start, end)| start > end || end > 23)
        {
            return Err(PipelineError::config(
                "peak windows must be ordered hours within 0..=23",
            ));
        }
        self.age_bins.validate()?;
        self.delivery_bins.validate()?;
        Ok(())
    }

    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter as u8
    }
}

/// Converts a field delimiter to the byte the CSV reader and writer expect.
pub fn ascii_delimiter(delimiter: char) -> Result<u8> {
    if delimiter.is_ascii() {
        Ok(delimiter as u8)
    } else {
        Err(PipelineError::config(format!(
            "delimiter must be a single ASCII character, got '{delimiter}'"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.amount_columns, vec!["order_value", "total_amount"]);
        assert_eq!(config.peak_windows, vec![(12, 14), (19, 21)]);
    }

    #[test]
    fn test_load_partial_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"platform_fee_rate": 0.2, "output": "out.csv"}}"#).unwrap();

        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.platform_fee_rate, 0.2);
        assert_eq!(config.output, PathBuf::from("out.csv"));
        assert_eq!(config.delivery_cost_rate, 5.0);
    }

    #[test]
    fn test_load_rejects_invalid_bins() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"age_bins": {{"edges": [0, 50, 20], "labels": ["a", "b"]}}}}"#
        )
        .unwrap();

        let err = PipelineConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, PipelineError::Config { .. }));
    }

    #[test]
    fn test_validate_rejects_inverted_quantiles() {
        let config = PipelineConfig {
            delivery_time_lower_quantile: 0.9,
            delivery_time_upper_quantile: 0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ascii_delimiter() {
        assert_eq!(ascii_delimiter(';').unwrap(), b';');
        assert!(matches!(ascii_delimiter('§'), Err(PipelineError::Config { .. })));
    }

    #[test]
    fn test_validate_rejects_bad_peak_window() {
        let config = PipelineConfig {
            peak_windows: vec![(22, 25)],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
