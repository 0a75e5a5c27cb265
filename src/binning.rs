//! Fixed-edge, right-closed binning.
//!
//! A bin set with edges `e0 < e1 < ... < en` and `n` labels assigns label `i`
//! to values in `(e[i], e[i+1]]`. A value exactly on an inner edge falls into
//! the lower bin. Values at or below `e0`, above `en`, or missing get no label.

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bins {
    pub edges: Vec<f64>,
    pub labels: Vec<String>,
}

impl Bins {
    pub fn new(edges: Vec<f64>, labels: Vec<&str>) -> Result<Self> {
        let bins = Self {
            edges,
            labels: labels.into_iter().map(String::from).collect(),
        };
        bins.validate()?;
        Ok(bins)
    }

    /// Age brackets over `customer_age`.
    pub fn age_groups() -> Self {
        Self {
            edges: vec![0.0, 18.0, 30.0, 45.0, 60.0, 100.0],
            labels: ["Teen", "Young Adult", "Adult", "Mid Age", "Senior"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }

    /// Delivery speed brackets over `delivery_time` minutes.
    pub fn delivery_performance() -> Self {
        Self {
            edges: vec![0.0, 30.0, 45.0, 60.0, 300.0],
            labels: ["Fast", "Average", "Slow", "Very Slow"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.edges.len() < 2 {
            return Err(PipelineError::config("bins need at least two edges"));
        }
        if self.labels.len() + 1 != self.edges.len() {
            return Err(PipelineError::config(format!(
                "{} edges require {} labels, got {}",
                self.edges.len(),
                self.edges.len() - 1,
                self.labels.len()
            )));
        }
        if self.edges.iter().any(|e| !e.is_finite()) {
            return Err(PipelineError::config("bin edges must be finite"));
        }
        if self.edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PipelineError::config("bin edges must be strictly increasing"));
        }
        Ok(())
    }

    pub fn label(&self, value: f64) -> Option<&str> {
        if !value.is_finite() {
            return None;
        }
        self.edges
            .windows(2)
            .position(|w| value > w[0] && value <= w[1])
            .map(|i| self.labels[i].as_str())
    }

    /// Labels a whole column, leaving missing or out-of-range values empty.
    pub fn apply(&self, values: &[Option<f64>]) -> Vec<Option<String>> {
        values
            .iter()
            .map(|v| v.and_then(|x| self.label(x)).map(String::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_falls_into_lower_bin() {
        let bins = Bins::age_groups();
        assert_eq!(bins.label(18.0), Some("Teen"));
        assert_eq!(bins.label(18.5), Some("Young Adult"));
        assert_eq!(bins.label(30.0), Some("Young Adult"));
        assert_eq!(bins.label(60.0), Some("Mid Age"));
        assert_eq!(bins.label(100.0), Some("Senior"));
    }

    #[test]
    fn test_lowest_edge_is_exclusive() {
        let bins = Bins::delivery_performance();
        assert_eq!(bins.label(0.0), None);
        assert_eq!(bins.label(-3.0), None);
        assert_eq!(bins.label(0.1), Some("Fast"));
    }

    #[test]
    fn test_above_last_edge_is_unlabeled() {
        let bins = Bins::delivery_performance();
        assert_eq!(bins.label(300.0), Some("Very Slow"));
        assert_eq!(bins.label(300.5), None);
        assert_eq!(bins.label(f64::NAN), None);
    }

    #[test]
    fn test_apply_keeps_missing_values_empty() {
        let bins = Bins::delivery_performance();
        let labels = bins.apply(&[Some(25.0), None, Some(45.0), Some(61.0)]);
        assert_eq!(
            labels,
            vec![
                Some("Fast".to_string()),
                None,
                Some("Average".to_string()),
                Some("Very Slow".to_string())
            ]
        );
    }

    #[test]
    fn test_validate_rejects_bad_edges() {
        assert!(Bins::new(vec![0.0, 10.0, 5.0], vec!["a", "b"]).is_err());
        assert!(Bins::new(vec![0.0, 10.0], vec!["a", "b"]).is_err());
        assert!(Bins::new(vec![0.0], vec![]).is_err());
        assert!(Bins::new(vec![0.0, 10.0, 20.0], vec!["a", "b"]).is_ok());
    }
}
