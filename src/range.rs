//! Domain-range correction: clamping to fixed and empirical bounds.

use tracing::{debug, info};

/// Quantile with linear interpolation between closest ranks.
///
/// Uses position `(n - 1) * q` over the sorted non-missing values.
pub fn quantile(values: &[Option<f64>], q: f64) -> Option<f64> {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return None;
    }
    present.sort_by(|a, b| a.total_cmp(b));

    let pos = (present.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(present[lo] + (present[hi] - present[lo]) * frac)
}

/// Clamps every present value into `[min, max]`, returning how many changed.
pub fn clamp_column(values: &mut [Option<f64>], min: f64, max: f64) -> usize {
    let mut changed = 0;
    for value in values.iter_mut().flatten() {
        let clamped = value.clamp(min, max);
        if clamped != *value {
            *value = clamped;
            changed += 1;
        }
    }
    changed
}

/// Clips a column to its own `[q(lower), q(upper)]` range.
///
/// Both bounds are computed from the values as they are before any clipping.
/// Returns the bounds used and the number of values changed.
pub fn clip_to_quantiles(
    values: &mut [Option<f64>],
    lower: f64,
    upper: f64,
) -> Option<((f64, f64), usize)> {
    let lo = quantile(values, lower)?;
    let hi = quantile(values, upper)?;
    let changed = clamp_column(values, lo, hi);
    debug!(lower = lo, upper = hi, changed, "Clipped to quantile bounds");
    Some(((lo, hi), changed))
}

/// Summary of range corrections applied to a table.
#[derive(Debug, Default, Clone, PartialEq, serde::Serialize)]
pub struct RangeCorrections {
    pub rating_clamped: usize,
    pub delivery_time_bounds: Option<(f64, f64)>,
    pub delivery_time_clipped: usize,
}

impl RangeCorrections {
    pub fn log(&self) {
        info!(
            rating_clamped = self.rating_clamped,
            delivery_time_clipped = self.delivery_time_clipped,
            bounds = ?self.delivery_time_bounds,
            "Range corrections applied"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_interpolates() {
        let values: Vec<Option<f64>> = (1..=5).map(|v| Some(v as f64)).collect();
        assert_eq!(quantile(&values, 0.0), Some(1.0));
        assert_eq!(quantile(&values, 0.5), Some(3.0));
        assert_eq!(quantile(&values, 1.0), Some(5.0));
        // position 0.2 between 1 and 2
        assert!((quantile(&values, 0.05).unwrap() - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_quantile_ignores_missing() {
        assert_eq!(quantile(&[None, Some(4.0), None], 0.95), Some(4.0));
        assert_eq!(quantile(&[None], 0.5), None);
    }

    #[test]
    fn test_clamp_rating() {
        let mut ratings = vec![Some(-1.0), Some(3.5), Some(7.0), None];
        assert_eq!(clamp_column(&mut ratings, 0.0, 5.0), 2);
        assert_eq!(ratings, vec![Some(0.0), Some(3.5), Some(5.0), None]);
    }

    #[test]
    fn test_clamp_is_idempotent() {
        let mut ratings = vec![Some(0.0), Some(2.0), Some(5.0)];
        assert_eq!(clamp_column(&mut ratings, 0.0, 5.0), 0);
        assert_eq!(ratings, vec![Some(0.0), Some(2.0), Some(5.0)]);
    }

    #[test]
    fn test_outlier_clipped_exactly_to_bound() {
        let mut times: Vec<Option<f64>> = (0..20).map(|i| Some(20.0 + i as f64)).collect();
        times.push(Some(900.0));

        let expected_hi = quantile(&times, 0.95).unwrap();
        let ((lo, hi), changed) = clip_to_quantiles(&mut times, 0.05, 0.95).unwrap();

        assert_eq!(hi, expected_hi);
        assert_eq!(times.len(), 21);
        assert_eq!(times[20], Some(hi));
        assert!(changed >= 2);
        assert!(times.iter().flatten().all(|t| *t >= lo && *t <= hi));
    }
}
