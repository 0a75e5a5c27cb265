//! Derived monetary metrics: cost estimates, profit and margin.

use serde::Serialize;

/// Rates used to estimate per-order costs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    pub delivery_cost_rate: f64,
    pub platform_fee_rate: f64,
    pub default_distance_km: f64,
}

/// Metrics derived for a single order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OrderMetrics {
    pub estimated_delivery_cost: f64,
    pub estimated_platform_cost: f64,
    pub profit: f64,
    /// `None` when the order amount is zero.
    pub profit_margin_pct: Option<f64>,
}

impl CostModel {
    /// Computes all derived metrics for one order.
    ///
    /// Profit is floored at zero before the margin is taken, so a loss-making
    /// order reports a 0% margin rather than a negative one.
    pub fn compute(&self, amount: f64, discount: Option<f64>, distance_km: Option<f64>) -> OrderMetrics {
        let distance = distance_km.unwrap_or(self.default_distance_km);
        let estimated_delivery_cost = distance * self.delivery_cost_rate;
        let estimated_platform_cost = amount * self.platform_fee_rate;

        let raw_profit =
            amount - discount.unwrap_or(0.0) - estimated_delivery_cost - estimated_platform_cost;
        let profit = raw_profit.max(0.0);

        let profit_margin_pct = if amount == 0.0 {
            None
        } else {
            Some(profit / amount * 100.0)
        };

        OrderMetrics {
            estimated_delivery_cost,
            estimated_platform_cost,
            profit,
            profit_margin_pct,
        }
    }
}

/// Column-wise results, one entry per row.
#[derive(Debug, Default)]
pub struct MetricColumns {
    pub estimated_delivery_cost: Vec<Option<f64>>,
    pub estimated_platform_cost: Vec<Option<f64>>,
    pub profit: Vec<Option<f64>>,
    pub profit_margin_pct: Vec<Option<f64>>,
}

/// Derives metrics for every row.
///
/// `discount` and `distance` are `None` when the source column is absent.
/// A row whose amount is missing gets empty metrics.
pub fn derive_metrics(
    model: &CostModel,
    amount: &[Option<f64>],
    discount: Option<&[Option<f64>]>,
    distance: Option<&[Option<f64>]>,
) -> MetricColumns {
    let mut out = MetricColumns::default();

    for (row, amount) in amount.iter().enumerate() {
        let d = discount.and_then(|col| col[row]);
        let km = distance.and_then(|col| col[row]);

        match amount {
            Some(a) => {
                let m = model.compute(*a, d, km);
                out.estimated_delivery_cost.push(Some(m.estimated_delivery_cost));
                out.estimated_platform_cost.push(Some(m.estimated_platform_cost));
                out.profit.push(Some(m.profit));
                out.profit_margin_pct.push(m.profit_margin_pct);
            }
            None => {
                let km = km.unwrap_or(model.default_distance_km);
                out.estimated_delivery_cost.push(Some(km * model.delivery_cost_rate));
                out.estimated_platform_cost.push(None);
                out.profit.push(None);
                out.profit_margin_pct.push(None);
            }
        }
    }

    out
}
