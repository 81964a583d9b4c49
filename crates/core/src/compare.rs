//! Target-vs-competitor metric comparison

use crate::data::{ComparisonResult, ComparisonStatus, Metric, MetricSnapshot};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Configuration for metric comparison
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompareConfig {
    /// Absolute tolerance under which a float delta (LCP, CLS) counts as a tie.
    /// The integer performance score always uses an exact comparison.
    #[serde(default)]
    pub tie_tolerance: f64,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self { tie_tolerance: 0.0 }
    }
}

impl CompareConfig {
    pub fn new(tie_tolerance: f64) -> Result<Self> {
        let config = Self { tie_tolerance };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.tie_tolerance.is_finite() || self.tie_tolerance < 0.0 {
            return Err(Error::ConfigError(format!(
                "tie tolerance must be a non-negative number, got {}",
                self.tie_tolerance
            )));
        }
        Ok(())
    }

    fn tolerance_for(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Performance => 0.0,
            Metric::Lcp | Metric::Cls => self.tie_tolerance,
        }
    }
}

/// Decimal places a metric is stored with; reported deltas are rounded to match
fn precision(metric: Metric) -> i32 {
    match metric {
        Metric::Performance => 0,
        Metric::Lcp => 2,
        Metric::Cls => 4,
    }
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Classify a delta for one metric
pub fn classify(metric: Metric, delta: f64, config: &CompareConfig) -> ComparisonStatus {
    if delta.abs() <= config.tolerance_for(metric) {
        return ComparisonStatus::Tied;
    }

    let target_is_higher = delta > 0.0;
    if target_is_higher == metric.higher_is_better() {
        ComparisonStatus::Leading
    } else {
        ComparisonStatus::Trailing
    }
}

/// Compare the target against every competitor.
///
/// Results are grouped by competitor in input order and, within a group,
/// follow `Metric::ALL` (performance, LCP, CLS). Zero competitors yield an
/// empty vector.
pub fn compare(
    target: &MetricSnapshot,
    competitors: &[MetricSnapshot],
    config: &CompareConfig,
) -> Result<Vec<ComparisonResult>> {
    target.validate()?;

    let mut results = Vec::with_capacity(competitors.len() * Metric::ALL.len());

    for competitor in competitors {
        competitor.validate()?;

        for metric in Metric::ALL {
            let target_value = target.value(metric);
            let competitor_value = competitor.value(metric);
            // Status comes from the exact difference; only the reported delta is rounded
            let raw_delta = target_value - competitor_value;

            results.push(ComparisonResult {
                metric,
                target_value,
                competitor_id: competitor.site_id.clone(),
                competitor_value,
                delta: round_to(raw_delta, precision(metric)),
                status: classify(metric, raw_delta, config),
            });
        }
    }

    Ok(results)
}
