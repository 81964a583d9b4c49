//! Data structures for sites, snapshots, comparisons and reports

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Role a site plays in a comparison run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SiteRole {
    Target,
    Competitor,
}

/// A tracked site
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Site {
    /// Stable identifier
    pub id: String,
    /// Page URL handed to the analysis provider
    pub url: String,
    /// Human readable label used in reports
    pub label: String,
    /// Target or competitor
    pub role: SiteRole,
}

impl Site {
    pub fn is_target(&self) -> bool {
        self.role == SiteRole::Target
    }
}

/// Device profile the provider emulates
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Mobile,
    Desktop,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Mobile => "mobile",
            Strategy::Desktop => "desktop",
        }
    }
}

/// A provider-identified improvement with estimated savings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Opportunity {
    /// Stable audit identifier (e.g. "unused-javascript")
    pub key: String,
    /// Provider's title, untranslated
    pub title: String,
    /// Provider's long description, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Provider's own savings label (e.g. "Potential savings of 120 KiB")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_savings_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_savings_ms: Option<u64>,
}

impl Opportunity {
    /// Create an opportunity without savings estimates
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            description: None,
            display_value: None,
            estimated_savings_bytes: None,
            estimated_savings_ms: None,
        }
    }

    pub fn with_savings_ms(mut self, ms: u64) -> Self {
        self.estimated_savings_ms = Some(ms);
        self
    }

    pub fn with_savings_bytes(mut self, bytes: u64) -> Self {
        self.estimated_savings_bytes = Some(bytes);
        self
    }
}

/// One normalized measurement of a site at a point in time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricSnapshot {
    pub site_id: String,
    pub captured_at: DateTime<Utc>,
    /// Lighthouse performance score, 0-100
    pub performance_score: u8,
    /// Largest Contentful Paint in seconds
    pub lcp_seconds: f64,
    /// Cumulative Layout Shift
    pub cls_score: f64,
    /// Opportunities in provider order
    #[serde(default)]
    pub opportunities: Vec<Opportunity>,
}

impl MetricSnapshot {
    /// Check the range invariants every snapshot must satisfy
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Error::InvalidSnapshot {
            site_id: self.site_id.clone(),
            reason,
        };

        if self.performance_score > 100 {
            return Err(invalid(format!(
                "performance score {} is outside 0-100",
                self.performance_score
            )));
        }
        if !self.lcp_seconds.is_finite() || self.lcp_seconds < 0.0 {
            return Err(invalid(format!("LCP {} must be >= 0", self.lcp_seconds)));
        }
        if !self.cls_score.is_finite() || self.cls_score < 0.0 {
            return Err(invalid(format!("CLS {} must be >= 0", self.cls_score)));
        }
        Ok(())
    }

    /// Value of one tracked metric
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Performance => f64::from(self.performance_score),
            Metric::Lcp => self.lcp_seconds,
            Metric::Cls => self.cls_score,
        }
    }
}

/// Tracked Core Web Vitals metrics
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Performance,
    Lcp,
    Cls,
}

impl Metric {
    /// Canonical output order within a competitor group
    pub const ALL: [Metric; 3] = [Metric::Performance, Metric::Lcp, Metric::Cls];

    pub fn higher_is_better(&self) -> bool {
        matches!(self, Metric::Performance)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Performance => "Performance",
            Metric::Lcp => "LCP",
            Metric::Cls => "CLS",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Standing of the target against one competitor on one metric
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonStatus {
    Leading,
    Trailing,
    Tied,
}

/// Comparison between the target and one competitor for one metric
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComparisonResult {
    pub metric: Metric,
    pub target_value: f64,
    pub competitor_id: String,
    pub competitor_value: f64,
    /// target - competitor; the sign meaning depends on the metric
    pub delta: f64,
    pub status: ComparisonStatus,
}

/// Recommendation urgency; ordered so that `Urgent` is the greatest
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::Urgent => "urgent",
        }
    }
}

/// A deduplicated, localized, prioritized action item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub key: String,
    pub localized_title: String,
    pub localized_detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_savings_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_savings_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_value: Option<String>,
    pub priority: Priority,
}

/// The consolidated output of one comparison run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub target_snapshot: MetricSnapshot,
    /// In configured site order
    pub competitor_snapshots: Vec<MetricSnapshot>,
    pub comparisons: Vec<ComparisonResult>,
    pub recommendations: Vec<Recommendation>,
    pub generated_at: DateTime<Utc>,
    /// Competitors whose measurement failed this run
    #[serde(default)]
    pub missing_competitors: BTreeSet<String>,
}

impl Report {
    /// Comparisons against a single competitor, in metric order
    pub fn comparisons_for<'a>(
        &'a self,
        competitor_id: &'a str,
    ) -> impl Iterator<Item = &'a ComparisonResult> + 'a {
        self.comparisons
            .iter()
            .filter(move |c| c.competitor_id == competitor_id)
    }

    pub fn leading_count(&self) -> usize {
        self.count_status(ComparisonStatus::Leading)
    }

    pub fn trailing_count(&self) -> usize {
        self.count_status(ComparisonStatus::Trailing)
    }

    pub fn has_missing_competitors(&self) -> bool {
        !self.missing_competitors.is_empty()
    }

    fn count_status(&self, status: ComparisonStatus) -> usize {
        self.comparisons.iter().filter(|c| c.status == status).count()
    }
}
