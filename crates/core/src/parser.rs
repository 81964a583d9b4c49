//! Parser for PageSpeed Insights / Lighthouse responses
//!
//! The provider returns a loosely structured document:
//! ```text
//! { "lighthouseResult": {
//!     "categories": { "performance": { "score": 0.85 } },
//!     "audits": {
//!       "largest-contentful-paint": { "numericValue": 2345.6, ... },
//!       "unused-javascript": { "score": 0.4, "title": "...",
//!          "details": { "type": "opportunity", "overallSavingsMs": 900 } } } } }
//! ```
//! Parsing yields a [`RawMeasurement`]; [`RawMeasurement::into_snapshot`]
//! normalizes and validates it into a [`MetricSnapshot`].

use crate::compare::round_to;
use crate::data::{MetricSnapshot, Opportunity};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const LCP_AUDIT: &str = "largest-contentful-paint";
const CLS_AUDIT: &str = "cumulative-layout-shift";

/// Audits scoring at or above this are considered passing
const PASSING_AUDIT_SCORE: f64 = 0.9;

/// A provider measurement before normalization.
///
/// Every numeric field is optional because the provider omits them on
/// partial failures; missing required fields are rejected at normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMeasurement {
    /// Performance category score as a fraction in [0, 1]
    pub performance_score: Option<f64>,
    /// Largest Contentful Paint in milliseconds
    pub lcp_ms: Option<f64>,
    /// Cumulative Layout Shift
    pub cls: Option<f64>,
    /// Failing audits that carry a savings estimate
    pub opportunities: Vec<Opportunity>,
}

#[derive(Debug, Deserialize)]
struct PageSpeedResponse {
    #[serde(rename = "lighthouseResult")]
    lighthouse_result: Option<LighthouseResult>,
}

#[derive(Debug, Deserialize)]
struct LighthouseResult {
    #[serde(default)]
    categories: Categories,
    #[serde(default)]
    audits: BTreeMap<String, Audit>,
}

#[derive(Debug, Default, Deserialize)]
struct Categories {
    performance: Option<Category>,
}

#[derive(Debug, Deserialize)]
struct Category {
    score: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Audit {
    title: Option<String>,
    description: Option<String>,
    score: Option<f64>,
    numeric_value: Option<f64>,
    display_value: Option<String>,
    details: Option<AuditDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuditDetails {
    #[serde(rename = "type")]
    kind: Option<String>,
    overall_savings_ms: Option<f64>,
    overall_savings_bytes: Option<f64>,
}

fn to_savings(value: Option<f64>) -> Option<u64> {
    value
        .filter(|v| v.is_finite())
        .map(|v| v.max(0.0).round() as u64)
}

impl Audit {
    /// Convert a failing audit with savings into an opportunity
    fn into_opportunity(self, key: &str) -> Option<Opportunity> {
        let score = self.score?;
        if score >= PASSING_AUDIT_SCORE {
            return None;
        }

        let details = self.details?;
        let is_opportunity = details.kind.as_deref() == Some("opportunity");
        let has_savings =
            details.overall_savings_ms.is_some() || details.overall_savings_bytes.is_some();
        if !is_opportunity && !has_savings {
            return None;
        }

        Some(Opportunity {
            key: key.to_string(),
            title: self.title.unwrap_or_else(|| key.to_string()),
            description: self.description,
            display_value: self.display_value.filter(|v| !v.is_empty()),
            estimated_savings_bytes: to_savings(details.overall_savings_bytes),
            estimated_savings_ms: to_savings(details.overall_savings_ms),
        })
    }
}

/// Rough single-number savings used to order opportunities within a snapshot
fn combined_savings(opportunity: &Opportunity) -> f64 {
    opportunity.estimated_savings_ms.unwrap_or(0) as f64
        + opportunity.estimated_savings_bytes.unwrap_or(0) as f64 / 1000.0
}

/// Parse a PageSpeed Insights JSON document
pub fn parse_from_string(json: &str) -> Result<RawMeasurement> {
    let response: PageSpeedResponse = serde_json::from_str(json)?;
    let lighthouse = response.lighthouse_result.ok_or_else(|| {
        Error::MalformedMeasurement("response has no lighthouseResult".to_string())
    })?;

    let performance_score = lighthouse.categories.performance.and_then(|c| c.score);

    let audits = lighthouse.audits;
    let lcp_ms = audits.get(LCP_AUDIT).and_then(|a| a.numeric_value);
    let cls = audits.get(CLS_AUDIT).and_then(|a| a.numeric_value);

    let mut opportunities: Vec<Opportunity> = audits
        .into_iter()
        .filter_map(|(key, audit)| audit.into_opportunity(&key))
        .collect();

    // Largest savings first; audit keys break ties
    opportunities.sort_by(|a, b| {
        combined_savings(b)
            .total_cmp(&combined_savings(a))
            .then_with(|| a.key.cmp(&b.key))
    });

    Ok(RawMeasurement {
        performance_score,
        lcp_ms,
        cls,
        opportunities,
    })
}

impl RawMeasurement {
    /// Normalize into a validated snapshot for `site_id`
    pub fn into_snapshot(
        self,
        site_id: &str,
        captured_at: DateTime<Utc>,
    ) -> Result<MetricSnapshot> {
        let missing =
            |field: &str| Error::MalformedMeasurement(format!("{} is missing for '{}'", field, site_id));

        let fraction = self
            .performance_score
            .ok_or_else(|| missing("performance score"))?;
        let lcp_ms = self.lcp_ms.ok_or_else(|| missing("LCP"))?;
        let cls = self.cls.ok_or_else(|| missing("CLS"))?;

        if !fraction.is_finite() || !(0.0..=1.0).contains(&fraction) {
            return Err(Error::InvalidSnapshot {
                site_id: site_id.to_string(),
                reason: format!("performance score {} is outside 0-1", fraction),
            });
        }

        let snapshot = MetricSnapshot {
            site_id: site_id.to_string(),
            captured_at,
            performance_score: (fraction * 100.0).round() as u8,
            lcp_seconds: round_to(lcp_ms / 1000.0, 2),
            cls_score: round_to(cls, 4),
            opportunities: self.opportunities,
        };

        snapshot.validate()?;
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = r#"{
        "id": "https://example.com/",
        "lighthouseResult": {
            "categories": { "performance": { "score": 0.85 } },
            "audits": {
                "largest-contentful-paint": { "score": 0.6, "numericValue": 2345.6 },
                "cumulative-layout-shift": { "score": 0.95, "numericValue": 0.05123 },
                "unused-javascript": {
                    "title": "Reduce unused JavaScript",
                    "description": "Reduce unused JavaScript and defer loading scripts.",
                    "score": 0.3,
                    "displayValue": "Potential savings of 180 KiB",
                    "details": { "type": "opportunity", "overallSavingsMs": 900, "overallSavingsBytes": 184320 }
                },
                "uses-text-compression": {
                    "title": "Enable text compression",
                    "score": 0.5,
                    "details": { "type": "opportunity", "overallSavingsMs": 0, "overallSavingsBytes": 52000 }
                },
                "modern-image-formats": {
                    "title": "Serve images in modern formats",
                    "score": 0.95,
                    "details": { "type": "opportunity", "overallSavingsMs": 150 }
                },
                "dom-size": {
                    "title": "Avoids an excessive DOM size",
                    "score": 0.2,
                    "details": { "type": "table" }
                },
                "speed-index": { "score": null, "numericValue": 3000 }
            }
        }
    }"#;

    #[test]
    fn test_parse_sample() {
        let raw = parse_from_string(SAMPLE).unwrap();

        assert_eq!(raw.performance_score, Some(0.85));
        assert_eq!(raw.lcp_ms, Some(2345.6));
        assert_eq!(raw.cls, Some(0.05123));

        let keys: Vec<&str> = raw.opportunities.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["unused-javascript", "uses-text-compression"]);

        let unused = &raw.opportunities[0];
        assert_eq!(unused.estimated_savings_ms, Some(900));
        assert_eq!(unused.estimated_savings_bytes, Some(184_320));
        assert_eq!(
            unused.display_value.as_deref(),
            Some("Potential savings of 180 KiB")
        );
    }

    #[test]
    fn test_into_snapshot_normalizes_units() {
        let raw = parse_from_string(SAMPLE).unwrap();
        let snapshot = raw.into_snapshot("me", Utc::now()).unwrap();

        assert_eq!(snapshot.site_id, "me");
        assert_eq!(snapshot.performance_score, 85);
        assert_eq!(snapshot.lcp_seconds, 2.35);
        assert_eq!(snapshot.cls_score, 0.0512);
        assert_eq!(snapshot.opportunities.len(), 2);
    }

    #[test]
    fn test_score_is_rounded_not_truncated() {
        let raw = RawMeasurement {
            performance_score: Some(0.57),
            lcp_ms: Some(2000.0),
            cls: Some(0.01),
            opportunities: Vec::new(),
        };

        let snapshot = raw.into_snapshot("me", Utc::now()).unwrap();

        assert_eq!(snapshot.performance_score, 57);
    }

    #[test]
    fn test_missing_performance_score_is_malformed() {
        let raw = RawMeasurement {
            performance_score: None,
            lcp_ms: Some(1000.0),
            cls: Some(0.1),
            opportunities: Vec::new(),
        };

        let err = raw.into_snapshot("me", Utc::now()).unwrap_err();
        assert!(matches!(err, Error::MalformedMeasurement(_)));
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let raw = RawMeasurement {
            performance_score: Some(1.4),
            lcp_ms: Some(1000.0),
            cls: Some(0.1),
            opportunities: Vec::new(),
        };
        assert!(matches!(
            raw.into_snapshot("me", Utc::now()),
            Err(Error::InvalidSnapshot { .. })
        ));

        let raw = RawMeasurement {
            performance_score: Some(0.5),
            lcp_ms: Some(-20.0),
            cls: Some(0.1),
            opportunities: Vec::new(),
        };
        assert!(matches!(
            raw.into_snapshot("me", Utc::now()),
            Err(Error::InvalidSnapshot { .. })
        ));
    }

    #[test]
    fn test_missing_lighthouse_result() {
        let err = parse_from_string(r#"{"error": {"code": 500}}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedMeasurement(_)));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            parse_from_string("not json"),
            Err(Error::JsonError(_))
        ));
    }
}
