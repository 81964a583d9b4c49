//! Report assembly from collected snapshots

use crate::compare::{compare, CompareConfig};
use crate::data::{MetricSnapshot, Opportunity, Report};
use crate::error::{Error, Result};
use crate::prioritize::{prioritize, PriorityConfig};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Composes comparison and prioritization into a [`Report`]
#[derive(Debug, Clone, Default)]
pub struct ReportAssembler {
    pub compare: CompareConfig,
    pub priority: PriorityConfig,
}

impl ReportAssembler {
    pub fn new(compare: CompareConfig, priority: PriorityConfig) -> Result<Self> {
        compare.validate()?;
        priority.validate()?;
        Ok(Self { compare, priority })
    }

    /// Assemble a report.
    ///
    /// `target_id` names the target site so a missing target can be reported.
    /// Opportunities are prioritized in the order target first, then each
    /// competitor in input order, so the target wins full dedupe ties.
    pub fn assemble(
        &self,
        target_id: &str,
        target: Option<&MetricSnapshot>,
        competitors: &[MetricSnapshot],
        missing_competitors: &BTreeSet<String>,
        generated_at: DateTime<Utc>,
    ) -> Result<Report> {
        let target = target.ok_or_else(|| Error::MissingTarget(target_id.to_string()))?;

        let comparisons = compare(target, competitors, &self.compare)?;

        let opportunities: Vec<Opportunity> = target
            .opportunities
            .iter()
            .chain(competitors.iter().flat_map(|c| c.opportunities.iter()))
            .cloned()
            .collect();
        let recommendations = prioritize(&opportunities, &self.priority);

        Ok(Report {
            target_snapshot: target.clone(),
            competitor_snapshots: competitors.to_vec(),
            comparisons,
            recommendations,
            generated_at,
            missing_competitors: missing_competitors.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ComparisonStatus, Priority};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 6, 30, 0).unwrap()
    }

    fn snap(id: &str, score: u8, opportunities: Vec<Opportunity>) -> MetricSnapshot {
        MetricSnapshot {
            site_id: id.to_string(),
            captured_at: at(),
            performance_score: score,
            lcp_seconds: 2.0,
            cls_score: 0.1,
            opportunities,
        }
    }

    #[test]
    fn test_assemble_full_report() {
        let target = snap(
            "me",
            85,
            vec![Opportunity::new("unused-javascript", "Reduce unused JS")
                .with_savings_ms(400)
                .with_savings_bytes(20_000)],
        );
        let competitors = vec![
            snap(
                "a",
                78,
                vec![Opportunity::new("unused-javascript", "Reduce unused JS")
                    .with_savings_ms(900)
                    .with_savings_bytes(20_000)],
            ),
            snap(
                "b",
                90,
                vec![Opportunity::new("render-blocking-resources", "Eliminate render-blocking")
                    .with_savings_ms(1_000)],
            ),
        ];

        let report = ReportAssembler::default()
            .assemble("me", Some(&target), &competitors, &BTreeSet::new(), at())
            .unwrap();

        assert_eq!(report.comparisons.len(), 6);
        assert_eq!(report.comparisons[0].status, ComparisonStatus::Leading);
        assert_eq!(report.comparisons[3].status, ComparisonStatus::Trailing);
        assert_eq!(report.generated_at, at());

        let keys: Vec<&str> = report.recommendations.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["unused-javascript", "render-blocking-resources"]);
        assert_eq!(report.recommendations[0].estimated_savings_ms, Some(900));
        assert_eq!(report.recommendations[0].priority, Priority::Urgent);
    }

    #[test]
    fn test_assemble_missing_target() {
        let err = ReportAssembler::default()
            .assemble("me", None, &[], &BTreeSet::new(), at())
            .unwrap_err();
        assert!(matches!(err, Error::MissingTarget(id) if id == "me"));
    }

    #[test]
    fn test_assemble_partial_failure() {
        let target = snap("me", 85, Vec::new());
        let competitors = vec![snap("b", 70, Vec::new())];
        let missing: BTreeSet<String> = ["a".to_string(), "c".to_string()].into_iter().collect();

        let report = ReportAssembler::default()
            .assemble("me", Some(&target), &competitors, &missing, at())
            .unwrap();

        assert_eq!(report.missing_competitors.len(), 2);
        assert_eq!(report.comparisons.len(), 3);
        assert!(report.comparisons.iter().all(|c| c.competitor_id == "b"));
        assert!(report.has_missing_competitors());
    }

    #[test]
    fn test_assemble_no_competitors() {
        let target = snap("me", 85, Vec::new());
        let report = ReportAssembler::default()
            .assemble("me", Some(&target), &[], &BTreeSet::new(), at())
            .unwrap();

        assert!(report.comparisons.is_empty());
        assert!(report.competitor_snapshots.is_empty());
    }

    #[test]
    fn test_assemble_is_deterministic() {
        let target = snap(
            "me",
            60,
            vec![
                Opportunity::new("dom-size", "DOM").with_savings_ms(100),
                Opportunity::new("redirects", "Redirects").with_savings_ms(100),
            ],
        );
        let competitors = vec![snap("a", 70, Vec::new())];
        let assembler = ReportAssembler::default();

        let first = assembler
            .assemble("me", Some(&target), &competitors, &BTreeSet::new(), at())
            .unwrap();
        let second = assembler
            .assemble("me", Some(&target), &competitors, &BTreeSet::new(), at())
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_assemble_rejects_invalid_target() {
        let mut target = snap("me", 85, Vec::new());
        target.cls_score = -1.0;

        let err = ReportAssembler::default()
            .assemble("me", Some(&target), &[], &BTreeSet::new(), at())
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSnapshot { .. }));
    }
}
