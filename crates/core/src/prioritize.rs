//! Turning raw opportunities into deduplicated, prioritized recommendations

use crate::data::{Opportunity, Priority, Recommendation};
use crate::error::{Error, Result};
use crate::localize;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum length of a provider description used as fallback detail
const FALLBACK_DETAIL_CHARS: usize = 150;

/// Savings thresholds separating urgent, medium and low priority.
///
/// Time savings are the primary signal; byte savings are only consulted
/// when an opportunity carries no (or a zero) time estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityConfig {
    #[serde(default = "default_urgent_ms")]
    pub urgent_ms: u64,
    #[serde(default = "default_medium_ms")]
    pub medium_ms: u64,
    #[serde(default = "default_urgent_bytes")]
    pub urgent_bytes: u64,
    #[serde(default = "default_medium_bytes")]
    pub medium_bytes: u64,
}

fn default_urgent_ms() -> u64 {
    800
}

fn default_medium_ms() -> u64 {
    300
}

fn default_urgent_bytes() -> u64 {
    100_000
}

fn default_medium_bytes() -> u64 {
    25_000
}

impl Default for PriorityConfig {
    fn default() -> Self {
        Self {
            urgent_ms: default_urgent_ms(),
            medium_ms: default_medium_ms(),
            urgent_bytes: default_urgent_bytes(),
            medium_bytes: default_medium_bytes(),
        }
    }
}

impl PriorityConfig {
    pub fn validate(&self) -> Result<()> {
        if self.urgent_ms < self.medium_ms {
            return Err(Error::ConfigError(
                "urgent_ms must be >= medium_ms".to_string(),
            ));
        }
        if self.urgent_bytes < self.medium_bytes {
            return Err(Error::ConfigError(
                "urgent_bytes must be >= medium_bytes".to_string(),
            ));
        }
        Ok(())
    }

    /// Priority for a single opportunity
    pub fn classify(&self, opportunity: &Opportunity) -> Priority {
        let ms = opportunity.estimated_savings_ms.filter(|v| *v > 0);
        let bytes = opportunity.estimated_savings_bytes.filter(|v| *v > 0);

        let (savings, urgent, medium) = match (ms, bytes) {
            (Some(ms), _) => (ms, self.urgent_ms, self.medium_ms),
            (None, Some(bytes)) => (bytes, self.urgent_bytes, self.medium_bytes),
            (None, None) => return Priority::Low,
        };

        if savings >= urgent {
            Priority::Urgent
        } else if savings >= medium {
            Priority::Medium
        } else {
            Priority::Low
        }
    }
}

/// Whether `candidate` should replace `current` for the same key
fn outranks(candidate: &Opportunity, current: &Opportunity) -> bool {
    candidate
        .estimated_savings_bytes
        .cmp(&current.estimated_savings_bytes)
        .then(
            candidate
                .estimated_savings_ms
                .cmp(&current.estimated_savings_ms),
        )
        .is_gt()
}

/// Collapse opportunities sharing a key, keeping the largest savings.
///
/// Ties on bytes fall back to milliseconds, then to first-seen order.
pub fn dedupe(opportunities: &[Opportunity]) -> Vec<&Opportunity> {
    let mut kept: Vec<&Opportunity> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for opportunity in opportunities {
        match index.get(opportunity.key.as_str()) {
            Some(&slot) => {
                if outranks(opportunity, kept[slot]) {
                    kept[slot] = opportunity;
                }
            }
            None => {
                index.insert(opportunity.key.as_str(), kept.len());
                kept.push(opportunity);
            }
        }
    }

    kept
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

fn localize(opportunity: &Opportunity) -> (String, String) {
    match localize::lookup(&opportunity.key) {
        Some(translation) => (
            translation.title.to_string(),
            translation.detail.to_string(),
        ),
        None => (
            opportunity.title.clone(),
            opportunity
                .description
                .as_deref()
                .map(|d| truncate_chars(d.trim(), FALLBACK_DETAIL_CHARS))
                .unwrap_or_default(),
        ),
    }
}

/// Build the ordered recommendation list.
///
/// Output is ordered by priority (urgent first), then byte savings
/// descending, then key ascending, and contains each key at most once.
pub fn prioritize(opportunities: &[Opportunity], config: &PriorityConfig) -> Vec<Recommendation> {
    let mut recommendations: Vec<Recommendation> = dedupe(opportunities)
        .into_iter()
        .map(|opportunity| {
            let (localized_title, localized_detail) = localize(opportunity);
            Recommendation {
                key: opportunity.key.clone(),
                localized_title,
                localized_detail,
                estimated_savings_bytes: opportunity.estimated_savings_bytes,
                estimated_savings_ms: opportunity.estimated_savings_ms,
                display_value: opportunity.display_value.clone(),
                priority: config.classify(opportunity),
            }
        })
        .collect();

    recommendations.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then(b.estimated_savings_bytes.cmp(&a.estimated_savings_bytes))
            .then(a.key.cmp(&b.key))
    });

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn thresholds() -> PriorityConfig {
        PriorityConfig {
            urgent_ms: 800,
            medium_ms: 300,
            ..Default::default()
        }
    }

    #[test]
    fn test_dedupe_keeps_larger_ms() {
        let opportunities = vec![
            Opportunity::new("unused-js", "Reduce unused JavaScript").with_savings_ms(900),
            Opportunity::new("unused-js", "Reduce unused JavaScript").with_savings_ms(400),
        ];

        let recs = prioritize(&opportunities, &thresholds());

        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].key, "unused-js");
        assert_eq!(recs[0].estimated_savings_ms, Some(900));
    }

    #[test]
    fn test_dedupe_prefers_bytes_over_ms() {
        let opportunities = vec![
            Opportunity::new("images", "a")
                .with_savings_bytes(10_000)
                .with_savings_ms(2_000),
            Opportunity::new("images", "b")
                .with_savings_bytes(50_000)
                .with_savings_ms(100),
        ];

        let kept = dedupe(&opportunities);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "b");
    }

    #[test]
    fn test_dedupe_full_tie_keeps_first_seen() {
        let opportunities = vec![
            Opportunity::new("dom-size", "first").with_savings_ms(100),
            Opportunity::new("dom-size", "second").with_savings_ms(100),
        ];

        let kept = dedupe(&opportunities);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "first");
    }

    #[test]
    fn test_priority_thresholds() {
        let config = thresholds();
        let classify = |ms| config.classify(&Opportunity::new("k", "t").with_savings_ms(ms));

        assert_eq!(classify(900), Priority::Urgent);
        assert_eq!(classify(800), Priority::Urgent);
        assert_eq!(classify(400), Priority::Medium);
        assert_eq!(classify(50), Priority::Low);
    }

    #[test]
    fn test_priority_falls_back_to_bytes() {
        let config = PriorityConfig {
            urgent_bytes: 100_000,
            medium_bytes: 20_000,
            ..thresholds()
        };

        let bytes_only = Opportunity::new("k", "t").with_savings_bytes(150_000);
        assert_eq!(config.classify(&bytes_only), Priority::Urgent);

        let zero_ms = Opportunity::new("k", "t")
            .with_savings_ms(0)
            .with_savings_bytes(30_000);
        assert_eq!(config.classify(&zero_ms), Priority::Medium);

        let none = Opportunity::new("k", "t");
        assert_eq!(config.classify(&none), Priority::Low);
    }

    #[test]
    fn test_ordering_law() {
        let opportunities = vec![
            Opportunity::new("zeta", "z").with_savings_ms(50),
            Opportunity::new("alpha", "a").with_savings_ms(100),
            Opportunity::new("big", "b")
                .with_savings_ms(1_200)
                .with_savings_bytes(10),
            Opportunity::new("mid-small", "m")
                .with_savings_ms(500)
                .with_savings_bytes(1_000),
            Opportunity::new("mid-large", "m")
                .with_savings_ms(400)
                .with_savings_bytes(90_000),
        ];

        let recs = prioritize(&opportunities, &thresholds());
        let keys: Vec<&str> = recs.iter().map(|r| r.key.as_str()).collect();

        assert_eq!(keys, vec!["big", "mid-large", "mid-small", "alpha", "zeta"]);

        for pair in recs.windows(2) {
            assert!(pair[0].priority >= pair[1].priority);
            if pair[0].priority == pair[1].priority {
                assert!(pair[0].estimated_savings_bytes >= pair[1].estimated_savings_bytes);
            }
        }
    }

    #[test]
    fn test_localization_known_and_unknown() {
        let mut unknown = Opportunity::new("brand-new-audit", "Brand new audit").with_savings_ms(10);
        unknown.description = Some("x".repeat(200));

        let opportunities = vec![
            Opportunity::new("unused-javascript", "Reduce unused JavaScript").with_savings_ms(10),
            unknown,
        ];

        let recs = prioritize(&opportunities, &thresholds());

        let known = recs.iter().find(|r| r.key == "unused-javascript").unwrap();
        assert_eq!(known.localized_title, "Kullanılmayan JavaScript'i Kaldırın");

        let fallback = recs.iter().find(|r| r.key == "brand-new-audit").unwrap();
        assert_eq!(fallback.localized_title, "Brand new audit");
        assert_eq!(fallback.localized_detail.chars().count(), 150);
    }

    #[test]
    fn test_invalid_thresholds() {
        let config = PriorityConfig {
            urgent_ms: 100,
            medium_ms: 300,
            ..Default::default()
        };
        assert!(config.validate().is_err());
        assert!(PriorityConfig::default().validate().is_ok());
    }
}
