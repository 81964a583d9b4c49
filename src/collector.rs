//! Concurrent collection of metric snapshots
//!
//! Every site is fetched in its own task. A semaphore bounds how many provider
//! requests are in flight, an optional rate limiter spaces them out, and
//! transient failures are retried under a [`RetryPolicy`]. A fetch slot is
//! held for one attempt only, never across a backoff sleep. A single site's
//! failure never aborts the others.

use crate::provider::{AnalysisProvider, FetchError};
use crate::rate_limiter::RateLimiter;
use crate::retry::{RetryError, RetryPolicy};
use chrono::Utc;
use serde::Serialize;
use site_pulse_core::{Error as CoreError, MetricSnapshot, Site, Strategy};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Why a site produced no snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Transient failures outlasted the retry budget
    Unavailable,
    /// The provider rejected the request outright
    Permanent,
    /// The measurement was malformed or out of range
    InvalidSnapshot,
    /// The run deadline passed before the site finished
    DeadlineExceeded,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FailureKind::Unavailable => "unavailable",
            FailureKind::Permanent => "permanent failure",
            FailureKind::InvalidSnapshot => "invalid snapshot",
            FailureKind::DeadlineExceeded => "deadline exceeded",
        };
        write!(f, "{}", text)
    }
}

/// Outcome of one collection run, keyed by site id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    pub snapshots: BTreeMap<String, MetricSnapshot>,
    pub failures: BTreeMap<String, FailureKind>,
}

impl Collection {
    pub fn snapshot(&self, site_id: &str) -> Option<&MetricSnapshot> {
        self.snapshots.get(site_id)
    }

    /// Competitor snapshots in the order of `competitors`, plus the ids that failed
    pub fn split_competitors<'a>(
        &self,
        competitors: impl IntoIterator<Item = &'a Site>,
    ) -> (Vec<MetricSnapshot>, BTreeSet<String>) {
        let mut snapshots = Vec::new();
        let mut missing = BTreeSet::new();

        for site in competitors {
            match self.snapshots.get(&site.id) {
                Some(snapshot) => snapshots.push(snapshot.clone()),
                None => {
                    missing.insert(site.id.clone());
                }
            }
        }

        (snapshots, missing)
    }
}

/// Fetches snapshots for a set of sites
pub struct MetricCollector {
    provider: Arc<dyn AnalysisProvider>,
    policy: RetryPolicy,
    strategy: Strategy,
    max_in_flight: usize,
    deadline: Option<Duration>,
    rate_limiter: Option<Arc<RateLimiter>>,
}

impl MetricCollector {
    pub fn new(provider: Arc<dyn AnalysisProvider>, policy: RetryPolicy) -> Self {
        Self {
            provider,
            policy,
            strategy: Strategy::default(),
            max_in_flight: 2,
            deadline: None,
            rate_limiter: None,
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Bound concurrent fetches; values below 1 are raised to 1
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    /// Give up on sites still running `deadline` after collection starts
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Option<Arc<RateLimiter>>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Fetch every site and record either a snapshot or a failure for each
    pub async fn collect(&self, sites: &[Site]) -> Collection {
        info!(
            "Collecting {} site(s), {} in flight, strategy {}",
            sites.len(),
            self.max_in_flight,
            self.strategy.as_str()
        );

        let semaphore = Arc::new(Semaphore::new(self.max_in_flight));
        let deadline = self.deadline.map(|d| Instant::now() + d);
        let mut tasks = JoinSet::new();

        for site in sites {
            let fetch = SiteFetch {
                provider: Arc::clone(&self.provider),
                policy: self.policy,
                strategy: self.strategy,
                rate_limiter: self.rate_limiter.clone(),
                slots: Arc::clone(&semaphore),
                site: site.clone(),
            };

            tasks.spawn(async move {
                let id = fetch.site.id.clone();
                let work = fetch.run();

                let outcome = match deadline {
                    Some(at) => match tokio::time::timeout_at(at, work).await {
                        Ok(outcome) => outcome,
                        Err(_) => {
                            warn!("Deadline passed before '{}' finished", id);
                            Err(FailureKind::DeadlineExceeded)
                        }
                    },
                    None => work.await,
                };
                (id, outcome)
            });
        }

        let mut collection = Collection::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, Ok(snapshot))) => {
                    collection.snapshots.insert(id, snapshot);
                }
                Ok((id, Err(kind))) => {
                    collection.failures.insert(id, kind);
                }
                Err(e) => warn!("Fetch task failed: {}", e),
            }
        }

        // A task that panicked leaves no entry of its own
        for site in sites {
            if !collection.snapshots.contains_key(&site.id) {
                collection
                    .failures
                    .entry(site.id.clone())
                    .or_insert(FailureKind::Unavailable);
            }
        }

        info!(
            "Collected {} snapshot(s), {} failure(s)",
            collection.snapshots.len(),
            collection.failures.len()
        );
        collection
    }
}

/// Everything a single site's task owns
struct SiteFetch {
    provider: Arc<dyn AnalysisProvider>,
    policy: RetryPolicy,
    strategy: Strategy,
    rate_limiter: Option<Arc<RateLimiter>>,
    slots: Arc<Semaphore>,
    site: Site,
}

impl SiteFetch {
    async fn run(&self) -> Result<MetricSnapshot, FailureKind> {
        let provider = self.provider.as_ref();
        let url = self.site.url.as_str();
        let id = self.site.id.as_str();
        let strategy = self.strategy;
        let limiter = self.rate_limiter.as_deref();
        let slots = self.slots.as_ref();

        let result = self
            .policy
            .run(|attempt| async move {
                if let Some(limiter) = limiter {
                    limiter.acquire().await;
                }
                let _slot = match slots.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return Err(FetchError::Permanent("fetch slots closed".to_string())),
                };
                debug!("Fetching '{}' ({}), attempt {}", id, url, attempt);
                provider.fetch(url, strategy).await
            })
            .await;

        let raw = match result {
            Ok(raw) => raw,
            Err(RetryError::Exhausted { attempts, last }) => {
                warn!("'{}' unavailable after {} attempt(s): {}", id, attempts, last);
                return Err(FailureKind::Unavailable);
            }
            Err(RetryError::Permanent { error, .. }) => {
                warn!("'{}' failed: {}", id, error);
                return Err(match error {
                    FetchError::Malformed(_) => FailureKind::InvalidSnapshot,
                    _ => FailureKind::Permanent,
                });
            }
        };

        raw.into_snapshot(id, Utc::now()).map_err(|e| {
            warn!("'{}' returned an unusable measurement: {}", id, e);
            match e {
                CoreError::InvalidSnapshot { .. } | CoreError::MalformedMeasurement(_) => {
                    FailureKind::InvalidSnapshot
                }
                _ => FailureKind::Permanent,
            }
        })
    }
}
