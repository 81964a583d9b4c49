//! One comparison run: collect, assemble, render, save, deliver

use crate::collector::{FailureKind, MetricCollector};
use crate::config::Config;
use crate::delivery::{self, DeliveryChannel};
use crate::error::{Error, Result};
use crate::provider::AnalysisProvider;
use crate::rate_limiter::RateLimiter;
use crate::render::{RenderedReport, Renderer};
use crate::storage::{JsonFileRepository, Repository};
use chrono::Utc;
use site_pulse_core::{Report, ReportAssembler, Site};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub report: Report,
    pub rendered: RenderedReport,
    /// Every site without a snapshot, competitors only since the target is fatal
    pub failures: BTreeMap<String, FailureKind>,
}

/// Wires the collector, assembler and outer collaborators together
pub struct Monitor {
    sites: Vec<Site>,
    target_id: String,
    collector: MetricCollector,
    assembler: ReportAssembler,
    renderer: Renderer,
    repository: Arc<dyn Repository>,
    channel: Arc<dyn DeliveryChannel>,
}

impl Monitor {
    pub fn new(
        sites: Vec<Site>,
        collector: MetricCollector,
        assembler: ReportAssembler,
        repository: Arc<dyn Repository>,
        channel: Arc<dyn DeliveryChannel>,
    ) -> Result<Self> {
        let target_id = sites
            .iter()
            .find(|s| s.is_target())
            .map(|s| s.id.clone())
            .ok_or_else(|| Error::Config("no target site configured".to_string()))?;

        Ok(Self {
            sites,
            target_id,
            collector,
            assembler,
            renderer: Renderer::new()?,
            repository,
            channel,
        })
    }

    /// Replace the default templates
    pub fn with_renderer(mut self, renderer: Renderer) -> Self {
        self.renderer = renderer;
        self
    }

    /// Build a monitor from configuration and a provider
    pub fn from_config(config: &Config, provider: Arc<dyn AnalysisProvider>) -> Result<Self> {
        let collector = MetricCollector::new(provider, config.collector.retry_policy())
            .with_strategy(config.strategy)
            .with_max_in_flight(config.collector.max_in_flight)
            .with_deadline(config.collector.deadline())
            .with_rate_limiter(
                config
                    .collector
                    .requests_per_minute
                    .map(|rpm| Arc::new(RateLimiter::new(rpm))),
            );
        let assembler = ReportAssembler::new(config.compare, config.priority)?;
        let repository = JsonFileRepository::new(&config.storage.path, config.storage.max_items);
        let channel: Arc<dyn DeliveryChannel> = Arc::from(delivery::from_config(&config.delivery)?);

        Self::new(
            config.sites.clone(),
            collector,
            assembler,
            Arc::new(repository),
            channel,
        )
    }

    /// Execute one run.
    ///
    /// The report is rendered before anything is persisted, then saved, then
    /// delivered. A rendering or storage failure stops the run with nothing
    /// sent. With `dry_run` nothing is saved or sent.
    pub async fn run(&self, dry_run: bool) -> Result<RunOutcome> {
        let collection = self.collector.collect(&self.sites).await;

        let competitors = self.sites.iter().filter(|s| !s.is_target());
        let (snapshots, missing) = collection.split_competitors(competitors);
        for id in &missing {
            if let Some(kind) = collection.failures.get(id) {
                warn!("Competitor '{}' left out of this report: {}", id, kind);
            }
        }

        let target = collection.snapshot(&self.target_id);
        if target.is_none() {
            let kind = collection
                .failures
                .get(&self.target_id)
                .copied()
                .unwrap_or(FailureKind::Unavailable);
            error!("Target '{}' could not be measured: {}", self.target_id, kind);
        }

        let report =
            self.assembler
                .assemble(&self.target_id, target, &snapshots, &missing, Utc::now())?;
        info!(
            "Report assembled: {} comparison(s), {} recommendation(s)",
            report.comparisons.len(),
            report.recommendations.len()
        );

        let rendered = self.renderer.render(&report, &self.sites)?;

        if dry_run {
            info!("Dry run: report not saved or delivered");
        } else {
            self.repository.save(&report)?;
            self.channel.send(&rendered).await?;
        }

        Ok(RunOutcome {
            report,
            rendered,
            failures: collection.failures,
        })
    }
}
