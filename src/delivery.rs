//! Delivery channels for rendered reports

use crate::config::DeliveryConfig;
use crate::error::{Error, Result};
use crate::render::RenderedReport;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

/// Somewhere a rendered report can be sent
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    async fn send(&self, report: &RenderedReport) -> Result<()>;
}

/// Build the channel described by the configuration
pub fn from_config(config: &DeliveryConfig) -> Result<Box<dyn DeliveryChannel>> {
    Ok(match config {
        DeliveryConfig::Stdout => Box::new(StdoutChannel),
        DeliveryConfig::File { dir } => Box::new(FileChannel::new(dir.clone())),
        DeliveryConfig::Webhook { url } => Box::new(WebhookChannel::new(url)?),
    })
}

/// Prints the markdown report
pub struct StdoutChannel;

#[async_trait]
impl DeliveryChannel for StdoutChannel {
    async fn send(&self, report: &RenderedReport) -> Result<()> {
        println!("{}\n\n{}", report.subject, report.text);
        Ok(())
    }
}

/// Writes `report.md` and `report.html` into a directory
pub struct FileChannel {
    dir: PathBuf,
}

impl FileChannel {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }
}

#[async_trait]
impl DeliveryChannel for FileChannel {
    async fn send(&self, report: &RenderedReport) -> Result<()> {
        let write = |name: &str, content: &str| {
            let path = self.dir.join(name);
            std::fs::write(&path, content).map_err(|e| {
                Error::Delivery(format!("failed to write '{}': {}", path.display(), e))
            })
        };

        std::fs::create_dir_all(&self.dir).map_err(|e| {
            Error::Delivery(format!("failed to create '{}': {}", self.dir.display(), e))
        })?;
        write("report.md", &report.text)?;
        write("report.html", &report.html)?;

        info!("Report written to {}", self.dir.display());
        Ok(())
    }
}

/// POSTs the report as JSON
pub struct WebhookChannel {
    client: reqwest::Client,
    url: url::Url,
}

impl WebhookChannel {
    pub fn new(url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            url: url::Url::parse(url)?,
        })
    }
}

#[async_trait]
impl DeliveryChannel for WebhookChannel {
    async fn send(&self, report: &RenderedReport) -> Result<()> {
        let response = self
            .client
            .post(self.url.clone())
            .json(report)
            .send()
            .await
            .map_err(|e| Error::Delivery(format!("webhook request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Delivery(format!(
                "webhook {} answered HTTP {}",
                self.url, status
            )));
        }

        info!("Report delivered to {}", self.url);
        Ok(())
    }
}
