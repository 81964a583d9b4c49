//! site-pulse - Competitive Core Web Vitals monitoring
//!
//! This library measures a target site and its competitors through an
//! analysis provider, compares them with `site-pulse-core`, and persists and
//! delivers the resulting report.
//!
//! # Features
//!
//! - Concurrent collection with bounded retries, rate limiting and a deadline
//! - Google PageSpeed Insights client
//! - JSON file history of reports and per-site snapshots
//! - Markdown and HTML rendering, delivered to stdout, files or a webhook
//!
//! # Example
//!
//! ```no_run
//! use site_pulse::{config::Config, monitor::Monitor, provider::PageSpeedClient};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> site_pulse::Result<()> {
//! let config = Config::load("site-pulse.toml".as_ref())?;
//! let client = PageSpeedClient::new(None, Duration::from_secs(60))?;
//!
//! let monitor = Monitor::from_config(&config, Arc::new(client))?;
//! let outcome = monitor.run(false).await?;
//! println!("{} recommendation(s)", outcome.report.recommendations.len());
//! # Ok(())
//! # }
//! ```

pub mod collector;
pub mod config;
pub mod delivery;
pub mod error;
pub mod monitor;
pub mod provider;
pub mod rate_limiter;
pub mod render;
pub mod retry;
pub mod storage;

pub use error::{Error, Result};
