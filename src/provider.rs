//! Analysis provider interface and the PageSpeed Insights client

use crate::error::Result;
use crate::retry::Retryable;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use site_pulse_core::{parser, RawMeasurement, Strategy};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;
use url::Url;

const PAGESPEED_API: &str = "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";

/// Failure of a single fetch, classified for retrying
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Rate limited, timed out, or the provider is temporarily failing
    Transient(String),
    /// The request can never succeed as issued
    Permanent(String),
    /// The provider answered with a body that is not a usable measurement
    Malformed(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Transient(msg) => write!(f, "transient: {}", msg),
            FetchError::Permanent(msg) => write!(f, "permanent: {}", msg),
            FetchError::Malformed(msg) => write!(f, "malformed response: {}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

impl Retryable for FetchError {
    fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }
}

/// Source of raw performance measurements
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Measure one URL
    async fn fetch(&self, url: &str, strategy: Strategy) -> std::result::Result<RawMeasurement, FetchError>;
}

/// Whether an HTTP status is worth retrying
pub fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

/// Google PageSpeed Insights v5 client
pub struct PageSpeedClient {
    client: reqwest::Client,
    api_key: Option<String>,
    api_base: String,
}

impl PageSpeedClient {
    /// Create a new client; `timeout` bounds each request
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("site-pulse"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.is_empty()),
            api_base: PAGESPEED_API.to_string(),
        })
    }

    /// Point the client at a different endpoint
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Build the request URL for a site
    pub fn request_url(
        &self,
        site_url: &str,
        strategy: Strategy,
    ) -> std::result::Result<Url, FetchError> {
        let site = Url::parse(site_url.trim())
            .map_err(|e| FetchError::Permanent(format!("invalid site URL '{}': {}", site_url, e)))?;
        if !matches!(site.scheme(), "http" | "https") {
            return Err(FetchError::Permanent(format!(
                "unsupported URL scheme '{}'",
                site.scheme()
            )));
        }

        let mut url = Url::parse(&self.api_base)
            .map_err(|e| FetchError::Permanent(format!("invalid API base: {}", e)))?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("url", site.as_str())
                .append_pair("strategy", strategy.as_str())
                .append_pair("category", "performance");
            if let Some(ref key) = self.api_key {
                query.append_pair("key", key);
            }
        }
        Ok(url)
    }

    /// Remove the API key from text that may end up in logs
    fn redact(&self, text: &str) -> String {
        match self.api_key {
            Some(ref key) => text.replace(key.as_str(), "REDACTED"),
            None => text.to_string(),
        }
    }

    fn classify_request_error(&self, error: &reqwest::Error) -> FetchError {
        let message = self.redact(&error.to_string());
        if error.is_decode() {
            FetchError::Malformed(message)
        } else {
            FetchError::Transient(message)
        }
    }
}

/// Extract the provider's error message from an error body
fn api_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .pointer("/error/message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

#[async_trait]
impl AnalysisProvider for PageSpeedClient {
    async fn fetch(&self, url: &str, strategy: Strategy) -> std::result::Result<RawMeasurement, FetchError> {
        let request_url = self.request_url(url, strategy)?;
        debug!("Requesting PageSpeed analysis for {}", url);

        let response = self
            .client
            .get(request_url)
            .send()
            .await
            .map_err(|e| self.classify_request_error(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.classify_request_error(&e))?;

        if !status.is_success() {
            let detail = api_error_message(&body).unwrap_or_else(|| body.chars().take(300).collect());
            let message = self.redact(&format!("HTTP {} for {}: {}", status, url, detail));
            return Err(if is_transient_status(status) {
                FetchError::Transient(message)
            } else {
                FetchError::Permanent(message)
            });
        }

        parser::parse_from_string(&body)
            .map_err(|e| FetchError::Malformed(format!("{}: {}", url, e)))
    }
}

/// Provider replaying scripted responses per URL, for tests and offline runs.
///
/// Each URL has a queue of results; the last one repeats once the queue is
/// drained. Every call sleeps for the URL's delay so concurrency is observable.
pub struct ScriptedProvider {
    responses: Mutex<HashMap<String, VecDeque<std::result::Result<RawMeasurement, FetchError>>>>,
    delays: HashMap<String, Duration>,
    default_delay: Duration,
    calls: Mutex<HashMap<String, u32>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            delays: HashMap::new(),
            default_delay: Duration::from_millis(10),
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Queue a response for `url`
    pub fn respond(
        self,
        url: &str,
        response: std::result::Result<RawMeasurement, FetchError>,
    ) -> Self {
        if let Ok(mut responses) = self.responses.lock() {
            responses
                .entry(url.to_string())
                .or_default()
                .push_back(response);
        }
        self
    }

    /// Make every fetch of `url` take `delay`
    pub fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    /// Number of fetches issued for `url`
    pub fn calls(&self, url: &str) -> u32 {
        self.calls
            .lock()
            .map(|calls| calls.get(url).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Highest number of simultaneous fetches observed
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn next_response(&self, url: &str) -> std::result::Result<RawMeasurement, FetchError> {
        let mut responses = self
            .responses
            .lock()
            .map_err(|_| FetchError::Permanent("scripted provider poisoned".to_string()))?;
        match responses.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| Err(FetchError::Permanent("empty script".to_string()))),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(FetchError::Permanent("empty script".to_string()))),
            None => Err(FetchError::Permanent(format!("no scripted response for {}", url))),
        }
    }
}

#[async_trait]
impl AnalysisProvider for ScriptedProvider {
    async fn fetch(&self, url: &str, _strategy: Strategy) -> std::result::Result<RawMeasurement, FetchError> {
        if let Ok(mut calls) = self.calls.lock() {
            *calls.entry(url.to_string()).or_default() += 1;
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.delays.get(url).copied().unwrap_or(self.default_delay);
        tokio::time::sleep(delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.next_response(url)
    }
}
