//! Replicate - asynchronous media predictions
//!
//! A prediction is created with `Prefer: wait` so short runs finish in one round trip;
//! longer runs are polled until they reach a terminal status.

use crate::error::{Error, Result};
use crate::media::MediaRequest;
use crate::provider::MediaProvider;
use crate::util::{mask_api_key, redact_secrets};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.replicate.com";

/// Configuration for the Replicate provider
#[derive(Clone)]
pub struct ReplicateConfig {
    /// API token
    pub api_token: String,
    /// API base URL
    pub base_url: String,
    /// Delay between status polls
    pub poll_interval: Duration,
    /// Maximum number of status polls before giving up
    pub max_polls: u32,
    /// Per-request HTTP timeout
    pub timeout: Duration,
}

impl fmt::Debug for ReplicateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplicateConfig")
            .field("api_token", &mask_api_key(&self.api_token))
            .field("base_url", &self.base_url)
            .field("poll_interval", &self.poll_interval)
            .field("max_polls", &self.max_polls)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ReplicateConfig {
    /// Creates a new configuration with the given API token
    #[must_use]
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: Duration::from_secs(1),
            max_polls: 120,
            timeout: Duration::from_secs(90),
        }
    }

    /// Creates configuration from `REPLICATE_API_TOKEN` (and optional `REPLICATE_BASE_URL`)
    ///
    /// # Errors
    /// Returns error if `REPLICATE_API_TOKEN` is not set
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("REPLICATE_API_TOKEN")
            .map_err(|_| Error::NotConfigured("REPLICATE_API_TOKEN not set".to_string()))?;
        let mut config = Self::new(token);
        if let Ok(base_url) = std::env::var("REPLICATE_BASE_URL") {
            config.base_url = base_url;
        }
        Ok(config)
    }

    /// Sets a custom base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets polling behaviour
    #[must_use]
    pub fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls;
        self
    }
}

/// Prediction lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionStatus {
    /// Queued
    Starting,
    /// Running
    Processing,
    /// Finished with output
    Succeeded,
    /// Finished with an error
    Failed,
    /// Canceled before completion
    Canceled,
}

impl PredictionStatus {
    /// Whether no further transitions will happen
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: PredictionStatus,
    #[serde(default)]
    output: Value,
    #[serde(default)]
    error: Option<Value>,
}

/// Turn a terminal prediction into its output or an error
fn finish(prediction: Prediction) -> Result<Value> {
    match prediction.status {
        PredictionStatus::Succeeded => Ok(prediction.output),
        PredictionStatus::Failed | PredictionStatus::Canceled => {
            let reason = match prediction.error {
                Some(Value::String(s)) => s,
                Some(other) if !other.is_null() => other.to_string(),
                _ => format!("{:?}", prediction.status).to_lowercase(),
            };
            Err(Error::PredictionFailed(redact_secrets(&reason)))
        }
        status => Err(Error::InvalidResponse(format!(
            "prediction {} not terminal: {:?}",
            prediction.id, status
        ))),
    }
}

/// Replicate API provider for music and video models
pub struct ReplicateProvider {
    client: Client,
    config: ReplicateConfig,
}

impl ReplicateProvider {
    /// Creates a new provider with the given configuration
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: ReplicateConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Creates a provider from environment variables
    ///
    /// # Errors
    /// Returns error if `REPLICATE_API_TOKEN` is not set
    pub fn from_env() -> Result<Self> {
        Self::new(ReplicateConfig::from_env()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Prediction> {
        let response = builder
            .bearer_auth(&self.config.api_token)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout(self.config.timeout.as_millis() as u64)
                } else {
                    Error::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimit);
        }
        if !status.is_success() {
            let detail = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| format!("HTTP {}", status));
            return Err(Error::Api {
                status: status.as_u16(),
                message: redact_secrets(&detail),
            });
        }

        serde_json::from_str(&text).map_err(|e| Error::InvalidResponse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl MediaProvider for ReplicateProvider {
    fn name(&self) -> &str {
        "replicate"
    }

    #[instrument(skip(self, request), fields(version = %request.version))]
    async fn run(&self, request: MediaRequest) -> Result<Value> {
        let create = self
            .client
            .post(self.url("v1/predictions"))
            .header("Prefer", "wait")
            .json(&request);
        let mut prediction = self.send(create).await?;
        debug!(id = %prediction.id, status = ?prediction.status, "Prediction created");

        let mut polls = 0;
        while !prediction.status.is_terminal() {
            if polls >= self.config.max_polls {
                warn!(id = %prediction.id, polls, "Prediction did not finish in time");
                let waited = self.config.poll_interval * self.config.max_polls;
                return Err(Error::Timeout(waited.as_millis() as u64));
            }
            tokio::time::sleep(self.config.poll_interval).await;
            polls += 1;

            let get = self
                .client
                .get(self.url(&format!("v1/predictions/{}", prediction.id)));
            prediction = self.send(get).await?;
            debug!(id = %prediction.id, status = ?prediction.status, polls, "Prediction polled");
        }

        finish(prediction)
    }
}
