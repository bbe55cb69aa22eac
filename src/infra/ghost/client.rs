use std::time::Instant;

use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::{CmsSettings, FetchSettings};

use super::error::{ConfigError, ContentApiError};
use super::retry::RetryPolicy;

const METRIC_FETCH_RETRY: &str = "folio_fetch_retry_total";
const METRIC_FETCH_MS: &str = "folio_fetch_ms";
const KEY_PARAM: &str = "key";
const REDACTED: &str = "[redacted]";
const ERROR_BODY_PREVIEW_CHARS: usize = 200;

/// Read access to a Ghost-style content API.
///
/// `resource` is the path below `/content/`, one segment per element, e.g.
/// `["pages", "slug", "about"]`. The API key is supplied by the implementor.
#[async_trait]
pub trait ContentApi: Send + Sync {
    async fn get_json(
        &self,
        resource: &[&str],
        query: &[(&str, String)],
    ) -> Result<Value, ContentApiError>;
}

/// Pooled HTTP client for the Ghost Content API with bounded retry.
#[derive(Clone)]
pub struct GhostClient {
    http: Client,
    base: Option<Url>,
    key: Option<String>,
    api_version: String,
    retry: RetryPolicy,
}

impl GhostClient {
    pub fn new(cms: &CmsSettings, fetch: &FetchSettings) -> Result<Self, ContentApiError> {
        let http = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(fetch.timeout)
            .connect_timeout(fetch.connect_timeout)
            .build()
            .map_err(ContentApiError::transport)?;

        Ok(Self {
            http,
            base: cms.url.clone(),
            key: cms.content_api_key.clone(),
            api_version: cms.api_version.clone(),
            retry: RetryPolicy::from(fetch),
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("folio/", env!("CARGO_PKG_VERSION"))
    }

    pub fn is_configured(&self) -> bool {
        self.base.is_some() && self.key.is_some()
    }

    /// Full request URL, including the API key.
    fn request_url(&self, resource: &[&str], query: &[(&str, String)]) -> Result<Url, ConfigError> {
        let base = self.base.as_ref().ok_or(ConfigError::MissingBaseUrl)?;
        let key = self.key.as_deref().ok_or(ConfigError::MissingApiKey)?;

        let mut url = base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| ConfigError::UnusableBaseUrl(base.to_string()))?;
            segments.pop_if_empty().extend(["ghost", "api"]);
            if !self.api_version.is_empty() {
                segments.push(&self.api_version);
            }
            // Trailing empty segment keeps Ghost's canonical trailing slash.
            segments.push("content").extend(resource).push("");
        }

        url.set_query(None);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair(KEY_PARAM, key);
            for (name, value) in query {
                pairs.append_pair(name, value);
            }
        }

        Ok(url)
    }

    async fn attempt(&self, url: &Url) -> Result<Value, ContentApiError> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(ContentApiError::transport)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(ContentApiError::transport)?;

        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes);
            let preview: String = body.chars().take(ERROR_BODY_PREVIEW_CHARS).collect();
            return Err(ContentApiError::fetch(
                Some(status.as_u16()),
                format!("{status}: {preview}"),
            ));
        }

        serde_json::from_slice(&bytes).map_err(|err| {
            ContentApiError::fetch(Some(status.as_u16()), format!("invalid JSON body: {err}"))
        })
    }
}

#[async_trait]
impl ContentApi for GhostClient {
    async fn get_json(
        &self,
        resource: &[&str],
        query: &[(&str, String)],
    ) -> Result<Value, ContentApiError> {
        let url = self.request_url(resource, query)?;
        let log_url = redact_key(&url);
        let started_at = Instant::now();
        let mut attempt = 1;

        loop {
            debug!(url = %log_url, attempt, "Requesting content API");
            match self.attempt(&url).await {
                Ok(body) => {
                    histogram!(METRIC_FETCH_MS, "outcome" => "ok")
                        .record(started_at.elapsed().as_secs_f64() * 1000.0);
                    return Ok(body);
                }
                Err(err) if err.is_retryable() && self.retry.allows_another(attempt) => {
                    let delay = self.retry.delay_after(attempt);
                    warn!(
                        url = %log_url,
                        attempt,
                        status = err.status(),
                        error_kind = err.kind(),
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Content API request failed, retrying"
                    );
                    counter!(METRIC_FETCH_RETRY).increment(1);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    histogram!(METRIC_FETCH_MS, "outcome" => "error")
                        .record(started_at.elapsed().as_secs_f64() * 1000.0);
                    return Err(err);
                }
            }
        }
    }
}

/// Copy of `url` safe to log: the API key value is masked.
pub fn redact_key(url: &Url) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(name, value)| {
            let value = if name == KEY_PARAM {
                REDACTED.to_string()
            } else {
                value.into_owned()
            };
            (name.into_owned(), value)
        })
        .collect();

    redacted.set_query(None);
    if !pairs.is_empty() {
        redacted.query_pairs_mut().extend_pairs(pairs);
    }
    redacted.to_string()
}
