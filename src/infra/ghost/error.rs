use thiserror::Error;

use super::retry::is_retryable_status;

/// Missing or unusable CMS configuration, detected before any request is sent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("CMS base URL is not configured")]
    MissingBaseUrl,
    #[error("CMS content API key is not configured")]
    MissingApiKey,
    #[error("CMS base URL `{0}` cannot carry a path")]
    UnusableBaseUrl(String),
}

#[derive(Debug, Error)]
pub enum ContentApiError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("content API request failed ({}): {cause}", describe_status(.status))]
    Fetch { status: Option<u16>, cause: String },
    #[error("content API transport failure: {0}")]
    Transport(#[source] reqwest::Error),
}

impl ContentApiError {
    pub fn fetch(status: Option<u16>, cause: impl Into<String>) -> Self {
        Self::Fetch {
            status,
            cause: cause.into(),
        }
    }

    /// Wrap a transport fault, dropping the request URL so the API key cannot leak.
    pub fn transport(err: reqwest::Error) -> Self {
        Self::Transport(err.without_url())
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Fetch { status, .. } => *status,
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Config(_) => false,
            Self::Fetch { status, .. } => status.is_some_and(is_retryable_status),
            Self::Transport(err) => err.is_timeout() || err.is_connect(),
        }
    }

    /// Short label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Fetch { .. } => "fetch",
            Self::Transport(_) => "transport",
        }
    }
}

fn describe_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("status {code}"),
        None => "no status".to_string(),
    }
}
