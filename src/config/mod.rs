//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{
    fmt,
    net::SocketAddr,
    num::{NonZeroU32, NonZeroUsize},
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

pub use cli::{
    CheckArgs, CliArgs, CmsOverrides, Command, FetchOverrides, ServeArgs, ServeOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "folio";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_API_VERSION: &str = "v5";
const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
const DEFAULT_CACHE_CAPACITY: u64 = 100;
const DEFAULT_FETCH_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_FETCH_BACKOFF_BASE_MS: u64 = 1000;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_FETCH_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub cms: CmsSettings,
    pub cache: CacheSettings,
    pub fetch: FetchSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

/// Where the CMS lives. Either field may be absent; requests then degrade to empty results.
#[derive(Clone)]
pub struct CmsSettings {
    pub url: Option<Url>,
    pub content_api_key: Option<String>,
    pub api_version: String,
}

impl fmt::Debug for CmsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CmsSettings")
            .field("url", &self.url.as_ref().map(Url::as_str))
            .field(
                "content_api_key",
                &self.content_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("api_version", &self.api_version)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub capacity: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub max_attempts: NonZeroU32,
    pub backoff_base: Duration,
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("FOLIO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    raw.apply_cms_overrides(&cli.cms);
    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Check(args)) => raw.apply_fetch_overrides(&args.fetch),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    cms: RawCmsSettings,
    cache: RawCacheSettings,
    fetch: RawFetchSettings,
}

impl RawSettings {
    fn apply_cms_overrides(&mut self, overrides: &CmsOverrides) {
        if let Some(url) = overrides.ghost_url.as_ref() {
            self.cms.url = Some(url.clone());
        }
        if let Some(key) = overrides.ghost_content_api_key.as_ref() {
            self.cms.content_api_key = Some(key.clone());
        }
        if let Some(version) = overrides.ghost_api_version.as_ref() {
            self.cms.api_version = Some(version.clone());
        }
    }

    fn apply_fetch_overrides(&mut self, overrides: &FetchOverrides) {
        if let Some(attempts) = overrides.fetch_max_attempts {
            self.fetch.max_attempts = Some(attempts);
        }
        if let Some(ms) = overrides.fetch_backoff_base_ms {
            self.fetch.backoff_base_ms = Some(ms);
        }
        if let Some(seconds) = overrides.fetch_timeout_seconds {
            self.fetch.timeout_seconds = Some(seconds);
        }
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(seconds) = overrides.cache_ttl_seconds {
            self.cache.ttl_seconds = Some(seconds);
        }
        if let Some(capacity) = overrides.cache_capacity {
            self.cache.capacity = Some(capacity);
        }

        self.apply_fetch_overrides(&overrides.fetch);
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            cms,
            cache,
            fetch,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            cms: build_cms_settings(cms)?,
            cache: build_cache_settings(cache)?,
            fetch: build_fetch_settings(fetch)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cms_settings(cms: RawCmsSettings) -> Result<CmsSettings, LoadError> {
    let url = match non_blank(cms.url) {
        Some(value) => {
            let url = Url::parse(&value)
                .map_err(|err| LoadError::invalid("cms.url", format!("invalid URL: {err}")))?;
            if url.cannot_be_a_base() {
                return Err(LoadError::invalid(
                    "cms.url",
                    "URL must be an absolute http(s) base",
                ));
            }
            Some(url)
        }
        None => None,
    };

    let api_version = cms
        .api_version
        .map(|value| value.trim().trim_matches('/').to_string())
        .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

    Ok(CmsSettings {
        url,
        content_api_key: non_blank(cms.content_api_key),
        api_version,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let ttl_seconds = cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS);
    if ttl_seconds == 0 {
        return Err(LoadError::invalid(
            "cache.ttl_seconds",
            "must be greater than zero",
        ));
    }

    let capacity_value = cache.capacity.unwrap_or(DEFAULT_CACHE_CAPACITY);
    let capacity = usize::try_from(capacity_value)
        .ok()
        .and_then(NonZeroUsize::new)
        .ok_or_else(|| {
            LoadError::invalid("cache.capacity", "must be greater than zero and fit in usize")
        })?;

    Ok(CacheSettings {
        ttl: Duration::from_secs(ttl_seconds),
        capacity,
    })
}

fn build_fetch_settings(fetch: RawFetchSettings) -> Result<FetchSettings, LoadError> {
    let attempts = fetch.max_attempts.unwrap_or(DEFAULT_FETCH_MAX_ATTEMPTS);
    let max_attempts = non_zero_u32(attempts.into(), "fetch.max_attempts")?;

    let backoff_base = Duration::from_millis(
        fetch
            .backoff_base_ms
            .unwrap_or(DEFAULT_FETCH_BACKOFF_BASE_MS),
    );

    let timeout_secs = fetch.timeout_seconds.unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "fetch.timeout_seconds",
            "must be greater than zero",
        ));
    }

    let connect_timeout_secs = fetch
        .connect_timeout_seconds
        .unwrap_or(DEFAULT_FETCH_CONNECT_TIMEOUT_SECS);
    if connect_timeout_secs == 0 {
        return Err(LoadError::invalid(
            "fetch.connect_timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(FetchSettings {
        max_attempts,
        backoff_base,
        timeout: Duration::from_secs(timeout_secs),
        connect_timeout: Duration::from_secs(connect_timeout_secs),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Clone, Deserialize, Default)]
#[serde(default)]
struct RawCmsSettings {
    url: Option<String>,
    content_api_key: Option<String>,
    api_version: Option<String>,
}

impl fmt::Debug for RawCmsSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawCmsSettings")
            .field("url", &self.url)
            .field(
                "content_api_key",
                &self.content_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("api_version", &self.api_version)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    ttl_seconds: Option<u64>,
    capacity: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawFetchSettings {
    max_attempts: Option<u32>,
    backoff_base_ms: Option<u64>,
    timeout_seconds: Option<u64>,
    connect_timeout_seconds: Option<u64>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
