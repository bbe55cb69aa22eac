use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the folio binary.
#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Portfolio content server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FOLIO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub cms: CmsOverrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(Box<ServeArgs>),
    /// Fetch the post collection once and report what the CMS returned.
    Check(CheckArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub fetch: FetchOverrides,

    /// Also look up a page by slug.
    #[arg(long = "page", value_name = "SLUG")]
    pub page: Option<String>,
}

/// CMS location and credentials. Also read from the conventional Ghost variables.
#[derive(Debug, Args, Default, Clone)]
pub struct CmsOverrides {
    /// Override the Ghost site URL.
    #[arg(long = "ghost-url", env = "GHOST_URL", value_name = "URL", global = true)]
    pub ghost_url: Option<String>,

    /// Override the Ghost Content API key.
    #[arg(
        long = "ghost-content-api-key",
        env = "GHOST_CONTENT_API_KEY",
        value_name = "KEY",
        hide_env_values = true,
        global = true
    )]
    pub ghost_content_api_key: Option<String>,

    /// Override the Content API version path segment (e.g. v5).
    #[arg(long = "ghost-api-version", value_name = "VERSION", global = true)]
    pub ghost_api_version: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct FetchOverrides {
    /// Override the total number of attempts per CMS request.
    #[arg(long = "fetch-max-attempts", value_name = "COUNT")]
    pub fetch_max_attempts: Option<u32>,

    /// Override the base backoff delay between attempts.
    #[arg(long = "fetch-backoff-base-ms", value_name = "MILLISECONDS")]
    pub fetch_backoff_base_ms: Option<u64>,

    /// Override the per-request timeout.
    #[arg(long = "fetch-timeout-seconds", value_name = "SECONDS")]
    pub fetch_timeout_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub fetch: FetchOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override how long cached content counts as fresh.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS")]
    pub cache_ttl_seconds: Option<u64>,

    /// Override the maximum number of cached entries.
    #[arg(long = "cache-capacity", value_name = "COUNT")]
    pub cache_capacity: Option<u64>,
}
