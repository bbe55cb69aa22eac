use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register descriptions for every metric the crate emits. Idempotent.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "folio_cache_hit_total",
            Unit::Count,
            "Content cache reads answered by a fresh entry."
        );
        describe_counter!(
            "folio_cache_miss_total",
            Unit::Count,
            "Content cache reads with no fresh entry, labelled by reason."
        );
        describe_counter!(
            "folio_cache_stale_served_total",
            Unit::Count,
            "Failed refreshes answered with a previously held value."
        );
        describe_counter!(
            "folio_cache_evict_total",
            Unit::Count,
            "Content cache entries evicted due to capacity."
        );
        describe_counter!(
            "folio_fetch_retry_total",
            Unit::Count,
            "Content API attempts repeated after a transient failure."
        );
        describe_histogram!(
            "folio_fetch_ms",
            Unit::Milliseconds,
            "Content API request latency across all attempts in milliseconds."
        );
    });
}
