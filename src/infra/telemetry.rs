//! Process-wide tracing subscriber and metric descriptions.

use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing::level_filters::LevelFilter;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

/// sqlx logs every statement at `info`; keep it to slow-query warnings unless asked.
const QUIET_DIRECTIVES: &[&str] = &["sqlx::query=warn"];

static METRICS_DESCRIBED: Once = Once::new();

/// Install the global subscriber. `RUST_LOG` directives win over the configured level.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let output = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_events(FmtSpan::CLOSE)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter(logging.level))
        .with(ErrorLayer::default())
        .with(output)
        .try_init()
        .map_err(|err| InfraError::telemetry(format!("subscriber already installed: {err}")))
}

fn filter(level: LevelFilter) -> EnvFilter {
    let mut filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();
    if level < LevelFilter::DEBUG {
        for directive in QUIET_DIRECTIVES {
            if let Ok(directive) = directive.parse() {
                filter = filter.add_directive(directive);
            }
        }
    }
    filter
}

fn describe_metrics() {
    METRICS_DESCRIBED.call_once(|| {
        for (name, help) in [
            (
                "audiochan_cache_hit_total",
                "Reads served from the cache, by key scope.",
            ),
            (
                "audiochan_cache_miss_total",
                "Reads that fell through to the database, by key scope.",
            ),
            (
                "audiochan_cache_error_total",
                "Cache backend or decode failures, by key scope and operation.",
            ),
            (
                "audiochan_http_failed_requests_total",
                "Requests answered with a 4xx or 5xx status, by status class.",
            ),
        ] {
            describe_counter!(name, Unit::Count, help);
        }
        describe_counter!(
            "audiochan_uploaded_bytes_total",
            Unit::Bytes,
            "Audio bytes accepted by the upload endpoint."
        );
    });
}
