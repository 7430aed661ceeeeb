// observability/tracing_setup.rs - Tracing Configuration

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

/// Tracing output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TracingFormat {
    /// Human-readable format (default)
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for log aggregation
    Json,
}

impl FromStr for TracingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(TracingFormat::Pretty),
            "compact" => Ok(TracingFormat::Compact),
            "json" => Ok(TracingFormat::Json),
            other => Err(format!("unknown log format '{other}' (pretty, compact, json)")),
        }
    }
}

/// Logging section of the simulation configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    /// Filter directives, e.g. "info,fipa_room_agents=debug"
    pub filter: String,

    pub format: TracingFormat,

    /// Log span open/close (protocol handlers are instrumented)
    pub with_span_events: bool,

    /// File and line of each event
    pub with_file: bool,

    pub with_target: bool,

    pub with_thread_ids: bool,

    /// ANSI colors; ignored for JSON
    pub with_ansi: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::for_level("info", TracingFormat::Pretty)
    }
}

impl TracingConfig {
    /// Config for one level applied to everything, crate included.
    ///
    /// `debug` and `trace` also turn on span events and source locations.
    pub fn for_level(level: &str, format: TracingFormat) -> Self {
        let verbose = matches!(level, "debug" | "trace");
        Self {
            filter: format!("{level},fipa_room_agents={level}"),
            format,
            with_span_events: verbose,
            with_file: verbose,
            with_target: true,
            with_thread_ids: level == "trace",
            with_ansi: format != TracingFormat::Json,
        }
    }

    /// JSON lines at info, for log aggregation
    pub fn production() -> Self {
        Self::for_level("info", TracingFormat::Json)
    }
}

/// Tracing setup errors
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("Invalid filter '{filter}': {source}")]
    Filter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },

    #[error("Global subscriber already set: {0}")]
    AlreadySet(#[from] TryInitError),
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured filter. Fails if a
/// subscriber is already installed.
pub fn init_tracing(config: &TracingConfig) -> Result<(), TracingError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.filter).map_err(|source| TracingError::Filter {
            filter: config.filter.clone(),
            source,
        })?,
    };

    let span_events = if config.with_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    // Exactly one of these is Some
    let (pretty, compact, json) = match config.format {
        TracingFormat::Pretty => (Some(fmt::layer().with_ansi(config.with_ansi)), None, None),
        TracingFormat::Compact => (
            None,
            Some(fmt::layer().compact().with_ansi(config.with_ansi)),
            None,
        ),
        TracingFormat::Json => (None, None, Some(fmt::layer().json())),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(pretty.map(|layer| {
            layer
                .with_span_events(span_events.clone())
                .with_file(config.with_file)
                .with_line_number(config.with_file)
                .with_target(config.with_target)
                .with_thread_ids(config.with_thread_ids)
        }))
        .with(compact.map(|layer| {
            layer
                .with_span_events(span_events.clone())
                .with_file(config.with_file)
                .with_line_number(config.with_file)
                .with_target(config.with_target)
                .with_thread_ids(config.with_thread_ids)
        }))
        .with(json.map(|layer| {
            layer
                .with_span_events(span_events)
                .with_file(config.with_file)
                .with_line_number(config.with_file)
                .with_target(config.with_target)
                .with_thread_ids(config.with_thread_ids)
        }))
        .try_init()?;

    tracing::info!(filter = %config.filter, format = ?config.format, "Tracing initialized");
    Ok(())
}
