// observability/mod.rs - Tracing and Metrics

//! Observability module providing structured logging and Prometheus metrics.
//!
//! # Features
//!
//! - **Tracing**: Structured logging through `tracing-subscriber`
//! - **Metrics**: Prometheus-compatible metrics export
//!
//! # Example
//!
//! ```ignore
//! use fipa_room_agents::observability::{init_tracing, init_metrics, MetricsConfig, TracingConfig};
//!
//! init_tracing(&TracingConfig::default())?;
//! let handle = init_metrics(MetricsConfig::default())?;
//! ```

mod metrics;
mod tracing_setup;

pub use metrics::{
    init_metrics, record_agent_started, record_agent_stopped, record_environment,
    record_message_dropped, record_message_received, record_message_sent, record_negotiation,
    AgentMetrics, EnvironmentMetrics, MessageMetrics, MetricsConfig, MetricsError,
    MetricsHandle, NegotiationMetrics,
};

pub use tracing_setup::{init_tracing, TracingConfig, TracingError, TracingFormat};
