// observability/metrics.rs - Prometheus Metrics

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::sync::Arc;

/// Configuration for metrics
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Address to expose metrics endpoint
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 9090)),
        }
    }
}

/// Handle to the Prometheus metrics exporter
#[derive(Clone)]
pub struct MetricsHandle {
    handle: PrometheusHandle,
}

impl MetricsHandle {
    /// Render metrics in Prometheus text format
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Agent-related metrics
pub struct AgentMetrics;

impl AgentMetrics {
    pub const STARTED_TOTAL: &'static str = "room_agents_started_total";
    pub const STOPPED_TOTAL: &'static str = "room_agents_stopped_total";
    pub const ACTIVE: &'static str = "room_agents_active";
}

/// Message-related metrics
pub struct MessageMetrics;

impl MessageMetrics {
    pub const SENT_TOTAL: &'static str = "room_messages_sent_total";
    pub const RECEIVED_TOTAL: &'static str = "room_messages_received_total";
    pub const DROPPED_TOTAL: &'static str = "room_messages_dropped_total";
}

/// Negotiation metrics
pub struct NegotiationMetrics;

impl NegotiationMetrics {
    pub const ROUNDS_TOTAL: &'static str = "room_negotiation_rounds_total";
}

/// Simulated environment state
pub struct EnvironmentMetrics;

impl EnvironmentMetrics {
    /// 1 while the room is dark
    pub const ILLUMINANCE_LOW: &'static str = "room_illuminance_low";
    /// 1 while the sky is cloudy
    pub const WEATHER_CLOUDY: &'static str = "room_weather_cloudy";
}

/// Metrics initialization errors
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Failed to install Prometheus recorder: {0}")]
    Install(#[from] metrics_exporter_prometheus::BuildError),
}

/// Initialize the metrics system
///
/// Installs the Prometheus recorder and serves `/metrics` and `/health` on
/// the configured address. Must be called from within a tokio runtime.
pub fn init_metrics(config: MetricsConfig) -> Result<MetricsHandle, MetricsError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    let metrics_handle = MetricsHandle {
        handle: handle.clone(),
    };

    let listen_addr = config.listen_addr;
    let shared_handle = Arc::new(handle);

    tokio::spawn(async move {
        use axum::{http::StatusCode, routing::get, Json, Router};
        use serde::Serialize;

        #[derive(Serialize)]
        struct HealthResponse {
            status: &'static str,
            version: &'static str,
            uptime_secs: u64,
        }

        let start_time = std::time::Instant::now();

        let handle_for_route = shared_handle.clone();
        let app = Router::new()
            .route(
                "/metrics",
                get(move || {
                    let h = handle_for_route.clone();
                    async move { h.render() }
                }),
            )
            .route(
                "/health",
                get(move || {
                    let uptime = start_time.elapsed().as_secs();
                    async move {
                        Json(HealthResponse {
                            status: "healthy",
                            version: env!("CARGO_PKG_VERSION"),
                            uptime_secs: uptime,
                        })
                    }
                }),
            )
            .route("/ready", get(|| async { StatusCode::OK }));

        match tokio::net::TcpListener::bind(listen_addr).await {
            Ok(listener) => {
                tracing::info!(addr = %listen_addr, "Metrics HTTP server started");
                if let Err(e) = axum::serve(listener, app).await {
                    tracing::error!(error = %e, "Metrics server error");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, addr = %listen_addr, "Failed to bind metrics server");
            }
        }
    });

    describe_counter!(AgentMetrics::STARTED_TOTAL, "Total number of agents started");
    describe_counter!(AgentMetrics::STOPPED_TOTAL, "Total number of agents stopped");
    describe_gauge!(AgentMetrics::ACTIVE, "Current number of running agents");

    describe_counter!(MessageMetrics::SENT_TOTAL, "Total number of messages sent");
    describe_counter!(
        MessageMetrics::RECEIVED_TOTAL,
        "Total number of messages taken from an inbox"
    );
    describe_counter!(
        MessageMetrics::DROPPED_TOTAL,
        "Deliveries dropped because the receiver is unknown"
    );

    describe_counter!(
        NegotiationMetrics::ROUNDS_TOTAL,
        "Contract Net rounds by outcome"
    );

    describe_gauge!(EnvironmentMetrics::ILLUMINANCE_LOW, "1 while room illuminance is low");
    describe_gauge!(EnvironmentMetrics::WEATHER_CLOUDY, "1 while the weather is cloudy");

    tracing::info!(addr = %config.listen_addr, "Metrics initialized");

    Ok(metrics_handle)
}

// Recording functions. Without an installed recorder these are no-ops.

/// Record an agent being started
pub fn record_agent_started(role: &str) {
    counter!(AgentMetrics::STARTED_TOTAL, "role" => role.to_string()).increment(1);
    gauge!(AgentMetrics::ACTIVE, "role" => role.to_string()).increment(1.0);
}

/// Record an agent being stopped
pub fn record_agent_stopped(role: &str) {
    counter!(AgentMetrics::STOPPED_TOTAL, "role" => role.to_string()).increment(1);
    gauge!(AgentMetrics::ACTIVE, "role" => role.to_string()).decrement(1.0);
}

/// Record a message being sent
pub fn record_message_sent(performative: &str) {
    counter!(
        MessageMetrics::SENT_TOTAL,
        "performative" => performative.to_string()
    )
    .increment(1);
}

/// Record a message being taken from an inbox
pub fn record_message_received(performative: &str) {
    counter!(
        MessageMetrics::RECEIVED_TOTAL,
        "performative" => performative.to_string()
    )
    .increment(1);
}

/// Record a delivery to an unknown receiver
pub fn record_message_dropped(performative: &str) {
    counter!(
        MessageMetrics::DROPPED_TOTAL,
        "performative" => performative.to_string()
    )
    .increment(1);
}

/// Record the end of a negotiation round
pub fn record_negotiation(outcome: &str) {
    counter!(
        NegotiationMetrics::ROUNDS_TOTAL,
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record the environment state seen by the status log
pub fn record_environment(illuminance_low: bool, cloudy: bool) {
    gauge!(EnvironmentMetrics::ILLUMINANCE_LOW).set(if illuminance_low { 1.0 } else { 0.0 });
    gauge!(EnvironmentMetrics::WEATHER_CLOUDY).set(if cloudy { 1.0 } else { 0.0 });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_config_default() {
        let config = MetricsConfig::default();
        assert_eq!(config.listen_addr.port(), 9090);
    }

    #[test]
    fn test_metric_names() {
        assert!(AgentMetrics::STARTED_TOTAL.starts_with("room_"));
        assert!(MessageMetrics::SENT_TOTAL.starts_with("room_"));
        assert!(NegotiationMetrics::ROUNDS_TOTAL.starts_with("room_"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_message_sent("cfp");
        record_negotiation("completed");
        record_agent_started("manager");
        record_agent_stopped("manager");
        record_environment(true, false);
    }
}
