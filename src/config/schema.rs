//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the reporter.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::http::Options;
use crate::hub::ClientOptions;
use crate::sink::http::DEFAULT_QUEUE_SIZE;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ReporterConfig {
    /// Demo server settings.
    pub server: ServerConfig,

    /// Reporting client and delivery settings.
    pub client: ClientConfig,

    /// Panic middleware behaviour.
    pub middleware: MiddlewareConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Reporting client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Collector URL envelopes are POSTed to. Reporting is disabled when unset.
    pub endpoint: Option<String>,

    /// Environment name attached to events (e.g., "production").
    pub environment: Option<String>,

    /// Release identifier attached to events.
    pub release: Option<String>,

    /// Server name attached to events.
    pub server_name: Option<String>,

    /// Fraction of error events sent (0.0 - 1.0).
    pub sample_rate: f32,

    /// Fraction of new traces recorded (0.0 - 1.0).
    pub traces_sample_rate: f32,

    /// Attach cookies, auth headers and client IPs to events.
    pub send_default_pii: bool,

    /// Capacity of the delivery queue.
    pub queue_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            environment: None,
            release: None,
            server_name: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.0,
            send_default_pii: false,
            queue_size: DEFAULT_QUEUE_SIZE,
        }
    }
}

impl ClientConfig {
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            environment: self.environment.clone(),
            release: self.release.clone(),
            server_name: self.server_name.clone(),
            sample_rate: self.sample_rate,
            traces_sample_rate: self.traces_sample_rate,
            send_default_pii: self.send_default_pii,
        }
    }
}

/// Panic middleware configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MiddlewareConfig {
    /// Re-raise panics after reporting them.
    pub repanic: bool,

    /// Wait for report delivery before re-raising or responding.
    pub wait_for_delivery: bool,

    /// Delivery wait timeout in milliseconds (0 = default of 2s).
    pub timeout_ms: u64,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            repanic: false,
            wait_for_delivery: false,
            timeout_ms: 2000,
        }
    }
}

impl From<&MiddlewareConfig> for Options {
    fn from(config: &MiddlewareConfig) -> Self {
        Options {
            repanic: config.repanic,
            wait_for_delivery: config.wait_for_delivery,
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
