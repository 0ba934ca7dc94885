//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (sample rates, queue size)
//! - Validate addresses and the collector URL
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ReporterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use url::Url;

use crate::config::schema::ReporterConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must be between 0.0 and 1.0, got {value}")]
    RateOutOfRange { field: &'static str, value: f32 },

    #[error("client.queue_size must be greater than zero")]
    EmptyQueue,

    #[error("client.endpoint is not a valid http(s) URL: {0}")]
    InvalidEndpoint(String),

    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },
}

pub fn validate_config(config: &ReporterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (field, value) in [
        ("client.sample_rate", config.client.sample_rate),
        ("client.traces_sample_rate", config.client.traces_sample_rate),
    ] {
        if !(0.0..=1.0).contains(&value) {
            errors.push(ValidationError::RateOutOfRange { field, value });
        }
    }

    if config.client.queue_size == 0 {
        errors.push(ValidationError::EmptyQueue);
    }

    if let Some(endpoint) = &config.client.endpoint {
        match Url::parse(endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => errors.push(ValidationError::InvalidEndpoint(endpoint.clone())),
        }
    }

    let mut addresses = vec![("server.bind_address", &config.server.bind_address)];
    if config.observability.metrics_enabled {
        addresses.push(("observability.metrics_address", &config.observability.metrics_address));
    }
    for (field, value) in addresses {
        if value.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidAddress {
                field,
                value: value.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
