//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds >= 1, rates within [0, 1])
//! - Check that method names carry a service prefix

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{BreakerConfig, LayerConfig, OverridesConfig};
use crate::registry::key::{self, Key};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{layer}: {field} must be at least 1")]
    ZeroThreshold { layer: String, field: &'static str },

    #[error("{kind} layer has an empty name")]
    EmptyName { kind: &'static str },

    #[error("method {0:?} has no service prefix")]
    MissingServicePrefix(String),

    #[error("observability.event_capacity must be at least 1")]
    ZeroEventCapacity,

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),

    #[error("simulation.failure_rate {0} is outside [0, 1]")]
    InvalidFailureRate(String),

    #[error("simulation.concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("simulation.methods is empty")]
    NoSimulatedMethods,
}

/// Check `config`, returning every problem found.
pub fn validate_config(config: &BreakerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_overrides("global", &config.global, &mut errors);
    check_layers("service", &config.services, &mut errors);
    check_layers("method", &config.methods, &mut errors);

    for method in &config.methods {
        if !method.name.is_empty() && key::service_prefix(&method.name).is_none() {
            errors.push(ValidationError::MissingServicePrefix(method.name.clone()));
        }
    }

    let obs = &config.observability;
    if obs.event_capacity == 0 {
        errors.push(ValidationError::ZeroEventCapacity);
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidMetricsAddress(obs.metrics_address.clone()));
    }

    let sim = &config.simulation;
    if !(0.0..=1.0).contains(&sim.failure_rate) {
        errors.push(ValidationError::InvalidFailureRate(sim.failure_rate.to_string()));
    }
    if sim.concurrency == 0 {
        errors.push(ValidationError::ZeroConcurrency);
    }
    if sim.methods.is_empty() {
        errors.push(ValidationError::NoSimulatedMethods);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_layers(kind: &'static str, layers: &[LayerConfig], errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for layer in layers {
        if layer.name.is_empty() {
            errors.push(ValidationError::EmptyName { kind });
            continue;
        }
        let key = match kind {
            "service" => Key::service(&layer.name),
            _ => Key::method(&layer.name),
        };
        if !seen.insert(key) {
            tracing::warn!(name = %layer.name, kind, "Duplicate layer, first occurrence wins");
        }
        check_overrides(&layer.name, &layer.overrides, errors);
    }
}

fn check_overrides(layer: &str, overrides: &OverridesConfig, errors: &mut Vec<ValidationError>) {
    if overrides.fail_threshold == Some(0) {
        errors.push(ValidationError::ZeroThreshold {
            layer: layer.to_string(),
            field: "fail_threshold",
        });
    }
    if overrides.reset_threshold == Some(0) {
        errors.push(ValidationError::ZeroThreshold {
            layer: layer.to_string(),
            field: "reset_threshold",
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(validate_config(&BreakerConfig::default()), Ok(()));
    }

    #[test]
    fn collects_every_problem() {
        let mut config = BreakerConfig::default();
        config.global.fail_threshold = Some(0);
        config.services.push(LayerConfig {
            name: String::new(),
            overrides: OverridesConfig::default(),
        });
        config.methods.push(LayerConfig {
            name: "Get".into(),
            overrides: OverridesConfig {
                reset_threshold: Some(0),
                ..Default::default()
            },
        });
        config.observability.event_capacity = 0;
        config.simulation.failure_rate = 1.5;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::ZeroThreshold {
                    layer: "global".into(),
                    field: "fail_threshold"
                },
                ValidationError::EmptyName { kind: "service" },
                ValidationError::ZeroThreshold {
                    layer: "Get".into(),
                    field: "reset_threshold"
                },
                ValidationError::MissingServicePrefix("Get".into()),
                ValidationError::ZeroEventCapacity,
                ValidationError::InvalidFailureRate("1.5".into()),
            ]
        );
    }

    #[test]
    fn metrics_address_checked_only_when_enabled() {
        let mut config = BreakerConfig::default();
        config.observability.metrics_address = "nowhere".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config),
            Err(vec![ValidationError::InvalidMetricsAddress("nowhere".into())])
        );
    }
}
