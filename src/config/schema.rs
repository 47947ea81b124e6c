//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::breaker::Overrides;
use crate::observability::events::DEFAULT_EVENT_CAPACITY;
use crate::registry::OptionSet;

/// Root configuration for a breaker set.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BreakerConfig {
    /// Overrides applied on top of the built-in defaults.
    pub global: OverridesConfig,

    /// Service-level layers.
    pub services: Vec<LayerConfig>,

    /// Method-level layers.
    pub methods: Vec<LayerConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Traffic simulation used by `breaker-sim`.
    pub simulation: SimulationConfig,
}

impl BreakerConfig {
    /// Service and method layers in declaration order.
    pub fn layers(&self) -> Vec<OptionSet> {
        let services = self
            .services
            .iter()
            .map(|s| OptionSet::service(&s.name, s.overrides.to_overrides()));
        let methods = self
            .methods
            .iter()
            .map(|m| OptionSet::method(&m.name, m.overrides.to_overrides()));
        services.chain(methods).collect()
    }
}

/// Optional setting overrides. Unset fields inherit from the parent layer.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct OverridesConfig {
    /// Relevant failures needed to trip open.
    pub fail_threshold: Option<u32>,

    /// Successes needed while half-open to close.
    pub reset_threshold: Option<u32>,

    /// Milliseconds spent open before probing (0 disables probing).
    pub reset_timeout_ms: Option<u64>,
}

impl OverridesConfig {
    pub fn to_overrides(&self) -> Overrides {
        let mut overrides = Overrides::new();
        if let Some(threshold) = self.fail_threshold {
            overrides = overrides.fail_threshold(threshold);
        }
        if let Some(threshold) = self.reset_threshold {
            overrides = overrides.reset_threshold(threshold);
        }
        if let Some(ms) = self.reset_timeout_ms {
            overrides = overrides.reset_timeout(Duration::from_millis(ms));
        }
        overrides
    }
}

/// A named service or method layer.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct LayerConfig {
    /// Service name (e.g. `/pkg.Users`) or full method name (e.g. `/pkg.Users/Get`).
    pub name: String,

    #[serde(flatten)]
    pub overrides: OverridesConfig,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Capacity of the breaker event stream.
    pub event_capacity: usize,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Simulated traffic for `breaker-sim`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Call identifiers to spread calls across.
    pub methods: Vec<String>,

    /// Total number of calls.
    pub calls: u64,

    /// Concurrent callers.
    pub concurrency: usize,

    /// Probability that a simulated call fails (0.0 - 1.0).
    pub failure_rate: f64,

    /// Simulated call latency in milliseconds.
    pub latency_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            methods: vec![
                "/pkg.Users/Get".to_string(),
                "/pkg.Users/Create".to_string(),
                "/pkg.Orders/List".to_string(),
            ],
            calls: 1_000,
            concurrency: 8,
            failure_rate: 0.2,
            latency_ms: 5,
        }
    }
}
