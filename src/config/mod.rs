//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BreakerConfig (validated, immutable)
//!     → BreakerSet::from_config builds the breaker tree once
//! ```
//!
//! # Design Decisions
//! - Config is read once; breakers are never rebuilt in place
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Failure predicates are code, not config; file-built breakers count every error

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::BreakerConfig;
pub use schema::LayerConfig;
pub use schema::ObservabilityConfig;
pub use schema::OverridesConfig;
pub use schema::SimulationConfig;
