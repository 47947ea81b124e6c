//! Declarative configuration layers.

use crate::breaker::Overrides;
use crate::registry::key::Key;

/// One configured layer: a service or method key plus its overrides.
#[derive(Debug, Clone)]
pub struct OptionSet {
    key: Key,
    overrides: Overrides,
}

impl OptionSet {
    /// A service layer. `name` is normalised to end with the separator.
    pub fn service(name: &str, overrides: Overrides) -> Self {
        Self {
            key: Key::service(name),
            overrides,
        }
    }

    /// A method layer. `name` should start with its service's name.
    pub fn method(name: &str, overrides: Overrides) -> Self {
        Self {
            key: Key::method(name),
            overrides,
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }
}

/// Per-call override: routes a call to its own breaker, built lazily on first
/// use from the method's breaker settings.
#[derive(Debug, Clone)]
pub struct CallSite {
    key: Key,
    overrides: Overrides,
}

impl CallSite {
    pub fn new(name: &str, overrides: Overrides) -> Self {
        Self {
            key: Key::call_site(name),
            overrides,
        }
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }
}
