//! Breaker keys.
//!
//! A method name is always prefixed by its owning service name, and the
//! global key has the empty name, so sorting keys by name visits every
//! parent before its children.

use std::fmt;
use std::sync::Arc;

/// Separator between the service and method parts of a call identifier.
pub const SEPARATOR: char = '/';

/// Granularity of a breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Global,
    Service,
    Method,
    CallSite,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::Service => "service",
            Scope::Method => "method",
            Scope::CallSite => "call_site",
        }
    }
}

/// Identifies a breaker in the registry by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    scope: Scope,
    name: Arc<str>,
}

impl Key {
    pub fn global() -> Self {
        Self {
            scope: Scope::Global,
            name: Arc::from(""),
        }
    }

    /// A service key. The name is normalised to end with [`SEPARATOR`].
    pub fn service(name: &str) -> Self {
        let name: Arc<str> = if name.ends_with(SEPARATOR) {
            Arc::from(name)
        } else {
            Arc::from(format!("{name}{SEPARATOR}"))
        };
        Self {
            scope: Scope::Service,
            name,
        }
    }

    pub fn method(name: &str) -> Self {
        Self {
            scope: Scope::Method,
            name: Arc::from(name),
        }
    }

    pub fn call_site(name: &str) -> Self {
        Self {
            scope: Scope::CallSite,
            name: Arc::from(name),
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            f.write_str(self.scope.as_str())
        } else {
            write!(f, "{}|{}", self.scope.as_str(), self.name)
        }
    }
}

/// The owning service of a call identifier: everything up to and including
/// the first separator after the first character.
///
/// The first character is skipped so `/pkg.Users/Get` yields `/pkg.Users/`.
pub fn service_prefix(method: &str) -> Option<&str> {
    let mut chars = method.char_indices();
    chars.next()?;
    chars
        .find(|(_, c)| *c == SEPARATOR)
        .map(|(idx, _)| &method[..idx + SEPARATOR.len_utf8()])
}
