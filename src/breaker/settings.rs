//! Breaker settings and their overrides.
//!
//! # Inheritance
//! ```text
//! Settings::default()
//!     → global Overrides
//!     → service Overrides
//!     → method Overrides
//!     → call-site Overrides
//! ```
//!
//! # Design Decisions
//! - Settings are plain values; a child copies its parent's and applies its own overrides
//! - An override left unset inherits the parent's value
//! - A zero reset timeout means "no automatic probing"

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Error reference handed to a failure predicate.
pub type ErrorRef<'a> = &'a (dyn Error + Send + Sync + 'static);

/// Classifies an error as a relevant failure (counts toward tripping) or ignorable.
#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(ErrorRef<'_>) -> bool + Send + Sync>);

impl Predicate {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(ErrorRef<'_>) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Every error is a relevant failure.
    pub fn always() -> Self {
        Self::new(|_| true)
    }

    /// Only errors of type `E` are relevant failures.
    pub fn error_type<E: Error + 'static>() -> Self {
        Self::new(|err| err.is::<E>())
    }

    pub fn matches(&self, err: ErrorRef<'_>) -> bool {
        (self.0)(err)
    }
}

impl Default for Predicate {
    fn default() -> Self {
        Self::always()
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}

/// The tunable parameters of one breaker.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Failure classifier.
    pub predicate: Predicate,

    /// Time spent open before probing. `None` makes Open terminal.
    pub reset_timeout: Option<Duration>,

    /// Relevant failures needed to trip open.
    pub fail_threshold: u32,

    /// Successes needed while half-open to close.
    pub reset_threshold: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            predicate: Predicate::always(),
            reset_timeout: None,
            fail_threshold: 1,
            reset_threshold: 1,
        }
    }
}

/// A set of optional setting overrides layered on top of inherited settings.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    predicate: Option<Predicate>,
    reset_timeout: Option<Duration>,
    fail_threshold: Option<u32>,
    reset_threshold: Option<u32>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn predicate<F>(mut self, f: F) -> Self
    where
        F: Fn(ErrorRef<'_>) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Predicate::new(f));
        self
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = Some(timeout);
        self
    }

    pub fn fail_threshold(mut self, threshold: u32) -> Self {
        self.fail_threshold = Some(threshold);
        self
    }

    pub fn reset_threshold(mut self, threshold: u32) -> Self {
        self.reset_threshold = Some(threshold);
        self
    }

    /// Apply every set override to `settings`.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(predicate) = &self.predicate {
            settings.predicate = predicate.clone();
        }
        if let Some(timeout) = self.reset_timeout {
            settings.reset_timeout = Some(timeout).filter(|t| !t.is_zero());
        }
        if let Some(threshold) = self.fail_threshold {
            settings.fail_threshold = threshold;
        }
        if let Some(threshold) = self.reset_threshold {
            settings.reset_threshold = threshold;
        }
    }

    /// Copy `base` and apply these overrides to the copy.
    pub fn applied_to(&self, base: &Settings) -> Settings {
        let mut settings = base.clone();
        self.apply(&mut settings);
        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("unavailable")]
    struct Unavailable;

    #[derive(Debug, thiserror::Error)]
    #[error("not found")]
    struct NotFound;

    #[test]
    fn unset_overrides_inherit() {
        let base = Settings {
            reset_timeout: Some(Duration::from_secs(600)),
            ..Settings::default()
        };
        let child = Overrides::new().fail_threshold(10).applied_to(&base);

        assert_eq!(child.fail_threshold, 10);
        assert_eq!(child.reset_threshold, 1);
        assert_eq!(child.reset_timeout, Some(Duration::from_secs(600)));
    }

    #[test]
    fn child_copy_is_independent() {
        let mut base = Settings::default();
        let child = Overrides::new().reset_threshold(3).applied_to(&base);
        base.fail_threshold = 99;

        assert_eq!(child.fail_threshold, 1);
        assert_eq!(child.reset_threshold, 3);
    }

    #[test]
    fn zero_reset_timeout_disables_probing() {
        let base = Settings {
            reset_timeout: Some(Duration::from_secs(1)),
            ..Settings::default()
        };
        let child = Overrides::new().reset_timeout(Duration::ZERO).applied_to(&base);
        assert_eq!(child.reset_timeout, None);
    }

    #[test]
    fn typed_predicate() {
        let settings = Overrides::new()
            .with_predicate(Predicate::error_type::<Unavailable>())
            .applied_to(&Settings::default());

        assert!(settings.predicate.matches(&Unavailable));
        assert!(!settings.predicate.matches(&NotFound));
        assert!(Settings::default().predicate.matches(&NotFound));
    }
}
