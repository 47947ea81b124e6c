//! The caller-owned breaker set.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tower::BoxError;

use crate::breaker::machine::Deps;
use crate::breaker::{Breaker, GenState, Overrides};
use crate::config::BreakerConfig;
use crate::lifecycle::{LoopTracker, ShutdownSignal};
use crate::observability::events::{Event, EventBus, DEFAULT_EVENT_CAPACITY};
use crate::registry::cache::Cache;
use crate::registry::key::Key;
use crate::registry::options::{CallSite, OptionSet};

/// A set of breakers built from layered configuration.
///
/// Explicitly constructed and owned; several independent sets can live in one
/// process. Every breaker stops when the [`ShutdownSignal`] given to
/// [`BreakerSetBuilder::build`] fires, after which calls pass straight through.
#[derive(Debug)]
pub struct BreakerSet {
    cache: Cache,
    events: EventBus,
    loops: LoopTracker,
}

impl BreakerSet {
    pub fn builder() -> BreakerSetBuilder {
        BreakerSetBuilder::default()
    }

    /// Build from a loaded configuration file.
    ///
    /// Must be called within a Tokio runtime.
    pub fn from_config(config: &BreakerConfig, shutdown: ShutdownSignal) -> Self {
        BreakerSetBuilder {
            global: config.global.to_overrides(),
            layers: config.layers(),
            event_capacity: config.observability.event_capacity,
        }
        .build(shutdown)
    }

    /// Subscribe to state and shed events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// The breaker governing `method`, or the call site's own breaker if given.
    ///
    /// Unseen call sites start their control loop here, so this must be called
    /// within a Tokio runtime.
    pub fn resolve(&self, method: &str, call_site: Option<&CallSite>) -> Arc<Breaker> {
        self.cache.resolve(method, call_site)
    }

    /// Resolve the breaker for `method` and run `invocation` under it.
    pub async fn call<F, Fut, T, E>(
        &self,
        method: &str,
        call_site: Option<&CallSite>,
        invocation: F,
    ) -> Result<T, BoxError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<BoxError>,
    {
        self.resolve(method, call_site).call(invocation).await
    }

    pub fn global(&self) -> &Arc<Breaker> {
        self.cache.global()
    }

    /// The breaker registered under `key`, if any.
    pub fn get(&self, key: &Key) -> Option<Arc<Breaker>> {
        self.cache.load(key)
    }

    /// Every registered key with the state of the breaker it maps to.
    pub fn snapshot(&self) -> Vec<(Key, GenState)> {
        self.cache.snapshot()
    }

    /// Number of control loops currently running.
    pub fn active_loops(&self) -> usize {
        self.loops.active()
    }
}

/// Declarative builder for a [`BreakerSet`].
#[derive(Debug, Clone)]
pub struct BreakerSetBuilder {
    global: Overrides,
    layers: Vec<OptionSet>,
    event_capacity: usize,
}

impl Default for BreakerSetBuilder {
    fn default() -> Self {
        Self {
            global: Overrides::new(),
            layers: Vec::new(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl BreakerSetBuilder {
    pub fn global(mut self, overrides: Overrides) -> Self {
        self.global = overrides;
        self
    }

    pub fn service(self, name: &str, overrides: Overrides) -> Self {
        self.layer(OptionSet::service(name, overrides))
    }

    pub fn method(self, name: &str, overrides: Overrides) -> Self {
        self.layer(OptionSet::method(name, overrides))
    }

    pub fn layer(mut self, layer: OptionSet) -> Self {
        self.layers.push(layer);
        self
    }

    /// Capacity of the event stream; lagging subscribers lose the oldest events.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Build every configured breaker and start its control loop.
    ///
    /// Must be called within a Tokio runtime.
    pub fn build(self, shutdown: ShutdownSignal) -> BreakerSet {
        let events = EventBus::new(self.event_capacity);
        let loops = LoopTracker::new();
        let deps = Deps {
            shutdown,
            events: events.clone(),
            loops: loops.clone(),
        };
        let cache = Cache::build(deps, &self.global, self.layers);
        tracing::info!(
            breakers = cache.snapshot().len(),
            loops = loops.active(),
            "Breaker set built"
        );
        BreakerSet {
            cache,
            events,
            loops,
        }
    }
}
