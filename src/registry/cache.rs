//! Hierarchical breaker cache.
//!
//! # Construction
//! ```text
//! layers → dedup by key (first wins) → sort by name
//!        → walk with a stack of open ancestors:
//!            pop (and start) every method, and every ancestor that is not a prefix of the layer
//!            inherit the new top's settings, apply overrides, push
//!        → pop (and start) the rest; the root is the global breaker
//! ```
//!
//! # Resolution
//! ```text
//! call site given → load it, or build it from the method's breaker
//! method key      → load it
//! service key     → load it and memoize under the method key
//! otherwise       → memoize the global breaker under service and method keys
//! ```
//!
//! # Design Decisions
//! - At most one breaker per key; inserts go through `DashMap::entry`
//! - A breaker's control loop is started only after it wins the insert
//! - Never hold a map guard while resolving a parent

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::breaker::machine::{ControlLoop, Deps};
use crate::breaker::{Breaker, GenState, Overrides, Settings};
use crate::registry::key::{self, Key, Scope};
use crate::registry::options::{CallSite, OptionSet};

#[derive(Debug)]
pub(crate) struct Cache {
    breakers: DashMap<Key, Arc<Breaker>>,
    global: Arc<Breaker>,
    deps: Deps,
}

impl Cache {
    /// Build and start a breaker per configured layer plus the global breaker.
    pub(crate) fn build(deps: Deps, global: &Overrides, layers: Vec<OptionSet>) -> Self {
        let mut seen = HashSet::with_capacity(layers.len());
        let mut layers: Vec<OptionSet> = layers
            .into_iter()
            .filter(|layer| layer.key().scope() != Scope::Global)
            .filter(|layer| {
                let fresh = seen.insert(layer.key().clone());
                if !fresh {
                    tracing::warn!(key = %layer.key(), "Duplicate breaker layer ignored");
                }
                fresh
            })
            .collect();

        // names nest by prefix, so name order visits parents before children
        layers.sort_by(|a, b| {
            a.key()
                .name()
                .cmp(b.key().name())
                .then(a.key().scope().cmp(&b.key().scope()))
        });

        let breakers = DashMap::with_capacity(layers.len() + 1);
        let finalize = |(breaker, control): (Arc<Breaker>, ControlLoop)| {
            breakers.insert(breaker.key().clone(), Arc::clone(&breaker));
            start(&breaker, control);
        };

        let root = Breaker::new(
            Key::global(),
            global.applied_to(&Settings::default()),
            deps.clone(),
        );
        let global = Arc::clone(&root.0);
        let mut stack = vec![root];

        for layer in layers {
            let name = layer.key().name();
            // a method never parents another method, even when its name is a prefix
            while stack.last().is_some_and(|(top, _)| {
                top.key().scope() == Scope::Method || !name.starts_with(top.key().name())
            }) {
                if let Some(closed) = stack.pop() {
                    finalize(closed);
                }
            }

            let mut settings = stack
                .last()
                .map(|(parent, _)| parent.settings().clone())
                .unwrap_or_default();
            layer.overrides().apply(&mut settings);

            tracing::debug!(key = %layer.key(), "Breaker configured");
            stack.push(Breaker::new(layer.key().clone(), settings, deps.clone()));
        }

        while let Some(closed) = stack.pop() {
            finalize(closed);
        }

        Self {
            breakers,
            global,
            deps,
        }
    }

    /// Map a call identifier (and optional call-site override) to its breaker.
    pub(crate) fn resolve(&self, method: &str, call_site: Option<&CallSite>) -> Arc<Breaker> {
        if let Some(site) = call_site {
            if let Some(breaker) = self.load(site.key()) {
                return breaker;
            }
            let parent = self.resolve(method, None);
            let settings = site.overrides().applied_to(parent.settings());
            return self.load_or_start(site.key().clone(), settings);
        }

        let method_key = Key::method(method);
        if let Some(breaker) = self.load(&method_key) {
            return breaker;
        }

        let Some(service) = key::service_prefix(method) else {
            return self.load_or_store(method_key, Arc::clone(&self.global));
        };

        let service_key = Key::service(service);
        if let Some(breaker) = self.load(&service_key) {
            return self.load_or_store(method_key, breaker);
        }

        let breaker = self.load_or_store(service_key, Arc::clone(&self.global));
        self.load_or_store(method_key, breaker)
    }

    pub(crate) fn global(&self) -> &Arc<Breaker> {
        &self.global
    }

    pub(crate) fn load(&self, key: &Key) -> Option<Arc<Breaker>> {
        self.breakers.get(key).map(|r| Arc::clone(r.value()))
    }

    /// Every registered key with the state of the breaker it maps to.
    pub(crate) fn snapshot(&self) -> Vec<(Key, GenState)> {
        let mut entries: Vec<_> = self
            .breakers
            .iter()
            .map(|r| (r.key().clone(), r.value().gen_state()))
            .collect();
        entries.sort_by(|a, b| a.0.name().cmp(b.0.name()).then(a.0.scope().cmp(&b.0.scope())));
        entries
    }

    fn load_or_store(&self, key: Key, breaker: Arc<Breaker>) -> Arc<Breaker> {
        Arc::clone(self.breakers.entry(key).or_insert(breaker).value())
    }

    fn load_or_start(&self, key: Key, settings: Settings) -> Arc<Breaker> {
        let (breaker, control) = match self.breakers.entry(key) {
            Entry::Occupied(entry) => return Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                let (breaker, control) =
                    Breaker::new(entry.key().clone(), settings, self.deps.clone());
                entry.insert(Arc::clone(&breaker));
                (breaker, control)
            }
        };
        start(&breaker, control);
        breaker
    }
}

fn start(breaker: &Breaker, control: ControlLoop) {
    if let Err(e) = control.spawn() {
        tracing::debug!(key = %breaker.key(), error = %e, "Breaker created after shutdown, passing calls through");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaker::Predicate;
    use crate::lifecycle::{LoopTracker, Shutdown};
    use crate::observability::EventBus;
    use std::time::Duration;

    #[derive(Debug, thiserror::Error)]
    #[error("sentinel")]
    struct Sentinel;

    #[derive(Debug, thiserror::Error)]
    #[error("other")]
    struct Other;

    fn deps(shutdown: &Shutdown) -> Deps {
        Deps {
            shutdown: shutdown.subscribe(),
            events: EventBus::default(),
            loops: LoopTracker::new(),
        }
    }

    fn ten_minutes() -> Overrides {
        Overrides::new().reset_timeout(Duration::from_secs(600))
    }

    struct Expect {
        key: Key,
        reset_timeout: Option<Duration>,
        fail_threshold: u32,
        reset_threshold: u32,
        sentinel_only: bool,
    }

    fn check(cache: &Cache, method: &str, site: Option<&CallSite>, want: Expect) {
        let b = cache.resolve(method, site);
        assert_eq!(b.key(), &want.key, "key for {method}");
        let s = b.settings();
        assert_eq!(s.reset_timeout, want.reset_timeout, "reset timeout for {method}");
        assert_eq!(s.fail_threshold, want.fail_threshold, "fail threshold for {method}");
        assert_eq!(s.reset_threshold, want.reset_threshold, "reset threshold for {method}");
        assert!(s.predicate.matches(&Sentinel));
        assert_eq!(!s.predicate.matches(&Other), want.sentinel_only, "predicate for {method}");
    }

    #[tokio::test]
    async fn just_global() {
        let shutdown = Shutdown::new();
        let cache = Cache::build(
            deps(&shutdown),
            &ten_minutes().with_predicate(Predicate::error_type::<Sentinel>()),
            vec![],
        );
        check(&cache, "foo/Get", None, Expect {
            key: Key::global(),
            reset_timeout: Some(Duration::from_secs(600)),
            fail_threshold: 1,
            reset_threshold: 1,
            sentinel_only: true,
        });
    }

    #[tokio::test]
    async fn service_level() {
        let shutdown = Shutdown::new();
        let cache = Cache::build(
            deps(&shutdown),
            &ten_minutes(),
            vec![OptionSet::service("foo", Overrides::new().fail_threshold(10))],
        );
        for method in ["foo/Get", "foo/Create"] {
            check(&cache, method, None, Expect {
                key: Key::service("foo/"),
                reset_timeout: Some(Duration::from_secs(600)),
                fail_threshold: 10,
                reset_threshold: 1,
                sentinel_only: false,
            });
        }
        check(&cache, "notfoo/blah", None, Expect {
            key: Key::global(),
            reset_timeout: Some(Duration::from_secs(600)),
            fail_threshold: 1,
            reset_threshold: 1,
            sentinel_only: false,
        });
    }

    #[tokio::test]
    async fn method_level() {
        let shutdown = Shutdown::new();
        let cache = Cache::build(
            deps(&shutdown),
            &ten_minutes(),
            vec![
                OptionSet::method("foo/Get", Overrides::new().reset_threshold(22)),
                OptionSet::service("foo", Overrides::new().fail_threshold(10)),
            ],
        );
        check(&cache, "foo/Get", None, Expect {
            key: Key::method("foo/Get"),
            reset_timeout: Some(Duration::from_secs(600)),
            fail_threshold: 10,
            reset_threshold: 22,
            sentinel_only: false,
        });
        check(&cache, "foo/Create", None, Expect {
            key: Key::service("foo/"),
            reset_timeout: Some(Duration::from_secs(600)),
            fail_threshold: 10,
            reset_threshold: 1,
            sentinel_only: false,
        });
        check(&cache, "notfoo/blah", None, Expect {
            key: Key::global(),
            reset_timeout: Some(Duration::from_secs(600)),
            fail_threshold: 1,
            reset_threshold: 1,
            sentinel_only: false,
        });
    }

    #[tokio::test]
    async fn call_site_override() {
        let shutdown = Shutdown::new();
        let cache = Cache::build(
            deps(&shutdown),
            &ten_minutes(),
            vec![
                OptionSet::service("foo", Overrides::new().fail_threshold(10)),
                OptionSet::method(
                    "foo/Get",
                    Overrides::new()
                        .reset_threshold(22)
                        .with_predicate(Predicate::error_type::<Sentinel>()),
                ),
            ],
        );
        let site = CallSite::new("bizbaz", Overrides::new().fail_threshold(11));

        check(&cache, "foo/Get", Some(&site), Expect {
            key: Key::call_site("bizbaz"),
            reset_timeout: Some(Duration::from_secs(600)),
            fail_threshold: 11,
            reset_threshold: 22,
            sentinel_only: true,
        });
        check(&cache, "foo/Get", None, Expect {
            key: Key::method("foo/Get"),
            reset_timeout: Some(Duration::from_secs(600)),
            fail_threshold: 10,
            reset_threshold: 22,
            sentinel_only: true,
        });
        check(&cache, "foo/Create", None, Expect {
            key: Key::service("foo/"),
            reset_timeout: Some(Duration::from_secs(600)),
            fail_threshold: 10,
            reset_threshold: 1,
            sentinel_only: false,
        });
    }

    #[tokio::test]
    async fn service_prefix_does_not_leak_into_sibling_names() {
        let shutdown = Shutdown::new();
        let cache = Cache::build(
            deps(&shutdown),
            &Overrides::new(),
            vec![
                OptionSet::service("foo", Overrides::new().fail_threshold(10)),
                OptionSet::method("foobar/Get", Overrides::new().reset_threshold(5)),
            ],
        );
        let b = cache.resolve("foobar/Get", None);
        assert_eq!(b.key(), &Key::method("foobar/Get"));
        assert_eq!(b.settings().fail_threshold, 1);
        assert_eq!(b.settings().reset_threshold, 5);
    }

    #[tokio::test]
    async fn method_name_prefix_does_not_make_a_parent() {
        let shutdown = Shutdown::new();
        let cache = Cache::build(
            deps(&shutdown),
            &ten_minutes(),
            vec![
                OptionSet::service("foo", Overrides::new().fail_threshold(10)),
                OptionSet::method(
                    "foo/Get",
                    Overrides::new().fail_threshold(50).reset_threshold(22),
                ),
                OptionSet::method("foo/GetAll", Overrides::new()),
            ],
        );
        check(&cache, "foo/GetAll", None, Expect {
            key: Key::method("foo/GetAll"),
            reset_timeout: Some(Duration::from_secs(600)),
            fail_threshold: 10,
            reset_threshold: 1,
            sentinel_only: false,
        });
        check(&cache, "foo/Get", None, Expect {
            key: Key::method("foo/Get"),
            reset_timeout: Some(Duration::from_secs(600)),
            fail_threshold: 50,
            reset_threshold: 22,
            sentinel_only: false,
        });
    }

    #[tokio::test]
    async fn first_duplicate_layer_wins() {
        let shutdown = Shutdown::new();
        let cache = Cache::build(
            deps(&shutdown),
            &Overrides::new(),
            vec![
                OptionSet::service("foo", Overrides::new().fail_threshold(3)),
                OptionSet::service("foo/", Overrides::new().fail_threshold(4)),
            ],
        );
        assert_eq!(cache.resolve("foo/Get", None).settings().fail_threshold, 3);
    }

    #[tokio::test]
    async fn build_starts_one_loop_per_layer() {
        let shutdown = Shutdown::new();
        let deps = deps(&shutdown);
        let loops = deps.loops.clone();
        let cache = Cache::build(
            deps,
            &Overrides::new(),
            vec![
                OptionSet::service("a", Overrides::new()),
                OptionSet::method("a/X", Overrides::new()),
                OptionSet::service("b", Overrides::new()),
                OptionSet::method("c/Y", Overrides::new()),
            ],
        );
        assert_eq!(loops.active(), 5);
        assert_eq!(cache.snapshot().len(), 5);

        // memoized mappings reuse existing breakers
        cache.resolve("a/Z", None);
        cache.resolve("d/Z", None);
        cache.resolve("NoService", None);
        assert_eq!(loops.active(), 5);
        assert_eq!(cache.snapshot().len(), 9);
    }

    #[tokio::test]
    async fn resolution_is_idempotent() {
        let shutdown = Shutdown::new();
        let cache = Cache::build(deps(&shutdown), &Overrides::new(), vec![]);
        let site = CallSite::new("report", Overrides::new().fail_threshold(7));

        let a = cache.resolve("svc/Get", Some(&site));
        let b = cache.resolve("svc/Get", Some(&site));
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(
            &cache.resolve("svc/Get", None),
            &cache.resolve("svc/Get", None)
        ));
        assert!(Arc::ptr_eq(&cache.resolve("svc/Get", None), cache.global()));
        assert!(cache.load(&Key::service("svc")).is_some());
    }

    #[tokio::test]
    async fn call_site_after_shutdown_passes_through() {
        let shutdown = Shutdown::new();
        let deps = deps(&shutdown);
        let loops = deps.loops.clone();
        let cache = Cache::build(deps, &Overrides::new(), vec![]);
        shutdown.trigger();

        let site = CallSite::new("late", Overrides::new());
        let b = cache.resolve("svc/Get", Some(&site));
        assert!(b.gen_state().is_disabled());
        // only the global loop was ever started
        assert!(loops.active() <= 1);
    }
}
