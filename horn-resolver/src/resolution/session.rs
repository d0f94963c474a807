use super::cache::{CacheStats, DerivationCache, DerivationStatus};
use super::engine::Search;
use super::factory::{downcast, Factory};
use crate::catalog::RuleCatalog;
use crate::config::ResolverConfig;
use crate::diagnostics::ResolveError;
use crate::term::TypeTerm;
use crate::value::Value;
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;

/// A resolution session over a fixed catalog.
///
/// The session remembers the outcome of every goal it searched, so
/// each distinct goal is searched at most once.  Searches hold the
/// session lock; factories run outside of it.
pub struct Resolver {
    catalog: Arc<RuleCatalog>,
    config: ResolverConfig,
    cache: Mutex<DerivationCache>,
}

impl Resolver {
    #[must_use]
    pub fn new(catalog: Arc<RuleCatalog>) -> Self {
        Self::with_config(catalog, ResolverConfig::default())
    }

    #[must_use]
    pub fn with_config(catalog: Arc<RuleCatalog>, config: ResolverConfig) -> Self {
        Self {
            catalog,
            config,
            cache: Mutex::new(DerivationCache::default()),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &Arc<RuleCatalog> {
        &self.catalog
    }

    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Finds the proof of `goal`, and returns it as a factory.
    ///
    /// # Errors
    ///
    /// Returns `NonGroundGoal` if `goal` mentions type variables, and
    /// otherwise the (cached) `NoRule`, `Ambiguous`, `CyclicRule` or
    /// `DepthExceeded` failure of the search.
    pub fn compile(&self, goal: &TypeTerm) -> Result<Factory, ResolveError> {
        let outcome = {
            let mut cache = self.cache.lock();
            Search::new(&self.catalog, &self.config, &mut *cache).run(goal)
        };

        outcome
            .map(Factory::new)
            .map_err(|error| (*error).clone())
    }

    /// Returns the value of `goal`.  The first value built for a goal
    /// is kept: later calls return the same `Arc` without invoking any
    /// rule.
    ///
    /// # Errors
    ///
    /// Returns the errors of `compile`, and `Invocation` when a rule
    /// handle fails.
    pub fn resolve(&self, goal: &TypeTerm) -> Result<Value, ResolveError> {
        let factory = self.compile(goal)?;
        let derivation = factory.derivation();
        if let Some(value) = derivation.memoized() {
            return Ok(value);
        }

        let value = factory.invoke()?;
        Ok(derivation.memoize(value))
    }

    /// Returns the value of `goal`, downcast to `T`.
    ///
    /// # Errors
    ///
    /// Returns the errors of `resolve`, and `ValueType` when the value
    /// is not a `T`.
    pub fn resolve_as<T: Any + Send + Sync>(&self, goal: &TypeTerm) -> Result<Arc<T>, ResolveError> {
        downcast(goal, self.resolve(goal)?)
    }

    #[must_use]
    pub fn status(&self, goal: &TypeTerm) -> DerivationStatus {
        self.cache.lock().status(goal)
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    /// Forgets every outcome, and starts a new session over the same
    /// catalog.  Factories compiled earlier remain valid.
    pub fn reset(&self) {
        let mut cache = self.cache.lock();
        tracing::debug!(entries = cache.stats().entries, "resolution: session reset");
        *cache = DerivationCache::default();
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("rules", &self.catalog.len())
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
fn int_catalog() -> Arc<RuleCatalog> {
    use crate::catalog::{CatalogBuilder, RuleSpec};
    use crate::value::value;

    let catalog = CatalogBuilder::new()
        .rule(
            "core",
            RuleSpec::new("int", TypeTerm::con("Int"), |_| Ok(value(42i64))),
        )
        .build()
        .expect("ok");
    Arc::new(catalog)
}

#[test]
fn test_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}

    assert_send_sync::<Resolver>();
    assert_send_sync::<Factory>();
}

#[test]
fn test_stats_and_reset() {
    let resolver = Resolver::new(int_catalog());
    let int = TypeTerm::con("Int");

    assert!(matches!(resolver.status(&int), DerivationStatus::Unstarted));
    assert_eq!(*resolver.resolve_as::<i64>(&int).expect("ok"), 42);
    assert_eq!(*resolver.resolve_as::<i64>(&int).expect("ok"), 42);
    assert!(resolver.status(&int).is_resolved());

    let stats = resolver.stats();
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.resolved, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1);

    let factory = resolver.compile(&int).expect("ok");
    resolver.reset();
    assert!(matches!(resolver.status(&int), DerivationStatus::Unstarted));
    assert_eq!(resolver.stats(), CacheStats::default());
    assert_eq!(*factory.invoke_as::<i64>().expect("ok"), 42);
}

#[test]
fn test_non_ground_goal() {
    use crate::term::TypeVar;

    let resolver = Resolver::new(int_catalog());
    let goal = TypeTerm::app("List", vec![TypeVar::new("a").term()]);

    assert!(matches!(
        resolver.compile(&goal),
        Err(ResolveError::NonGroundGoal { .. })
    ));
    assert_eq!(resolver.stats().entries, 0);
}

#[test]
fn test_wrong_value_type() {
    let resolver = Resolver::new(int_catalog());

    match resolver.resolve_as::<String>(&TypeTerm::con("Int")) {
        Err(ResolveError::ValueType { goal, .. }) => assert_eq!(goal, TypeTerm::con("Int")),
        other => panic!("unexpected {:?}", other),
    }
}
