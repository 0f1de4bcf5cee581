//! Cached script column provider.
//!
//! [`ChainedValueProvider`] evaluates a script through the resolution chain
//! and remembers results per item. A result is admitted to the cache only
//! when all of the following hold:
//!
//! - it is non-empty
//! - it was computed within `max_runtime_ms`
//! - the item is not an aggregate row that is still loading
//!
//! Anchored items are cached weakly. Items with only a
//! [`row_id`](Item::row_id) go to a bounded FIFO store keyed by that id.
//! Items with neither are recomputed on every call. Cached values stay until
//! invalidated, even if the item changes.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use log::trace;

use crate::cache::{IdentityFifoCache, WeakKeyCache};
use crate::fields::{normalize_field_key, simple_variable};
use crate::item::Item;
use crate::provider::{Invalidate, ValueProvider};
use crate::resolve::{ResolveRequest, ValueResolverChain};
use crate::script::{ScriptContext, ScriptEvaluator};

/// Default admission budget in milliseconds.
pub const DEFAULT_MAX_RUNTIME_MS: i64 = 25;
/// Default cache size.
pub const DEFAULT_CACHE_SIZE: usize = 1024;
/// Lower bound for the identity cache capacity.
pub const DEFAULT_MIN_ID_CACHE_SIZE: usize = 16;

/// Tunables of script column caching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptCacheConfig {
    /// Results slower than this are not cached. Negative disables caching.
    pub max_runtime_ms: i64,
    /// Requested identity cache size.
    pub cache_size: usize,
    /// Floor applied to `cache_size`.
    pub min_id_cache_size: usize,
}

impl Default for ScriptCacheConfig {
    fn default() -> Self {
        ScriptCacheConfig {
            max_runtime_ms: DEFAULT_MAX_RUNTIME_MS,
            cache_size: DEFAULT_CACHE_SIZE,
            min_id_cache_size: DEFAULT_MIN_ID_CACHE_SIZE,
        }
    }
}

impl ScriptCacheConfig {
    /// Sets the admission budget.
    pub fn max_runtime_ms(mut self, ms: i64) -> Self {
        self.max_runtime_ms = ms;
        self
    }

    /// Sets the requested cache size.
    pub fn cache_size(mut self, size: usize) -> Self {
        self.cache_size = size;
        self
    }

    /// Effective identity cache capacity.
    pub fn id_cache_capacity(&self) -> usize {
        self.cache_size.max(self.min_id_cache_size)
    }

    fn budget(&self) -> Option<Duration> {
        u64::try_from(self.max_runtime_ms)
            .ok()
            .map(Duration::from_millis)
    }
}

/// Script provider with a hybrid weak/identity cache.
pub struct ChainedValueProvider {
    script: String,
    simple_var: Option<String>,
    budget: Option<Duration>,
    chain: ValueResolverChain,
    weak_cache: RefCell<WeakKeyCache<String>>,
    id_cache: RefCell<IdentityFifoCache<String>>,
}

impl ChainedValueProvider {
    /// Creates a provider with the default configuration.
    pub fn new(script: impl Into<String>, evaluator: Rc<dyn ScriptEvaluator>) -> Self {
        Self::with_config(script, evaluator, ScriptCacheConfig::default())
    }

    /// Creates a provider with the standard resolution chain.
    pub fn with_config(
        script: impl Into<String>,
        evaluator: Rc<dyn ScriptEvaluator>,
        config: ScriptCacheConfig,
    ) -> Self {
        Self::with_chain(script, ValueResolverChain::new(evaluator), config)
    }

    /// Creates a provider with a custom resolution chain.
    pub fn with_chain(
        script: impl Into<String>,
        chain: ValueResolverChain,
        config: ScriptCacheConfig,
    ) -> Self {
        let script = script.into();
        let simple_var = simple_variable(&script).map(normalize_field_key);
        ChainedValueProvider {
            script,
            simple_var,
            budget: config.budget(),
            chain,
            weak_cache: RefCell::new(WeakKeyCache::new()),
            id_cache: RefCell::new(IdentityFifoCache::new(config.id_cache_capacity())),
        }
    }

    /// Returns the script text.
    pub fn script(&self) -> &str {
        &self.script
    }

    /// Number of cached values across both stores.
    pub fn cached_len(&self) -> usize {
        self.weak_cache.borrow().len() + self.id_cache.borrow().len()
    }

    fn cached(&self, item: &dyn Item) -> Option<String> {
        if let Some(anchor) = item.anchor() {
            return self.weak_cache.borrow().get(anchor).cloned();
        }
        let id = item.row_id()?;
        self.id_cache.borrow().get(id).cloned()
    }

    fn admits(&self, value: &str, elapsed: Duration, suppressed: bool) -> bool {
        if value.is_empty() || suppressed {
            return false;
        }
        self.budget.is_some_and(|budget| elapsed <= budget)
    }

    fn store(&self, item: &dyn Item, value: &str) {
        if let Some(anchor) = item.anchor() {
            self.weak_cache
                .borrow_mut()
                .insert(anchor, value.to_string());
        } else if let Some(id) = item.row_id() {
            self.id_cache.borrow_mut().insert(id, value.to_string());
        }
    }
}

impl fmt::Debug for ChainedValueProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainedValueProvider")
            .field("script", &self.script)
            .field("budget", &self.budget)
            .field("cached", &self.cached_len())
            .finish_non_exhaustive()
    }
}

impl ValueProvider for ChainedValueProvider {
    fn evaluate(&self, item: &dyn Item) -> String {
        if let Some(value) = self.cached(item) {
            return value;
        }

        let suppressed = item.is_album_like() && !item.is_loaded();
        let context = ScriptContext::for_item(item);
        let request = ResolveRequest {
            item,
            simple_var: self.simple_var.as_deref(),
            script: &self.script,
            context: &context,
        };

        let started = Instant::now();
        let value = self.chain.resolve_value(&request);
        let elapsed = started.elapsed();

        if self.admits(&value, elapsed, suppressed) {
            self.store(item, &value);
        } else {
            trace!(
                "not caching {:?}: empty={} elapsed={:?} loading={}",
                self.script,
                value.is_empty(),
                elapsed,
                suppressed
            );
        }
        value
    }

    fn as_invalidate(&self) -> Option<&dyn Invalidate> {
        Some(self)
    }
}

impl Invalidate for ChainedValueProvider {
    /// Clears everything for `None`. For one item only the weak store is
    /// addressed; row-id entries stay until evicted or cleared.
    fn invalidate(&self, item: Option<&dyn Item>) {
        match item {
            None => {
                self.weak_cache.borrow_mut().clear();
                self.id_cache.borrow_mut().clear();
            }
            Some(item) => {
                if let Some(anchor) = item.anchor() {
                    self.weak_cache.borrow_mut().remove(anchor);
                }
            }
        }
    }
}
