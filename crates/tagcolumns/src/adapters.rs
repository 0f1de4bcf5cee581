//! Sort key adapters.
//!
//! An adapter wraps a base provider, passes `evaluate` through unchanged and
//! adds [`SortKeyProvider::sort_key`]. Every adapter emits keys of a single
//! shape for all items, so one column never mixes numbers and text in the
//! same sort pass. Mixed data is partitioned with a `(category, value)`
//! tuple instead:
//!
//! | Adapter                          | Key                                     |
//! |----------------------------------|-----------------------------------------|
//! | [`CasefoldSortAdapter`]          | collation key                           |
//! | [`DescendingCasefoldSortAdapter`]| reversed collation key                  |
//! | [`NumericSortAdapter`]           | `(0, number)` or `(1, natural text)`    |
//! | [`DescendingNumericSortAdapter`] | `(0, reversed number)` or `(1, natural text)` |
//! | [`LengthSortAdapter`]            | character count                         |
//! | [`ArticleInsensitiveAdapter`]    | `(tail, article)`                       |
//! | [`CompositeSortAdapter`]         | tuple of `(category, value)` components |
//! | [`NullsLastAdapter`]             | `(is_empty, collation key)`             |
//! | [`NullsFirstAdapter`]            | `(is_non_empty, collation key)`         |
//! | [`CachedSortAdapter`]            | memoized key of the base or key function |
//! | [`NaturalSortAdapter`]           | natural key                             |
//! | [`DescendingNaturalSortAdapter`] | reversed natural key                    |
//! | [`ReverseAdapter`]               | base key, reversed unless structured    |
//!
//! Adapters forward invalidation to their base, so a cached script column
//! stays invalidatable after being wrapped.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::cache::WeakKeyCache;
use crate::collate::{casefold, clean_invisible};
use crate::item::Item;
use crate::parsers::parse_float;
use crate::provider::{Invalidate, SharedProvider, SortKeyProvider, ValueProvider};
use crate::sort_key::SortKey;

/// Parses a display value into a number, `None` when it is not numeric.
pub type NumberParser = Rc<dyn Fn(&str) -> Option<f64>>;

/// Articles ignored by [`ArticleInsensitiveAdapter::new`].
pub const DEFAULT_ARTICLES: &[&str] = &["a", "an", "the"];

const NUMERIC: i64 = 0;
const NON_NUMERIC: i64 = 1;

/// Value returned by composite and cached key functions before
/// normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawKey {
    Number(f64),
    Text(String),
}

impl RawKey {
    /// Normalizes into `(0, number)` when numeric, else `(1, casefolded)`.
    ///
    /// Text that parses as a number counts as numeric; `NaN` does not.
    pub fn normalize(self) -> SortKey {
        let number = match &self {
            RawKey::Number(n) => Some(*n),
            RawKey::Text(text) => parse_float(text),
        };
        match number.filter(|n| !n.is_nan()) {
            Some(n) => SortKey::tuple([SortKey::Int(NUMERIC), SortKey::Number(n)]),
            None => {
                let text = match self {
                    RawKey::Number(n) => n.to_string(),
                    RawKey::Text(text) => text,
                };
                SortKey::tuple([SortKey::Int(NON_NUMERIC), SortKey::casefolded(&text)])
            }
        }
    }
}

impl From<f64> for RawKey {
    fn from(n: f64) -> Self {
        RawKey::Number(n)
    }
}

impl From<i64> for RawKey {
    fn from(n: i64) -> Self {
        RawKey::Number(n as f64)
    }
}

impl From<String> for RawKey {
    fn from(s: String) -> Self {
        RawKey::Text(s)
    }
}

impl From<&str> for RawKey {
    fn from(s: &str) -> Self {
        RawKey::Text(s.to_string())
    }
}

macro_rules! delegate_value_provider {
    ($adapter:ty) => {
        impl ValueProvider for $adapter {
            fn evaluate(&self, item: &dyn Item) -> String {
                self.base.evaluate(item)
            }

            fn as_sort_key_provider(&self) -> Option<&dyn SortKeyProvider> {
                Some(self)
            }

            fn as_invalidate(&self) -> Option<&dyn Invalidate> {
                self.base.as_invalidate()
            }
        }
    };
}

macro_rules! simple_adapter {
    ($(#[$meta:meta])* $name:ident, |$value:ident| $key:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name {
            base: SharedProvider,
        }

        impl $name {
            pub fn new(base: SharedProvider) -> Self {
                $name { base }
            }
        }

        delegate_value_provider!($name);

        impl SortKeyProvider for $name {
            fn sort_key(&self, item: &dyn Item) -> SortKey {
                let $value = self.base.evaluate(item);
                $key
            }
        }
    };
}

simple_adapter!(
    /// Caseless, accent-insensitive ascending sort.
    CasefoldSortAdapter,
    |value| SortKey::collated(&value)
);

simple_adapter!(
    /// Caseless, accent-insensitive descending sort.
    DescendingCasefoldSortAdapter,
    |value| SortKey::collated(&value).reversed()
);

simple_adapter!(
    /// Sort by character count.
    LengthSortAdapter,
    |value| SortKey::from(value.chars().count())
);

simple_adapter!(
    /// Alphanumeric sort: `"Track 2"` before `"Track 10"`.
    NaturalSortAdapter,
    |value| SortKey::natural(&value)
);

simple_adapter!(
    /// Descending alphanumeric sort.
    DescendingNaturalSortAdapter,
    |value| SortKey::natural(&value).reversed()
);

simple_adapter!(
    /// Sorts empty values (after removing invisible characters) last.
    NullsLastAdapter,
    |value| {
        let cleaned = clean_invisible(&value);
        SortKey::tuple([SortKey::from(cleaned.is_empty()), SortKey::collated(&cleaned)])
    }
);

simple_adapter!(
    /// Sorts empty values (after removing invisible characters) first.
    NullsFirstAdapter,
    |value| {
        let cleaned = clean_invisible(&value);
        SortKey::tuple([SortKey::from(!cleaned.is_empty()), SortKey::collated(&cleaned)])
    }
);

/// Numbers first in ascending order, then everything else in natural order.
#[derive(Clone)]
pub struct NumericSortAdapter {
    base: SharedProvider,
    parser: NumberParser,
}

impl NumericSortAdapter {
    /// Uses [`parse_float`].
    pub fn new(base: SharedProvider) -> Self {
        Self::with_parser(base, Rc::new(parse_float))
    }

    pub fn with_parser(base: SharedProvider, parser: NumberParser) -> Self {
        NumericSortAdapter { base, parser }
    }

    fn classify(&self, value: &str) -> Option<f64> {
        (self.parser)(value).filter(|n| !n.is_nan())
    }
}

impl fmt::Debug for NumericSortAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NumericSortAdapter")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

delegate_value_provider!(NumericSortAdapter);

impl SortKeyProvider for NumericSortAdapter {
    fn sort_key(&self, item: &dyn Item) -> SortKey {
        let value = self.base.evaluate(item);
        match self.classify(&value) {
            Some(n) => SortKey::tuple([SortKey::Int(NUMERIC), SortKey::Number(n)]),
            None => SortKey::tuple([SortKey::Int(NON_NUMERIC), SortKey::natural(&value)]),
        }
    }
}

/// Numbers first in descending order, then everything else in ascending
/// natural order.
#[derive(Clone, Debug)]
pub struct DescendingNumericSortAdapter {
    inner: NumericSortAdapter,
}

impl DescendingNumericSortAdapter {
    pub fn new(base: SharedProvider) -> Self {
        DescendingNumericSortAdapter {
            inner: NumericSortAdapter::new(base),
        }
    }

    pub fn with_parser(base: SharedProvider, parser: NumberParser) -> Self {
        DescendingNumericSortAdapter {
            inner: NumericSortAdapter::with_parser(base, parser),
        }
    }
}

impl ValueProvider for DescendingNumericSortAdapter {
    fn evaluate(&self, item: &dyn Item) -> String {
        self.inner.evaluate(item)
    }

    fn as_sort_key_provider(&self) -> Option<&dyn SortKeyProvider> {
        Some(self)
    }

    fn as_invalidate(&self) -> Option<&dyn Invalidate> {
        self.inner.as_invalidate()
    }
}

impl SortKeyProvider for DescendingNumericSortAdapter {
    fn sort_key(&self, item: &dyn Item) -> SortKey {
        let value = self.inner.evaluate(item);
        match self.inner.classify(&value) {
            Some(n) => SortKey::tuple([SortKey::Int(NUMERIC), SortKey::Number(n).reversed()]),
            None => SortKey::tuple([SortKey::Int(NON_NUMERIC), SortKey::natural(&value)]),
        }
    }
}

/// Ignores a leading article: `"The Beatles"` sorts under `b`.
///
/// Values that only differ by the article sort without it first.
#[derive(Debug, Clone)]
pub struct ArticleInsensitiveAdapter {
    base: SharedProvider,
    articles: Vec<String>,
}

impl ArticleInsensitiveAdapter {
    /// Ignores `a`, `an` and `the`.
    pub fn new(base: SharedProvider) -> Self {
        Self::with_articles(base, DEFAULT_ARTICLES.iter().copied())
    }

    pub fn with_articles<I, S>(base: SharedProvider, articles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ArticleInsensitiveAdapter {
            base,
            articles: articles
                .into_iter()
                .map(|article| casefold(article.as_ref().trim()))
                .filter(|article| !article.is_empty())
                .collect(),
        }
    }

    fn split<'v>(&self, folded: &'v str) -> (&'v str, &'v str) {
        for article in &self.articles {
            if let Some(tail) = folded
                .strip_prefix(article.as_str())
                .and_then(|rest| rest.strip_prefix(' '))
            {
                return (tail, &folded[..article.len()]);
            }
        }
        (folded, "")
    }
}

delegate_value_provider!(ArticleInsensitiveAdapter);

impl SortKeyProvider for ArticleInsensitiveAdapter {
    fn sort_key(&self, item: &dyn Item) -> SortKey {
        let value = self.base.evaluate(item);
        let folded = casefold(value.trim());
        let (tail, article) = self.split(&folded);
        SortKey::tuple([SortKey::collated(tail), SortKey::from(article)])
    }
}

/// Function producing one component of a composite key.
pub type KeyFn = Box<dyn Fn(&dyn Item) -> RawKey>;

/// Sorts by several key functions, each normalized on its own.
pub struct CompositeSortAdapter {
    base: SharedProvider,
    key_funcs: Vec<KeyFn>,
}

impl CompositeSortAdapter {
    pub fn new(base: SharedProvider, key_funcs: Vec<KeyFn>) -> Self {
        CompositeSortAdapter { base, key_funcs }
    }
}

impl fmt::Debug for CompositeSortAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeSortAdapter")
            .field("base", &self.base)
            .field("key_funcs", &self.key_funcs.len())
            .finish()
    }
}

delegate_value_provider!(CompositeSortAdapter);

impl SortKeyProvider for CompositeSortAdapter {
    fn sort_key(&self, item: &dyn Item) -> SortKey {
        SortKey::tuple(self.key_funcs.iter().map(|func| func(item).normalize()))
    }
}

/// Key function of a [`CachedSortAdapter`], given the item and the base.
pub type ProviderKeyFn = Box<dyn Fn(&dyn Item, &dyn ValueProvider) -> RawKey>;

/// Memoizes sort keys per item.
///
/// Keys come from the key function when one is set, else from the base's own
/// sort key, else from the casefolded value. Only anchored items are cached;
/// others are recomputed on every call.
pub struct CachedSortAdapter {
    base: SharedProvider,
    key_func: Option<ProviderKeyFn>,
    cache: RefCell<WeakKeyCache<SortKey>>,
}

impl CachedSortAdapter {
    pub fn new(base: SharedProvider) -> Self {
        CachedSortAdapter {
            base,
            key_func: None,
            cache: RefCell::new(WeakKeyCache::new()),
        }
    }

    pub fn with_key_func(base: SharedProvider, key_func: ProviderKeyFn) -> Self {
        CachedSortAdapter {
            key_func: Some(key_func),
            ..Self::new(base)
        }
    }

    fn compute(&self, item: &dyn Item) -> SortKey {
        if let Some(key_func) = &self.key_func {
            return key_func(item, self.base.as_ref()).normalize();
        }
        match self.base.as_sort_key_provider() {
            Some(provider) => provider.sort_key(item),
            None => SortKey::casefolded(&self.base.evaluate(item)),
        }
    }
}

impl fmt::Debug for CachedSortAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedSortAdapter")
            .field("base", &self.base)
            .field("key_func", &self.key_func.is_some())
            .field("cached", &self.cache.borrow().len())
            .finish()
    }
}

impl ValueProvider for CachedSortAdapter {
    fn evaluate(&self, item: &dyn Item) -> String {
        self.base.evaluate(item)
    }

    fn as_sort_key_provider(&self) -> Option<&dyn SortKeyProvider> {
        Some(self)
    }

    fn as_invalidate(&self) -> Option<&dyn Invalidate> {
        Some(self)
    }
}

impl SortKeyProvider for CachedSortAdapter {
    fn sort_key(&self, item: &dyn Item) -> SortKey {
        let Some(anchor) = item.anchor() else {
            return self.compute(item);
        };
        if let Some(key) = self.cache.borrow().get(anchor) {
            return key.clone();
        }
        let key = self.compute(item);
        self.cache.borrow_mut().insert(anchor, key.clone());
        key
    }
}

impl Invalidate for CachedSortAdapter {
    fn invalidate(&self, item: Option<&dyn Item>) {
        match item {
            None => self.cache.borrow_mut().clear(),
            Some(item) => {
                if let Some(anchor) = item.anchor() {
                    self.cache.borrow_mut().remove(anchor);
                }
            }
        }
        if let Some(base) = self.base.as_invalidate() {
            base.invalidate(item);
        }
    }
}

/// Inverts the base order.
///
/// Structured (tuple) keys pass through untouched, since they already encode
/// their own grouping; flat keys are reversed. Without a base sort key the
/// evaluated text is reversed.
#[derive(Debug, Clone)]
pub struct ReverseAdapter {
    base: SharedProvider,
}

impl ReverseAdapter {
    pub fn new(base: SharedProvider) -> Self {
        ReverseAdapter { base }
    }
}

delegate_value_provider!(ReverseAdapter);

impl SortKeyProvider for ReverseAdapter {
    fn sort_key(&self, item: &dyn Item) -> SortKey {
        let key = match self.base.as_sort_key_provider() {
            Some(provider) => provider.sort_key(item),
            None => SortKey::from(self.base.evaluate(item)),
        };
        if key.is_tuple() {
            key
        } else {
            key.reversed()
        }
    }
}
