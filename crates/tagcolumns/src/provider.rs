//! Value provider strategies.
//!
//! A provider turns a row [`Item`] into the string shown in a cell. The
//! contract is that [`ValueProvider::evaluate`] never fails: lookup errors,
//! missing capabilities and collaborator failures all become `""` (logged at
//! debug level), so one broken column cannot blank a whole row.
//!
//! Optional capabilities are separate traits that a provider opts into and
//! advertises through the `as_*` accessors:
//!
//! - [`SortKeyProvider`]: produces a [`SortKey`] for ordering rows.
//! - [`Invalidate`]: drops cached values.

use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::fields::normalize_field_key;
use crate::item::Item;
use crate::sort_key::SortKey;

/// Shared handle to a provider, as held by columns and adapters.
pub type SharedProvider = Rc<dyn ValueProvider>;

/// Computes the display value of a column for an item.
pub trait ValueProvider: fmt::Debug {
    /// Returns the display value; never fails, `""` on any error.
    fn evaluate(&self, item: &dyn Item) -> String;

    /// Returns this provider as a sort key provider, if it is one.
    fn as_sort_key_provider(&self) -> Option<&dyn SortKeyProvider> {
        None
    }

    /// Returns this provider's cache invalidation handle, if it caches.
    fn as_invalidate(&self) -> Option<&dyn Invalidate> {
        None
    }
}

/// Provider capability: a comparable key for ordering rows.
pub trait SortKeyProvider: ValueProvider {
    /// Returns the sort key of an item.
    fn sort_key(&self, item: &dyn Item) -> SortKey;
}

/// Provider capability: explicit cache invalidation.
pub trait Invalidate {
    /// Drops the cached value of one item, or of every item for `None`.
    fn invalidate(&self, item: Option<&dyn Item>);
}

/// Reads a field through [`Item::column`].
///
/// The key is normalized on construction, so `%_bitrate%`, `_bitrate`,
/// `~bitrate` and `bitrate` all query `~bitrate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldReferenceProvider {
    key: String,
}

impl FieldReferenceProvider {
    /// Creates a provider for a field reference.
    pub fn new(key: &str) -> Self {
        FieldReferenceProvider {
            key: normalize_field_key(key),
        }
    }

    /// Returns the normalized key this provider queries.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl ValueProvider for FieldReferenceProvider {
    fn evaluate(&self, item: &dyn Item) -> String {
        match item.column(&self.key) {
            Ok(value) => value,
            Err(err) => {
                debug!("field lookup for {:?} failed: {}", self.key, err);
                String::new()
            }
        }
    }
}

type CallableFn = dyn Fn(&dyn Item) -> Result<String, String>;

/// Computes the value with an arbitrary function.
pub struct CallableProvider {
    func: Box<CallableFn>,
}

impl CallableProvider {
    /// Wraps an infallible function; its result is displayed with `Display`.
    pub fn new<F, T>(func: F) -> Self
    where
        F: Fn(&dyn Item) -> T + 'static,
        T: fmt::Display,
    {
        CallableProvider {
            func: Box::new(move |item: &dyn Item| -> Result<String, String> {
                Ok(func(item).to_string())
            }),
        }
    }

    /// Wraps a fallible function; errors evaluate to `""`.
    pub fn fallible<F, T, E>(func: F) -> Self
    where
        F: Fn(&dyn Item) -> Result<T, E> + 'static,
        T: fmt::Display,
        E: fmt::Display,
    {
        CallableProvider {
            func: Box::new(move |item: &dyn Item| {
                func(item)
                    .map(|value| value.to_string())
                    .map_err(|err| err.to_string())
            }),
        }
    }
}

impl fmt::Debug for CallableProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallableProvider").finish_non_exhaustive()
    }
}

impl ValueProvider for CallableProvider {
    fn evaluate(&self, item: &dyn Item) -> String {
        (self.func)(item).unwrap_or_else(|err| {
            debug!("callable provider failed: {}", err);
            String::new()
        })
    }
}

type TransformFn = dyn Fn(&str) -> Result<String, String>;

/// Applies a string transform to the value of a base provider.
pub struct TransformProvider {
    base: SharedProvider,
    transform: Box<TransformFn>,
}

impl TransformProvider {
    /// Wraps `base` with an infallible transform.
    pub fn new<F>(base: SharedProvider, transform: F) -> Self
    where
        F: Fn(&str) -> String + 'static,
    {
        TransformProvider {
            base,
            transform: Box::new(move |value: &str| -> Result<String, String> { Ok(transform(value)) }),
        }
    }

    /// Wraps `base` with a fallible transform; errors evaluate to `""`.
    pub fn fallible<F, E>(base: SharedProvider, transform: F) -> Self
    where
        F: Fn(&str) -> Result<String, E> + 'static,
        E: fmt::Display,
    {
        TransformProvider {
            base,
            transform: Box::new(move |value: &str| transform(value).map_err(|err| err.to_string())),
        }
    }

    /// Returns the wrapped provider.
    pub fn base(&self) -> &SharedProvider {
        &self.base
    }
}

impl fmt::Debug for TransformProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformProvider")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl ValueProvider for TransformProvider {
    fn evaluate(&self, item: &dyn Item) -> String {
        let value = self.base.evaluate(item);
        (self.transform)(&value).unwrap_or_else(|err| {
            debug!("transform failed on {:?}: {}", value, err);
            String::new()
        })
    }

    fn as_invalidate(&self) -> Option<&dyn Invalidate> {
        self.base.as_invalidate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::LookupError;
    use std::collections::HashMap;

    struct Row {
        values: HashMap<String, String>,
    }

    impl Row {
        fn new(pairs: &[(&str, &str)]) -> Self {
            Row {
                values: pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            }
        }
    }

    impl Item for Row {
        fn column(&self, key: &str) -> Result<String, LookupError> {
            self.values
                .get(key)
                .cloned()
                .ok_or_else(|| LookupError::UnknownKey(key.to_string()))
        }
    }

    struct NoColumns;

    impl Item for NoColumns {}

    #[test]
    fn field_provider_reads_column() {
        let row = Row::new(&[("artist", "Artist A")]);
        assert_eq!(FieldReferenceProvider::new("artist").evaluate(&row), "Artist A");
        assert_eq!(FieldReferenceProvider::new("%artist%").evaluate(&row), "Artist A");
    }

    #[test]
    fn field_provider_hidden_spellings_agree() {
        let row = Row::new(&[("~bitrate", "320 kbps")]);
        let values: Vec<String> = ["%_bitrate%", "_bitrate", "~bitrate", "bitrate"]
            .iter()
            .map(|raw| FieldReferenceProvider::new(raw).evaluate(&row))
            .collect();
        assert!(values.iter().all(|v| v == "320 kbps"), "{values:?}");
    }

    #[test]
    fn field_provider_missing_key_or_lookup_is_empty() {
        let row = Row::new(&[]);
        assert_eq!(FieldReferenceProvider::new("title").evaluate(&row), "");
        assert_eq!(FieldReferenceProvider::new("title").evaluate(&NoColumns), "");
    }

    #[test]
    fn callable_provider_displays_result() {
        let provider = CallableProvider::new(|item: &dyn Item| {
            format!(
                "{} - {}",
                item.column("artist").unwrap_or_default(),
                item.column("title").unwrap_or_default()
            )
        });
        let row = Row::new(&[("artist", "A"), ("title", "T")]);
        assert_eq!(provider.evaluate(&row), "A - T");

        let numeric = CallableProvider::new(|_: &dyn Item| 42);
        assert_eq!(numeric.evaluate(&row), "42");
    }

    #[test]
    fn callable_provider_errors_become_empty() {
        let provider =
            CallableProvider::fallible(|_: &dyn Item| "x".parse::<i32>().map(|n| n * 2));
        assert_eq!(provider.evaluate(&NoColumns), "");
    }

    #[test]
    fn transform_provider_applies_function() {
        let base: SharedProvider = Rc::new(FieldReferenceProvider::new("title"));
        let upper = TransformProvider::new(base, |s| s.to_uppercase());
        assert_eq!(upper.evaluate(&Row::new(&[("title", "Hello")])), "HELLO");
        assert_eq!(upper.evaluate(&NoColumns), "");
    }

    #[test]
    fn transform_provider_errors_become_empty() {
        let base: SharedProvider = Rc::new(FieldReferenceProvider::new("n"));
        let doubled = TransformProvider::fallible(base, |s| {
            s.parse::<i64>().map(|n| (n * 2).to_string())
        });
        assert_eq!(doubled.evaluate(&Row::new(&[("n", "21")])), "42");
        assert_eq!(doubled.evaluate(&Row::new(&[("n", "abc")])), "");
    }

    #[test]
    fn plain_providers_advertise_no_capabilities() {
        let provider = FieldReferenceProvider::new("title");
        assert!(provider.as_sort_key_provider().is_none());
        assert!(provider.as_invalidate().is_none());
    }
}
