//! Tagcolumns - configurable columns for item views.
//!
//! A column turns a row item (a file, a track, an album) into the text shown
//! in its cell and into a key the view sorts rows by. Tagcolumns provides the
//! pieces to build such columns and to let users define their own:
//!
//! - Value providers: field lookups, closures, transforms and cached scripts
//! - Sort adapters producing totally ordered [`SortKey`]s, so mixed numeric
//!   and textual data sorts deterministically
//! - A [`ColumnRegistry`] holding the columns of each view
//! - Persisted, leniently loaded [`ColumnSpec`]s with validation
//!
//! # Quick Start
//!
//! ```rust
//! use std::rc::Rc;
//! use tagcolumns::{
//!     ColumnKind, ColumnRegistry, ColumnSpec, Item, ItemAnchor, LookupError, Metadata,
//!     PercentTemplate, ViewId,
//! };
//!
//! struct Track {
//!     anchor: ItemAnchor,
//!     tags: Metadata,
//! }
//!
//! impl Item for Track {
//!     fn column(&self, key: &str) -> Result<String, LookupError> {
//!         Ok(self.tags.get(key).unwrap_or_default())
//!     }
//!     fn metadata(&self) -> Option<&Metadata> {
//!         Some(&self.tags)
//!     }
//!     fn anchor(&self) -> Option<&ItemAnchor> {
//!         Some(&self.anchor)
//!     }
//! }
//!
//! let spec = ColumnSpec::new("Who", "who", ColumnKind::Script, "%artist% (%date%)");
//! let column = spec.build_column(Rc::new(PercentTemplate::new())).unwrap();
//!
//! let mut registry = ColumnRegistry::with_default_views();
//! registry.register(column, &spec.views()).unwrap();
//!
//! let track = Track {
//!     anchor: ItemAnchor::new(),
//!     tags: [("artist", "Nina Simone"), ("date", "1965")].into_iter().collect(),
//! };
//! let column = registry.get("who").unwrap();
//! assert_eq!(column.value(&track), "Nina Simone (1965)");
//! assert_eq!(registry.view(&ViewId::ALBUM).unwrap().len(), 1);
//! ```
//!
//! # Sort Keys
//!
//! Every adapter emits keys of one shape for all rows. Data that mixes kinds
//! is partitioned with a leading category, e.g. the numeric adapter yields
//! `(0, number)` for numbers and `(1, natural text)` for the rest:
//!
//! ```text
//! ["10", "abc", "2", "", "7a", "-3.5"]  =>  -3.5, 2, 10, "", 7a, abc
//! ```
//!
//! # Caching
//!
//! Script columns cache results per item. Items carrying an [`ItemAnchor`]
//! are cached weakly and drop out once the anchor is gone. Items reporting an
//! [`Item::row_id`] use a bounded FIFO cache; items with neither are not
//! cached. Only fast, non-empty results are cached; see
//! [`ScriptCacheConfig`].

pub mod adapters;
mod cache;
pub mod collate;
mod column;
mod error;
pub mod factory;
pub mod fields;
mod item;
mod ordering;
pub mod parsers;
mod provider;
mod registry;
mod resolve;
mod script;
mod script_provider;
mod sort_key;
mod spec;
mod storage;
pub mod validation;

// Re-export public API
pub use cache::{IdentityFifoCache, WeakKeyCache};
pub use column::{Align, Column, ColumnBuilder, Columns, SortKeyFn, SortType};
pub use error::{ColumnsError, Result};
pub use item::{Item, ItemAnchor, LookupError, Metadata, WeakAnchor, MULTI_VALUE_JOINER};
pub use ordering::{compare_by_orderings, sort_rows, sorted_positions, Dir, OrderBy};
pub use provider::{
    CallableProvider, FieldReferenceProvider, Invalidate, SharedProvider, SortKeyProvider,
    TransformProvider, ValueProvider,
};
pub use registry::{ColumnRegistry, ViewId};
pub use resolve::{
    ContextVariableResolver, ObjectColumnResolver, ResolveError, ResolveRequest,
    ScriptEvaluatorResolver, ValueResolver, ValueResolverChain,
};
pub use script::{PercentTemplate, ScriptContext, ScriptError, ScriptEvaluator};
pub use script_provider::{
    ChainedValueProvider, ScriptCacheConfig, DEFAULT_CACHE_SIZE, DEFAULT_MAX_RUNTIME_MS,
    DEFAULT_MIN_ID_CACHE_SIZE,
};
pub use sort_key::SortKey;
pub use spec::{
    format_add_to, next_incremented_title, parse_add_to, ColumnKind, ColumnSpec,
    SortingAdapterName, TransformName, DEFAULT_ADD_TO,
};
pub use storage::{ColumnManager, SpecStore, StoreFormat};
