//! Column factory.
//!
//! The `make_*` functions return a [`ColumnBuilder`] with the provider and
//! sort settings already wired, so callers only add presentation details:
//!
//! ```
//! use tagcolumns::factory::make_field_column;
//!
//! let column = make_field_column("Artist", "artist").width(200).build().unwrap();
//! assert_eq!(column.key, "artist");
//! ```
//!
//! The sort type is inferred from the provider unless given: providers with
//! a sort key sort by [`SortType::SortKey`], everything else by
//! [`SortType::Text`]. An explicit `SortKey` on a provider without sort keys
//! is downgraded to `Text`.

use std::rc::Rc;

use log::debug;

use crate::adapters::{
    ArticleInsensitiveAdapter, CasefoldSortAdapter, DescendingCasefoldSortAdapter,
    DescendingNaturalSortAdapter, DescendingNumericSortAdapter, LengthSortAdapter, NaturalSortAdapter,
    NullsFirstAdapter, NullsLastAdapter, NumberParser, NumericSortAdapter,
};
use crate::column::{Column, ColumnBuilder, SortKeyFn, SortType};
use crate::error::Result;
use crate::item::Item;
use crate::parsers::{parse_bitrate, parse_file_size, parse_time_format};
use crate::provider::{CallableProvider, FieldReferenceProvider, SharedProvider, TransformProvider};
use crate::script::ScriptEvaluator;
use crate::script_provider::{ChainedValueProvider, ScriptCacheConfig};
use crate::sort_key::SortKey;
use crate::spec::{ColumnKind, ColumnSpec, SortingAdapterName};

/// Resolves the sort type of a column over `provider`.
pub fn infer_sort_type(provider: &SharedProvider, explicit: Option<SortType>) -> SortType {
    let has_sort_key = provider.as_sort_key_provider().is_some();
    match explicit {
        Some(SortType::SortKey) if !has_sort_key => {
            debug!("{:?} has no sort key, sorting as text", provider);
            SortType::Text
        }
        Some(sort_type) => sort_type,
        None if has_sort_key => SortType::SortKey,
        None => SortType::Text,
    }
}

/// Binds the provider's sort key method as a column sort function.
fn bind_sort_key(provider: &SharedProvider) -> Option<SortKeyFn> {
    provider.as_sort_key_provider()?;
    let provider = Rc::clone(provider);
    let sortkey: SortKeyFn = Rc::new(move |item: &dyn Item| match provider.as_sort_key_provider() {
        Some(sorter) => sorter.sort_key(item),
        None => SortKey::collated(&provider.evaluate(item)),
    });
    Some(sortkey)
}

/// Column over an arbitrary provider.
pub fn make_provider_column(
    title: impl Into<String>,
    key: impl Into<String>,
    provider: SharedProvider,
    sort_type: Option<SortType>,
) -> ColumnBuilder {
    let sort_type = infer_sort_type(&provider, sort_type);
    let mut builder = Column::builder(title, key).sort_type(sort_type);
    if sort_type == SortType::SortKey {
        if let Some(sortkey) = bind_sort_key(&provider) {
            builder = builder.sortkey(sortkey);
        }
    }
    builder.provider(provider)
}

/// Column showing the field `key`.
pub fn make_field_column(title: impl Into<String>, key: &str) -> ColumnBuilder {
    let provider: SharedProvider = Rc::new(FieldReferenceProvider::new(key));
    make_provider_column(title, key, provider, None)
}

/// Field column sorted numerically with `parser`, numbers first.
pub fn make_numeric_field_column<F>(title: impl Into<String>, key: &str, parser: F) -> ColumnBuilder
where
    F: Fn(&str) -> Option<f64> + 'static,
{
    let parser: NumberParser = Rc::new(parser);
    let base: SharedProvider = Rc::new(FieldReferenceProvider::new(key));
    let provider: SharedProvider = Rc::new(NumericSortAdapter::with_parser(base, parser));
    make_provider_column(title, key, provider, Some(SortType::SortKey))
}

/// Cached script column.
///
/// `max_runtime_ms` and `cache_size` override the defaults of
/// [`ScriptCacheConfig`] when given.
pub fn make_script_column(
    title: impl Into<String>,
    key: impl Into<String>,
    script: impl Into<String>,
    evaluator: Rc<dyn ScriptEvaluator>,
    max_runtime_ms: Option<i64>,
    cache_size: Option<usize>,
) -> ColumnBuilder {
    let mut config = ScriptCacheConfig::default();
    if let Some(ms) = max_runtime_ms {
        config = config.max_runtime_ms(ms);
    }
    if let Some(size) = cache_size {
        config = config.cache_size(size);
    }
    make_script_column_with(title, key, script, evaluator, config)
}

/// Cached script column with an explicit configuration.
pub fn make_script_column_with(
    title: impl Into<String>,
    key: impl Into<String>,
    script: impl Into<String>,
    evaluator: Rc<dyn ScriptEvaluator>,
    config: ScriptCacheConfig,
) -> ColumnBuilder {
    let provider: SharedProvider = Rc::new(ChainedValueProvider::with_config(script, evaluator, config));
    make_provider_column(title, key, provider, Some(SortType::Text))
}

/// Column computed by a function of the item.
pub fn make_callable_column<F, T>(
    title: impl Into<String>,
    key: impl Into<String>,
    func: F,
    sort_type: Option<SortType>,
) -> ColumnBuilder
where
    F: Fn(&dyn Item) -> T + 'static,
    T: std::fmt::Display,
{
    let provider: SharedProvider = Rc::new(CallableProvider::new(func));
    make_provider_column(title, key, provider, sort_type)
}

/// Column applying `transform` to the value of `base`.
pub fn make_transformed_column<F>(
    title: impl Into<String>,
    key: impl Into<String>,
    base: SharedProvider,
    transform: F,
) -> ColumnBuilder
where
    F: Fn(&str) -> String + 'static,
{
    let provider: SharedProvider = Rc::new(TransformProvider::new(base, transform));
    make_provider_column(title, key, provider, Some(SortType::Text))
}

/// Wraps `base` in the named sort adapter. `Default` returns `base` as is.
pub fn apply_sorting_adapter(base: SharedProvider, adapter: SortingAdapterName) -> SharedProvider {
    match adapter {
        SortingAdapterName::Default => base,
        SortingAdapterName::Casefold => Rc::new(CasefoldSortAdapter::new(base)),
        SortingAdapterName::CasefoldDescending => Rc::new(DescendingCasefoldSortAdapter::new(base)),
        SortingAdapterName::Numeric => Rc::new(NumericSortAdapter::new(base)),
        SortingAdapterName::NumericDescending => Rc::new(DescendingNumericSortAdapter::new(base)),
        SortingAdapterName::Natural => Rc::new(NaturalSortAdapter::new(base)),
        SortingAdapterName::NaturalDescending => Rc::new(DescendingNaturalSortAdapter::new(base)),
        SortingAdapterName::Length => Rc::new(LengthSortAdapter::new(base)),
        SortingAdapterName::ArticleInsensitive => Rc::new(ArticleInsensitiveAdapter::new(base)),
        SortingAdapterName::NullsLast => Rc::new(NullsLastAdapter::new(base)),
        SortingAdapterName::NullsFirst => Rc::new(NullsFirstAdapter::new(base)),
    }
}

pub(crate) fn build_from_spec(
    spec: &ColumnSpec,
    evaluator: Rc<dyn ScriptEvaluator>,
    config: ScriptCacheConfig,
) -> Result<Column> {
    let base: SharedProvider = match spec.kind {
        ColumnKind::Field => Rc::new(FieldReferenceProvider::new(&spec.expression)),
        ColumnKind::Script => Rc::new(ChainedValueProvider::with_config(
            spec.expression.clone(),
            evaluator,
            config,
        )),
        ColumnKind::Transform => {
            let transform = spec.transform.unwrap_or_default();
            let field: SharedProvider = Rc::new(FieldReferenceProvider::new(&spec.expression));
            Rc::new(TransformProvider::new(field, move |value| transform.apply(value)))
        }
    };
    let (provider, sort_type) = match spec.sorting_adapter {
        Some(adapter) if adapter != SortingAdapterName::Default => {
            (apply_sorting_adapter(base, adapter), None)
        }
        _ if spec.kind == ColumnKind::Field => (base, None),
        _ => (base, Some(SortType::Text)),
    };
    make_provider_column(spec.title.clone(), spec.key.clone(), provider, sort_type)
        .maybe_width(spec.width)
        .align(spec.align)
        .always_visible(spec.always_visible)
        .build()
}

/// The built-in columns, in display order.
pub fn common_columns() -> Result<Vec<Column>> {
    let natural = Some(SortType::Natural);
    let field = |title: &str, key: &str| make_field_column(title, key);
    let natural_field = |title: &str, key: &str| {
        let provider: SharedProvider = Rc::new(FieldReferenceProvider::new(key));
        make_provider_column(title, key, provider, natural)
    };

    let builders = vec![
        natural_field("Title", "title")
            .width(250)
            .always_visible(true)
            .status_icon(true)
            .is_default(true),
        make_numeric_field_column("Length", "~length", parse_time_format)
            .width(50)
            .right()
            .is_default(true),
        field("Artist", "artist").width(200).is_default(true),
        field("Album Artist", "albumartist"),
        field("Composer", "composer"),
        natural_field("Album", "album"),
        natural_field("Disc Subtitle", "discsubtitle"),
        natural_field("Track No.", "tracknumber").right(),
        natural_field("Disc No.", "discnumber").right(),
        natural_field("Catalog No.", "catalognumber"),
        field("Barcode", "barcode"),
        field("Media", "media"),
        make_numeric_field_column("Size", "~filesize", parse_file_size).right(),
        field("File Type", "~format").width(120),
        make_numeric_field_column("Bitrate", "~bitrate", parse_bitrate)
            .width(80)
            .right(),
        field("Genre", "genre"),
        field("Date", "date"),
        field("Original Release Date", "originaldate"),
        field("Release Date", "releasedate"),
        field("Cover", "covercount"),
        field("Cover Dimensions", "coverdimensions"),
    ];
    builders.into_iter().map(ColumnBuilder::build).collect()
}
