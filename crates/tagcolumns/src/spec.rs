//! Persisted column specifications.
//!
//! A [`ColumnSpec`] is the flat, serializable description of a user column.
//! Loading is lenient: a field with a missing, null or malformed value takes
//! its default instead of failing the whole entry, so specs written by newer
//! versions still load.
//!
//! | Field             | Default                  |
//! |-------------------|--------------------------|
//! | `kind`            | `field`                  |
//! | `align`           | `LEFT`                   |
//! | `always_visible`  | `false`                  |
//! | `add_to`          | `FILE_VIEW,ALBUM_VIEW`   |
//! | `width`           | none                     |
//! | `transform`       | none                     |
//! | `sorting_adapter` | none                     |

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::rc::Rc;

use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};

use crate::column::{Align, Column};
use crate::error::Result;
use crate::factory;
use crate::registry::ViewId;
use crate::script::ScriptEvaluator;
use crate::script_provider::ScriptCacheConfig;

/// `add_to` value selecting both default views.
pub const DEFAULT_ADD_TO: &str = "FILE_VIEW,ALBUM_VIEW";

/// How a column computes its value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// A field reference such as `title` or `~bitrate`.
    #[default]
    Field,
    /// A script expression.
    Script,
    /// A field passed through a [`TransformName`].
    Transform,
}

impl ColumnKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ColumnKind::Field => "field",
            ColumnKind::Script => "script",
            ColumnKind::Transform => "transform",
        }
    }

    /// Parses a persisted name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "field" => Some(ColumnKind::Field),
            "script" => Some(ColumnKind::Script),
            "transform" => Some(ColumnKind::Transform),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// String transforms available to transform columns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformName {
    Upper,
    Lower,
    Title,
    /// Trims surrounding whitespace. Used when a transform column names none.
    #[default]
    Strip,
    /// Wraps non-empty values in square brackets.
    Brackets,
}

impl TransformName {
    pub const ALL: [TransformName; 5] = [
        TransformName::Upper,
        TransformName::Lower,
        TransformName::Title,
        TransformName::Strip,
        TransformName::Brackets,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TransformName::Upper => "upper",
            TransformName::Lower => "lower",
            TransformName::Title => "title",
            TransformName::Strip => "strip",
            TransformName::Brackets => "brackets",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    /// Applies the transform.
    pub fn apply(self, value: &str) -> String {
        match self {
            TransformName::Upper => value.to_uppercase(),
            TransformName::Lower => value.to_lowercase(),
            TransformName::Title => title_case(value),
            TransformName::Strip => value.trim().to_string(),
            TransformName::Brackets if value.is_empty() => String::new(),
            TransformName::Brackets => format!("[{value}]"),
        }
    }
}

fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut in_word = false;
    for c in value.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

/// User-selectable sort adapters.
///
/// Persisted under their adapter type names; the default is stored as `""`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortingAdapterName {
    /// Sort by the column's own sort type.
    #[default]
    Default,
    Casefold,
    CasefoldDescending,
    Numeric,
    NumericDescending,
    Natural,
    NaturalDescending,
    Length,
    ArticleInsensitive,
    NullsLast,
    NullsFirst,
}

impl SortingAdapterName {
    pub const ALL: [SortingAdapterName; 11] = [
        SortingAdapterName::Default,
        SortingAdapterName::Casefold,
        SortingAdapterName::CasefoldDescending,
        SortingAdapterName::Numeric,
        SortingAdapterName::NumericDescending,
        SortingAdapterName::Natural,
        SortingAdapterName::NaturalDescending,
        SortingAdapterName::Length,
        SortingAdapterName::ArticleInsensitive,
        SortingAdapterName::NullsLast,
        SortingAdapterName::NullsFirst,
    ];

    /// Persisted identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            SortingAdapterName::Default => "",
            SortingAdapterName::Casefold => "CasefoldSortAdapter",
            SortingAdapterName::CasefoldDescending => "DescendingCasefoldSortAdapter",
            SortingAdapterName::Numeric => "NumericSortAdapter",
            SortingAdapterName::NumericDescending => "DescendingNumericSortAdapter",
            SortingAdapterName::Natural => "NaturalSortAdapter",
            SortingAdapterName::NaturalDescending => "DescendingNaturalSortAdapter",
            SortingAdapterName::Length => "LengthSortAdapter",
            SortingAdapterName::ArticleInsensitive => "ArticleInsensitiveAdapter",
            SortingAdapterName::NullsLast => "NullsLastAdapter",
            SortingAdapterName::NullsFirst => "NullsFirstAdapter",
        }
    }

    /// Label shown to users.
    pub fn label(self) -> &'static str {
        match self {
            SortingAdapterName::Default => "Default",
            SortingAdapterName::Casefold => "Case Insensitive",
            SortingAdapterName::CasefoldDescending => "Case Insensitive - Descending",
            SortingAdapterName::Numeric => "Numeric",
            SortingAdapterName::NumericDescending => "Numeric - Descending",
            SortingAdapterName::Natural => "Natural",
            SortingAdapterName::NaturalDescending => "Natural - Descending",
            SortingAdapterName::Length => "By Value Length",
            SortingAdapterName::ArticleInsensitive => "Article Insensitive",
            SortingAdapterName::NullsLast => "Empty Values Last",
            SortingAdapterName::NullsFirst => "Empty Values First",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|a| a.as_str() == name)
    }

    /// Options for a picker: `Default` first, the rest by label.
    pub fn options() -> Vec<SortingAdapterName> {
        let mut rest: Vec<_> = Self::ALL[1..].to_vec();
        rest.sort_by_key(|adapter| adapter.label());
        let mut options = vec![SortingAdapterName::Default];
        options.extend(rest);
        options
    }
}

impl Serialize for SortingAdapterName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Parses a comma separated `add_to` value into known views.
///
/// Tokens are matched case-insensitively; unknown ones are dropped. A blank
/// value selects both default views. The result is in canonical order.
pub fn parse_add_to(add_to: &str) -> Vec<ViewId> {
    let raw = if add_to.trim().is_empty() {
        DEFAULT_ADD_TO
    } else {
        add_to
    };
    let tokens: HashSet<String> = raw
        .split(',')
        .map(|token| token.trim().to_ascii_uppercase())
        .filter(|token| !token.is_empty())
        .collect();
    ViewId::defaults()
        .into_iter()
        .filter(|view| tokens.contains(view.as_str()))
        .collect()
}

/// Formats view tokens: known views in canonical order, then unknown tokens
/// alphabetically.
pub fn format_add_to<I, S>(views: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let tokens: BTreeSet<String> = views
        .into_iter()
        .map(|view| view.as_ref().trim().to_ascii_uppercase())
        .filter(|view| !view.is_empty())
        .collect();
    let known = ViewId::defaults();
    let mut ordered: Vec<&str> = known
        .iter()
        .map(ViewId::as_str)
        .filter(|view| tokens.contains(*view))
        .collect();
    ordered.extend(
        tokens
            .iter()
            .map(String::as_str)
            .filter(|token| !known.iter().any(|view| view.as_str() == *token)),
    );
    ordered.join(",")
}

/// Returns `"<base> (N)"` with the smallest `N >= 1` not in `existing`.
pub fn next_incremented_title(base: &str, existing: &HashSet<String>) -> String {
    (1..)
        .map(|n| format!("{base} ({n})"))
        .find(|candidate| !existing.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Serializable description of a user column.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawColumnSpec")]
pub struct ColumnSpec {
    pub title: String,
    /// Unique identifier used for registration.
    pub key: String,
    pub kind: ColumnKind,
    /// Field key for field and transform columns, script text for scripts.
    pub expression: String,
    pub width: Option<i64>,
    pub align: Align,
    pub always_visible: bool,
    /// Comma separated view identifiers.
    pub add_to: String,
    pub transform: Option<TransformName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sorting_adapter: Option<SortingAdapterName>,
}

impl ColumnSpec {
    /// Creates a spec with default presentation settings.
    pub fn new(
        title: impl Into<String>,
        key: impl Into<String>,
        kind: ColumnKind,
        expression: impl Into<String>,
    ) -> Self {
        ColumnSpec {
            title: title.into(),
            key: key.into(),
            kind,
            expression: expression.into(),
            width: None,
            align: Align::Left,
            always_visible: false,
            add_to: DEFAULT_ADD_TO.to_string(),
            transform: None,
            sorting_adapter: None,
        }
    }

    /// Views this spec registers into.
    pub fn views(&self) -> Vec<ViewId> {
        parse_add_to(&self.add_to)
    }

    /// Returns `true` if the spec has the fields required to build a column.
    pub fn is_loadable(&self) -> bool {
        !self.key.trim().is_empty() && !self.expression.trim().is_empty()
    }

    /// Encodes as a JSON mapping.
    pub fn to_value(&self) -> serde_json::Value {
        // a struct of strings, numbers and options always encodes
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Decodes a JSON mapping leniently. Fails only for non-mappings.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value::<RawColumnSpec>(value)?.into())
    }

    /// Builds the column with the default script cache configuration.
    pub fn build_column(&self, evaluator: Rc<dyn ScriptEvaluator>) -> Result<Column> {
        self.build_column_with(evaluator, ScriptCacheConfig::default())
    }

    /// Builds the column.
    ///
    /// Field columns look up `expression` but register under `key`. The
    /// sorting adapter, when set, wraps the built provider.
    pub fn build_column_with(
        &self,
        evaluator: Rc<dyn ScriptEvaluator>,
        config: ScriptCacheConfig,
    ) -> Result<Column> {
        factory::build_from_spec(self, evaluator, config)
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Other(IgnoredAny),
}

impl Scalar {
    fn text(self) -> Option<String> {
        match self {
            Scalar::Text(s) => Some(s),
            Scalar::Int(n) => Some(n.to_string()),
            Scalar::Float(n) => Some(n.to_string()),
            Scalar::Bool(b) => Some(b.to_string()),
            Scalar::Other(_) => None,
        }
    }

    fn int(self) -> Option<i64> {
        match self {
            Scalar::Int(n) => Some(n),
            Scalar::Float(n) if n.is_finite() => Some(n as i64),
            Scalar::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn boolean(self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(b),
            Scalar::Int(n) => Some(n != 0),
            Scalar::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(true),
                "false" | "0" | "no" | "" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawColumnSpec {
    title: Option<Scalar>,
    key: Option<Scalar>,
    kind: Option<Scalar>,
    expression: Option<Scalar>,
    width: Option<Scalar>,
    align: Option<Scalar>,
    always_visible: Option<Scalar>,
    add_to: Option<Scalar>,
    transform: Option<Scalar>,
    sorting_adapter: Option<Scalar>,
}

impl From<RawColumnSpec> for ColumnSpec {
    fn from(raw: RawColumnSpec) -> Self {
        let text = |field: Option<Scalar>| field.and_then(Scalar::text);
        let add_to = text(raw.add_to)
            .filter(|add_to| !add_to.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ADD_TO.to_string());
        ColumnSpec {
            title: text(raw.title).unwrap_or_default(),
            key: text(raw.key).unwrap_or_default(),
            kind: text(raw.kind)
                .and_then(|kind| ColumnKind::parse(&kind))
                .unwrap_or_default(),
            expression: text(raw.expression).unwrap_or_default(),
            width: raw.width.and_then(Scalar::int),
            align: text(raw.align)
                .and_then(|align| Align::parse(&align))
                .unwrap_or_default(),
            always_visible: raw
                .always_visible
                .and_then(Scalar::boolean)
                .unwrap_or(false),
            add_to,
            transform: text(raw.transform).and_then(|t| TransformName::parse(&t)),
            sorting_adapter: text(raw.sorting_adapter).and_then(|a| SortingAdapterName::parse(&a)),
        }
    }
}
