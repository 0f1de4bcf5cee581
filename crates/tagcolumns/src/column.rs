//! Columns and per-view column collections.
//!
//! A [`Column`] carries display metadata (title, width, alignment), an
//! optional value provider and the rule used to sort rows by it. Views hold
//! their columns in a [`Columns`] collection: an ordered list with lookup by
//! key. Columns are shared between views through `Rc`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::{ColumnsError, Result};
use crate::item::Item;
use crate::provider::SharedProvider;
use crate::sort_key::SortKey;

/// Text alignment of a column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Align {
    #[default]
    Left,
    Right,
}

impl Align {
    /// Returns the persisted name (`"LEFT"`, `"RIGHT"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Align::Left => "LEFT",
            Align::Right => "RIGHT",
        }
    }

    /// Parses a persisted name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "LEFT" => Some(Align::Left),
            "RIGHT" => Some(Align::Right),
            _ => None,
        }
    }
}

impl fmt::Display for Align {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How rows are ordered by a column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SortType {
    /// Caseless collation of the displayed value.
    #[default]
    Text,
    /// Natural (alphanumeric) order of the displayed value.
    Natural,
    /// The column's sort key function.
    SortKey,
}

/// Sort key function bound to a column.
pub type SortKeyFn = Rc<dyn Fn(&dyn Item) -> SortKey>;

/// A view column.
#[derive(Clone)]
pub struct Column {
    /// Header title.
    pub title: String,
    /// Identifier, unique within a view.
    pub key: String,
    /// Fixed width; `None` uses the view default.
    pub width: Option<u32>,
    /// Text alignment.
    pub align: Align,
    /// The column cannot be hidden.
    pub always_visible: bool,
    /// The column shows the row status icon.
    pub status_icon: bool,
    /// Shown in a fresh view configuration.
    pub is_default: bool,
    provider: Option<SharedProvider>,
    sort_type: SortType,
    sortkey: Option<SortKeyFn>,
}

impl Column {
    /// Starts building a column.
    pub fn builder(title: impl Into<String>, key: impl Into<String>) -> ColumnBuilder {
        ColumnBuilder {
            title: title.into(),
            key: key.into(),
            ..ColumnBuilder::default()
        }
    }

    /// Returns the value provider, if any.
    pub fn provider(&self) -> Option<&SharedProvider> {
        self.provider.as_ref()
    }

    pub fn sort_type(&self) -> SortType {
        self.sort_type
    }

    /// Returns the bound sort key function (only for [`SortType::SortKey`]).
    pub fn sortkey(&self) -> Option<&SortKeyFn> {
        self.sortkey.as_ref()
    }

    /// Returns the displayed value of an item.
    ///
    /// Columns without a provider read `item.column(key)`. Never fails.
    pub fn value(&self, item: &dyn Item) -> String {
        match &self.provider {
            Some(provider) => provider.evaluate(item),
            None => item.column(&self.key).unwrap_or_default(),
        }
    }

    /// Returns the key rows are sorted by.
    pub fn sort_key(&self, item: &dyn Item) -> SortKey {
        match (&self.sort_type, &self.sortkey) {
            (SortType::SortKey, Some(sortkey)) => sortkey(item),
            (SortType::Natural, _) => SortKey::natural(&self.value(item)),
            _ => SortKey::collated(&self.value(item)),
        }
    }

    /// Drops cached values of one item, or all items for `None`.
    ///
    /// Does nothing when the provider keeps no cache.
    pub fn invalidate_cache(&self, item: Option<&dyn Item>) {
        if let Some(cache) = self.provider.as_ref().and_then(|p| p.as_invalidate()) {
            cache.invalidate(item);
        }
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("title", &self.title)
            .field("key", &self.key)
            .field("width", &self.width)
            .field("align", &self.align)
            .field("sort_type", &self.sort_type)
            .field("always_visible", &self.always_visible)
            .field("status_icon", &self.status_icon)
            .field("provider", &self.provider)
            .finish()
    }
}

/// Builder for [`Column`].
#[derive(Default)]
pub struct ColumnBuilder {
    title: String,
    key: String,
    width: Option<u32>,
    align: Align,
    always_visible: bool,
    status_icon: bool,
    is_default: bool,
    provider: Option<SharedProvider>,
    sort_type: SortType,
    sortkey: Option<SortKeyFn>,
}

impl ColumnBuilder {
    pub fn provider(mut self, provider: SharedProvider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Sets the width; zero or negative means "use the view default".
    pub fn width(self, width: i64) -> Self {
        self.maybe_width(Some(width))
    }

    /// Like [`ColumnBuilder::width`], `None` keeps the view default.
    pub fn maybe_width(mut self, width: Option<i64>) -> Self {
        self.width = width
            .filter(|w| *w > 0)
            .and_then(|w| u32::try_from(w).ok());
        self
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    /// Shorthand for `.align(Align::Right)`.
    pub fn right(self) -> Self {
        self.align(Align::Right)
    }

    pub fn always_visible(mut self, always_visible: bool) -> Self {
        self.always_visible = always_visible;
        self
    }

    pub fn status_icon(mut self, status_icon: bool) -> Self {
        self.status_icon = status_icon;
        self
    }

    pub fn is_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }

    pub fn sort_type(mut self, sort_type: SortType) -> Self {
        self.sort_type = sort_type;
        self
    }

    pub fn sortkey(mut self, sortkey: SortKeyFn) -> Self {
        self.sortkey = Some(sortkey);
        self
    }

    /// Builds the column.
    ///
    /// Fails with [`ColumnsError::MissingSortKey`] for [`SortType::SortKey`]
    /// without a sort key function. A sort key function given with any other
    /// sort type is dropped.
    pub fn build(self) -> Result<Column> {
        let sortkey = match self.sort_type {
            SortType::SortKey => Some(self.sortkey.ok_or_else(|| ColumnsError::MissingSortKey {
                key: self.key.clone(),
            })?),
            _ => None,
        };
        Ok(Column {
            title: self.title,
            key: self.key,
            width: self.width,
            align: self.align,
            always_visible: self.always_visible,
            status_icon: self.status_icon,
            is_default: self.is_default,
            provider: self.provider,
            sort_type: self.sort_type,
            sortkey,
        })
    }
}

/// Ordered, key-indexed column collection of one view.
///
/// The key index is rebuilt lazily after mutations. At most one column may
/// be the status icon column.
#[derive(Debug, Default)]
pub struct Columns {
    list: Vec<Rc<Column>>,
    index: RefCell<Option<HashMap<String, usize>>>,
    default_width: Option<u32>,
}

impl Columns {
    /// Creates an empty collection.
    pub fn new(default_width: Option<u32>) -> Self {
        Columns {
            default_width,
            ..Columns::default()
        }
    }

    /// Creates a collection from columns, checking each like [`Columns::push`].
    pub fn from_columns<I>(columns: I, default_width: Option<u32>) -> Result<Self>
    where
        I: IntoIterator<Item = Rc<Column>>,
    {
        let mut collection = Columns::new(default_width);
        for column in columns {
            collection.push(column)?;
        }
        Ok(collection)
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&Rc<Column>> {
        self.list.get(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rc<Column>> + '_ {
        self.list.iter()
    }

    pub fn default_width(&self) -> Option<u32> {
        self.default_width
    }

    /// Width to render the column at `position` with.
    pub fn effective_width(&self, position: usize) -> Option<u32> {
        self.list
            .get(position)
            .and_then(|column| column.width.or(self.default_width))
    }

    /// Appends a column.
    pub fn push(&mut self, column: Rc<Column>) -> Result<()> {
        self.insert(self.list.len(), column)
    }

    /// Inserts a column; `position` past the end appends.
    pub fn insert(&mut self, position: usize, column: Rc<Column>) -> Result<()> {
        self.check_status_icon(&column, None)?;
        let position = position.min(self.list.len());
        self.list.insert(position, column);
        self.mark_dirty();
        Ok(())
    }

    /// Replaces the column at `position`, returning the old one.
    pub fn replace(&mut self, position: usize, column: Rc<Column>) -> Result<Option<Rc<Column>>> {
        if position >= self.list.len() {
            self.push(column)?;
            return Ok(None);
        }
        self.check_status_icon(&column, Some(position))?;
        let old = std::mem::replace(&mut self.list[position], column);
        self.mark_dirty();
        Ok(Some(old))
    }

    /// Removes the column at `position`.
    pub fn remove(&mut self, position: usize) -> Option<Rc<Column>> {
        if position >= self.list.len() {
            return None;
        }
        let removed = self.list.remove(position);
        self.mark_dirty();
        Some(removed)
    }

    /// Removes every column with `key`, returning how many were removed.
    pub fn remove_key(&mut self, key: &str) -> usize {
        let before = self.list.len();
        self.list.retain(|column| column.key != key);
        let removed = before - self.list.len();
        if removed > 0 {
            self.mark_dirty();
        }
        removed
    }

    /// Position of the first column with `key`.
    pub fn pos(&self, key: &str) -> Option<usize> {
        let mut index = self.index.borrow_mut();
        let index = index.get_or_insert_with(|| {
            let mut map = HashMap::with_capacity(self.list.len());
            for (position, column) in self.list.iter().enumerate() {
                map.entry(column.key.clone()).or_insert(position);
            }
            map
        });
        index.get(key).copied()
    }

    /// Position of the status icon column.
    pub fn status_icon_column(&self) -> Option<usize> {
        self.list.iter().position(|column| column.status_icon)
    }

    /// Positions of the columns that cannot be hidden.
    pub fn always_visible_columns(&self) -> impl Iterator<Item = usize> + '_ {
        self.list
            .iter()
            .enumerate()
            .filter(|(_, column)| column.always_visible)
            .map(|(position, _)| position)
    }

    fn check_status_icon(&self, column: &Column, replacing: Option<usize>) -> Result<()> {
        if !column.status_icon {
            return Ok(());
        }
        match self.status_icon_column() {
            Some(existing) if Some(existing) != replacing => {
                Err(ColumnsError::DuplicateStatusIcon { existing })
            }
            _ => Ok(()),
        }
    }

    fn mark_dirty(&mut self) {
        *self.index.get_mut() = None;
    }
}

impl<'a> IntoIterator for &'a Columns {
    type Item = &'a Rc<Column>;
    type IntoIter = std::slice::Iter<'a, Rc<Column>>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::LookupError;
    use crate::provider::CallableProvider;

    struct Row(&'static str);

    impl Item for Row {
        fn column(&self, key: &str) -> std::result::Result<String, LookupError> {
            match key {
                "title" => Ok(self.0.to_string()),
                other => Err(LookupError::UnknownKey(other.to_string())),
            }
        }
    }

    fn plain(key: &str) -> Rc<Column> {
        Rc::new(Column::builder(key.to_uppercase(), key).build().unwrap())
    }

    #[test]
    fn sortkey_without_function_fails() {
        let err = Column::builder("T", "t")
            .sort_type(SortType::SortKey)
            .build()
            .unwrap_err();
        assert!(matches!(err, ColumnsError::MissingSortKey { key } if key == "t"));
    }

    #[test]
    fn sortkey_function_only_kept_for_sortkey_columns() {
        let func: SortKeyFn = Rc::new(|_: &dyn Item| SortKey::Int(1));
        let text = Column::builder("T", "t").sortkey(func.clone()).build().unwrap();
        assert!(text.sortkey().is_none());
        let keyed = Column::builder("T", "t")
            .sort_type(SortType::SortKey)
            .sortkey(func)
            .build()
            .unwrap();
        assert_eq!(keyed.sort_key(&Row("x")), SortKey::Int(1));
    }

    #[test]
    fn width_normalization() {
        assert_eq!(Column::builder("T", "t").width(0).build().unwrap().width, None);
        assert_eq!(Column::builder("T", "t").width(-5).build().unwrap().width, None);
        assert_eq!(Column::builder("T", "t").width(120).build().unwrap().width, Some(120));
        assert_eq!(Column::builder("T", "t").maybe_width(None).build().unwrap().width, None);
    }

    #[test]
    fn value_falls_back_to_item_lookup() {
        let column = Column::builder("Title", "title").build().unwrap();
        assert_eq!(column.value(&Row("Song")), "Song");

        let other = Column::builder("Other", "other").build().unwrap();
        assert_eq!(other.value(&Row("Song")), "");

        let computed = Column::builder("Len", "len")
            .provider(Rc::new(CallableProvider::new(|item: &dyn Item| {
                item.column("title").map(|t| t.len()).unwrap_or(0)
            })))
            .build()
            .unwrap();
        assert_eq!(computed.value(&Row("Song")), "4");
    }

    #[test]
    fn text_and_natural_sort_keys() {
        let text = Column::builder("Title", "title").build().unwrap();
        assert!(text.sort_key(&Row("track 10")) < text.sort_key(&Row("Track 2")));

        let natural = Column::builder("Title", "title")
            .sort_type(SortType::Natural)
            .build()
            .unwrap();
        assert!(natural.sort_key(&Row("Track 2")) < natural.sort_key(&Row("track 10")));
    }

    #[test]
    fn align_names() {
        assert_eq!(Align::parse("right"), Some(Align::Right));
        assert_eq!(Align::parse(" LEFT "), Some(Align::Left));
        assert_eq!(Align::parse("center"), None);
        assert_eq!(Align::Right.to_string(), "RIGHT");
    }

    #[test]
    fn columns_position_index_follows_mutations() {
        let mut columns = Columns::new(None);
        columns.push(plain("a")).unwrap();
        columns.push(plain("b")).unwrap();
        assert_eq!(columns.pos("b"), Some(1));

        columns.insert(0, plain("c")).unwrap();
        assert_eq!(columns.pos("b"), Some(2));
        assert_eq!(columns.pos("c"), Some(0));

        columns.remove(0);
        assert_eq!(columns.pos("c"), None);
        assert_eq!(columns.pos("a"), Some(0));

        let old = columns.replace(1, plain("d")).unwrap();
        assert_eq!(old.map(|c| c.key.clone()), Some("b".to_string()));
        assert_eq!(columns.pos("d"), Some(1));
    }

    #[test]
    fn remove_key_drops_every_occurrence() {
        let mut columns = Columns::from_columns([plain("a"), plain("b"), plain("a")], None).unwrap();
        assert_eq!(columns.remove_key("a"), 2);
        assert_eq!(columns.len(), 1);
        assert_eq!(columns.remove_key("zzz"), 0);
    }

    #[test]
    fn only_one_status_icon_column() {
        let icon = |key: &str| {
            Rc::new(
                Column::builder("Icon", key)
                    .status_icon(true)
                    .build()
                    .unwrap(),
            )
        };
        let mut columns = Columns::new(None);
        columns.push(plain("a")).unwrap();
        columns.push(icon("title")).unwrap();
        assert_eq!(columns.status_icon_column(), Some(1));

        let err = columns.push(icon("other")).unwrap_err();
        assert!(matches!(err, ColumnsError::DuplicateStatusIcon { existing: 1 }));

        // replacing the icon column itself is fine
        columns.replace(1, icon("other")).unwrap();
        assert_eq!(columns.status_icon_column(), Some(1));
    }

    #[test]
    fn default_width_and_always_visible() {
        let fixed = Rc::new(Column::builder("F", "f").width(80).build().unwrap());
        let pinned = Rc::new(
            Column::builder("P", "p")
                .always_visible(true)
                .build()
                .unwrap(),
        );
        let columns = Columns::from_columns([fixed, pinned], Some(100)).unwrap();
        assert_eq!(columns.effective_width(0), Some(80));
        assert_eq!(columns.effective_width(1), Some(100));
        assert_eq!(columns.effective_width(2), None);
        assert_eq!(columns.always_visible_columns().collect::<Vec<_>>(), vec![1]);
    }
}
