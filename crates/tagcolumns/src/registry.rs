//! Column registry and the views it maintains.
//!
//! The registry owns one [`Columns`] collection per view and an index of
//! registered columns by key. It is an explicit object: callers that add or
//! remove user columns get it passed in rather than reaching for global
//! state.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use log::debug;

use crate::column::{Column, Columns};
use crate::error::{ColumnsError, Result};

/// Identifier of a view (a named column collection).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewId(Cow<'static, str>);

impl ViewId {
    /// The file list view.
    pub const FILE: ViewId = ViewId(Cow::Borrowed("FILE_VIEW"));
    /// The album tree view.
    pub const ALBUM: ViewId = ViewId(Cow::Borrowed("ALBUM_VIEW"));

    pub fn new(id: impl Into<String>) -> Self {
        ViewId(Cow::Owned(id.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The views hosted by [`ColumnRegistry::with_default_views`], in
    /// canonical order.
    pub fn defaults() -> [ViewId; 2] {
        [ViewId::FILE, ViewId::ALBUM]
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registered columns and the views showing them.
#[derive(Debug, Default)]
pub struct ColumnRegistry {
    by_key: HashMap<String, Rc<Column>>,
    views: BTreeMap<ViewId, Columns>,
}

impl ColumnRegistry {
    /// Creates a registry without views.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry hosting the file and album views.
    pub fn with_default_views() -> Self {
        let mut registry = Self::new();
        for view in ViewId::defaults() {
            registry.add_view(view, Columns::default());
        }
        registry
    }

    /// Hosts a view, replacing any collection previously under `id`.
    pub fn add_view(&mut self, id: ViewId, columns: Columns) {
        self.views.insert(id, columns);
    }

    /// Returns a view's column collection.
    pub fn view(&self, id: &ViewId) -> Option<&Columns> {
        self.views.get(id)
    }

    pub fn view_mut(&mut self, id: &ViewId) -> Option<&mut Columns> {
        self.views.get_mut(id)
    }

    /// Iterates hosted view ids.
    pub fn view_ids(&self) -> impl Iterator<Item = &ViewId> + '_ {
        self.views.keys()
    }

    /// Registers a column and appends it to each target view.
    ///
    /// Registration is idempotent per key: any column with the same key is
    /// first removed from the target views, and the new column always lands
    /// at the end. Every target view is checked before anything changes.
    pub fn register(&mut self, column: impl Into<Rc<Column>>, add_to: &[ViewId]) -> Result<Rc<Column>> {
        let column = column.into();
        if let Some(unknown) = add_to.iter().find(|id| !self.views.contains_key(*id)) {
            return Err(ColumnsError::UnknownView(unknown.to_string()));
        }
        if column.status_icon {
            for columns in add_to.iter().filter_map(|id| self.views.get(id)) {
                if let Some(existing) = columns.status_icon_column() {
                    if columns.get(existing).is_some_and(|c| c.key != column.key) {
                        return Err(ColumnsError::DuplicateStatusIcon { existing });
                    }
                }
            }
        }

        for id in add_to {
            if let Some(columns) = self.views.get_mut(id) {
                columns.remove_key(&column.key);
                columns.push(Rc::clone(&column))?;
            }
        }
        debug!("registered column {:?} in {:?}", column.key, add_to);
        self.by_key.insert(column.key.clone(), Rc::clone(&column));
        Ok(column)
    }

    /// Removes a column from the registry and from every view.
    ///
    /// Returns `None` if no column is registered under `key`.
    pub fn unregister(&mut self, key: &str) -> Option<Rc<Column>> {
        let column = self.by_key.remove(key)?;
        for columns in self.views.values_mut() {
            columns.remove_key(key);
        }
        debug!("unregistered column {:?}", key);
        Some(column)
    }

    /// Looks up a registered column.
    pub fn get(&self, key: &str) -> Option<&Rc<Column>> {
        self.by_key.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(title: &str, key: &str) -> Column {
        Column::builder(title, key).build().unwrap()
    }

    fn keys(registry: &ColumnRegistry, view: &ViewId) -> Vec<String> {
        registry
            .view(view)
            .unwrap()
            .iter()
            .map(|c| c.key.clone())
            .collect()
    }

    #[test]
    fn register_appends_to_target_views() {
        let mut registry = ColumnRegistry::with_default_views();
        registry.register(column("A", "a"), &[ViewId::FILE]).unwrap();
        registry.register(column("B", "b"), &ViewId::defaults()).unwrap();

        assert_eq!(keys(&registry, &ViewId::FILE), vec!["a", "b"]);
        assert_eq!(keys(&registry, &ViewId::ALBUM), vec!["b"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn reregistering_replaces_and_moves_to_end() {
        let mut registry = ColumnRegistry::with_default_views();
        registry.register(column("K", "k"), &ViewId::defaults()).unwrap();
        registry.register(column("Other", "o"), &ViewId::defaults()).unwrap();
        registry.register(column("K2", "k"), &ViewId::defaults()).unwrap();

        for view in ViewId::defaults() {
            assert_eq!(keys(&registry, &view), vec!["o", "k"]);
            let columns = registry.view(&view).unwrap();
            let pos = columns.pos("k").unwrap();
            assert_eq!(columns.get(pos).unwrap().title, "K2");
        }
        assert_eq!(registry.get("k").unwrap().title, "K2");
    }

    #[test]
    fn unknown_view_changes_nothing() {
        let mut registry = ColumnRegistry::with_default_views();
        let err = registry
            .register(column("A", "a"), &[ViewId::FILE, ViewId::new("NOPE")])
            .unwrap_err();
        assert!(matches!(err, ColumnsError::UnknownView(v) if v == "NOPE"));
        assert!(registry.view(&ViewId::FILE).unwrap().is_empty());
        assert!(!registry.contains("a"));
    }

    #[test]
    fn unregister_removes_everywhere() {
        let mut registry = ColumnRegistry::with_default_views();
        registry.register(column("A", "a"), &ViewId::defaults()).unwrap();
        let removed = registry.unregister("a").unwrap();
        assert_eq!(removed.title, "A");
        assert!(registry.view(&ViewId::FILE).unwrap().is_empty());
        assert!(registry.view(&ViewId::ALBUM).unwrap().is_empty());
        assert!(registry.unregister("a").is_none());
        assert!(registry.get("a").is_none());
    }

    #[test]
    fn shared_column_instance_across_views() {
        let mut registry = ColumnRegistry::with_default_views();
        let registered = registry.register(column("A", "a"), &ViewId::defaults()).unwrap();
        let file = registry.view(&ViewId::FILE).unwrap().get(0).unwrap();
        let album = registry.view(&ViewId::ALBUM).unwrap().get(0).unwrap();
        assert!(Rc::ptr_eq(file, album));
        assert!(Rc::ptr_eq(file, &registered));
    }

    #[test]
    fn second_status_icon_column_is_rejected_up_front() {
        let icon = |key: &str| Column::builder("Icon", key).status_icon(true).build().unwrap();
        let mut registry = ColumnRegistry::with_default_views();
        registry.register(icon("title"), &[ViewId::ALBUM]).unwrap();
        registry.register(icon("title"), &ViewId::defaults()).unwrap();

        let err = registry.register(icon("other"), &ViewId::defaults()).unwrap_err();
        assert!(matches!(err, ColumnsError::DuplicateStatusIcon { .. }));
        assert!(registry.view(&ViewId::FILE).unwrap().pos("other").is_none());
    }

    #[test]
    fn custom_views() {
        let mut registry = ColumnRegistry::new();
        registry.add_view(ViewId::new("SIDEBAR"), Columns::new(Some(50)));
        registry.register(column("A", "a"), &[ViewId::new("SIDEBAR")]).unwrap();
        assert_eq!(registry.view_ids().count(), 1);
        assert_eq!(
            registry.view(&ViewId::new("SIDEBAR")).unwrap().effective_width(0),
            Some(50)
        );
        assert_eq!(ViewId::FILE.to_string(), "FILE_VIEW");
    }
}
