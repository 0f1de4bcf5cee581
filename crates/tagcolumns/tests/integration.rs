//! End-to-end tests: specs to columns, registry views, caching and sorting.

use std::rc::Rc;

use tagcolumns::adapters::{NumericSortAdapter, ReverseAdapter};
use tagcolumns::factory::{common_columns, make_field_column, make_script_column};
use tagcolumns::{
    sorted_positions, Column, ColumnKind, ColumnManager, ColumnRegistry, ColumnSpec, ColumnsError,
    FieldReferenceProvider, Item, ItemAnchor, LookupError, Metadata, OrderBy, PercentTemplate,
    ScriptEvaluator, SharedProvider, SortingAdapterName, SpecStore, ViewId,
};
use tempfile::TempDir;

// ============================================================================
// Test helpers
// ============================================================================

struct Track {
    anchor: ItemAnchor,
    tags: Metadata,
}

impl Track {
    fn new(pairs: &[(&str, &str)]) -> Self {
        Track {
            anchor: ItemAnchor::new(),
            tags: pairs.iter().copied().collect(),
        }
    }

    fn set(&mut self, tag: &str, value: &str) {
        self.tags.set(tag, value);
    }
}

impl Item for Track {
    fn column(&self, key: &str) -> Result<String, LookupError> {
        Ok(self.tags.get(key).unwrap_or_default())
    }

    fn metadata(&self) -> Option<&Metadata> {
        Some(&self.tags)
    }

    fn anchor(&self) -> Option<&ItemAnchor> {
        Some(&self.anchor)
    }
}

/// A plain row: no metadata, no anchor.
struct Cell(&'static str);

impl Item for Cell {
    fn column(&self, _key: &str) -> Result<String, LookupError> {
        Ok(self.0.to_string())
    }
}

fn evaluator() -> Rc<dyn ScriptEvaluator> {
    Rc::new(PercentTemplate::new())
}

// ============================================================================
// Script columns
// ============================================================================

#[test]
fn script_column_serves_cached_value_until_invalidated() {
    let column = make_script_column("Artist", "artist_s", "%artist%!", evaluator(), Some(10_000), None)
        .build()
        .unwrap();
    let mut track = Track::new(&[("artist", "Björk")]);

    assert_eq!(column.value(&track), "Björk!");
    track.set("artist", "Bjork");
    assert_eq!(column.value(&track), "Björk!");

    column.invalidate_cache(Some(&track as &dyn Item));
    assert_eq!(column.value(&track), "Bjork!");
}

#[test]
fn script_column_without_budget_always_recomputes() {
    let column = make_script_column("Artist", "artist_s", "%artist%", evaluator(), Some(-1), None)
        .build()
        .unwrap();
    let mut track = Track::new(&[("artist", "one")]);

    assert_eq!(column.value(&track), "one");
    track.set("artist", "two");
    assert_eq!(column.value(&track), "two");
}

#[test]
fn script_column_never_mixes_up_plain_rows() {
    let column = make_script_column("Value", "value_s", "%value%", evaluator(), Some(i64::MAX), None)
        .build()
        .unwrap();

    let mut seen = Vec::new();
    for value in ["A", "B", "C"] {
        let row = Cell(value);
        seen.push(column.value(&row));
    }
    assert_eq!(seen, ["A", "B", "C"]);

    let mut rows = vec![Cell("b"), Cell("a")];
    assert_eq!(rows.iter().map(|row| column.value(row)).collect::<Vec<_>>(), ["b", "a"]);
    rows.sort_by_key(|row| row.0);
    assert_eq!(rows.iter().map(|row| column.value(row)).collect::<Vec<_>>(), ["a", "b"]);
}

#[test]
fn hidden_field_spellings_resolve_the_same() {
    let track = Track::new(&[("~bitrate", "320")]);
    for expression in ["_bitrate", "~bitrate", "bitrate", "%_bitrate%"] {
        let column = ColumnSpec::new("Bitrate", "br", ColumnKind::Field, expression)
            .build_column(evaluator())
            .unwrap();
        assert_eq!(column.value(&track), "320", "expression {expression:?}");
    }
}

// ============================================================================
// Registry
// ============================================================================

#[test]
fn registering_twice_keeps_one_copy_per_view() {
    let mut registry = ColumnRegistry::with_default_views();
    let views = ViewId::defaults();
    registry
        .register(make_field_column("Genre", "genre").build().unwrap(), &views)
        .unwrap();
    registry
        .register(make_field_column("Mood", "mood").build().unwrap(), &views)
        .unwrap();
    registry
        .register(make_field_column("Genre 2", "genre").build().unwrap(), &views)
        .unwrap();

    for view in &views {
        let columns = registry.view(view).unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns.pos("mood"), Some(0));
        assert_eq!(columns.pos("genre"), Some(1));
        assert_eq!(columns.get(1).unwrap().title, "Genre 2");
    }
}

#[test]
fn unknown_view_leaves_registry_untouched() {
    let mut registry = ColumnRegistry::with_default_views();
    let column = make_field_column("Genre", "genre").build().unwrap();
    let err = registry
        .register(column, &[ViewId::FILE, ViewId::new("SIDEBAR")])
        .unwrap_err();

    assert!(matches!(err, ColumnsError::UnknownView(ref view) if view == "SIDEBAR"));
    assert!(!registry.contains("genre"));
    assert!(registry.view(&ViewId::FILE).unwrap().is_empty());
}

#[test]
fn common_columns_fill_a_view() {
    let mut registry = ColumnRegistry::with_default_views();
    for column in common_columns().unwrap() {
        registry.register(column, &[ViewId::FILE]).unwrap();
    }
    let view = registry.view(&ViewId::FILE).unwrap();
    assert_eq!(view.status_icon_column(), view.pos("title"));
    assert_eq!(view.always_visible_columns().collect::<Vec<_>>(), vec![0]);

    let second_icon = Column::builder("Icon", "icon").status_icon(true).build().unwrap();
    assert!(matches!(
        registry.register(second_icon, &[ViewId::FILE]),
        Err(ColumnsError::DuplicateStatusIcon { existing: 0 })
    ));
}

// ============================================================================
// Sorting
// ============================================================================

#[test]
fn reverse_over_numeric_keeps_numeric_order() {
    let base: SharedProvider = Rc::new(FieldReferenceProvider::new("value"));
    let numeric: SharedProvider = Rc::new(NumericSortAdapter::new(Rc::clone(&base)));
    let reversed: SharedProvider = Rc::new(ReverseAdapter::new(Rc::clone(&numeric)));

    let rows = [Cell("10"), Cell("abc"), Cell("2"), Cell("")];
    let numeric_keys: Vec<_> = rows
        .iter()
        .map(|row| numeric.as_sort_key_provider().unwrap().sort_key(row))
        .collect();
    let reversed_keys: Vec<_> = rows
        .iter()
        .map(|row| reversed.as_sort_key_provider().unwrap().sort_key(row))
        .collect();
    assert_eq!(numeric_keys, reversed_keys);
}

#[test]
fn rows_sort_by_spec_with_sorting_adapter() {
    let mut spec = ColumnSpec::new("Track", "trk", ColumnKind::Field, "tracknumber");
    spec.sorting_adapter = Some(SortingAdapterName::Numeric);
    let column = Rc::new(spec.build_column(evaluator()).unwrap());

    let rows: Vec<Track> = ["10", "abc", "2", "", "7a", "-3.5"]
        .iter()
        .map(|&n| Track::new(&[("tracknumber", n)]))
        .collect();
    let order = sorted_positions(&rows, &[OrderBy::asc(Rc::clone(&column))]);
    let values: Vec<String> = order.iter().map(|&i| column.value(&rows[i])).collect();
    assert_eq!(values, ["-3.5", "2", "10", "", "7a", "abc"]);

    let order = sorted_positions(&rows, &[OrderBy::desc(column)]);
    assert_eq!(order.first(), Some(&1));
}

// ============================================================================
// Persistence
// ============================================================================

#[test]
fn persisted_columns_survive_a_restart() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("columns.yaml");

    let mut first = ColumnManager::new(
        SpecStore::new(&path),
        ColumnRegistry::with_default_views(),
        evaluator(),
    );
    let mut script = ColumnSpec::new("Label", "label", ColumnKind::Script, "[%label%]");
    script.add_to = "ALBUM_VIEW".to_string();
    script.sorting_adapter = Some(SortingAdapterName::NullsLast);
    first.add_column(&script).unwrap();
    first
        .add_column(&ColumnSpec::new("Mood", "mood", ColumnKind::Field, "mood"))
        .unwrap();
    assert!(first.remove_column("mood").unwrap());

    let mut second = ColumnManager::new(
        SpecStore::new(&path),
        ColumnRegistry::with_default_views(),
        evaluator(),
    );
    assert_eq!(second.load_persisted().unwrap(), 1);
    assert_eq!(second.store().load().unwrap(), vec![script]);

    let registry = second.registry();
    assert!(registry.view(&ViewId::FILE).unwrap().is_empty());
    let column = registry.get("label").unwrap();
    assert_eq!(column.value(&Track::new(&[("label", "Warp")])), "[Warp]");
}
