//! Row ordering by columns.
//!
//! Each [`OrderBy`] clause pairs a column with a [`Dir`]. Sort keys are
//! computed once per row and compared with the total order of [`SortKey`],
//! so sorting never fails on mixed data.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::column::Column;
use crate::item::Item;
use crate::sort_key::SortKey;

/// Direction a column is sorted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dir {
    #[default]
    Asc,
    Desc,
}

impl Dir {
    /// Flips `ordering` for [`Dir::Desc`].
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Dir::Asc => ordering,
            Dir::Desc => ordering.reverse(),
        }
    }
}

/// A single ordering clause: a column and a direction.
#[derive(Debug, Clone)]
pub struct OrderBy {
    pub column: Rc<Column>,
    pub dir: Dir,
}

impl OrderBy {
    pub fn asc(column: Rc<Column>) -> Self {
        OrderBy {
            column,
            dir: Dir::Asc,
        }
    }

    pub fn desc(column: Rc<Column>) -> Self {
        OrderBy {
            column,
            dir: Dir::Desc,
        }
    }

    /// Compares two rows by this clause.
    pub fn compare(&self, a: &dyn Item, b: &dyn Item) -> Ordering {
        self.dir
            .apply(self.column.sort_key(a).cmp(&self.column.sort_key(b)))
    }
}

/// Compares two rows using a list of ordering clauses.
///
/// The first clause is the primary key, later ones break ties.
pub fn compare_by_orderings(a: &dyn Item, b: &dyn Item, orderings: &[OrderBy]) -> Ordering {
    orderings
        .iter()
        .map(|order_by| order_by.compare(a, b))
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// Returns row positions in sorted order.
///
/// Each row's key is computed exactly once; equal keys keep their input
/// order.
pub fn sorted_positions<T: Item>(rows: &[T], orderings: &[OrderBy]) -> Vec<usize> {
    let keys: Vec<Vec<SortKey>> = rows
        .iter()
        .map(|row| {
            orderings
                .iter()
                .map(|order_by| order_by.column.sort_key(row))
                .collect()
        })
        .collect();

    let mut positions: Vec<usize> = (0..rows.len()).collect();
    positions.sort_by(|&a, &b| compare_keys(&keys[a], &keys[b], orderings));
    positions
}

fn compare_keys(a: &[SortKey], b: &[SortKey], orderings: &[OrderBy]) -> Ordering {
    orderings
        .iter()
        .zip(a.iter().zip(b))
        .map(|(order_by, (ka, kb))| order_by.dir.apply(ka.cmp(kb)))
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// Sorts borrowed rows in place.
pub fn sort_rows(rows: &mut [&dyn Item], orderings: &[OrderBy]) {
    let mut keyed: Vec<(Vec<SortKey>, &dyn Item)> = rows
        .iter()
        .map(|row| {
            let keys = orderings
                .iter()
                .map(|order_by| order_by.column.sort_key(*row))
                .collect();
            (keys, *row)
        })
        .collect();
    keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, orderings));
    for (slot, (_, row)) in rows.iter_mut().zip(keyed) {
        *slot = row;
    }
}
