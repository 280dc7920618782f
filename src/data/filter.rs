use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};

use super::model::{Dimension, Table, Value};

// ---------------------------------------------------------------------------
// Filter criteria: which values are accepted per dimension
// ---------------------------------------------------------------------------

/// Per-dimension selection state: dimension → set of accepted values.
/// A dimension that is absent or has an empty set is unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    selections: BTreeMap<Dimension, BTreeSet<Value>>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style: accept `values` for `dim`.
    pub fn with(mut self, dim: Dimension, values: impl IntoIterator<Item = Value>) -> Self {
        self.set(dim, values);
        self
    }

    pub fn set(&mut self, dim: Dimension, values: impl IntoIterator<Item = Value>) {
        let values: BTreeSet<Value> = values.into_iter().collect();
        if values.is_empty() {
            self.selections.remove(&dim);
        } else {
            self.selections.insert(dim, values);
        }
    }

    pub fn insert(&mut self, dim: Dimension, value: Value) {
        self.selections.entry(dim).or_default().insert(value);
    }

    pub fn remove(&mut self, dim: Dimension, value: &Value) {
        if let Some(set) = self.selections.get_mut(&dim) {
            set.remove(value);
            if set.is_empty() {
                self.selections.remove(&dim);
            }
        }
    }

    pub fn toggle(&mut self, dim: Dimension, value: &Value) {
        if self.is_selected(dim, value) {
            self.remove(dim, value);
        } else {
            self.insert(dim, value.clone());
        }
    }

    pub fn clear(&mut self, dim: Dimension) {
        self.selections.remove(&dim);
    }

    pub fn clear_all(&mut self) {
        self.selections.clear();
    }

    pub fn selected(&self, dim: Dimension) -> Option<&BTreeSet<Value>> {
        self.selections.get(&dim).filter(|set| !set.is_empty())
    }

    pub fn is_selected(&self, dim: Dimension, value: &Value) -> bool {
        self.selected(dim).is_some_and(|set| set.contains(value))
    }

    /// Whether no dimension constrains the rows.
    pub fn is_unconstrained(&self) -> bool {
        self.selections.values().all(BTreeSet::is_empty)
    }
}

// ---------------------------------------------------------------------------
// FilteredView – order-preserving row selection
// ---------------------------------------------------------------------------

/// Read-only subset of a [`Table`]: row indices in source order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    table: &'a Table,
    rows: Cow<'a, [usize]>,
}

impl<'a> FilteredView<'a> {
    /// Every row of the table.
    pub fn all(table: &'a Table) -> Self {
        Self {
            table,
            rows: Cow::Owned((0..table.len()).collect()),
        }
    }

    /// View over rows previously computed by [`apply_filters`].
    pub fn borrowed(table: &'a Table, rows: &'a [usize]) -> Self {
        Self {
            table,
            rows: Cow::Borrowed(rows),
        }
    }

    pub fn table(&self) -> &'a Table {
        self.table
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<usize> {
        self.rows.into_owned()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Volumes of the selected rows, in view order.
    pub fn volumes(&self) -> impl Iterator<Item = f64> + '_ {
        let all = self.table.volumes();
        self.rows.iter().map(move |&r| all[r])
    }

    /// Materialise the view as its own table.
    pub fn to_table(&self) -> Table {
        self.table.select(&self.rows)
    }
}

/// Return the rows passing every active constraint, in table order.
///
/// A row passes a dimension when:
/// * the dimension has no selection (absent or empty set) → no constraint
/// * the row's value for that dimension is in the selected set
pub fn apply_filters<'a>(table: &'a Table, criteria: &FilterCriteria) -> FilteredView<'a> {
    // One mask per constrained dimension, indexed by dictionary code.
    let masks: Vec<(&[u32], Vec<bool>)> = Dimension::ALL
        .iter()
        .filter_map(|&dim| {
            let selected = criteria.selected(dim)?;
            let column = table.dimension(dim);
            let mask: Vec<bool> = column
                .levels()
                .iter()
                .map(|level| selected.contains(level))
                .collect();
            Some((column.codes(), mask))
        })
        .collect();

    if masks.is_empty() {
        return FilteredView::all(table);
    }

    let rows: Vec<usize> = (0..table.len())
        .filter(|&row| {
            masks
                .iter()
                .all(|(codes, mask)| mask[codes[row] as usize])
        })
        .collect();

    log::debug!(
        "Filter over {} dimension(s) kept {} of {} rows",
        masks.len(),
        rows.len(),
        table.len()
    );
    FilteredView {
        table,
        rows: Cow::Owned(rows),
    }
}
