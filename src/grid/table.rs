//! In-memory grid tables indexed by a composite key.
//!
//! A table is a list of rows; each row has one value per key dimension (e.g.
//! `initial_mass, age, initial_feh`) and one value per value column. Missing
//! values are stored as NaN so a table can describe grids where some columns
//! are only filled for part of the parameter space.
//!
//! Rows are kept sorted by key (lexicographically, in key-column order) so any
//! partial-key selection comes out ordered by the remaining dimensions.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use crate::domain::GridKind;
use crate::error::{Error, Result};
use crate::grid::resolver::Axis;

/// One grid sample.
#[derive(Debug, Clone, PartialEq)]
pub struct GridRow {
    key: Vec<f64>,
    values: Vec<f64>,
}

impl GridRow {
    pub fn new(key: Vec<f64>, values: Vec<f64>) -> Self {
        Self { key, values }
    }

    pub fn key(&self) -> &[f64] {
        &self.key
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value at column index `idx`, or `None` when absent or NaN.
    pub fn value(&self, idx: usize) -> Option<f64> {
        self.values.get(idx).copied().filter(|v| v.is_finite())
    }
}

/// Total-ordered key component so composite keys can index a `BTreeMap`.
#[derive(Debug, Clone, Copy)]
struct KeyValue(f64);

impl PartialEq for KeyValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for KeyValue {}

impl PartialOrd for KeyValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

fn compare_keys(a: &[f64], b: &[f64]) -> Ordering {
    for (x, y) in a.iter().zip(b) {
        match x.total_cmp(y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    a.len().cmp(&b.len())
}

/// A loaded grid: rows + composite-key index + per-dimension axes.
#[derive(Debug, Clone)]
pub struct GridTable {
    kind: GridKind,
    key_columns: Vec<String>,
    value_columns: Vec<String>,
    rows: Vec<GridRow>,
    index: BTreeMap<Vec<KeyValue>, Vec<usize>>,
    axes: Vec<Axis>,
}

impl GridTable {
    /// Build and index a table.
    ///
    /// Fails with `GridLoad` when the layout is inconsistent: no key columns,
    /// duplicated column names, rows of the wrong width, non-finite keys, or
    /// no rows at all.
    pub fn new(
        kind: GridKind,
        key_columns: Vec<String>,
        value_columns: Vec<String>,
        mut rows: Vec<GridRow>,
    ) -> Result<Self> {
        let invalid = |message: String| Error::GridLoad { kind, message };

        if key_columns.is_empty() {
            return Err(invalid("a grid needs at least one key column".to_string()));
        }
        let mut seen = HashSet::new();
        for name in key_columns.iter().chain(value_columns.iter()) {
            if !seen.insert(name.as_str()) {
                return Err(invalid(format!("duplicate column `{name}`")));
            }
        }
        if rows.is_empty() {
            return Err(invalid("grid has no rows".to_string()));
        }

        for (i, row) in rows.iter_mut().enumerate() {
            if row.key.len() != key_columns.len() || row.values.len() != value_columns.len() {
                return Err(invalid(format!(
                    "row {i} has {} key / {} value cells, expected {} / {}",
                    row.key.len(),
                    row.values.len(),
                    key_columns.len(),
                    value_columns.len()
                )));
            }
            if row.key.iter().any(|k| !k.is_finite()) {
                return Err(invalid(format!("row {i} has a non-finite key {:?}", row.key)));
            }
            // `-0.0` and `0.0` must land on the same key.
            for k in row.key.iter_mut() {
                *k += 0.0;
            }
        }

        rows.sort_by(|a, b| compare_keys(&a.key, &b.key));

        let mut index: BTreeMap<Vec<KeyValue>, Vec<usize>> = BTreeMap::new();
        for (i, row) in rows.iter().enumerate() {
            let key = row.key.iter().copied().map(KeyValue).collect();
            index.entry(key).or_default().push(i);
        }

        let axes = key_columns
            .iter()
            .enumerate()
            .map(|(d, name)| Axis::new(name.clone(), rows.iter().map(|r| r.key[d])))
            .collect();

        Ok(Self {
            kind,
            key_columns,
            value_columns,
            rows,
            index,
            axes,
        })
    }

    pub fn kind(&self) -> GridKind {
        self.kind
    }

    pub fn key_columns(&self) -> &[String] {
        &self.key_columns
    }

    pub fn value_columns(&self) -> &[String] {
        &self.value_columns
    }

    pub fn rows(&self) -> &[GridRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a value column, if the grid carries it.
    pub fn value_index(&self, column: &str) -> Option<usize> {
        self.value_columns.iter().position(|c| c == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.value_index(column).is_some()
    }

    /// Position of a key dimension.
    pub fn dimension_index(&self, dimension: &str) -> Result<usize> {
        self.key_columns
            .iter()
            .position(|c| c == dimension)
            .ok_or_else(|| Error::UnknownDimension {
                dimension: dimension.to_string(),
                available: self.key_columns.clone(),
            })
    }

    /// Sorted distinct values along one key dimension.
    pub fn axis_values(&self, dimension: &str) -> Result<&Axis> {
        let d = self.dimension_index(dimension)?;
        Ok(&self.axes[d])
    }

    /// All rows at an exact composite key, in load order.
    ///
    /// No snapping happens here; snap each component with the resolver first.
    pub fn slice(&self, key: &[f64]) -> Result<Vec<&GridRow>> {
        let not_found = || Error::KeyNotFound {
            key: self.named_key(key),
        };
        if key.len() != self.key_columns.len() {
            return Err(not_found());
        }
        let lookup: Vec<KeyValue> = key.iter().map(|k| KeyValue(k + 0.0)).collect();
        let indices = self.index.get(&lookup).ok_or_else(not_found)?;
        Ok(indices.iter().map(|&i| &self.rows[i]).collect())
    }

    /// Rows whose named key dimensions equal the given values (a partial key).
    ///
    /// Rows come back ordered by the remaining dimensions.
    pub fn section(&self, fixed: &[(&str, f64)]) -> Result<Vec<&GridRow>> {
        let resolved: Vec<(usize, KeyValue)> = fixed
            .iter()
            .map(|&(name, value)| Ok((self.dimension_index(name)?, KeyValue(value + 0.0))))
            .collect::<Result<_>>()?;

        let rows: Vec<&GridRow> = self
            .rows
            .iter()
            .filter(|row| resolved.iter().all(|&(d, v)| KeyValue(row.key[d]) == v))
            .collect();

        if rows.is_empty() {
            return Err(Error::KeyNotFound {
                key: fixed.iter().map(|&(n, v)| (n.to_string(), v)).collect(),
            });
        }
        Ok(rows)
    }

    fn named_key(&self, key: &[f64]) -> Vec<(String, f64)> {
        self.key_columns
            .iter()
            .cloned()
            .zip(key.iter().copied())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    fn iso_table() -> GridTable {
        let rows = vec![
            GridRow::new(vec![9.5, 0.0], vec![300.0, 5600.0]),
            GridRow::new(vec![9.0, 0.0], vec![200.0, 5800.0]),
            GridRow::new(vec![9.0, 0.0], vec![250.0, 5750.0]),
            GridRow::new(vec![9.0, -0.0], vec![300.0, 5700.0]),
            GridRow::new(vec![9.0, -0.5], vec![200.0, 6000.0]),
        ];
        GridTable::new(
            GridKind::Isochrone,
            names(&["age", "feh"]),
            names(&["eep", "Teff"]),
            rows,
        )
        .unwrap()
    }

    #[test]
    fn axis_values_are_sorted_and_distinct() {
        let table = iso_table();
        assert_eq!(table.axis_values("age").unwrap().values(), &[9.0, 9.5]);
        assert_eq!(table.axis_values("feh").unwrap().values(), &[-0.5, 0.0]);
    }

    #[test]
    fn unknown_dimension_lists_known_ones() {
        let table = iso_table();
        match table.axis_values("mass") {
            Err(Error::UnknownDimension { dimension, available }) => {
                assert_eq!(dimension, "mass");
                assert_eq!(available, names(&["age", "feh"]));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn slice_returns_all_rows_at_exact_key() {
        let table = iso_table();
        let rows = table.slice(&[9.0, 0.0]).unwrap();
        assert_eq!(rows.len(), 3, "negative zero must collapse onto zero");
        let eeps: Vec<f64> = rows.iter().map(|r| r.values()[0]).collect();
        assert_eq!(eeps, vec![200.0, 250.0, 300.0]);
    }

    #[test]
    fn slice_does_not_snap() {
        let table = iso_table();
        assert!(matches!(
            table.slice(&[9.1, 0.0]),
            Err(Error::KeyNotFound { .. })
        ));
    }

    #[test]
    fn section_filters_on_partial_key() {
        let table = iso_table();
        let rows = table.section(&[("feh", 0.0)]).unwrap();
        let ages: Vec<f64> = rows.iter().map(|r| r.key()[0]).collect();
        assert_eq!(ages, vec![9.0, 9.0, 9.0, 9.5]);
        assert!(table.section(&[("feh", 0.25)]).is_err());
        assert!(table.section(&[("mass", 1.0)]).is_err());
    }

    #[test]
    fn rejects_inconsistent_layout() {
        let bad_width = GridTable::new(
            GridKind::Track,
            names(&["mass"]),
            names(&["eep"]),
            vec![GridRow::new(vec![1.0], vec![])],
        );
        assert!(matches!(bad_width, Err(Error::GridLoad { .. })));

        let duplicate = GridTable::new(
            GridKind::Track,
            names(&["mass"]),
            names(&["mass"]),
            vec![GridRow::new(vec![1.0], vec![1.0])],
        );
        assert!(duplicate.is_err());

        let empty = GridTable::new(GridKind::Track, names(&["mass"]), names(&["eep"]), vec![]);
        assert!(empty.is_err());
    }
}
