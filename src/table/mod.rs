//! Tabular data model
//!
//! A [`Table`] is an ordered set of named, equal-length [`Column`]s. Tables
//! are never mutated by the engine: every strategy clones its input and
//! returns a new table.

mod column;

pub use column::{Column, ColumnKind, ColumnValues};

use crate::error::{ImputeError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Column-ordered table with explicit missing cells
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

/// Deserialized form; revalidated through [`Table::new`]
#[derive(Deserialize)]
struct RawTable {
    columns: Vec<Column>,
}

impl TryFrom<RawTable> for Table {
    type Error = ImputeError;

    fn try_from(raw: RawTable) -> Result<Self> {
        Table::new(raw.columns)
    }
}

impl Table {
    /// Build a table, checking equal column lengths and unique names
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map(Column::len).unwrap_or(0);
        let mut seen = HashSet::with_capacity(columns.len());

        for col in &columns {
            if col.len() != n_rows {
                return Err(ImputeError::LengthMismatch {
                    column: col.name().to_string(),
                    expected: n_rows,
                    actual: col.len(),
                });
            }
            if !seen.insert(col.name()) {
                return Err(ImputeError::DuplicateColumn(col.name().to_string()));
            }
        }

        Ok(Self { columns, n_rows })
    }

    /// Build an all-numeric table from a matrix, treating `NaN` as missing
    pub fn from_array(names: &[&str], data: &Array2<f64>) -> Result<Self> {
        if names.len() != data.ncols() {
            return Err(ImputeError::LengthMismatch {
                column: "<names>".to_string(),
                expected: data.ncols(),
                actual: names.len(),
            });
        }

        let columns = names
            .iter()
            .zip(data.columns())
            .map(|(name, col)| Column::from_f64(*name, &col.to_vec()))
            .collect();

        Self::new(columns)
    }

    /// Export numeric columns as a matrix with `NaN` for missing cells.
    /// Categorical columns are skipped.
    pub fn to_array(&self) -> Array2<f64> {
        let numeric: Vec<&[Option<f64>]> =
            self.columns.iter().filter_map(Column::as_numeric).collect();

        Array2::from_shape_fn((self.n_rows, numeric.len()), |(i, j)| {
            numeric[j][i].unwrap_or(f64::NAN)
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// True when the table has no rows or no columns
    pub fn is_empty(&self) -> bool {
        self.n_rows == 0 || self.columns.is_empty()
    }

    /// Fail with [`ImputeError::EmptyInput`] for an empty table
    pub fn ensure_not_empty(&self) -> Result<()> {
        if self.is_empty() {
            return Err(ImputeError::EmptyInput {
                rows: self.n_rows,
                columns: self.columns.len(),
            });
        }
        Ok(())
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_at(&self, idx: usize) -> Option<&Column> {
        self.columns.get(idx)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub(crate) fn column_mut(&mut self, idx: usize) -> &mut Column {
        &mut self.columns[idx]
    }

    pub(crate) fn replace_column(&mut self, idx: usize, column: Column) {
        debug_assert_eq!(column.len(), self.n_rows);
        self.columns[idx] = column;
    }

    /// Whether the cell at (`row`, `col`) is missing
    #[inline]
    pub fn is_missing(&self, row: usize, col: usize) -> bool {
        self.columns[col].is_missing(row)
    }

    /// Total number of missing cells
    pub fn count_missing(&self) -> usize {
        self.columns.iter().map(Column::missing_count).sum()
    }

    /// Missing cell counts per column, in column order
    pub fn missing_by_column(&self) -> Vec<(String, usize)> {
        self.columns
            .iter()
            .map(|c| (c.name().to_string(), c.missing_count()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_table_rejects_ragged_columns() {
        let err = Table::new(vec![
            Column::from_f64("a", &[1.0, 2.0]),
            Column::from_f64("b", &[1.0]),
        ])
        .unwrap_err();
        assert!(matches!(err, ImputeError::LengthMismatch { ref column, .. } if column == "b"));
    }

    #[test]
    fn test_table_rejects_duplicate_names() {
        let err = Table::new(vec![
            Column::from_f64("a", &[1.0]),
            Column::from_f64("a", &[2.0]),
        ])
        .unwrap_err();
        assert_eq!(err, ImputeError::DuplicateColumn("a".to_string()));
    }

    #[test]
    fn test_array_round_trip_keeps_nan() {
        let data = array![[1.0, f64::NAN], [3.0, 4.0]];
        let table = Table::from_array(&["x", "y"], &data).unwrap();
        assert_eq!(table.count_missing(), 1);

        let back = table.to_array();
        assert_eq!(back[[0, 0]], 1.0);
        assert!(back[[0, 1]].is_nan());
        assert_eq!(back[[1, 1]], 4.0);
    }

    #[test]
    fn test_deserialize_rejects_ragged_payload() {
        let json = r#"{"columns": [
            {"name": "a", "values": {"Numeric": [1.0, null]}},
            {"name": "b", "values": {"Numeric": [1.0]}}
        ]}"#;
        assert!(serde_json::from_str::<Table>(json).is_err());

        let json = r#"{"columns": [
            {"name": "a", "values": {"Numeric": [1.0]}},
            {"name": "a", "values": {"Numeric": [2.0]}}
        ]}"#;
        assert!(serde_json::from_str::<Table>(json).is_err());
    }

    #[test]
    fn test_deserialize_recomputes_row_count() {
        let json = r#"{"columns": [{"name": "a", "values": {"Numeric": [1.0, null]}}], "n_rows": 5}"#;
        let table: Table = serde_json::from_str(json).unwrap();
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.count_missing(), 1);
    }

    #[test]
    fn test_json_round_trip() {
        let table = Table::new(vec![
            Column::from_f64("x", &[1.0, f64::NAN]),
            Column::from_labels("c", &[None, Some("k")]),
        ])
        .unwrap();
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(serde_json::from_str::<Table>(&json).unwrap(), table);
    }

    #[test]
    fn test_empty_table() {
        let table = Table::new(vec![]).unwrap();
        assert!(table.is_empty());
        assert!(matches!(
            table.ensure_not_empty(),
            Err(ImputeError::EmptyInput { rows: 0, columns: 0 })
        ));
    }
}
