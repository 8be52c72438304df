//! Missingness summary and pattern enumeration

use super::mask::{MissingnessMask, RowPattern};
use crate::error::Result;
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Missing cell statistics for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMissingness {
    /// Column name
    pub column: String,
    /// Number of missing cells
    pub missing: usize,
    /// Missing cells as a fraction of the row count (0.0 - 1.0)
    pub fraction: f64,
}

/// One distinct row pattern and how often it occurs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternCount {
    pub pattern: RowPattern,
    pub count: usize,
    /// Index of the first row showing this pattern
    pub first_row: usize,
}

/// Distinct row patterns ordered by count descending, then first row ascending
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PatternTable {
    entries: Vec<PatternCount>,
}

impl PatternTable {
    pub fn from_mask(mask: &MissingnessMask) -> Self {
        let mut index: HashMap<RowPattern, usize> = HashMap::new();
        let mut entries: Vec<PatternCount> = Vec::new();

        for row in 0..mask.n_rows() {
            let pattern = mask.row_pattern(row);
            match index.get(&pattern) {
                Some(&slot) => entries[slot].count += 1,
                None => {
                    index.insert(pattern.clone(), entries.len());
                    entries.push(PatternCount {
                        pattern,
                        count: 1,
                        first_row: row,
                    });
                }
            }
        }

        entries.sort_by(|a, b| b.count.cmp(&a.count).then(a.first_row.cmp(&b.first_row)));
        Self { entries }
    }

    pub fn entries(&self) -> &[PatternCount] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count for an exact pattern, zero if absent
    pub fn count_of(&self, pattern: &RowPattern) -> usize {
        self.entries
            .iter()
            .find(|e| &e.pattern == pattern)
            .map(|e| e.count)
            .unwrap_or(0)
    }

    /// Sum of all pattern counts; always the table's row count
    pub fn total_rows(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }

    /// Number of rows with no missing cell
    pub fn complete_rows(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.pattern.is_complete())
            .map(|e| e.count)
            .sum()
    }
}

/// Full missingness profile of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingProfile {
    pub mask: MissingnessMask,
    pub columns: Vec<ColumnMissingness>,
    pub patterns: PatternTable,
    /// Missing cell count per row
    pub missing_by_row: Vec<usize>,
    pub total_missing: usize,
    /// `total_missing / (N * M) * 100`
    pub percent_missing: f64,
}

impl MissingProfile {
    /// Columns with at least one missing cell
    pub fn incomplete_columns(&self) -> impl Iterator<Item = &ColumnMissingness> {
        self.columns.iter().filter(|c| c.missing > 0)
    }
}

/// Builds [`MissingProfile`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct MissingnessProfiler;

impl MissingnessProfiler {
    pub fn new() -> Self {
        Self
    }

    /// Profile `table`. Fails with `EmptyInput` for a table without rows
    /// or columns.
    pub fn profile(&self, table: &Table) -> Result<MissingProfile> {
        table.ensure_not_empty()?;

        let mask = MissingnessMask::from_table(table);
        let n_rows = table.n_rows();

        let columns = table
            .columns()
            .iter()
            .zip(mask.missing_by_column())
            .map(|(col, missing)| ColumnMissingness {
                column: col.name().to_string(),
                missing,
                fraction: missing as f64 / n_rows as f64,
            })
            .collect();

        let total_missing = mask.total_missing();
        let percent_missing =
            total_missing as f64 / (n_rows * table.n_columns()) as f64 * 100.0;

        Ok(MissingProfile {
            patterns: PatternTable::from_mask(&mask),
            missing_by_row: mask.missing_by_row(),
            mask,
            columns,
            total_missing,
            percent_missing,
        })
    }
}

/// Profile `table` with the default profiler
pub fn profile(table: &Table) -> Result<MissingProfile> {
    MissingnessProfiler::new().profile(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImputeError;
    use crate::table::Column;

    #[test]
    fn test_profile_counts() {
        let table = Table::new(vec![
            Column::from_f64("a", &[1.0, f64::NAN, 3.0, f64::NAN]),
            Column::from_f64("b", &[1.0, 2.0, 3.0, 4.0]),
        ])
        .unwrap();

        let p = profile(&table).unwrap();
        assert_eq!(p.total_missing, 2);
        assert!((p.percent_missing - 25.0).abs() < 1e-12);
        assert_eq!(p.columns[0].missing, 2);
        assert!((p.columns[0].fraction - 0.5).abs() < 1e-12);
        assert_eq!(p.incomplete_columns().count(), 1);
        assert_eq!(p.missing_by_row, vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_pattern_ties_follow_first_row() {
        // rows: {a}, {}, {b}, {} -> {} x2 first, then {a} (row 0), then {b} (row 2)
        let table = Table::new(vec![
            Column::from_f64("a", &[f64::NAN, 1.0, 1.0, 1.0]),
            Column::from_f64("b", &[1.0, 1.0, f64::NAN, 1.0]),
        ])
        .unwrap();

        let patterns = profile(&table).unwrap().patterns;
        let order: Vec<Vec<usize>> = patterns
            .entries()
            .iter()
            .map(|e| e.pattern.missing_columns())
            .collect();
        assert_eq!(order, vec![vec![], vec![0], vec![1]]);
        assert_eq!(patterns.total_rows(), 4);
        assert_eq!(patterns.complete_rows(), 2);
    }

    #[test]
    fn test_profile_empty_table_fails() {
        let table = Table::new(vec![Column::from_f64("a", &[])]).unwrap();
        assert!(matches!(profile(&table), Err(ImputeError::EmptyInput { .. })));
    }
}
