//! KNN-based imputation
//!
//! Distances use pairwise deletion over standardized numeric columns: only
//! dimensions observed in both rows contribute, and the sum is rescaled by
//! `total_dims / shared_dims` so rows with fewer shared dimensions are not
//! favoured. A candidate sharing no observed dimension with the target sits
//! at infinite distance: it is still eligible but ranks after every finite
//! candidate. When all selected neighbours are at infinite distance their
//! values are averaged with equal weights.

use crate::error::{ImputeError, Result};
use crate::imputation::{FillOutcome, ImputationDiagnostic};
use crate::table::{ColumnValues, Table};
use crate::utils::stats;
use ndarray::{Array2, ArrayView1};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Offset added to distances before inverting them into weights
const WEIGHT_EPSILON: f64 = 1e-8;

/// Distance-weighted k nearest neighbour filler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborFiller {
    /// Number of neighbours
    n_neighbors: usize,
    /// Numeric columns used for distances (all numeric columns when `None`)
    distance_columns: Option<Vec<String>>,
}

/// One imputed cell
type Imputed = (usize, usize, f64);

impl NeighborFiller {
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors,
            distance_columns: None,
        }
    }

    /// Restrict the distance computation to the named numeric columns
    pub fn with_distance_columns<S: Into<String>>(
        mut self,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        self.distance_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    /// Resolve distance dimensions to numeric column indices
    fn distance_dims(&self, table: &Table) -> Result<Vec<usize>> {
        match &self.distance_columns {
            None => Ok(table
                .columns()
                .iter()
                .enumerate()
                .filter(|(_, c)| c.as_numeric().is_some())
                .map(|(j, _)| j)
                .collect()),
            Some(names) => names
                .iter()
                .map(|name| {
                    let idx = table
                        .column_index(name)
                        .ok_or_else(|| ImputeError::ColumnNotFound(name.clone()))?;
                    if table.columns()[idx].as_numeric().is_none() {
                        return Err(ImputeError::invalid_parameter(
                            "distance_columns",
                            name,
                            "must name a numeric column",
                        ));
                    }
                    Ok(idx)
                })
                .collect(),
        }
    }

    /// Standardize the distance dimensions once, globally, from observed
    /// values. Missing cells stay `NaN`.
    fn standardized(table: &Table, dims: &[usize]) -> Array2<f64> {
        let mut z = Array2::from_elem((table.n_rows(), dims.len()), f64::NAN);

        for (k, &j) in dims.iter().enumerate() {
            let column = &table.columns()[j];
            let observed = column.observed_numeric();
            let center = stats::mean(&observed).unwrap_or(0.0);
            let scale = stats::std_dev(&observed)
                .filter(|s| *s > 1e-12)
                .unwrap_or(1.0);

            if let Some(cells) = column.as_numeric() {
                for (i, cell) in cells.iter().enumerate() {
                    if let Some(v) = cell {
                        z[[i, k]] = (v - center) / scale;
                    }
                }
            }
        }
        z
    }

    /// Pairwise-deletion Euclidean distance; `None` when no dimension is
    /// observed in both rows
    fn distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> Option<f64> {
        let mut shared = 0usize;
        let mut sum_sq = 0.0;
        for (&x, &y) in a.iter().zip(b.iter()) {
            if x.is_nan() || y.is_nan() {
                continue;
            }
            shared += 1;
            sum_sq += (x - y) * (x - y);
        }
        if shared == 0 {
            return None;
        }
        Some((sum_sq * a.len() as f64 / shared as f64).sqrt())
    }

    /// Impute every missing numeric cell of row `row`
    fn impute_row(
        &self,
        table: &Table,
        z: &Array2<f64>,
        targets: &[usize],
        row: usize,
    ) -> Result<Vec<Imputed>> {
        let distances: Vec<Option<f64>> = (0..table.n_rows())
            .map(|r| {
                if r == row {
                    None
                } else {
                    Some(Self::distance(z.row(row), z.row(r)).unwrap_or(f64::INFINITY))
                }
            })
            .collect();

        let mut imputed = Vec::new();
        for &col in targets {
            let column = &table.columns()[col];
            let Some(cells) = column.as_numeric() else {
                continue;
            };
            if cells[row].is_some() {
                continue;
            }

            let mut candidates: Vec<(f64, usize, f64)> = distances
                .iter()
                .enumerate()
                .filter_map(|(r, d)| match (d, cells[r]) {
                    (Some(d), Some(v)) => Some((*d, r, v)),
                    _ => None,
                })
                .collect();

            if candidates.len() < self.n_neighbors {
                tracing::warn!(
                    column = column.name(),
                    row,
                    required = self.n_neighbors,
                    available = candidates.len(),
                    "Not enough neighbour candidates"
                );
                return Err(ImputeError::InsufficientNeighbors {
                    column: column.name().to_string(),
                    row,
                    required: self.n_neighbors,
                    available: candidates.len(),
                });
            }

            candidates.sort_by(|a, b| match a.0.total_cmp(&b.0) {
                Ordering::Equal => a.1.cmp(&b.1),
                other => other,
            });

            let selected = &candidates[..self.n_neighbors];
            let (weighted_sum, weight_sum) =
                selected
                    .iter()
                    .fold((0.0, 0.0), |(ws, w), &(d, _, v)| {
                        let weight = 1.0 / (d + WEIGHT_EPSILON);
                        (ws + weight * v, w + weight)
                    });
            let value = if weight_sum > 0.0 {
                weighted_sum / weight_sum
            } else {
                // every selected neighbour is at infinite distance
                selected.iter().map(|&(_, _, v)| v).sum::<f64>() / selected.len() as f64
            };
            imputed.push((row, col, value));
        }

        Ok(imputed)
    }

    /// Fill missing numeric cells; returns a new table.
    ///
    /// Fails with `InsufficientNeighbors` when fewer than k candidate rows
    /// exist for a missing cell. Categorical columns are not imputed and
    /// are reported as skipped.
    pub fn fill(&self, table: &Table) -> Result<FillOutcome> {
        table.ensure_not_empty()?;
        if self.n_neighbors == 0 {
            return Err(ImputeError::invalid_parameter(
                "n_neighbors",
                self.n_neighbors,
                "must be a positive integer",
            ));
        }

        let dims = self.distance_dims(table)?;
        let z = Self::standardized(table, &dims);

        let targets: Vec<usize> = table
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, c)| c.as_numeric().is_some() && c.missing_count() > 0)
            .map(|(j, _)| j)
            .collect();

        let incomplete_rows: Vec<usize> = (0..table.n_rows())
            .filter(|&i| targets.iter().any(|&j| table.is_missing(i, j)))
            .collect();

        tracing::info!(
            k = self.n_neighbors,
            rows = table.n_rows(),
            distance_dims = dims.len(),
            incomplete_rows = incomplete_rows.len(),
            "Running KNN imputation"
        );

        // Search phase: each row reads the shared standardized matrix only
        let per_row: Vec<Result<Vec<Imputed>>> = incomplete_rows
            .par_iter()
            .map(|&row| self.impute_row(table, &z, &targets, row))
            .collect();

        let mut result = table.clone();
        for cells in per_row {
            for (row, col, value) in cells? {
                if let ColumnValues::Numeric(values) = result.column_mut(col).values_mut() {
                    values[row] = Some(value);
                }
            }
        }

        let diagnostics = table
            .columns()
            .iter()
            .filter(|c| c.as_categorical().is_some() && c.missing_count() > 0)
            .map(|c| ImputationDiagnostic::SkippedColumn {
                column: c.name().to_string(),
                reason: "knn imputes numeric columns only".to_string(),
            })
            .collect();

        Ok(FillOutcome::new(result, diagnostics))
    }
}

impl Default for NeighborFiller {
    fn default() -> Self {
        Self::new(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    #[test]
    fn test_knn_fills_all_numeric() {
        let table = Table::new(vec![
            Column::from_f64("x", &[1.0, 2.0, 3.0, 4.0, f64::NAN, 2.5]),
            Column::from_f64("y", &[10.0, 20.0, 30.0, 40.0, 25.0, f64::NAN]),
        ])
        .unwrap();

        let out = NeighborFiller::new(3).fill(&table).unwrap();
        assert_eq!(out.table.count_missing(), 0);

        let x = out.table.column("x").unwrap().as_numeric().unwrap();
        let y = out.table.column("y").unwrap().as_numeric().unwrap();
        assert!(x[4].unwrap() >= 1.0 && x[4].unwrap() <= 4.0);
        assert!(y[5].unwrap() >= 10.0 && y[5].unwrap() <= 40.0);
    }

    #[test]
    fn test_knn_exact_match_dominates() {
        // Row 4 matches row 0 exactly on x, so its weight dwarfs the others
        let table = Table::new(vec![
            Column::from_f64("x", &[0.0, 1.0, 2.0, 3.0, 0.0]),
            Column::from_f64("y", &[5.0, 1.0, 2.0, 3.0, f64::NAN]),
        ])
        .unwrap();

        let out = NeighborFiller::new(3).fill(&table).unwrap();
        let y = out.table.column("y").unwrap().as_numeric().unwrap()[4].unwrap();
        assert!((y - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_knn_insufficient_neighbors() {
        let table = Table::new(vec![
            Column::from_f64("x", &[1.0, 2.0, 3.0, 4.0]),
            Column::from_f64("y", &[1.0, 2.0, f64::NAN, f64::NAN]),
        ])
        .unwrap();

        let err = NeighborFiller::new(3).fill(&table).unwrap_err();
        assert_eq!(
            err,
            ImputeError::InsufficientNeighbors {
                column: "y".to_string(),
                row: 2,
                required: 3,
                available: 2,
            }
        );
    }

    #[test]
    fn test_knn_does_not_mutate_input() {
        let table = Table::new(vec![
            Column::from_f64("x", &[1.0, 2.0, 3.0]),
            Column::from_f64("y", &[1.0, 2.0, f64::NAN]),
        ])
        .unwrap();
        let before = table.clone();
        let _ = NeighborFiller::new(2).fill(&table).unwrap();
        assert_eq!(table, before);
    }

    #[test]
    fn test_knn_ties_break_by_row_index() {
        // Rows 0, 1, 2 are equidistant from row 3 on x; k = 2 picks rows 0 and 1
        let table = Table::new(vec![
            Column::from_f64("x", &[1.0, 1.0, 1.0, 1.0]),
            Column::from_f64("y", &[10.0, 20.0, 90.0, f64::NAN]),
        ])
        .unwrap();
        let out = NeighborFiller::new(2).fill(&table).unwrap();
        let y = out.table.column("y").unwrap().as_numeric().unwrap()[3].unwrap();
        assert!((y - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_knn_rows_without_shared_dims_remain_candidates() {
        // row 4 observes nothing, so every candidate is infinitely far;
        // ties break by row index and the values are averaged equally
        let table = Table::new(vec![
            Column::from_f64("x", &[1.0, 2.0, 3.0, 4.0, f64::NAN]),
            Column::from_f64("y", &[1.0, 2.0, 3.0, 4.0, f64::NAN]),
        ])
        .unwrap();

        let out = NeighborFiller::new(3).fill(&table).unwrap();
        assert_eq!(out.table.count_missing(), 0);
        assert_eq!(out.table.column("x").unwrap().as_numeric().unwrap()[4], Some(2.0));
        assert_eq!(out.table.column("y").unwrap().as_numeric().unwrap()[4], Some(2.0));
    }

    #[test]
    fn test_knn_finite_neighbors_rank_before_unshared() {
        // row 2 observes no distance dimension shared with row 3
        let table = Table::new(vec![
            Column::from_f64("x", &[0.0, 1.0, f64::NAN, 0.0]),
            Column::from_f64("y", &[10.0, 20.0, 99.0, f64::NAN]),
        ])
        .unwrap();

        let out = NeighborFiller::new(1).fill(&table).unwrap();
        let y = out.table.column("y").unwrap().as_numeric().unwrap()[3].unwrap();
        assert!((y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_knn_distances_use_standardized_columns() {
        // On raw scale row 0 is nearest to row 4 (|1 - 0| < |50 - 0|); after
        // standardization the small spread of "small" makes row 1 nearest.
        let table = Table::new(vec![
            Column::from_f64("small", &[1.0, 0.0, 0.5, 0.5, 0.0]),
            Column::from_f64("big", &[0.0, 50.0, 1000.0, 1000.0, 0.0]),
            Column::from_f64("y", &[100.0, -100.0, 0.0, 0.0, f64::NAN]),
        ])
        .unwrap();

        let out = NeighborFiller::new(1).fill(&table).unwrap();
        let y = out.table.column("y").unwrap().as_numeric().unwrap()[4].unwrap();
        assert!((y + 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_knn_skips_categorical() {
        let table = Table::new(vec![
            Column::from_f64("x", &[1.0, 2.0, 3.0]),
            Column::from_labels("c", &[Some("a"), None, Some("b")]),
        ])
        .unwrap();
        let out = NeighborFiller::new(1).fill(&table).unwrap();
        assert_eq!(out.flagged_columns(), vec!["c"]);
    }

    #[test]
    fn test_knn_unknown_distance_column() {
        let table = Table::new(vec![Column::from_f64("x", &[1.0, f64::NAN])]).unwrap();
        let err = NeighborFiller::new(1)
            .with_distance_columns(["nope"])
            .fill(&table)
            .unwrap_err();
        assert_eq!(err, ImputeError::ColumnNotFound("nope".to_string()));
    }
}
