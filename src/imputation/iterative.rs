//! Iterative chained-equations imputation (MICE-style)
//!
//! Every incomplete column is seeded with a constant (mean for numeric,
//! mode for categorical). Each round then visits the incomplete columns in
//! ascending order of their original missing count and replaces the
//! originally missing cells with predictions from a model fitted on the
//! other columns' current values. Observed cells are never overwritten.
//!
//! Rounds run until the round-over-round change drops below the tolerance
//! or `max_rounds` is reached.

use crate::error::{ImputeError, Result};
use crate::imputation::predictor::{FittedModel, LinearRegressor, Predictor, SoftmaxClassifier};
use crate::imputation::simple::{FillValue, Statistic, StatisticFiller, TieBreak};
use crate::imputation::ImputationDiagnostic;
use crate::missing::MissingnessMask;
use crate::table::{ColumnValues, Table};
use crate::utils::stats;
use ndarray::Array2;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Result of a chained-equations run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverOutcome {
    pub table: Table,
    /// Rounds executed, never more than `max_rounds`
    pub rounds_run: usize,
    /// Whether the last round's change fell below the tolerance
    pub converged: bool,
    /// Change measured after each round
    pub delta_history: Vec<f64>,
    pub diagnostics: Vec<ImputationDiagnostic>,
}

impl SolverOutcome {
    /// Columns allowed to retain missing cells
    pub fn flagged_columns(&self) -> Vec<&str> {
        crate::imputation::flagged(&self.diagnostics)
    }
}

/// Current values of one column during a solve
#[derive(Debug, Clone)]
enum WorkingColumn {
    Numeric {
        values: Vec<f64>,
        /// Round-0 seed, reused for constant fallback
        seed: f64,
        /// Observed standard deviation, 1.0 when degenerate
        scale: f64,
    },
    Categorical {
        levels: Vec<String>,
        codes: Vec<usize>,
        seed: usize,
    },
    /// No observed values; excluded from modeling and from predictors
    Unidentifiable,
}

impl WorkingColumn {
    /// Number of design matrix columns this column contributes as a predictor
    fn width(&self) -> usize {
        match self {
            WorkingColumn::Numeric { .. } => 1,
            // one-hot, first level dropped
            WorkingColumn::Categorical { levels, .. } => levels.len().saturating_sub(1),
            WorkingColumn::Unidentifiable => 0,
        }
    }

    /// Write this column's predictor encoding of `row` into `out`
    fn encode(&self, row: usize, out: &mut [f64]) {
        match self {
            WorkingColumn::Numeric { values, .. } => out[0] = values[row],
            WorkingColumn::Categorical { codes, .. } => {
                out.iter_mut().for_each(|v| *v = 0.0);
                if codes[row] > 0 {
                    out[codes[row] - 1] = 1.0;
                }
            }
            WorkingColumn::Unidentifiable => {}
        }
    }
}

/// Visit plan for one incomplete column
#[derive(Debug, Clone)]
struct ColumnPlan {
    col: usize,
    observed_rows: Vec<usize>,
    missing_rows: Vec<usize>,
    /// Constant-fill reason when the column cannot be modeled at all
    degenerate: Option<String>,
}

/// Iterative chained-equations solver, generic over the per-column
/// regressor (numeric targets) and classifier (categorical targets)
#[derive(Debug, Clone)]
pub struct ChainedEquationsSolver<R = LinearRegressor, C = SoftmaxClassifier> {
    max_rounds: usize,
    tolerance: f64,
    seed: u64,
    regressor: R,
    classifier: C,
}

impl Default for ChainedEquationsSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ChainedEquationsSolver {
    pub fn new() -> Self {
        Self {
            max_rounds: 10,
            tolerance: 1e-3,
            seed: 42,
            regressor: LinearRegressor::new(),
            classifier: SoftmaxClassifier::new(),
        }
    }
}

impl<R, C> ChainedEquationsSolver<R, C>
where
    R: Predictor<Target = f64>,
    C: Predictor<Target = usize>,
{
    /// Set the hard ceiling on rounds
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Set convergence tolerance
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set random seed for randomized model fitting
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Replace the numeric-column predictor
    pub fn with_regressor<R2: Predictor<Target = f64>>(
        self,
        regressor: R2,
    ) -> ChainedEquationsSolver<R2, C> {
        ChainedEquationsSolver {
            max_rounds: self.max_rounds,
            tolerance: self.tolerance,
            seed: self.seed,
            regressor,
            classifier: self.classifier,
        }
    }

    /// Replace the categorical-column predictor
    pub fn with_classifier<C2: Predictor<Target = usize>>(
        self,
        classifier: C2,
    ) -> ChainedEquationsSolver<R, C2> {
        ChainedEquationsSolver {
            max_rounds: self.max_rounds,
            tolerance: self.tolerance,
            seed: self.seed,
            regressor: self.regressor,
            classifier,
        }
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn validate(&self) -> Result<()> {
        if self.max_rounds == 0 {
            return Err(ImputeError::invalid_parameter(
                "max_rounds",
                self.max_rounds,
                "must be a positive integer",
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ImputeError::invalid_parameter(
                "tolerance",
                self.tolerance,
                "must be a positive finite number",
            ));
        }
        Ok(())
    }

    /// Round-0 state: seed every identifiable column with its constant fill
    fn seed_columns(
        table: &Table,
        diagnostics: &mut Vec<ImputationDiagnostic>,
    ) -> Vec<WorkingColumn> {
        let mean = StatisticFiller::new(Statistic::Mean);
        let mode = StatisticFiller::new(Statistic::Mode).with_tie_break(TieBreak::FirstSeen);

        table
            .columns()
            .iter()
            .map(|column| {
                if column.observed_count() == 0 {
                    tracing::warn!(column = column.name(), "Column has zero observed values, skipping");
                    diagnostics.push(ImputationDiagnostic::UnidentifiableColumn {
                        column: column.name().to_string(),
                    });
                    return WorkingColumn::Unidentifiable;
                }

                match column.values() {
                    ColumnValues::Numeric(cells) => {
                        let seed = match mean.fill_value(column) {
                            Ok(FillValue::Numeric(v)) => v,
                            _ => 0.0,
                        };
                        let scale = stats::std_dev(&column.observed_numeric())
                            .filter(|s| *s > 1e-12)
                            .unwrap_or(1.0);
                        WorkingColumn::Numeric {
                            values: cells.iter().map(|c| c.unwrap_or(seed)).collect(),
                            seed,
                            scale,
                        }
                    }
                    ColumnValues::Categorical(cells) => {
                        let levels: Vec<String> = stats::frequencies(cells.iter().flatten())
                            .into_iter()
                            .map(|(label, _)| label.clone())
                            .collect();
                        let code_of = |label: &str| {
                            levels.iter().position(|l| l == label).unwrap_or(0)
                        };
                        let seed = match mode.fill_value(column) {
                            Ok(FillValue::Label(label)) => code_of(&label),
                            _ => 0,
                        };
                        let codes = cells
                            .iter()
                            .map(|c| c.as_deref().map(code_of).unwrap_or(seed))
                            .collect();
                        WorkingColumn::Categorical {
                            levels,
                            codes,
                            seed,
                        }
                    }
                }
            })
            .collect()
    }

    /// Incomplete, identifiable columns in visiting order: fewest missing
    /// first, ties by column index
    fn visiting_order(
        table: &Table,
        mask: &MissingnessMask,
        working: &[WorkingColumn],
    ) -> Vec<ColumnPlan> {
        let missing_by_column = mask.missing_by_column();
        let mut order: Vec<usize> = (0..table.n_columns())
            .filter(|&j| missing_by_column[j] > 0)
            .filter(|&j| !matches!(working[j], WorkingColumn::Unidentifiable))
            .collect();
        order.sort_by_key(|&j| (missing_by_column[j], j));

        let predictor_width: usize = working.iter().map(WorkingColumn::width).sum();

        order
            .into_iter()
            .map(|col| {
                let (missing_rows, observed_rows): (Vec<usize>, Vec<usize>) =
                    (0..table.n_rows()).partition(|&i| mask.is_missing(i, col));

                let degenerate = match &working[col] {
                    WorkingColumn::Numeric { .. } => {
                        let observed = table.columns()[col].observed_numeric();
                        let variance = stats::population_variance(&observed).unwrap_or(0.0);
                        (variance <= 1e-12)
                            .then(|| "zero variance among observed values".to_string())
                    }
                    WorkingColumn::Categorical { levels, .. } => (levels.len() < 2)
                        .then(|| "single observed category".to_string()),
                    WorkingColumn::Unidentifiable => None,
                };
                let degenerate = degenerate.or_else(|| {
                    (predictor_width == working[col].width())
                        .then(|| "no predictor columns available".to_string())
                });

                ColumnPlan {
                    col,
                    observed_rows,
                    missing_rows,
                    degenerate,
                }
            })
            .collect()
    }

    /// Design matrix of all columns except `target`, for the given rows
    fn design_matrix(working: &[WorkingColumn], target: usize, rows: &[usize]) -> Array2<f64> {
        let widths: Vec<usize> = working
            .iter()
            .enumerate()
            .map(|(j, w)| if j == target { 0 } else { w.width() })
            .collect();
        let total: usize = widths.iter().sum();

        let mut x = Array2::<f64>::zeros((rows.len(), total));
        let mut buf = vec![0.0; total];
        for (r, &row) in rows.iter().enumerate() {
            let mut offset = 0;
            for (j, w) in working.iter().enumerate() {
                if widths[j] == 0 {
                    continue;
                }
                w.encode(row, &mut buf[offset..offset + widths[j]]);
                offset += widths[j];
            }
            x.row_mut(r).assign(&ndarray::ArrayView1::from(&buf[..]));
        }
        x
    }

    /// Fit a fresh model for `target` and overwrite its missing cells.
    /// On failure the cells are reset to the round-0 constant.
    fn update_column(
        &self,
        working: &mut [WorkingColumn],
        target: &ColumnPlan,
        rng: &mut Xoshiro256PlusPlus,
    ) -> std::result::Result<(), String> {
        let x_train = Self::design_matrix(working, target.col, &target.observed_rows);
        let x_pred = Self::design_matrix(working, target.col, &target.missing_rows);

        match &mut working[target.col] {
            WorkingColumn::Numeric { values, seed, .. } => {
                let y: Vec<f64> = target.observed_rows.iter().map(|&i| values[i]).collect();
                let predictions = self
                    .regressor
                    .fit(x_train.view(), &y, rng)
                    .and_then(|model| model.predict(x_pred.view()))
                    .map_err(|e| e.to_string())
                    .and_then(|p| {
                        if p.iter().all(|v| v.is_finite()) {
                            Ok(p)
                        } else {
                            Err("model produced non-finite predictions".to_string())
                        }
                    });

                match predictions {
                    Ok(p) => {
                        for (&row, v) in target.missing_rows.iter().zip(p) {
                            values[row] = v;
                        }
                        Ok(())
                    }
                    Err(reason) => {
                        for &row in &target.missing_rows {
                            values[row] = *seed;
                        }
                        Err(reason)
                    }
                }
            }
            WorkingColumn::Categorical {
                codes, seed, levels
            } => {
                let n_levels = levels.len();
                let y: Vec<usize> = target.observed_rows.iter().map(|&i| codes[i]).collect();
                let predictions = self
                    .classifier
                    .fit(x_train.view(), &y, rng)
                    .and_then(|model| model.predict(x_pred.view()))
                    .map_err(|e| e.to_string())
                    .and_then(|p| {
                        if p.iter().all(|&c| c < n_levels) {
                            Ok(p)
                        } else {
                            Err("model predicted an unknown category".to_string())
                        }
                    });

                match predictions {
                    Ok(p) => {
                        for (&row, c) in target.missing_rows.iter().zip(p) {
                            codes[row] = c;
                        }
                        Ok(())
                    }
                    Err(reason) => {
                        for &row in &target.missing_rows {
                            codes[row] = *seed;
                        }
                        Err(reason)
                    }
                }
            }
            WorkingColumn::Unidentifiable => Ok(()),
        }
    }

    /// Snapshot of every imputed cell of the visited columns
    fn snapshot(working: &[WorkingColumn], targets: &[ColumnPlan]) -> Vec<Vec<f64>> {
        targets
            .iter()
            .map(|t| match &working[t.col] {
                WorkingColumn::Numeric { values, .. } => {
                    t.missing_rows.iter().map(|&i| values[i]).collect()
                }
                WorkingColumn::Categorical { codes, .. } => {
                    t.missing_rows.iter().map(|&i| codes[i] as f64).collect()
                }
                WorkingColumn::Unidentifiable => Vec::new(),
            })
            .collect()
    }

    /// Round delta: the larger of the RMS of scale-normalized numeric
    /// changes and the fraction of categorical cells that changed
    fn round_delta(
        working: &[WorkingColumn],
        targets: &[ColumnPlan],
        previous: &[Vec<f64>],
        current: &[Vec<f64>],
    ) -> f64 {
        let (mut sq_sum, mut n_numeric) = (0.0, 0usize);
        let (mut changed, mut n_categorical) = (0usize, 0usize);

        for ((t, old), new) in targets.iter().zip(previous).zip(current) {
            match &working[t.col] {
                WorkingColumn::Numeric { scale, .. } => {
                    for (a, b) in old.iter().zip(new) {
                        sq_sum += ((b - a) / scale).powi(2);
                        n_numeric += 1;
                    }
                }
                WorkingColumn::Categorical { .. } => {
                    for (a, b) in old.iter().zip(new) {
                        if a != b {
                            changed += 1;
                        }
                        n_categorical += 1;
                    }
                }
                WorkingColumn::Unidentifiable => {}
            }
        }

        let numeric = if n_numeric > 0 {
            (sq_sum / n_numeric as f64).sqrt()
        } else {
            0.0
        };
        let categorical = if n_categorical > 0 {
            changed as f64 / n_categorical as f64
        } else {
            0.0
        };
        numeric.max(categorical)
    }

    /// Impute `table`; returns a new table and the convergence record
    pub fn solve(&self, table: &Table) -> Result<SolverOutcome> {
        table.ensure_not_empty()?;
        self.validate()?;

        let mask = MissingnessMask::from_table(table);
        let mut diagnostics = Vec::new();
        let mut working = Self::seed_columns(table, &mut diagnostics);
        let targets = Self::visiting_order(table, &mask, &working);

        tracing::info!(
            rows = table.n_rows(),
            columns = table.n_columns(),
            targets = targets.len(),
            max_rounds = self.max_rounds,
            tolerance = self.tolerance,
            "Running chained-equations imputation"
        );

        for t in targets.iter() {
            if let Some(reason) = &t.degenerate {
                let column = table.columns()[t.col].name();
                tracing::info!(column, %reason, "Degenerate model, using constant fill");
                diagnostics.push(ImputationDiagnostic::DegenerateModelFallback {
                    column: column.to_string(),
                    reason: reason.clone(),
                });
            }
        }

        let modeled: Vec<&ColumnPlan> = targets.iter().filter(|t| t.degenerate.is_none()).collect();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
        let mut fallen_back: HashSet<usize> = HashSet::new();
        let mut delta_history = Vec::new();
        let mut converged = modeled.is_empty();

        if !modeled.is_empty() {
            for round in 1..=self.max_rounds {
                let previous = Self::snapshot(&working, &targets);

                for target in &modeled {
                    if let Err(reason) = self.update_column(&mut working, target, &mut rng) {
                        if fallen_back.insert(target.col) {
                            let column = table.columns()[target.col].name();
                            tracing::info!(column, round, %reason, "Model fit failed, using constant fill");
                            diagnostics.push(ImputationDiagnostic::DegenerateModelFallback {
                                column: column.to_string(),
                                reason,
                            });
                        }
                    }
                }

                let current = Self::snapshot(&working, &targets);
                let delta = Self::round_delta(&working, &targets, &previous, &current);
                delta_history.push(delta);
                tracing::debug!(round, delta, "Chained-equations round complete");

                if delta < self.tolerance {
                    converged = true;
                    break;
                }
            }
        }

        let rounds_run = delta_history.len();
        tracing::info!(rounds_run, converged, "Chained-equations imputation finished");

        Ok(SolverOutcome {
            table: Self::materialize(table, &working),
            rounds_run,
            converged,
            delta_history,
            diagnostics,
        })
    }

    /// Copy `table` with the working values written into missing cells
    fn materialize(table: &Table, working: &[WorkingColumn]) -> Table {
        let mut result = table.clone();
        for (j, w) in working.iter().enumerate() {
            match (result.column_mut(j).values_mut(), w) {
                (ColumnValues::Numeric(cells), WorkingColumn::Numeric { values, .. }) => {
                    for (cell, v) in cells.iter_mut().zip(values) {
                        if cell.is_none() {
                            *cell = Some(*v);
                        }
                    }
                }
                (
                    ColumnValues::Categorical(cells),
                    WorkingColumn::Categorical { levels, codes, .. },
                ) => {
                    for (cell, &c) in cells.iter_mut().zip(codes) {
                        if cell.is_none() {
                            *cell = Some(levels[c].clone());
                        }
                    }
                }
                _ => {}
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn linear_table() -> Table {
        // b = 2a + 1, c = a - 3
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let b = [3.0, 5.0, f64::NAN, 9.0, 11.0, f64::NAN, 15.0, 17.0];
        let c = [-2.0, -1.0, 0.0, f64::NAN, 2.0, 3.0, 4.0, 5.0];
        Table::new(vec![
            Column::from_f64("a", &a),
            Column::from_f64("b", &b),
            Column::from_f64("c", &c),
        ])
        .unwrap()
    }

    #[test]
    fn test_recovers_linear_relation() {
        let out = ChainedEquationsSolver::new()
            .with_max_rounds(20)
            .solve(&linear_table())
            .unwrap();

        assert_eq!(out.table.count_missing(), 0);
        assert!(out.converged);
        let b = out.table.column("b").unwrap().as_numeric().unwrap();
        let c = out.table.column("c").unwrap().as_numeric().unwrap();
        assert!((b[2].unwrap() - 7.0).abs() < 1e-3);
        assert!((b[5].unwrap() - 13.0).abs() < 1e-3);
        assert!((c[3].unwrap() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_observed_cells_untouched() {
        let table = linear_table();
        let out = ChainedEquationsSolver::new().solve(&table).unwrap();
        for (orig, new) in table.columns().iter().zip(out.table.columns()) {
            let (o, n) = (orig.as_numeric().unwrap(), new.as_numeric().unwrap());
            for (x, y) in o.iter().zip(n) {
                if x.is_some() {
                    assert_eq!(x, y);
                }
            }
        }
    }

    #[test]
    fn test_rounds_bounded() {
        let out = ChainedEquationsSolver::new()
            .with_max_rounds(2)
            .with_tolerance(1e-300)
            .solve(&linear_table())
            .unwrap();
        assert!(out.rounds_run <= 2);
        assert_eq!(out.delta_history.len(), out.rounds_run);
    }

    #[test]
    fn test_visiting_order_fewest_missing_first() {
        let table = Table::new(vec![
            Column::from_f64("many", &[f64::NAN, f64::NAN, 3.0, 4.0, 5.0]),
            Column::from_f64("one", &[1.0, 2.0, f64::NAN, 4.0, 5.0]),
            Column::from_f64("also_one", &[1.0, 2.0, 3.0, f64::NAN, 5.0]),
        ])
        .unwrap();
        let mask = MissingnessMask::from_table(&table);
        let mut diagnostics = Vec::new();
        let working = ChainedEquationsSolver::<LinearRegressor, SoftmaxClassifier>::seed_columns(
            &table,
            &mut diagnostics,
        );
        let order: Vec<usize> =
            ChainedEquationsSolver::<LinearRegressor, SoftmaxClassifier>::visiting_order(
                &table, &mask, &working,
            )
            .iter()
            .map(|t| t.col)
            .collect();
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn test_all_missing_column_is_unidentifiable() {
        let table = Table::new(vec![
            Column::from_f64("x", &[1.0, 2.0, 3.0, f64::NAN]),
            Column::from_f64("y", &[2.0, 4.0, 6.0, 8.0]),
            Column::from_f64("gone", &[f64::NAN; 4]),
        ])
        .unwrap();

        let out = ChainedEquationsSolver::new().solve(&table).unwrap();
        assert_eq!(out.flagged_columns(), vec!["gone"]);
        assert_eq!(out.table.column("gone").unwrap().missing_count(), 4);
        assert_eq!(out.table.column("x").unwrap().missing_count(), 0);
        let x = out.table.column("x").unwrap().as_numeric().unwrap()[3].unwrap();
        assert!((x - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_variance_column_falls_back_to_constant() {
        let table = Table::new(vec![
            Column::from_f64("flat", &[7.0, 7.0, f64::NAN, 7.0]),
            Column::from_f64("y", &[1.0, 2.0, 3.0, 4.0]),
        ])
        .unwrap();

        let out = ChainedEquationsSolver::new().solve(&table).unwrap();
        assert_eq!(out.table.column("flat").unwrap().as_numeric().unwrap()[2], Some(7.0));
        assert!(out.diagnostics.iter().any(|d| matches!(
            d,
            ImputationDiagnostic::DegenerateModelFallback { column, .. } if column == "flat"
        )));
        assert!(out.flagged_columns().is_empty());
        assert!(out.converged);
    }

    #[test]
    fn test_categorical_target_predicted_from_numeric() {
        let x = [0.0, 0.1, 0.2, 0.3, 5.0, 5.1, 5.2, 5.3, 0.15, 5.15];
        let labels = [
            Some("low"),
            Some("low"),
            Some("low"),
            Some("low"),
            Some("high"),
            Some("high"),
            Some("high"),
            Some("high"),
            None,
            None,
        ];
        let table = Table::new(vec![
            Column::from_f64("x", &x),
            Column::from_labels("label", &labels),
        ])
        .unwrap();

        let out = ChainedEquationsSolver::new().with_seed(7).solve(&table).unwrap();
        let filled = out.table.column("label").unwrap().as_categorical().unwrap();
        assert_eq!(filled[8].as_deref(), Some("low"));
        assert_eq!(filled[9].as_deref(), Some("high"));
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let table = Table::new(vec![
            Column::from_f64("x", &[1.0, 2.0, f64::NAN, 4.0, 5.0, 6.0]),
            Column::from_labels(
                "c",
                &[Some("a"), Some("b"), Some("a"), None, Some("b"), Some("a")],
            ),
        ])
        .unwrap();

        let solver = ChainedEquationsSolver::new().with_seed(11);
        assert_eq!(solver.solve(&table).unwrap(), solver.solve(&table).unwrap());
    }

    #[test]
    fn test_round_delta_combines_numeric_and_categorical() {
        type Solver = ChainedEquationsSolver<LinearRegressor, SoftmaxClassifier>;

        let working = vec![
            WorkingColumn::Numeric {
                values: vec![0.0; 4],
                seed: 0.0,
                scale: 2.0,
            },
            WorkingColumn::Categorical {
                levels: vec!["a".to_string(), "b".to_string()],
                codes: vec![0; 4],
                seed: 0,
            },
        ];
        let plan = |col| ColumnPlan {
            col,
            observed_rows: Vec::new(),
            missing_rows: vec![0, 1, 2, 3],
            degenerate: None,
        };
        let targets = vec![plan(0), plan(1)];

        // labels: 2 of 4 cells changed; numeric unchanged
        let previous = vec![vec![1.0; 4], vec![0.0, 0.0, 1.0, 1.0]];
        let current = vec![vec![1.0; 4], vec![0.0, 1.0, 1.0, 0.0]];
        let delta = Solver::round_delta(&working, &targets, &previous, &current);
        assert!((delta - 0.5).abs() < 1e-12);

        // identical labels; one numeric cell moved by 4 = 2 scale units
        let current = vec![vec![5.0, 1.0, 1.0, 1.0], vec![0.0, 0.0, 1.0, 1.0]];
        let delta = Solver::round_delta(&working, &targets, &previous, &current);
        assert!((delta - 1.0).abs() < 1e-12);

        let delta = Solver::round_delta(&working, &targets, &previous, &previous);
        assert_eq!(delta, 0.0);
    }

    #[test]
    fn test_no_missing_returns_copy() {
        let table = Table::new(vec![Column::from_f64("x", &[1.0, 2.0])]).unwrap();
        let out = ChainedEquationsSolver::new().solve(&table).unwrap();
        assert_eq!(out.table, table);
        assert_eq!(out.rounds_run, 0);
        assert!(out.converged);
    }

    #[test]
    fn test_invalid_parameters() {
        let table = linear_table();
        assert!(matches!(
            ChainedEquationsSolver::new().with_max_rounds(0).solve(&table),
            Err(ImputeError::InvalidParameter { .. })
        ));
        assert!(matches!(
            ChainedEquationsSolver::new().with_tolerance(0.0).solve(&table),
            Err(ImputeError::InvalidParameter { .. })
        ));
    }
}
