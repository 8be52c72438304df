//! Imputation engine
//!
//! Single entry point that routes a table to one strategy according to an
//! [`ImputationPlan`]. The engine validates input and applies column-kind
//! overrides; all imputation logic lives in the strategies.

mod config;

pub use config::{ImputationPlan, IterativeParams, KnnParams, Strategy};

use crate::error::{ImputeError, Result};
use crate::imputation::{
    ChainedEquationsSolver, ImputationDiagnostic, NeighborFiller, Statistic, StatisticFiller,
};
use crate::table::{ColumnKind, Table};
use serde::{Deserialize, Serialize};

/// Result of an engine run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputationOutcome {
    pub table: Table,
    pub diagnostics: Vec<ImputationDiagnostic>,
    /// Solver rounds executed (iterative strategy only)
    pub rounds_run: Option<usize>,
    /// Whether the solver converged (iterative strategy only)
    pub converged: Option<bool>,
}

impl ImputationOutcome {
    fn filled(table: Table, diagnostics: Vec<ImputationDiagnostic>) -> Self {
        Self {
            table,
            diagnostics,
            rounds_run: None,
            converged: None,
        }
    }

    /// Columns allowed to retain missing cells
    pub fn flagged_columns(&self) -> Vec<&str> {
        crate::imputation::flagged(&self.diagnostics)
    }
}

/// Strategy router
#[derive(Debug, Clone, Default)]
pub struct ImputationEngine {
    plan: ImputationPlan,
}

impl ImputationEngine {
    pub fn new(plan: ImputationPlan) -> Self {
        Self { plan }
    }

    pub fn plan(&self) -> &ImputationPlan {
        &self.plan
    }

    /// Impute `table` with the configured strategy; returns a new table
    pub fn impute(&self, table: &Table) -> Result<ImputationOutcome> {
        table.ensure_not_empty()?;
        self.plan.validate()?;

        tracing::info!(
            strategy = self.plan.strategy.name(),
            rows = table.n_rows(),
            columns = table.n_columns(),
            missing = table.count_missing(),
            "Starting imputation"
        );

        let (working, original_kinds) = self.apply_overrides(table)?;
        let mut outcome = self.dispatch(&working)?;
        outcome.table = restore_kinds(outcome.table, &original_kinds)?;

        tracing::info!(
            strategy = self.plan.strategy.name(),
            remaining = outcome.table.count_missing(),
            flagged = outcome.flagged_columns().len(),
            "Imputation complete"
        );

        Ok(outcome)
    }

    fn dispatch(&self, table: &Table) -> Result<ImputationOutcome> {
        match &self.plan.strategy {
            Strategy::Mean => statistic_fill(Statistic::Mean, table),
            Strategy::Median => statistic_fill(Statistic::Median, table),
            Strategy::Mode => statistic_fill(Statistic::Mode, table),
            Strategy::Knn(params) => {
                let mut filler = NeighborFiller::new(params.n_neighbors);
                if let Some(columns) = &params.distance_columns {
                    filler = filler.with_distance_columns(columns.iter().cloned());
                }
                let out = filler.fill(table)?;
                Ok(ImputationOutcome::filled(out.table, out.diagnostics))
            }
            Strategy::Iterative(params) => {
                let out = ChainedEquationsSolver::new()
                    .with_max_rounds(params.max_rounds)
                    .with_tolerance(params.tolerance)
                    .with_seed(self.plan.seed)
                    .solve(table)?;
                Ok(ImputationOutcome {
                    table: out.table,
                    diagnostics: out.diagnostics,
                    rounds_run: Some(out.rounds_run),
                    converged: Some(out.converged),
                })
            }
        }
    }

    /// Convert overridden columns; returns the working table and the kinds
    /// to restore afterwards
    fn apply_overrides(&self, table: &Table) -> Result<(Table, Vec<(usize, ColumnKind)>)> {
        let mut working = table.clone();
        let mut original_kinds = Vec::new();

        for (name, &kind) in &self.plan.column_kinds {
            let idx = table
                .column_index(name)
                .ok_or_else(|| ImputeError::ColumnNotFound(name.clone()))?;
            let column = &table.columns()[idx];
            if column.kind() == kind {
                continue;
            }
            tracing::debug!(column = name.as_str(), from = %column.kind(), to = %kind, "Overriding column kind");
            working.replace_column(idx, column.converted(kind)?);
            original_kinds.push((idx, column.kind()));
        }

        Ok((working, original_kinds))
    }
}

fn statistic_fill(statistic: Statistic, table: &Table) -> Result<ImputationOutcome> {
    let out = StatisticFiller::new(statistic).fill(table)?;
    Ok(ImputationOutcome::filled(out.table, out.diagnostics))
}

fn restore_kinds(mut table: Table, original_kinds: &[(usize, ColumnKind)]) -> Result<Table> {
    for &(idx, kind) in original_kinds {
        let restored = table.columns()[idx].converted(kind)?;
        table.replace_column(idx, restored);
    }
    Ok(table)
}

/// Impute `table` under `plan`
pub fn impute(table: &Table, plan: &ImputationPlan) -> Result<ImputationOutcome> {
    ImputationEngine::new(plan.clone()).impute(table)
}
