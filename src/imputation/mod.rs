//! Missing value imputation
//!
//! Three tiers of strategies, each returning a new table:
//! - [`StatisticFiller`] - per-column mean / median / mode
//! - [`NeighborFiller`] - distance-weighted k nearest neighbours
//! - [`ChainedEquationsSolver`] - iterative chained-equations (MICE-style)
//!
//! Per-column problems never abort a run; they are reported as
//! [`ImputationDiagnostic`]s on the outcome.

mod iterative;
mod knn;
pub mod predictor;
mod simple;

pub use iterative::{ChainedEquationsSolver, SolverOutcome};
pub use knn::NeighborFiller;
pub use predictor::{FittedModel, LinearRegressor, Predictor, SoftmaxClassifier};
pub use simple::{FillValue, Statistic, StatisticFiller, TieBreak};

use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Non-fatal per-column condition raised during imputation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImputationDiagnostic {
    /// Column has no observed values and could not be modeled
    UnidentifiableColumn { column: String },
    /// Model could not be fitted; the column was filled with a constant
    DegenerateModelFallback { column: String, reason: String },
    /// Fill value could not be determined; missing cells remain
    UnresolvedColumn { column: String, reason: String },
    /// Strategy does not apply to the column's kind; missing cells remain
    SkippedColumn { column: String, reason: String },
}

impl ImputationDiagnostic {
    pub fn column(&self) -> &str {
        match self {
            ImputationDiagnostic::UnidentifiableColumn { column }
            | ImputationDiagnostic::DegenerateModelFallback { column, .. }
            | ImputationDiagnostic::UnresolvedColumn { column, .. }
            | ImputationDiagnostic::SkippedColumn { column, .. } => column,
        }
    }

    /// Whether the column may still hold missing cells after the run
    pub fn leaves_missing(&self) -> bool {
        !matches!(self, ImputationDiagnostic::DegenerateModelFallback { .. })
    }
}

impl fmt::Display for ImputationDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImputationDiagnostic::UnidentifiableColumn { column } => {
                write!(f, "column '{}' is unidentifiable: zero observed values", column)
            }
            ImputationDiagnostic::DegenerateModelFallback { column, reason } => {
                write!(f, "column '{}' fell back to constant fill: {}", column, reason)
            }
            ImputationDiagnostic::UnresolvedColumn { column, reason } => {
                write!(f, "column '{}' left unresolved: {}", column, reason)
            }
            ImputationDiagnostic::SkippedColumn { column, reason } => {
                write!(f, "column '{}' skipped: {}", column, reason)
            }
        }
    }
}

/// Imputed table plus the diagnostics raised while producing it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillOutcome {
    pub table: Table,
    pub diagnostics: Vec<ImputationDiagnostic>,
}

impl FillOutcome {
    pub(crate) fn new(table: Table, diagnostics: Vec<ImputationDiagnostic>) -> Self {
        Self { table, diagnostics }
    }

    /// Columns allowed to retain missing cells, in report order
    pub fn flagged_columns(&self) -> Vec<&str> {
        flagged(&self.diagnostics)
    }
}

pub(crate) fn flagged(diagnostics: &[ImputationDiagnostic]) -> Vec<&str> {
    let mut names: Vec<&str> = Vec::new();
    for d in diagnostics.iter().filter(|d| d.leaves_missing()) {
        if !names.contains(&d.column()) {
            names.push(d.column());
        }
    }
    names
}
