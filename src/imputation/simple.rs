//! Constant fill with per-column statistics

use crate::error::Result;
use crate::imputation::{FillOutcome, ImputationDiagnostic};
use crate::table::{Column, ColumnKind, ColumnValues, Table};
use crate::utils::stats::{self, Mode};
use serde::{Deserialize, Serialize};

/// Statistic used for constant fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    /// Mean of observed values (numeric only)
    Mean,
    /// Median of observed values (numeric only)
    Median,
    /// Most frequent observed value (any kind)
    Mode,
}

impl Statistic {
    pub fn name(&self) -> &'static str {
        match self {
            Statistic::Mean => "mean",
            Statistic::Median => "median",
            Statistic::Mode => "mode",
        }
    }

    fn applies_to(&self, kind: ColumnKind) -> bool {
        matches!(
            (self, kind),
            (Statistic::Mode, _) | (_, ColumnKind::Numeric)
        )
    }
}

/// How a tied mode is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TieBreak {
    /// A tie leaves the column unresolved
    #[default]
    Strict,
    /// The first-seen of the tied values wins
    FirstSeen,
}

/// Value broadcast into the missing cells of one column
#[derive(Debug, Clone, PartialEq)]
pub enum FillValue {
    Numeric(f64),
    Label(String),
}

/// Per-column constant fill (mean / median / mode)
#[derive(Debug, Clone, Copy)]
pub struct StatisticFiller {
    statistic: Statistic,
    tie_break: TieBreak,
}

impl StatisticFiller {
    pub fn new(statistic: Statistic) -> Self {
        Self {
            statistic,
            tie_break: TieBreak::Strict,
        }
    }

    /// Set mode tie handling
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    pub fn statistic(&self) -> Statistic {
        self.statistic
    }

    /// Compute the fill value of `column` from its observed cells.
    ///
    /// `Err` carries the reason the column cannot be resolved.
    pub fn fill_value(&self, column: &Column) -> std::result::Result<FillValue, String> {
        let no_observed = || format!("column '{}' has zero observed values", column.name());

        match (self.statistic, column.values()) {
            (Statistic::Mean, ColumnValues::Numeric(_)) => stats::mean(&column.observed_numeric())
                .map(FillValue::Numeric)
                .ok_or_else(no_observed),
            (Statistic::Median, ColumnValues::Numeric(_)) => {
                stats::median(&column.observed_numeric())
                    .map(FillValue::Numeric)
                    .ok_or_else(no_observed)
            }
            (Statistic::Mode, ColumnValues::Numeric(cells)) => {
                // -0.0 and 0.0 count as the same value
                let mode = stats::mode(
                    cells
                        .iter()
                        .flatten()
                        .map(|&v| if v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() }),
                );
                self.resolve_mode(mode, column)
                    .map(|bits| FillValue::Numeric(f64::from_bits(bits)))
            }
            (Statistic::Mode, ColumnValues::Categorical(cells)) => {
                let mode = stats::mode(cells.iter().flatten().map(String::as_str));
                self.resolve_mode(mode, column)
                    .map(|label| FillValue::Label(label.to_string()))
            }
            (stat, _) => Err(format!(
                "{} applies only to numeric columns, '{}' is {}",
                stat.name(),
                column.name(),
                column.kind()
            )),
        }
    }

    fn resolve_mode<K>(&self, mode: Mode<K>, column: &Column) -> std::result::Result<K, String> {
        match (mode, self.tie_break) {
            (Mode::Empty, _) => Err(format!(
                "column '{}' has zero observed values",
                column.name()
            )),
            (Mode::Unique(k), _) => Ok(k),
            (Mode::Tied(ks), TieBreak::FirstSeen) => ks
                .into_iter()
                .next()
                .ok_or_else(|| format!("column '{}' has no mode", column.name())),
            (Mode::Tied(ks), TieBreak::Strict) => Err(format!(
                "column '{}' has no unique mode ({} values tied)",
                column.name(),
                ks.len()
            )),
        }
    }

    /// Fill every column independently; returns a new table.
    ///
    /// Columns the statistic does not apply to, and columns whose fill value
    /// cannot be determined, keep their missing cells and are reported in
    /// the outcome's diagnostics.
    pub fn fill(&self, table: &Table) -> Result<FillOutcome> {
        table.ensure_not_empty()?;

        let mut result = table.clone();
        let mut diagnostics = Vec::new();

        for (idx, column) in table.columns().iter().enumerate() {
            if column.missing_count() == 0 {
                continue;
            }

            if !self.statistic.applies_to(column.kind()) {
                diagnostics.push(ImputationDiagnostic::SkippedColumn {
                    column: column.name().to_string(),
                    reason: format!(
                        "{} does not apply to {} columns",
                        self.statistic.name(),
                        column.kind()
                    ),
                });
                continue;
            }

            match self.fill_value(column) {
                Ok(value) => apply_fill(result.column_mut(idx), &value),
                Err(reason) => {
                    tracing::warn!(column = column.name(), %reason, "Column left unresolved");
                    diagnostics.push(ImputationDiagnostic::UnresolvedColumn {
                        column: column.name().to_string(),
                        reason,
                    });
                }
            }
        }

        tracing::debug!(
            statistic = self.statistic.name(),
            flagged = diagnostics.len(),
            "Statistic fill complete"
        );

        Ok(FillOutcome::new(result, diagnostics))
    }
}

/// Write `value` into every missing cell of `column`
pub(crate) fn apply_fill(column: &mut Column, value: &FillValue) {
    match (column.values_mut(), value) {
        (ColumnValues::Numeric(cells), FillValue::Numeric(v)) => {
            cells.iter_mut().filter(|c| c.is_none()).for_each(|c| *c = Some(*v));
        }
        (ColumnValues::Categorical(cells), FillValue::Label(label)) => {
            cells
                .iter_mut()
                .filter(|c| c.is_none())
                .for_each(|c| *c = Some(label.clone()));
        }
        _ => debug_assert!(false, "fill value kind does not match column kind"),
    }
}
