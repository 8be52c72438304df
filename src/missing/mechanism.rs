//! Missingness mechanism classification
//!
//! Approximates Little's MCAR test by comparing each numeric column between
//! complete and incomplete rows with a pooled-variance two-sample t test and
//! averaging the resulting p-values.
//!
//! This is a column-wise simplification. Little's statistic is a joint
//! chi-square over all missingness patterns; the averaged p-value here is
//! advisory only and should not be read as a certified test result.

use super::mask::MissingnessMask;
use crate::error::{ImputeError, Result};
use crate::table::Table;
use crate::utils::stats;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use std::fmt;

/// Classified missingness mechanism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mechanism {
    /// Missing completely at random
    Mcar,
    /// Missing at random or not at random; the test cannot distinguish them
    MarOrMnar,
}

impl Mechanism {
    /// Human-readable recommendation label
    pub fn recommendation(&self) -> &'static str {
        match self {
            Mechanism::Mcar => "MCAR",
            Mechanism::MarOrMnar => "MAR/MNAR",
        }
    }
}

impl fmt::Display for Mechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.recommendation())
    }
}

/// Location test of one numeric column, complete vs incomplete rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnLocationTest {
    pub column: String,
    pub t_statistic: f64,
    pub p_value: f64,
    pub n_complete: usize,
    pub n_incomplete: usize,
}

/// Aggregate verdict of the mechanism classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MechanismVerdict {
    /// Mean of the per-column p-values (1.0 when nothing was tested)
    pub p_value: f64,
    pub mechanism: Mechanism,
    /// Per-column tests that contributed to `p_value`
    pub tested_columns: Vec<ColumnLocationTest>,
}

impl MechanismVerdict {
    fn trivial() -> Self {
        Self {
            p_value: 1.0,
            mechanism: Mechanism::Mcar,
            tested_columns: Vec::new(),
        }
    }

    pub fn is_mcar(&self) -> bool {
        self.mechanism == Mechanism::Mcar
    }

    pub fn recommendation(&self) -> &'static str {
        self.mechanism.recommendation()
    }
}

/// MCAR-style classifier over a table and its mask
#[derive(Debug, Clone, Copy)]
pub struct MechanismClassifier {
    alpha: f64,
}

impl Default for MechanismClassifier {
    fn default() -> Self {
        Self { alpha: 0.05 }
    }
}

impl MechanismClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Significance level; the verdict is MCAR iff the aggregate p-value
    /// exceeds it. Must lie in (0, 1).
    pub fn with_alpha(mut self, alpha: f64) -> Result<Self> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(ImputeError::invalid_parameter(
                "alpha",
                alpha,
                "must be between 0 and 1",
            ));
        }
        self.alpha = alpha;
        Ok(self)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn classify(&self, table: &Table, mask: &MissingnessMask) -> Result<MechanismVerdict> {
        if mask.n_rows() != table.n_rows() || mask.n_columns() != table.n_columns() {
            return Err(ImputeError::ComputationError(format!(
                "mask shape {}x{} does not match table shape {}x{}",
                mask.n_rows(),
                mask.n_columns(),
                table.n_rows(),
                table.n_columns()
            )));
        }

        if mask.total_missing() == 0 {
            return Ok(MechanismVerdict::trivial());
        }

        let (incomplete, complete): (Vec<usize>, Vec<usize>) =
            (0..table.n_rows()).partition(|&i| mask.row_has_missing(i));

        if complete.is_empty() || incomplete.is_empty() {
            return Ok(MechanismVerdict::trivial());
        }

        let mut tested_columns = Vec::new();
        for col in table.columns() {
            let Some(cells) = col.as_numeric() else {
                continue;
            };
            let a: Vec<f64> = complete.iter().filter_map(|&i| cells[i]).collect();
            let b: Vec<f64> = incomplete.iter().filter_map(|&i| cells[i]).collect();
            if a.len() < 2 || b.len() < 2 {
                continue;
            }

            let (t_statistic, p_value) = pooled_t_test(&a, &b)?;
            tested_columns.push(ColumnLocationTest {
                column: col.name().to_string(),
                t_statistic,
                p_value,
                n_complete: a.len(),
                n_incomplete: b.len(),
            });
        }

        let p_value = if tested_columns.is_empty() {
            1.0
        } else {
            tested_columns.iter().map(|t| t.p_value).sum::<f64>() / tested_columns.len() as f64
        };

        let mechanism = if p_value > self.alpha {
            Mechanism::Mcar
        } else {
            Mechanism::MarOrMnar
        };

        tracing::debug!(
            p_value,
            tested = tested_columns.len(),
            complete_rows = complete.len(),
            incomplete_rows = incomplete.len(),
            mechanism = %mechanism,
            "Classified missingness mechanism"
        );

        Ok(MechanismVerdict {
            p_value,
            mechanism,
            tested_columns,
        })
    }
}

/// Two-sided Student t test assuming equal variances.
///
/// With zero pooled variance the statistic is undefined: p is 1.0 when the
/// means agree and 0.0 otherwise.
fn pooled_t_test(a: &[f64], b: &[f64]) -> Result<(f64, f64)> {
    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let (m1, m2) = (
        stats::mean(a).unwrap_or(0.0),
        stats::mean(b).unwrap_or(0.0),
    );
    let v1 = stats::sample_variance(a).unwrap_or(0.0);
    let v2 = stats::sample_variance(b).unwrap_or(0.0);

    let df = n1 + n2 - 2.0;
    let pooled = ((n1 - 1.0) * v1 + (n2 - 1.0) * v2) / df;
    let se = (pooled * (1.0 / n1 + 1.0 / n2)).sqrt();

    if se <= f64::EPSILON * (m1.abs() + m2.abs()).max(1.0) {
        return Ok(if (m1 - m2).abs() <= f64::EPSILON * (m1.abs() + m2.abs()).max(1.0) {
            (0.0, 1.0)
        } else {
            ((m1 - m2).signum() * f64::INFINITY, 0.0)
        });
    }

    let t = (m1 - m2) / se;
    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|e| ImputeError::ComputationError(format!("t distribution: {}", e)))?;
    let p = (2.0 * (1.0 - dist.cdf(t.abs()))).clamp(0.0, 1.0);
    Ok((t, p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn classify(table: &Table) -> MechanismVerdict {
        let mask = MissingnessMask::from_table(table);
        MechanismClassifier::new().classify(table, &mask).unwrap()
    }

    #[test]
    fn test_no_missing_is_trivially_mcar() {
        let table = Table::new(vec![Column::from_f64("a", &[1.0, 2.0, 3.0])]).unwrap();
        let verdict = classify(&table);
        assert_eq!(verdict.p_value, 1.0);
        assert!(verdict.is_mcar());
        assert!(verdict.tested_columns.is_empty());
    }

    #[test]
    fn test_all_rows_incomplete_is_trivial() {
        let table = Table::new(vec![
            Column::from_f64("a", &[f64::NAN, 2.0]),
            Column::from_f64("b", &[1.0, f64::NAN]),
        ])
        .unwrap();
        assert_eq!(classify(&table).p_value, 1.0);
    }

    #[test]
    fn test_shifted_incomplete_rows_are_not_mcar() {
        // x is much larger whenever y is missing
        let x = [1.0, 1.1, 0.9, 1.2, 0.8, 1.0, 50.0, 51.0, 49.5, 50.5];
        let y = [
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, f64::NAN, f64::NAN, f64::NAN, f64::NAN,
        ];
        let table = Table::new(vec![Column::from_f64("x", &x), Column::from_f64("y", &y)]).unwrap();

        let verdict = classify(&table);
        assert_eq!(verdict.tested_columns.len(), 1);
        assert_eq!(verdict.tested_columns[0].column, "x");
        assert!(verdict.p_value < 0.05);
        assert_eq!(verdict.mechanism, Mechanism::MarOrMnar);
        assert_eq!(verdict.recommendation(), "MAR/MNAR");
    }

    #[test]
    fn test_similar_groups_are_mcar() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 1.5, 2.5, 3.5, 4.5, 3.0];
        let y = [
            1.0, 2.0, 3.0, 4.0, 5.0, f64::NAN, f64::NAN, f64::NAN, f64::NAN, 6.0,
        ];
        let table = Table::new(vec![Column::from_f64("x", &x), Column::from_f64("y", &y)]).unwrap();
        let verdict = classify(&table);
        assert!(verdict.p_value > 0.05);
        assert!(verdict.is_mcar());
    }

    #[test]
    fn test_t_test_matches_reference() {
        // reference values: t = -2.1908902, two-sided p = 0.070988 (df = 6)
        let (t, p) = pooled_t_test(&[1.0, 2.0, 3.0, 4.0], &[3.0, 4.0, 5.0, 6.0]).unwrap();
        assert!((t + 2.190890).abs() < 1e-5);
        assert!((p - 0.070988).abs() < 1e-4);
    }

    #[test]
    fn test_constant_groups() {
        assert_eq!(pooled_t_test(&[2.0, 2.0], &[2.0, 2.0]).unwrap().1, 1.0);
        assert_eq!(pooled_t_test(&[2.0, 2.0], &[3.0, 3.0]).unwrap().1, 0.0);
    }

    #[test]
    fn test_alpha_validation() {
        assert!(MechanismClassifier::new().with_alpha(1.5).is_err());
        assert_eq!(MechanismClassifier::new().with_alpha(0.1).unwrap().alpha(), 0.1);
    }
}
