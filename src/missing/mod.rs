//! Missing data analysis
//!
//! Read-only diagnostics over a [`Table`]:
//! - [`MissingnessMask`] - per-cell presence matrix
//! - [`MissingnessProfiler`] - column statistics and distinct row patterns
//! - [`MechanismClassifier`] - advisory MCAR verdict

mod mask;
mod mechanism;
mod profiler;

pub use mask::{MissingnessMask, RowPattern};
pub use mechanism::{ColumnLocationTest, Mechanism, MechanismClassifier, MechanismVerdict};
pub use profiler::{
    profile, ColumnMissingness, MissingProfile, MissingnessProfiler, PatternCount, PatternTable,
};

use crate::error::Result;
use crate::table::Table;
use serde::{Deserialize, Serialize};

/// Profile and mechanism verdict for one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingnessReport {
    pub profile: MissingProfile,
    pub verdict: MechanismVerdict,
}

impl MissingnessReport {
    /// Short label for the likely mechanism ("MCAR" or "MAR/MNAR")
    pub fn recommendation(&self) -> &'static str {
        self.verdict.recommendation()
    }
}

/// Profile `table` and classify its missingness mechanism
pub fn analyze(table: &Table) -> Result<MissingnessReport> {
    let profile = MissingnessProfiler::new().profile(table)?;
    let verdict = MechanismClassifier::new().classify(table, &profile.mask)?;

    tracing::info!(
        rows = table.n_rows(),
        columns = table.n_columns(),
        total_missing = profile.total_missing,
        patterns = profile.patterns.len(),
        mechanism = %verdict.mechanism,
        "Missing data analysis complete"
    );

    Ok(MissingnessReport { profile, verdict })
}
