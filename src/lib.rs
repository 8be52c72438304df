//! Kolosal Impute - missing-data diagnostics and imputation for tabular data
//!
//! This crate provides:
//! - Missingness profiling: per-column counts, row patterns, indicator matrix
//! - A heuristic MCAR vs MAR/MNAR mechanism classifier
//! - Imputation strategies: constant fill, k nearest neighbours and
//!   iterative chained equations
//! - A single engine routing a table to a strategy from a serializable plan
//!
//! # Modules
//!
//! - [`table`] - Column-oriented table with explicit missing cells
//! - [`missing`] - Missingness mask, profiler and mechanism classifier
//! - [`imputation`] - Imputation strategies and per-column predictors
//! - [`engine`] - Plan configuration and strategy dispatch
//! - [`utils`] - Small statistics helpers
//!
//! Every operation returns a new table; inputs are never mutated.

// Core error handling
pub mod error;

// Data model
pub mod table;

// Diagnostics
pub mod missing;

// Imputation
pub mod imputation;
pub mod engine;

// Utilities
pub mod utils;

pub use error::{ImputeError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{ImputeError, Result};

    // Data model
    pub use crate::table::{Column, ColumnKind, ColumnValues, Table};

    // Diagnostics
    pub use crate::missing::{
        analyze, profile, Mechanism, MechanismClassifier, MechanismVerdict, MissingProfile,
        MissingnessMask, MissingnessProfiler, MissingnessReport, PatternTable, RowPattern,
    };

    // Imputation
    pub use crate::imputation::{
        ChainedEquationsSolver, FillOutcome, ImputationDiagnostic, NeighborFiller, Statistic,
        StatisticFiller, TieBreak,
    };

    // Engine
    pub use crate::engine::{
        impute, ImputationEngine, ImputationOutcome, ImputationPlan, IterativeParams, KnnParams,
        Strategy,
    };
}
