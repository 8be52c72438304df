//! Imputation plan configuration

use crate::error::{ImputeError, Result};
use crate::table::ColumnKind;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Parameters of the k nearest neighbour strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnnParams {
    /// Number of neighbours
    pub n_neighbors: usize,
    /// Numeric columns used for distances (all numeric columns when `None`)
    pub distance_columns: Option<Vec<String>>,
}

impl Default for KnnParams {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            distance_columns: None,
        }
    }
}

/// Parameters of the chained-equations strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IterativeParams {
    /// Hard ceiling on solver rounds
    pub max_rounds: usize,
    /// Convergence threshold on the round-over-round change
    pub tolerance: f64,
}

impl Default for IterativeParams {
    fn default() -> Self {
        Self {
            max_rounds: 10,
            tolerance: 1e-3,
        }
    }
}

/// Imputation strategy
///
/// Serialized with a `kind` tag next to the strategy's parameters. The tag
/// is parsed with [`Strategy::from_str`], so `mice` and mixed case are
/// accepted on input.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Strategy {
    #[default]
    Mean,
    Median,
    Mode,
    Knn(KnnParams),
    Iterative(IterativeParams),
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Mean => "mean",
            Strategy::Median => "median",
            Strategy::Mode => "mode",
            Strategy::Knn(_) => "knn",
            Strategy::Iterative(_) => "iterative",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = ImputeError;

    /// Parse a strategy name with default parameters. `mice` is accepted
    /// as an alias for `iterative`.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(Strategy::Mean),
            "median" => Ok(Strategy::Median),
            "mode" => Ok(Strategy::Mode),
            "knn" => Ok(Strategy::Knn(KnnParams::default())),
            "iterative" | "mice" => Ok(Strategy::Iterative(IterativeParams::default())),
            _ => Err(ImputeError::UnknownStrategy(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Strategy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Tagged {
            kind: String,
            #[serde(flatten)]
            params: serde_json::Map<String, serde_json::Value>,
        }

        let tagged = Tagged::deserialize(deserializer)?;
        let params = serde_json::Value::Object(tagged.params);
        match tagged.kind.parse::<Strategy>().map_err(de::Error::custom)? {
            Strategy::Knn(_) => serde_json::from_value(params)
                .map(Strategy::Knn)
                .map_err(de::Error::custom),
            Strategy::Iterative(_) => serde_json::from_value(params)
                .map(Strategy::Iterative)
                .map_err(de::Error::custom),
            other => Ok(other),
        }
    }
}

/// Configuration for one imputation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImputationPlan {
    /// Strategy and its parameters
    pub strategy: Strategy,

    /// Seed for randomized model fitting
    pub seed: u64,

    /// Per-column kind overrides applied before imputation
    pub column_kinds: BTreeMap<String, ColumnKind>,
}

impl Default for ImputationPlan {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            seed: 42,
            column_kinds: BTreeMap::new(),
        }
    }
}

impl ImputationPlan {
    /// Create a plan for the given strategy
    pub fn new(strategy: Strategy) -> Self {
        Self {
            strategy,
            ..Self::default()
        }
    }

    /// Create a plan from a strategy name, using default parameters
    pub fn from_strategy_name(name: &str) -> Result<Self> {
        Ok(Self::new(name.parse()?))
    }

    /// Parse a plan from JSON. An unrecognized strategy `kind` fails with
    /// `UnknownStrategy`; other malformed input with `SerializationError`.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if let Some(kind) = value
            .get("strategy")
            .and_then(|s| s.get("kind"))
            .and_then(serde_json::Value::as_str)
        {
            kind.parse::<Strategy>()?;
        }

        let plan: Self = serde_json::from_value(value)?;
        plan.validate()?;
        Ok(plan)
    }

    /// Serialize the plan to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Builder method to set the seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builder method to set the neighbour count. Switches to knn if the
    /// plan uses another strategy.
    pub fn with_n_neighbors(mut self, n_neighbors: usize) -> Self {
        match &mut self.strategy {
            Strategy::Knn(params) => params.n_neighbors = n_neighbors,
            other => {
                *other = Strategy::Knn(KnnParams {
                    n_neighbors,
                    ..KnnParams::default()
                })
            }
        }
        self
    }

    /// Builder method to set the solver's round ceiling. Switches to
    /// iterative if the plan uses another strategy.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        match &mut self.strategy {
            Strategy::Iterative(params) => params.max_rounds = max_rounds,
            other => {
                *other = Strategy::Iterative(IterativeParams {
                    max_rounds,
                    ..IterativeParams::default()
                })
            }
        }
        self
    }

    /// Builder method to set the solver's convergence tolerance. Switches to
    /// iterative if the plan uses another strategy.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        match &mut self.strategy {
            Strategy::Iterative(params) => params.tolerance = tolerance,
            other => {
                *other = Strategy::Iterative(IterativeParams {
                    tolerance,
                    ..IterativeParams::default()
                })
            }
        }
        self
    }

    /// Builder method to override a column's kind
    pub fn with_column_kind(mut self, column: impl Into<String>, kind: ColumnKind) -> Self {
        self.column_kinds.insert(column.into(), kind);
        self
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<()> {
        match &self.strategy {
            Strategy::Knn(params) if params.n_neighbors == 0 => Err(ImputeError::invalid_parameter(
                "n_neighbors",
                params.n_neighbors,
                "must be a positive integer",
            )),
            Strategy::Iterative(params) if params.max_rounds == 0 => {
                Err(ImputeError::invalid_parameter(
                    "max_rounds",
                    params.max_rounds,
                    "must be a positive integer",
                ))
            }
            Strategy::Iterative(params)
                if !(params.tolerance.is_finite() && params.tolerance > 0.0) =>
            {
                Err(ImputeError::invalid_parameter(
                    "tolerance",
                    params.tolerance,
                    "must be a positive finite number",
                ))
            }
            _ => Ok(()),
        }
    }
}
