//! Typed columns with explicit missing cells

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared kind of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Continuous or integer values stored as `f64`
    Numeric,
    /// Discrete labels stored as strings
    Categorical,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Numeric => write!(f, "numeric"),
            ColumnKind::Categorical => write!(f, "categorical"),
        }
    }
}

/// Cell storage for a column. `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    Categorical(Vec<Option<String>>),
}

impl ColumnValues {
    pub fn len(&self) -> usize {
        match self {
            ColumnValues::Numeric(v) => v.len(),
            ColumnValues::Categorical(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the cell at `row` is missing
    #[inline]
    pub fn is_missing(&self, row: usize) -> bool {
        match self {
            ColumnValues::Numeric(v) => v[row].is_none(),
            ColumnValues::Categorical(v) => v[row].is_none(),
        }
    }
}

/// A named column of a [`Table`](super::Table)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawColumn")]
pub struct Column {
    name: String,
    values: ColumnValues,
}

#[derive(Deserialize)]
struct RawColumn {
    name: String,
    values: ColumnValues,
}

impl From<RawColumn> for Column {
    fn from(raw: RawColumn) -> Self {
        match raw.values {
            ColumnValues::Numeric(values) => Column::numeric(raw.name, values),
            ColumnValues::Categorical(values) => Column::categorical(raw.name, values),
        }
    }
}

impl Column {
    /// Create a numeric column. `NaN` values are normalized to missing.
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        let values = values
            .into_iter()
            .map(|v| v.filter(|x| !x.is_nan()))
            .collect();
        Self {
            name: name.into(),
            values: ColumnValues::Numeric(values),
        }
    }

    /// Create a numeric column from raw floats, treating `NaN` as missing
    pub fn from_f64(name: impl Into<String>, values: &[f64]) -> Self {
        Self::numeric(name, values.iter().map(|&v| Some(v)).collect())
    }

    /// Create a categorical column
    pub fn categorical(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Categorical(values),
        }
    }

    /// Create a categorical column from string slices
    pub fn from_labels(name: impl Into<String>, values: &[Option<&str>]) -> Self {
        Self::categorical(
            name,
            values.iter().map(|v| v.map(str::to_string)).collect(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        match self.values {
            ColumnValues::Numeric(_) => ColumnKind::Numeric,
            ColumnValues::Categorical(_) => ColumnKind::Categorical,
        }
    }

    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut ColumnValues {
        &mut self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Numeric cells, or `None` for a categorical column
    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.values {
            ColumnValues::Numeric(v) => Some(v),
            ColumnValues::Categorical(_) => None,
        }
    }

    /// Categorical cells, or `None` for a numeric column
    pub fn as_categorical(&self) -> Option<&[Option<String>]> {
        match &self.values {
            ColumnValues::Categorical(v) => Some(v),
            ColumnValues::Numeric(_) => None,
        }
    }

    #[inline]
    pub fn is_missing(&self, row: usize) -> bool {
        self.values.is_missing(row)
    }

    /// Number of missing cells
    pub fn missing_count(&self) -> usize {
        (0..self.len()).filter(|&i| self.is_missing(i)).count()
    }

    /// Number of observed cells
    pub fn observed_count(&self) -> usize {
        self.len() - self.missing_count()
    }

    /// Observed numeric values in row order (empty for categorical columns)
    pub fn observed_numeric(&self) -> Vec<f64> {
        self.as_numeric()
            .map(|v| v.iter().flatten().copied().collect())
            .unwrap_or_default()
    }

    /// Convert to another kind. Numeric values become their shortest
    /// round-trip text; categorical labels must parse as `f64`.
    pub(crate) fn converted(&self, kind: ColumnKind) -> crate::Result<Column> {
        match (&self.values, kind) {
            (ColumnValues::Numeric(_), ColumnKind::Numeric)
            | (ColumnValues::Categorical(_), ColumnKind::Categorical) => Ok(self.clone()),
            (ColumnValues::Numeric(v), ColumnKind::Categorical) => Ok(Column::categorical(
                self.name.clone(),
                v.iter().map(|x| x.map(|x| x.to_string())).collect(),
            )),
            (ColumnValues::Categorical(v), ColumnKind::Numeric) => {
                let parsed = v
                    .iter()
                    .map(|label| match label {
                        None => Ok(None),
                        Some(s) => s.trim().parse::<f64>().map(Some).map_err(|_| {
                            crate::ImputeError::KindConversion {
                                column: self.name.clone(),
                                reason: format!("label '{}' is not numeric", s),
                            }
                        }),
                    })
                    .collect::<crate::Result<Vec<_>>>()?;
                Ok(Column::numeric(self.name.clone(), parsed))
            }
        }
    }
}
