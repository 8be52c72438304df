//! Missingness mask and row patterns

use crate::table::Table;
use ndarray::{Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

/// N×M boolean matrix, `true` where the cell is missing.
///
/// Derived once from a table; its shape always matches the table's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingnessMask {
    cells: Array2<bool>,
}

impl MissingnessMask {
    pub fn from_table(table: &Table) -> Self {
        let cells = Array2::from_shape_fn((table.n_rows(), table.n_columns()), |(i, j)| {
            table.is_missing(i, j)
        });
        Self { cells }
    }

    pub fn n_rows(&self) -> usize {
        self.cells.nrows()
    }

    pub fn n_columns(&self) -> usize {
        self.cells.ncols()
    }

    #[inline]
    pub fn is_missing(&self, row: usize, col: usize) -> bool {
        self.cells[[row, col]]
    }

    /// Mask row `row` as a view over columns
    pub fn row(&self, row: usize) -> ArrayView1<'_, bool> {
        self.cells.row(row)
    }

    /// Whether row `row` has at least one missing cell
    pub fn row_has_missing(&self, row: usize) -> bool {
        self.cells.row(row).iter().any(|&m| m)
    }

    /// Missing cell count per column
    pub fn missing_by_column(&self) -> Vec<usize> {
        self.cells
            .axis_iter(Axis(1))
            .map(|col| col.iter().filter(|&&m| m).count())
            .collect()
    }

    /// Missing cell count per row
    pub fn missing_by_row(&self) -> Vec<usize> {
        self.cells
            .axis_iter(Axis(0))
            .map(|row| row.iter().filter(|&&m| m).count())
            .collect()
    }

    /// Total number of missing cells
    pub fn total_missing(&self) -> usize {
        self.cells.iter().filter(|&&m| m).count()
    }

    /// Binary indicator matrix (1 = missing), the heatmap representation
    pub fn to_indicator_matrix(&self) -> Array2<u8> {
        self.cells.mapv(u8::from)
    }

    /// Bit-vector pattern of row `row`
    pub fn row_pattern(&self, row: usize) -> RowPattern {
        RowPattern::from_flags(self.cells.row(row).iter().copied())
    }
}

/// Packed bit-vector of the columns missing in one row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowPattern {
    bits: Vec<u64>,
    width: usize,
}

impl RowPattern {
    /// Build from per-column missing flags
    pub fn from_flags(flags: impl IntoIterator<Item = bool>) -> Self {
        let mut bits = Vec::new();
        let mut width = 0;
        for missing in flags {
            let (word, bit) = (width / 64, width % 64);
            if word >= bits.len() {
                bits.push(0u64);
            }
            if missing {
                bits[word] |= 1u64 << bit;
            }
            width += 1;
        }
        Self { bits, width }
    }

    /// Build from the indices of missing columns
    pub fn from_missing_columns(width: usize, missing: &[usize]) -> Self {
        Self::from_flags((0..width).map(|j| missing.contains(&j)))
    }

    /// Number of columns the pattern spans
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn is_missing(&self, col: usize) -> bool {
        debug_assert!(col < self.width, "column {col} out of bounds (width={})", self.width);
        (self.bits[col / 64] >> (col % 64)) & 1 == 1
    }

    /// Indices of the missing columns, ascending
    pub fn missing_columns(&self) -> Vec<usize> {
        (0..self.width).filter(|&j| self.is_missing(j)).collect()
    }

    /// Number of missing columns
    pub fn missing_count(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// True when no column is missing
    pub fn is_complete(&self) -> bool {
        self.bits.iter().all(|&w| w == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    fn sample() -> Table {
        Table::new(vec![
            Column::from_f64("a", &[1.0, f64::NAN, 3.0]),
            Column::from_labels("b", &[None, None, Some("x")]),
        ])
        .unwrap()
    }

    #[test]
    fn test_mask_shape_and_counts() {
        let mask = MissingnessMask::from_table(&sample());
        assert_eq!((mask.n_rows(), mask.n_columns()), (3, 2));
        assert_eq!(mask.total_missing(), 3);
        assert_eq!(mask.missing_by_column(), vec![1, 2]);
        assert_eq!(mask.missing_by_row(), vec![1, 2, 0]);
        assert!(!mask.row_has_missing(2));
    }

    #[test]
    fn test_indicator_matrix() {
        let mask = MissingnessMask::from_table(&sample());
        let m = mask.to_indicator_matrix();
        assert_eq!(m[[1, 0]], 1);
        assert_eq!(m[[2, 1]], 0);
    }

    #[test]
    fn test_pattern_bits_span_words() {
        let pattern = RowPattern::from_missing_columns(130, &[0, 64, 129]);
        assert_eq!(pattern.width(), 130);
        assert_eq!(pattern.missing_columns(), vec![0, 64, 129]);
        assert_eq!(pattern.missing_count(), 3);
        assert!(!pattern.is_complete());
        assert!(RowPattern::from_flags(vec![false; 3]).is_complete());
    }
}
