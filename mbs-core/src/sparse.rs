//! Fixed-pattern sparse matrices for constraint Jacobians.
//!
//! Constraint Jacobians here are very sparse (a constraint row touches at
//! most five columns) and their sparsity pattern is established exactly once,
//! when constraints build their structures at model construction. After that
//! only the numeric values change, on every `update_constraints()` call.
//!
//! The representation is a triplet list with *slot handles*: a constraint
//! registers each (row, column) position it may ever write and keeps the
//! returned [`SlotId`]; updates then write values by slot in O(1) without
//! touching the pattern. Rows grow one at a time as constraint equations are
//! appended; columns are fixed at the assembled model's DOF count.

use nalgebra::{DMatrix, DVector};

/// Handle to one pre-registered nonzero position of a [`SparseMatrix`].
///
/// Valid only for the matrix that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotId(usize);

/// A sparse matrix with an immutable sparsity pattern and mutable values.
#[derive(Debug, Clone, Default)]
pub struct SparseMatrix {
    nrows: usize,
    ncols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f64>,
}

impl SparseMatrix {
    /// Create an empty matrix (0 rows, 0 columns, no entries).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the column count. Called once at assembly with the total DOF count.
    pub fn set_col_count(&mut self, ncols: usize) {
        debug_assert!(self.cols.iter().all(|&c| c < ncols));
        self.ncols = ncols;
    }

    /// Append one row; existing entries are unaffected. Returns the new row index.
    pub fn add_row(&mut self) -> usize {
        self.nrows += 1;
        self.nrows - 1
    }

    /// Register a nonzero position. Construction-time only; the pattern is
    /// never mutated afterwards. The slot starts at 0.0.
    pub fn register(&mut self, row: usize, col: usize) -> SlotId {
        debug_assert!(row < self.nrows, "row {row} out of {}", self.nrows);
        debug_assert!(col < self.ncols, "col {col} out of {}", self.ncols);
        self.rows.push(row);
        self.cols.push(col);
        self.values.push(0.0);
        SlotId(self.values.len() - 1)
    }

    /// Write the value of a registered slot.
    #[inline]
    pub fn set(&mut self, slot: SlotId, value: f64) {
        self.values[slot.0] = value;
    }

    /// Read the value of a registered slot.
    #[inline]
    #[must_use]
    pub fn get(&self, slot: SlotId) -> f64 {
        self.values[slot.0]
    }

    /// Number of rows.
    #[must_use]
    pub const fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns.
    #[must_use]
    pub const fn ncols(&self) -> usize {
        self.ncols
    }

    /// Number of registered nonzero positions.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Entries of one row as (column, value) pairs, in registration order.
    ///
    /// Linear in `nnz`; meant for factor adapters pulling a handful of rows,
    /// not for inner solver loops (those use [`SparseMatrix::mul_vec`] or a
    /// dense copy).
    pub fn row_entries(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.rows
            .iter()
            .zip(self.cols.iter())
            .zip(self.values.iter())
            .filter_map(move |((&r, &c), &v)| (r == row).then_some((c, v)))
    }

    /// Compute `A * v`.
    #[must_use]
    pub fn mul_vec(&self, v: &DVector<f64>) -> DVector<f64> {
        debug_assert_eq!(v.len(), self.ncols);
        let mut out = DVector::zeros(self.nrows);
        for i in 0..self.values.len() {
            out[self.rows[i]] += self.values[i] * v[self.cols[i]];
        }
        out
    }

    /// Compute `Aᵀ * v`.
    #[must_use]
    pub fn mul_transpose_vec(&self, v: &DVector<f64>) -> DVector<f64> {
        debug_assert_eq!(v.len(), self.nrows);
        let mut out = DVector::zeros(self.ncols);
        for i in 0..self.values.len() {
            out[self.cols[i]] += self.values[i] * v[self.rows[i]];
        }
        out
    }

    /// Convert to a dense matrix (tests, small dense solvers).
    #[must_use]
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(self.nrows, self.ncols);
        for i in 0..self.values.len() {
            dense[(self.rows[i], self.cols[i])] += self.values[i];
        }
        dense
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_register_and_set() {
        let mut m = SparseMatrix::new();
        m.set_col_count(3);
        let r0 = m.add_row();
        let r1 = m.add_row();
        assert_eq!((r0, r1), (0, 1));

        let a = m.register(0, 0);
        let b = m.register(1, 2);
        m.set(a, 1.5);
        m.set(b, -2.0);

        assert_eq!(m.nnz(), 2);
        assert_relative_eq!(m.get(a), 1.5);
        let dense = m.to_dense();
        assert_relative_eq!(dense[(0, 0)], 1.5);
        assert_relative_eq!(dense[(1, 2)], -2.0);
        assert_relative_eq!(dense[(0, 1)], 0.0);
    }

    #[test]
    fn test_mul_vec_and_transpose() {
        let mut m = SparseMatrix::new();
        m.set_col_count(2);
        m.add_row();
        m.add_row();
        let s00 = m.register(0, 0);
        let s01 = m.register(0, 1);
        let s10 = m.register(1, 0);
        let s11 = m.register(1, 1);
        m.set(s00, 1.0);
        m.set(s01, 2.0);
        m.set(s10, 3.0);
        m.set(s11, 4.0);

        let v = DVector::from_vec(vec![1.0, 2.0]);
        let av = m.mul_vec(&v);
        assert_relative_eq!(av[0], 5.0, epsilon = 1e-12);
        assert_relative_eq!(av[1], 11.0, epsilon = 1e-12);

        let atv = m.mul_transpose_vec(&v);
        assert_relative_eq!(atv[0], 7.0, epsilon = 1e-12);
        assert_relative_eq!(atv[1], 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_row_growth_preserves_entries() {
        let mut m = SparseMatrix::new();
        m.set_col_count(4);
        m.add_row();
        let s = m.register(0, 3);
        m.set(s, 7.0);

        let new_row = m.add_row();
        assert_eq!(new_row, 1);
        assert_eq!(m.nrows(), 2);
        assert_relative_eq!(m.get(s), 7.0);
    }

    #[test]
    fn test_row_entries() {
        let mut m = SparseMatrix::new();
        m.set_col_count(5);
        m.add_row();
        m.add_row();
        let a = m.register(1, 0);
        let b = m.register(1, 4);
        m.register(0, 2);
        m.set(a, 1.0);
        m.set(b, 2.0);

        let entries: Vec<_> = m.row_entries(1).collect();
        assert_eq!(entries, vec![(0, 1.0), (4, 2.0)]);
    }
}
