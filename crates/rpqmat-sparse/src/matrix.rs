//! Row-major hypersparse boolean matrix.
//!
//! Only non-empty rows are stored, so two matrices with the same shape and
//! the same set of coordinates compare equal with `==`.

use std::collections::BTreeMap;

use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};

use crate::error::{MatrixError, Result};
use crate::Index;

/// An `nrows x ncols` boolean matrix; absent coordinates are `false`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoolMatrix {
    nrows: Index,
    ncols: Index,
    /// row -> set columns (never empty)
    rows: BTreeMap<Index, RoaringBitmap>,
}

impl BoolMatrix {
    /// Empty matrix of the given shape.
    pub fn new(nrows: Index, ncols: Index) -> Self {
        Self {
            nrows,
            ncols,
            rows: BTreeMap::new(),
        }
    }

    /// Build a matrix from parallel coordinate lists.
    pub fn from_coordinates(
        nrows: Index,
        ncols: Index,
        rows: &[Index],
        cols: &[Index],
    ) -> Result<Self> {
        let mut matrix = Self::new(nrows, ncols);
        matrix.build(rows, cols)?;
        Ok(matrix)
    }

    /// Replace the content with the given coordinates. Duplicates collapse.
    ///
    /// On error the matrix is left unchanged.
    pub fn build(&mut self, rows: &[Index], cols: &[Index]) -> Result<()> {
        if rows.len() != cols.len() {
            return Err(MatrixError::LengthMismatch {
                rows: rows.len(),
                cols: cols.len(),
            });
        }

        let mut built: BTreeMap<Index, RoaringBitmap> = BTreeMap::new();
        for (&row, &col) in rows.iter().zip(cols) {
            self.check_bounds("build", row, col)?;
            built.entry(row).or_default().insert(col);
        }
        self.rows = built;
        Ok(())
    }

    pub fn nrows(&self) -> Index {
        self.nrows
    }

    pub fn ncols(&self) -> Index {
        self.ncols
    }

    pub fn shape(&self) -> (Index, Index) {
        (self.nrows, self.ncols)
    }

    /// Number of `true` entries.
    pub fn nvals(&self) -> u64 {
        self.rows.values().map(RoaringBitmap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Drop all entries, keeping the shape.
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn set_element(&mut self, row: Index, col: Index) -> Result<()> {
        self.check_bounds("set_element", row, col)?;
        self.rows.entry(row).or_default().insert(col);
        Ok(())
    }

    pub fn get(&self, row: Index, col: Index) -> bool {
        self.rows.get(&row).is_some_and(|bits| bits.contains(col))
    }

    /// Columns set in `row`, if any.
    pub fn row(&self, row: Index) -> Option<&RoaringBitmap> {
        self.rows.get(&row)
    }

    /// Iterate over `(row, col)` coordinates in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Index, Index)> + '_ {
        self.rows
            .iter()
            .flat_map(|(&row, bits)| bits.iter().map(move |col| (row, col)))
    }

    /// Extract the coordinates as two parallel lists.
    pub fn extract_pairs(&self) -> Result<(Vec<Index>, Vec<Index>)> {
        let nvals = self.nvals();
        let mut rows = Vec::new();
        let mut cols = Vec::new();
        let reserve =
            usize::try_from(nvals).map_err(|_| MatrixError::Allocation { entries: nvals })?;
        rows.try_reserve_exact(reserve)
            .and_then(|_| cols.try_reserve_exact(reserve))
            .map_err(|_| MatrixError::Allocation { entries: nvals })?;

        for (row, col) in self.iter() {
            rows.push(row);
            cols.push(col);
        }
        Ok((rows, cols))
    }

    /// A new matrix holding the transpose.
    pub fn transpose(&self) -> Self {
        let mut out = Self::new(self.ncols, self.nrows);
        out.fill_transpose(self);
        out
    }

    /// `self <- src^T`.
    pub fn transpose_into(&mut self, src: &BoolMatrix) -> Result<()> {
        if self.shape() != (src.ncols, src.nrows) {
            return Err(self.mismatch("transpose", src.shape()));
        }
        self.clear();
        self.fill_transpose(src);
        Ok(())
    }

    fn fill_transpose(&mut self, src: &BoolMatrix) {
        for (row, col) in src.iter() {
            self.rows.entry(col).or_default().insert(row);
        }
    }

    /// `self <- a x b` over the boolean semiring, or `self |= a x b` when
    /// `accumulate` is set.
    pub fn mxm(&mut self, a: &BoolMatrix, b: &BoolMatrix, accumulate: bool) -> Result<()> {
        if a.ncols != b.nrows {
            return Err(MatrixError::DimensionMismatch {
                op: "mxm",
                left: a.shape(),
                right: b.shape(),
            });
        }
        if self.shape() != (a.nrows, b.ncols) {
            return Err(self.mismatch("mxm", (a.nrows, b.ncols)));
        }

        if !accumulate {
            self.clear();
        }

        for (&row, inner) in &a.rows {
            let mut acc = RoaringBitmap::new();
            for k in inner {
                if let Some(b_row) = b.rows.get(&k) {
                    acc |= b_row;
                }
            }
            if !acc.is_empty() {
                *self.rows.entry(row).or_default() |= acc;
            }
        }
        Ok(())
    }

    /// `self <- a | b`.
    pub fn ewise_add(&mut self, a: &BoolMatrix, b: &BoolMatrix) -> Result<()> {
        if a.shape() != b.shape() {
            return Err(MatrixError::DimensionMismatch {
                op: "ewise_add",
                left: a.shape(),
                right: b.shape(),
            });
        }
        if self.shape() != a.shape() {
            return Err(self.mismatch("ewise_add", a.shape()));
        }

        self.rows.clone_from(&a.rows);
        self.merge(b);
        Ok(())
    }

    /// `self |= other`.
    pub fn union_with(&mut self, other: &BoolMatrix) -> Result<()> {
        if self.shape() != other.shape() {
            return Err(self.mismatch("union_with", other.shape()));
        }
        self.merge(other);
        Ok(())
    }

    fn merge(&mut self, other: &BoolMatrix) {
        for (&row, bits) in &other.rows {
            *self.rows.entry(row).or_default() |= bits;
        }
    }

    /// `self <- a & !mask`.
    pub fn ewise_mult_inverted(&mut self, a: &BoolMatrix, mask: &BoolMatrix) -> Result<()> {
        if a.shape() != mask.shape() {
            return Err(MatrixError::DimensionMismatch {
                op: "ewise_mult_inverted",
                left: a.shape(),
                right: mask.shape(),
            });
        }
        if self.shape() != a.shape() {
            return Err(self.mismatch("ewise_mult_inverted", a.shape()));
        }

        self.clear();
        for (&row, bits) in &a.rows {
            let kept = match mask.rows.get(&row) {
                Some(masked) => bits - masked,
                None => bits.clone(),
            };
            if !kept.is_empty() {
                self.rows.insert(row, kept);
            }
        }
        Ok(())
    }

    fn check_bounds(&self, op: &'static str, row: Index, col: Index) -> Result<()> {
        if row >= self.nrows || col >= self.ncols {
            return Err(MatrixError::OutOfBounds {
                op,
                row,
                col,
                rows: self.nrows,
                cols: self.ncols,
            });
        }
        Ok(())
    }

    fn mismatch(&self, op: &'static str, expected: (Index, Index)) -> MatrixError {
        MatrixError::DimensionMismatch {
            op,
            left: self.shape(),
            right: expected,
        }
    }
}
