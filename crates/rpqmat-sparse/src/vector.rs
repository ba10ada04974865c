use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};

use crate::error::{MatrixError, Result};
use crate::{BoolMatrix, Index};

/// A boolean vector of fixed `size`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoolVector {
    size: Index,
    bits: RoaringBitmap,
}

impl BoolVector {
    pub fn new(size: Index) -> Self {
        Self {
            size,
            bits: RoaringBitmap::new(),
        }
    }

    pub fn from_indices(size: Index, indices: &[Index]) -> Result<Self> {
        let mut vector = Self::new(size);
        vector.build(indices)?;
        Ok(vector)
    }

    /// Replace the content with `indices`.
    pub fn build(&mut self, indices: &[Index]) -> Result<()> {
        let mut bits = RoaringBitmap::new();
        for &index in indices {
            if index >= self.size {
                return Err(MatrixError::OutOfBounds {
                    op: "vector_build",
                    row: index,
                    col: 0,
                    rows: self.size,
                    cols: 1,
                });
            }
            bits.insert(index);
        }
        self.bits = bits;
        Ok(())
    }

    pub fn size(&self) -> Index {
        self.size
    }

    pub fn nvals(&self) -> u64 {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn contains(&self, index: Index) -> bool {
        self.bits.contains(index)
    }

    /// Set indices in ascending order.
    pub fn extract_values(&self) -> Vec<Index> {
        self.bits.iter().collect()
    }

    pub fn as_bitmap(&self) -> &RoaringBitmap {
        &self.bits
    }

    /// `self <- v^T x m`: the union of the rows of `m` selected by `v`.
    pub fn vxm(&mut self, v: &BoolVector, m: &BoolMatrix) -> Result<()> {
        if v.size != m.nrows() {
            return Err(MatrixError::DimensionMismatch {
                op: "vxm",
                left: (1, v.size),
                right: m.shape(),
            });
        }
        if self.size != m.ncols() {
            return Err(MatrixError::DimensionMismatch {
                op: "vxm",
                left: (1, self.size),
                right: (1, m.ncols()),
            });
        }

        let mut out = RoaringBitmap::new();
        for index in &v.bits {
            if let Some(row) = m.row(index) {
                out |= row;
            }
        }
        self.bits = out;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vxm_unions_selected_rows() {
        let m = BoolMatrix::from_coordinates(3, 4, &[0, 1, 2], &[1, 3, 0]).unwrap();
        let v = BoolVector::from_indices(3, &[0, 2]).unwrap();
        let mut out = BoolVector::new(4);
        out.vxm(&v, &m).unwrap();
        assert_eq!(out.extract_values(), vec![0, 1]);
        assert_eq!(out.nvals(), 2);
    }

    #[test]
    fn vxm_checks_shapes() {
        let m = BoolMatrix::new(3, 4);
        let v = BoolVector::new(4);
        let mut out = BoolVector::new(4);
        assert!(out.vxm(&v, &m).is_err());
    }

    #[test]
    fn build_rejects_out_of_range_index() {
        assert!(BoolVector::from_indices(2, &[2]).is_err());
    }
}
