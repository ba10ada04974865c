//! Sparse boolean matrices for bulk graph traversal.
//!
//! A CPU backend for the handful of GraphBLAS-style primitives that
//! regular path query evaluation needs:
//!
//! 1. **Build / extract**: coordinate lists in, coordinate lists out
//! 2. **Products**: `mxm` (optionally accumulating) and `vxm`
//! 3. **Element-wise**: union and union-with-complement-mask
//! 4. **Transpose**
//!
//! Rows are Roaring bitmaps keyed by row index. Only non-empty rows are
//! stored, which keeps frontiers with a few automaton states over millions
//! of graph vertices cheap.
//!
//! Destination-passing operations (`dst.mxm(a, b, ..)`) take `&mut self`
//! for the output and `&` for the inputs, so an output can never alias an
//! input.

mod error;
mod matrix;
mod vector;

pub use error::{MatrixError, Result};
pub use matrix::BoolMatrix;
pub use vector::BoolVector;

/// Row / column index type.
pub type Index = u32;
