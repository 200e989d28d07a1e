//! Types

mod error;
pub use error::EvalError;

use num::Float;
use rlst::{Array, BaseArray, RlstScalar, VectorContainer};

/// A real scalar that can fill the dense arrays used throughout this crate
pub trait RealScalar: Float + RlstScalar<Real = Self> + Send + Sync {}

impl RealScalar for f32 {}
impl RealScalar for f64 {}

/// An N-dimensional array
pub type ArrayND<const N: usize, T> = Array<T, BaseArray<T, VectorContainer<T>, N>, N>;
/// A 2-dimensional array
pub type Array2D<T> = ArrayND<2, T>;
/// A 3-dimensional array
pub type Array3D<T> = ArrayND<3, T>;
/// A 4-dimensional array
pub type Array4D<T> = ArrayND<4, T>;

/// Flattening of index pairs along two parametric directions.
///
/// The direction-1 index varies fastest, matching the column-major ordering
/// of the dense arrays. The same layout is used for quadrature node pairs and
/// for local basis function pairs, so every component of the evaluation
/// agrees on how 2D indices are linearized.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct TensorLayout {
    size1: usize,
    size2: usize,
}

impl TensorLayout {
    /// Create new
    pub fn new(size1: usize, size2: usize) -> Self {
        Self { size1, size2 }
    }
    /// Number of index pairs
    pub fn len(&self) -> usize {
        self.size1 * self.size2
    }
    /// True if either direction is empty
    pub fn is_empty(&self) -> bool {
        self.size1 == 0 || self.size2 == 0
    }
    /// Flat index of the pair `(index1, index2)`
    pub fn flatten(&self, index1: usize, index2: usize) -> usize {
        debug_assert!(index1 < self.size1 && index2 < self.size2);
        index1 + self.size1 * index2
    }
    /// Index pair of a flat index
    pub fn unflatten(&self, index: usize) -> (usize, usize) {
        debug_assert!(index < self.len());
        (index % self.size1, index / self.size1)
    }
}
