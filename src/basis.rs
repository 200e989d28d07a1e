//! Univariate basis data and tensor-product assembly
use crate::{
    options::EvalOptions,
    types::{Array2D, Array3D, Array4D, EvalError, RealScalar, TensorLayout},
};
use rlst::{rlst_dynamic_array2, rlst_dynamic_array3, rlst_dynamic_array4, Shape};

/// Basis data along one parametric direction.
///
/// All dense arrays are indexed `[node, local_function, element]` with the
/// node index running over the quadrature nodes of that direction. Slots with
/// `local_function >= count(element)` are ignored.
#[derive(Debug)]
pub struct UnivariateBasisData<T: RealScalar> {
    counts: Vec<usize>,
    max_count: usize,
    dim: usize,
    connectivity: Array2D<usize>,
    values: Array3D<T>,
    gradients: Array3D<T>,
    second_derivs: Option<Array3D<T>>,
}

fn check_shape<const N: usize>(
    context: &'static str,
    expected: [usize; N],
    found: [usize; N],
) -> Result<(), EvalError> {
    if expected == found {
        Ok(())
    } else {
        Err(EvalError::ShapeMismatch {
            context,
            expected: expected.to_vec(),
            found: found.to_vec(),
        })
    }
}

impl<T: RealScalar> UnivariateBasisData<T> {
    /// Create new, validating that all arrays agree with `counts`.
    ///
    /// `counts` holds the number of nonzero basis functions on each element
    /// of the direction, `dim` the total number of global functions, and
    /// `connectivity` the global function index of each local function per
    /// element, shaped `[max_count, element_count]`.
    pub fn new(
        counts: Vec<usize>,
        dim: usize,
        connectivity: Array2D<usize>,
        values: Array3D<T>,
        gradients: Array3D<T>,
        second_derivs: Option<Array3D<T>>,
    ) -> Result<Self, EvalError> {
        let max_count = counts.iter().copied().max().unwrap_or(0);
        let element_count = counts.len();
        let node_count = values.shape()[0];
        check_shape(
            "univariate connectivity",
            [max_count, element_count],
            connectivity.shape(),
        )?;
        check_shape(
            "univariate values",
            [node_count, max_count, element_count],
            values.shape(),
        )?;
        check_shape("univariate gradients", values.shape(), gradients.shape())?;
        if let Some(d2) = &second_derivs {
            check_shape("univariate second derivatives", values.shape(), d2.shape())?;
        }
        Ok(Self {
            counts,
            max_count,
            dim,
            connectivity,
            values,
            gradients,
            second_derivs,
        })
    }
    /// Number of quadrature nodes along this direction
    pub fn node_count(&self) -> usize {
        self.values.shape()[0]
    }
    /// Number of elements along this direction
    pub fn element_count(&self) -> usize {
        self.counts.len()
    }
    /// Maximum number of nonzero functions over all elements
    pub fn max_count(&self) -> usize {
        self.max_count
    }
    /// Number of nonzero functions on element `element`
    pub fn count(&self, element: usize) -> usize {
        self.counts[element]
    }
    /// Total number of global functions along this direction
    pub fn dim(&self) -> usize {
        self.dim
    }
    /// Whether second derivative data was supplied
    pub fn has_second_derivs(&self) -> bool {
        self.second_derivs.is_some()
    }
}

/// Tensor-product basis data for the elements of one column.
///
/// Local functions are packed: only the first `counts()[e]` functions of
/// element `e` are meaningful, slots beyond hold zeros. Gradients carry a
/// leading axis of size 2 (the derivative component) and
/// Hessians a leading axis of size 4 holding the row-major 2x2 matrix; the
/// two mixed slots are equal. Directly after [`assemble_column`] the
/// derivatives are parametric; [`crate::evaluate_column`] returns them pushed
/// forward to physical space.
#[derive(Debug)]
pub struct TensorProductBasis<T: RealScalar> {
    pub(crate) elements: Vec<usize>,
    pub(crate) counts: Vec<usize>,
    pub(crate) max_count: usize,
    pub(crate) dim: usize,
    pub(crate) node_layout: TensorLayout,
    pub(crate) connectivity: Array2D<usize>,
    pub(crate) values: Option<Array3D<T>>,
    pub(crate) gradients: Option<Array4D<T>>,
    pub(crate) hessians: Option<Array4D<T>>,
}

impl<T: RealScalar> TensorProductBasis<T> {
    /// Global element indices of the column, ordered along direction 2
    pub fn elements(&self) -> &[usize] {
        &self.elements
    }
    /// Number of nonzero functions on each element of the column
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }
    /// Maximum number of nonzero functions over the column's elements
    pub fn max_count(&self) -> usize {
        self.max_count
    }
    /// Total number of global functions in the tensor-product space
    pub fn dim(&self) -> usize {
        self.dim
    }
    /// Number of 2D quadrature nodes per element
    pub fn node_count(&self) -> usize {
        self.node_layout.len()
    }
    /// Layout mapping `(node1, node2)` pairs to flat 2D node indices
    pub fn node_layout(&self) -> TensorLayout {
        self.node_layout
    }
    /// Global function index per local function per element, shaped `[max_count, element_count]`
    pub fn connectivity(&self) -> &Array2D<usize> {
        &self.connectivity
    }
    /// Basis values, shaped `[node_count, max_count, element_count]`
    pub fn values(&self) -> Option<&Array3D<T>> {
        self.values.as_ref()
    }
    /// Basis gradients, shaped `[2, node_count, max_count, element_count]`
    pub fn gradients(&self) -> Option<&Array4D<T>> {
        self.gradients.as_ref()
    }
    /// Basis Hessians, shaped `[4, node_count, max_count, element_count]`
    pub fn hessians(&self) -> Option<&Array4D<T>> {
        self.hessians.as_ref()
    }
}

/// Assemble the 2D basis data of one column in the parametric domain.
///
/// Direction-1 data is taken at the fixed `column` element index and
/// broadcast over the column's elements; direction-2 data varies per element.
/// The 2D quadrature node index flattens `(node1, node2)` pairs and the local
/// function index flattens `(function1, function2)` pairs, both via
/// [`TensorLayout`] with direction 1 fastest.
///
/// A Hessian request is honored only if both directions carry second
/// derivative data; otherwise the Hessian output is omitted and a warning is
/// logged. Gradients are assembled whenever Hessians are, since the
/// pushforward to physical space consumes them.
pub fn assemble_column<T: RealScalar>(
    column: usize,
    dir1: &UnivariateBasisData<T>,
    dir2: &UnivariateBasisData<T>,
    options: EvalOptions,
) -> Result<TensorProductBasis<T>, EvalError> {
    if column >= dir1.element_count() {
        return Err(EvalError::ColumnOutOfRange {
            column,
            count: dir1.element_count(),
        });
    }
    let hessian = options.hessian && dir1.has_second_derivs() && dir2.has_second_derivs();
    if options.hessian && !hessian {
        log::warn!(
            "Hessian requested but univariate second derivative data is missing; omitting Hessians"
        );
    }
    let gradient = options.gradient || hessian;

    let element_count = dir2.element_count();
    let node_layout = TensorLayout::new(dir1.node_count(), dir2.node_count());
    let function_layout = TensorLayout::new(dir1.max_count(), dir2.max_count());
    let node_count = node_layout.len();
    let max_count = function_layout.len();

    let elements = (0..element_count)
        .map(|e| column + dir1.element_count() * e)
        .collect::<Vec<_>>();
    let counts = (0..element_count)
        .map(|e| dir1.count(column) * dir2.count(e))
        .collect::<Vec<_>>();

    let mut connectivity = rlst_dynamic_array2!(usize, [max_count, element_count]);
    for e in 0..element_count {
        let local_layout = TensorLayout::new(dir1.count(column), dir2.count(e));
        for j in 0..dir2.count(e) {
            for i in 0..dir1.count(column) {
                let s = local_layout.flatten(i, j);
                connectivity[[s, e]] =
                    dir1.connectivity[[i, column]] + dir1.dim() * dir2.connectivity[[j, e]];
            }
        }
    }

    let mut values = options
        .value
        .then(|| rlst_dynamic_array3!(T, [node_count, max_count, element_count]));
    let mut gradients =
        gradient.then(|| rlst_dynamic_array4!(T, [2, node_count, max_count, element_count]));
    let mut hessians =
        hessian.then(|| rlst_dynamic_array4!(T, [4, node_count, max_count, element_count]));

    for e in 0..element_count {
        let local_layout = TensorLayout::new(dir1.count(column), dir2.count(e));
        for j in 0..dir2.count(e) {
            for i in 0..dir1.count(column) {
                let s = local_layout.flatten(i, j);
                for q2 in 0..dir2.node_count() {
                    for q1 in 0..dir1.node_count() {
                        let q = node_layout.flatten(q1, q2);
                        let v1 = dir1.values[[q1, i, column]];
                        let v2 = dir2.values[[q2, j, e]];
                        let g1 = dir1.gradients[[q1, i, column]];
                        let g2 = dir2.gradients[[q2, j, e]];
                        if let Some(values) = &mut values {
                            values[[q, s, e]] = v1 * v2;
                        }
                        if let Some(gradients) = &mut gradients {
                            gradients[[0, q, s, e]] = g1 * v2;
                            gradients[[1, q, s, e]] = v1 * g2;
                        }
                        if let Some(hessians) = &mut hessians {
                            let d1 = dir1.second_derivs.as_ref().unwrap()[[q1, i, column]];
                            let d2 = dir2.second_derivs.as_ref().unwrap()[[q2, j, e]];
                            hessians[[0, q, s, e]] = d1 * v2;
                            hessians[[1, q, s, e]] = g1 * g2;
                            hessians[[2, q, s, e]] = g1 * g2;
                            hessians[[3, q, s, e]] = v1 * d2;
                        }
                    }
                }
            }
        }
    }

    Ok(TensorProductBasis {
        elements,
        counts,
        max_count,
        dim: dir1.dim() * dir2.dim(),
        node_layout,
        connectivity,
        values,
        gradients,
        hessians,
    })
}
