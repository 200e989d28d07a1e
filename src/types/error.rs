//! Errors

use thiserror::Error;

/// An error produced while evaluating a column
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// An option key that is not recognized
    #[error("Unknown option key: {0}")]
    UnknownOption(String),
    /// A column index outside the mesh
    #[error("Column index {column} out of range for {count} elements in direction 1")]
    ColumnOutOfRange {
        /// The requested column index
        column: usize,
        /// The number of elements in direction 1
        count: usize,
    },
    /// Input arrays whose shapes do not agree
    #[error("Shape mismatch for {context}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        /// The array being checked
        context: &'static str,
        /// The shape implied by the other inputs
        expected: Vec<usize>,
        /// The shape found
        found: Vec<usize>,
    },
    /// A geometry Jacobian that cannot be inverted
    #[error("Singular Jacobian at quadrature node {node} of element {element}")]
    SingularJacobian {
        /// The flat 2D quadrature node index
        node: usize,
        /// The element index within the column
        element: usize,
    },
}
