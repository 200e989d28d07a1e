//! Tensor-product basis evaluation on structured quadrilateral meshes
#![cfg_attr(feature = "strict", deny(warnings), deny(unused_crate_dependencies))]
#![warn(missing_docs)]

pub mod basis;
pub mod evaluate;
pub mod geometry;
pub mod options;
pub mod transport;
pub mod types;

pub use basis::{assemble_column, TensorProductBasis, UnivariateBasisData};
pub use evaluate::evaluate_column;
pub use geometry::{GeometryMapData, InverseMapData};
pub use options::EvalOptions;
