//! Column evaluation
use crate::{
    basis::{assemble_column, TensorProductBasis, UnivariateBasisData},
    geometry::GeometryMapData,
    options::EvalOptions,
    transport::{push_forward_gradients, push_forward_hessians},
    types::{EvalError, RealScalar},
};

/// Evaluate the tensor-product basis of one column in physical space.
///
/// Assembles values and parametric derivatives from the two univariate data
/// sets, then pushes the derivatives forward through the geometry map:
/// gradients via the inverse transpose Jacobian, Hessians via the
/// second-order chain rule through the inverse map.
///
/// `geometry` must cover exactly the column's elements, with one Jacobian per
/// 2D quadrature node per element. A Hessian request is honored only if both
/// univariate data sets and the geometry carry second derivative data;
/// otherwise the Hessian output is omitted and a warning is logged.
///
/// Fails on mismatched input shapes, an out-of-range column index, or a
/// singular Jacobian at any quadrature node; no partial results are returned.
pub fn evaluate_column<T: RealScalar>(
    column: usize,
    dir1: &UnivariateBasisData<T>,
    dir2: &UnivariateBasisData<T>,
    geometry: &GeometryMapData<T>,
    options: EvalOptions,
) -> Result<TensorProductBasis<T>, EvalError> {
    let node_count = dir1.node_count() * dir2.node_count();
    if geometry.node_count() != node_count || geometry.element_count() != dir2.element_count() {
        return Err(EvalError::ShapeMismatch {
            context: "geometry map data",
            expected: vec![node_count, dir2.element_count()],
            found: vec![geometry.node_count(), geometry.element_count()],
        });
    }
    let mut effective = options;
    if options.hessian && !geometry.has_second_derivs() {
        log::warn!(
            "Hessian requested but geometry second derivative data is missing; omitting Hessians"
        );
        effective.hessian = false;
    }

    let mut basis = assemble_column(column, dir1, dir2, effective)?;
    if basis.gradients.is_some() {
        let inverse = geometry.invert(basis.hessians.is_some())?;
        if let (Some(hessians), Some(gradients)) = (&mut basis.hessians, &basis.gradients) {
            push_forward_hessians(hessians, gradients, &inverse);
        }
        if let Some(gradients) = &mut basis.gradients {
            push_forward_gradients(gradients, &inverse);
        }
        if !options.gradient {
            basis.gradients = None;
        }
    }
    Ok(basis)
}

#[cfg(test)]
mod test {
    use super::*;
    use rlst::{
        rlst_dynamic_array2, rlst_dynamic_array3, rlst_dynamic_array4, RawAccessMut, Shape,
    };

    fn example_direction(node_count: usize, element_count: usize) -> UnivariateBasisData<f64> {
        let connectivity = rlst_dynamic_array2!(usize, [2, element_count]);
        let mut values = rlst_dynamic_array3!(f64, [node_count, 2, element_count]);
        values.data_mut().fill(1.0);
        let mut gradients = rlst_dynamic_array3!(f64, [node_count, 2, element_count]);
        gradients.data_mut().fill(0.5);
        UnivariateBasisData::new(
            vec![2; element_count],
            element_count + 1,
            connectivity,
            values,
            gradients,
            None,
        )
        .unwrap()
    }

    fn identity_geometry(node_count: usize, element_count: usize) -> GeometryMapData<f64> {
        let mut jacobians = rlst_dynamic_array4!(f64, [2, 2, node_count, element_count]);
        for e in 0..element_count {
            for q in 0..node_count {
                jacobians[[0, 0, q, e]] = 1.0;
                jacobians[[1, 1, q, e]] = 1.0;
            }
        }
        GeometryMapData::new(jacobians, None).unwrap()
    }

    fn empty_direction(node_count: usize, element_count: usize) -> UnivariateBasisData<f64> {
        let connectivity = rlst_dynamic_array2!(usize, [0, element_count]);
        let values = rlst_dynamic_array3!(f64, [node_count, 0, element_count]);
        let gradients = rlst_dynamic_array3!(f64, [node_count, 0, element_count]);
        UnivariateBasisData::new(
            vec![0; element_count],
            0,
            connectivity,
            values,
            gradients,
            None,
        )
        .unwrap()
    }

    #[test]
    fn test_direction_without_functions() {
        // a direction can carry elements on which no function is supported
        let dir1 = example_direction(2, 3);
        let dir2 = empty_direction(2, 2);
        let geometry = identity_geometry(4, 2);
        let basis = evaluate_column(0, &dir1, &dir2, &geometry, EvalOptions::default()).unwrap();
        assert_eq!(basis.values().unwrap().shape(), [4, 0, 2]);
        assert_eq!(basis.gradients().unwrap().shape(), [2, 4, 0, 2]);
    }

    #[test]
    fn test_geometry_shape_mismatch() {
        let dir1 = example_direction(2, 3);
        let dir2 = example_direction(2, 2);
        let geometry = identity_geometry(4, 3);
        let e = evaluate_column(0, &dir1, &dir2, &geometry, EvalOptions::default());
        assert_eq!(
            e.err(),
            Some(EvalError::ShapeMismatch {
                context: "geometry map data",
                expected: vec![4, 2],
                found: vec![4, 3],
            })
        );
    }

    #[test]
    fn test_hessian_downgrade_without_geometry_second_derivs() {
        let dir1 = example_direction(2, 3);
        let dir2 = example_direction(2, 2);
        let geometry = identity_geometry(4, 2);
        let options = EvalOptions {
            hessian: true,
            ..Default::default()
        };
        let basis = evaluate_column(0, &dir1, &dir2, &geometry, options).unwrap();
        assert!(basis.values().is_some());
        assert!(basis.gradients().is_some());
        assert!(basis.hessians().is_none());
    }

    #[test]
    fn test_gradient_dropped_when_not_requested() {
        let dir1 = example_direction(2, 3);
        let dir2 = example_direction(2, 2);
        let geometry = identity_geometry(4, 2);
        let options = EvalOptions {
            gradient: false,
            ..Default::default()
        };
        let basis = evaluate_column(0, &dir1, &dir2, &geometry, options).unwrap();
        assert!(basis.values().is_some());
        assert!(basis.gradients().is_none());
    }
}
