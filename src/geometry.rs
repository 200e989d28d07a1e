//! Geometry map data for one column and its inversion
use crate::types::{Array4D, EvalError, RealScalar};
use rlst::{rlst_dynamic_array4, Shape};

/// First and, optionally, second derivatives of the geometry map at every
/// quadrature node of every element of a column.
///
/// `jacobians` is indexed `[physical_component, parametric_component, node,
/// element]`, so `[[gd, td, q, e]]` holds the derivative of physical
/// coordinate `gd` with respect to parametric coordinate `td`. The second
/// derivative axis of length 3 runs over the (uu, uv, vv) derivative pairs.
#[derive(Debug)]
pub struct GeometryMapData<T: RealScalar> {
    jacobians: Array4D<T>,
    second_derivs: Option<Array4D<T>>,
}

impl<T: RealScalar> GeometryMapData<T> {
    /// Create new, validating the array shapes against each other
    pub fn new(
        jacobians: Array4D<T>,
        second_derivs: Option<Array4D<T>>,
    ) -> Result<Self, EvalError> {
        let shape = jacobians.shape();
        if shape[0] != 2 || shape[1] != 2 {
            return Err(EvalError::ShapeMismatch {
                context: "geometry jacobians",
                expected: vec![2, 2, shape[2], shape[3]],
                found: shape.to_vec(),
            });
        }
        if let Some(d2) = &second_derivs {
            if d2.shape() != [2, 3, shape[2], shape[3]] {
                return Err(EvalError::ShapeMismatch {
                    context: "geometry second derivatives",
                    expected: vec![2, 3, shape[2], shape[3]],
                    found: d2.shape().to_vec(),
                });
            }
        }
        Ok(Self {
            jacobians,
            second_derivs,
        })
    }
    /// Number of 2D quadrature nodes per element
    pub fn node_count(&self) -> usize {
        self.jacobians.shape()[2]
    }
    /// Number of elements covered
    pub fn element_count(&self) -> usize {
        self.jacobians.shape()[3]
    }
    /// Whether second derivative data was supplied
    pub fn has_second_derivs(&self) -> bool {
        self.second_derivs.is_some()
    }

    /// Invert the map's derivatives at every node of every element.
    ///
    /// The first derivatives of the inverse map are the entries of the
    /// inverse Jacobian. When `with_second` is set and second derivative data
    /// is present, the second derivatives of the inverse map follow from
    /// differentiating the identity `J * J^{-1} = I` with respect to each
    /// physical coordinate and contracting the map's second derivatives with
    /// the known inverse; callers that only need gradients pass `false` to
    /// skip that work.
    ///
    /// Fails with [`EvalError::SingularJacobian`] at the first node whose
    /// Jacobian determinant vanishes within a scale-aware tolerance.
    pub fn invert(&self, with_second: bool) -> Result<InverseMapData<T>, EvalError> {
        let node_count = self.node_count();
        let element_count = self.element_count();
        let mut first = rlst_dynamic_array4!(T, [2, 2, node_count, element_count]);
        let mut second = self
            .second_derivs
            .as_ref()
            .filter(|_| with_second)
            .map(|_| rlst_dynamic_array4!(T, [2, 3, node_count, element_count]));

        for e in 0..element_count {
            for q in 0..node_count {
                let x_u = self.jacobians[[0, 0, q, e]];
                let x_v = self.jacobians[[0, 1, q, e]];
                let y_u = self.jacobians[[1, 0, q, e]];
                let y_v = self.jacobians[[1, 1, q, e]];
                let det = x_u * y_v - x_v * y_u;
                // Qualified: both Float::abs and RlstScalar::abs apply to T
                let scale = num::Float::abs(x_u * y_v) + num::Float::abs(x_v * y_u);
                if num::Float::abs(det) <= T::epsilon() * scale {
                    return Err(EvalError::SingularJacobian {
                        node: q,
                        element: e,
                    });
                }
                let u_x = y_v / det;
                let u_y = -x_v / det;
                let v_x = -y_u / det;
                let v_y = x_u / det;
                first[[0, 0, q, e]] = u_x;
                first[[0, 1, q, e]] = u_y;
                first[[1, 0, q, e]] = v_x;
                first[[1, 1, q, e]] = v_y;

                if let Some(second) = &mut second {
                    let d2 = self.second_derivs.as_ref().unwrap();
                    // Second derivatives of each physical coordinate,
                    // contracted with a pair of inverse first derivatives
                    let contract = |gd: usize, da: [T; 2], db: [T; 2]| {
                        d2[[gd, 0, q, e]] * da[0] * db[0]
                            + d2[[gd, 1, q, e]] * (da[0] * db[1] + da[1] * db[0])
                            + d2[[gd, 2, q, e]] * da[1] * db[1]
                    };
                    // Derivatives of (u, v) with respect to each physical coordinate
                    let dx = [u_x, v_x];
                    let dy = [u_y, v_y];
                    for (k, (da, db)) in [(dx, dx), (dx, dy), (dy, dy)].iter().enumerate() {
                        let s_x = contract(0, *da, *db);
                        let s_y = contract(1, *da, *db);
                        second[[0, k, q, e]] = -(u_x * s_x + u_y * s_y);
                        second[[1, k, q, e]] = -(v_x * s_x + v_y * s_y);
                    }
                }
            }
        }
        Ok(InverseMapData { first, second })
    }
}

/// Derivatives of the inverse geometry map, one entry per node per element.
///
/// `first` is indexed `[parametric_component, physical_component, node,
/// element]`, the transpose layout of the forward Jacobian; `second` runs
/// over the (xx, xy, yy) physical derivative pairs.
#[derive(Debug)]
pub struct InverseMapData<T: RealScalar> {
    pub(crate) first: Array4D<T>,
    pub(crate) second: Option<Array4D<T>>,
}

impl<T: RealScalar> InverseMapData<T> {
    /// Inverse Jacobian entries, shaped `[2, 2, node_count, element_count]`
    pub fn first(&self) -> &Array4D<T> {
        &self.first
    }
    /// Second derivatives of the inverse map, shaped `[2, 3, node_count, element_count]`
    pub fn second(&self) -> Option<&Array4D<T>> {
        self.second.as_ref()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn constant_map(j: [f64; 4], d2: Option<[f64; 6]>) -> GeometryMapData<f64> {
        let mut jacobians = rlst_dynamic_array4!(f64, [2, 2, 1, 1]);
        jacobians[[0, 0, 0, 0]] = j[0];
        jacobians[[0, 1, 0, 0]] = j[1];
        jacobians[[1, 0, 0, 0]] = j[2];
        jacobians[[1, 1, 0, 0]] = j[3];
        let second_derivs = d2.map(|d| {
            let mut a = rlst_dynamic_array4!(f64, [2, 3, 1, 1]);
            for gd in 0..2 {
                for k in 0..3 {
                    a[[gd, k, 0, 0]] = d[3 * gd + k];
                }
            }
            a
        });
        GeometryMapData::new(jacobians, second_derivs).unwrap()
    }

    #[test]
    fn test_inverse_jacobian() {
        let map = constant_map([2.0, 1.0, 0.5, 3.0], None);
        let inverse = map.invert(false).unwrap();
        // [[2, 1], [0.5, 3]]^{-1} = [[3, -1], [-0.5, 2]] / 5.5
        assert_relative_eq!(inverse.first()[[0, 0, 0, 0]], 3.0 / 5.5);
        assert_relative_eq!(inverse.first()[[0, 1, 0, 0]], -1.0 / 5.5);
        assert_relative_eq!(inverse.first()[[1, 0, 0, 0]], -0.5 / 5.5);
        assert_relative_eq!(inverse.first()[[1, 1, 0, 0]], 2.0 / 5.5);
        assert!(inverse.second().is_none());
    }

    #[test]
    fn test_singular_jacobian_reported() {
        let map = constant_map([1.0, 2.0, 2.0, 4.0], None);
        assert_eq!(
            map.invert(false).err(),
            Some(EvalError::SingularJacobian {
                node: 0,
                element: 0
            })
        );
    }

    #[test]
    fn test_quadratic_map_second_derivatives() {
        // x = u^2, y = v at u = 0.5: u = sqrt(x) gives u_xx = -1/(4 u^3) = -2
        let map = constant_map([1.0, 0.0, 0.0, 1.0], Some([2.0, 0.0, 0.0, 0.0, 0.0, 0.0]));
        let inverse = map.invert(true).unwrap();
        let second = inverse.second().unwrap();
        assert_relative_eq!(second[[0, 0, 0, 0]], -2.0);
        assert_relative_eq!(second[[0, 1, 0, 0]], 0.0);
        assert_relative_eq!(second[[0, 2, 0, 0]], 0.0);
        for k in 0..3 {
            assert_relative_eq!(second[[1, k, 0, 0]], 0.0);
        }
    }

    #[test]
    fn test_singular_detection_is_scale_aware() {
        // well-conditioned but tiny entries invert fine
        let map = constant_map([1.0e-8, 0.0, 0.0, 1.0e-8], None);
        let inverse = map.invert(false).unwrap();
        assert_relative_eq!(inverse.first()[[0, 0, 0, 0]], 1.0e8);
        // rank one stays singular at the same magnitude
        let map = constant_map([1.0e-8, 2.0e-8, 2.0e-8, 4.0e-8], None);
        assert_eq!(
            map.invert(false).err(),
            Some(EvalError::SingularJacobian {
                node: 0,
                element: 0
            })
        );
    }

    #[test]
    fn test_second_derivatives_skipped_when_not_needed() {
        let map = constant_map([1.0, 0.0, 0.0, 1.0], Some([2.0, 0.0, 0.0, 0.0, 0.0, 0.0]));
        assert!(map.has_second_derivs());
        let inverse = map.invert(false).unwrap();
        assert!(inverse.second().is_none());
    }

    #[test]
    fn test_shape_validation() {
        let jacobians = rlst_dynamic_array4!(f64, [2, 2, 4, 3]);
        let d2 = rlst_dynamic_array4!(f64, [2, 3, 4, 2]);
        let e = GeometryMapData::new(jacobians, Some(d2));
        assert!(matches!(
            e,
            Err(EvalError::ShapeMismatch {
                context: "geometry second derivatives",
                ..
            })
        ));
    }
}
