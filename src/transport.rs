//! Pushforward of parametric derivatives to physical space
use crate::{
    geometry::InverseMapData,
    types::{Array4D, RealScalar},
};
use itertools::izip;
use rayon::prelude::{IndexedParallelIterator, ParallelIterator, ParallelSlice, ParallelSliceMut};
use rlst::{RawAccess, RawAccessMut, Shape};

/// Gradient pushforward for one element.
///
/// `grad` holds `[2, node_count, function_count]` parametric gradients and
/// `inv1` the `[2, 2, node_count]` inverse Jacobian entries, both flat in
/// column-major order.
fn gradient_element<T: RealScalar>(grad: &mut [T], inv1: &[T], node_count: usize) {
    for function in grad.chunks_exact_mut(2 * node_count) {
        for (g, k) in izip!(function.chunks_exact_mut(2), inv1.chunks_exact(4)) {
            let g_u = g[0];
            let g_v = g[1];
            g[0] = k[0] * g_u + k[1] * g_v;
            g[1] = k[2] * g_u + k[3] * g_v;
        }
    }
}

/// Hessian pushforward for one element.
///
/// `hess` holds `[4, node_count, function_count]` parametric Hessians and is
/// overwritten with physical ones; `grad` must still hold the parametric
/// gradients. `inv2` holds the `[2, 3, node_count]` second derivatives of the
/// inverse map.
fn hessian_element<T: RealScalar>(
    hess: &mut [T],
    grad: &[T],
    inv1: &[T],
    inv2: &[T],
    node_count: usize,
) {
    for (h_function, g_function) in izip!(
        hess.chunks_exact_mut(4 * node_count),
        grad.chunks_exact(2 * node_count)
    ) {
        for (h, g, k, k2) in izip!(
            h_function.chunks_exact_mut(4),
            g_function.chunks_exact(2),
            inv1.chunks_exact(4),
            inv2.chunks_exact(6)
        ) {
            let mut out = [T::zero(); 4];
            for b in 0..2 {
                for a in 0..2 {
                    let mut entry = g[0] * k2[2 * (a + b)] + g[1] * k2[1 + 2 * (a + b)];
                    for p2 in 0..2 {
                        for p1 in 0..2 {
                            entry = entry + h[p1 + 2 * p2] * k[p1 + 2 * a] * k[p2 + 2 * b];
                        }
                    }
                    out[a + 2 * b] = entry;
                }
            }
            h.copy_from_slice(&out);
        }
    }
}

/// Apply the inverse transpose Jacobian to every parametric gradient in place.
///
/// Elements carry no data dependency on each other, so the column is
/// processed in parallel along the element axis.
pub fn push_forward_gradients<T: RealScalar>(
    gradients: &mut Array4D<T>,
    inverse: &InverseMapData<T>,
) {
    let shape = gradients.shape();
    let node_count = shape[1];
    debug_assert_eq!(
        inverse.first().shape(),
        [2, 2, node_count, shape[3]],
        "inverse map data does not match the gradient array"
    );
    if 2 * node_count * shape[2] == 0 {
        // zero chunk lengths are rejected by the chunk iterators
        return;
    }
    gradients
        .data_mut()
        .par_chunks_mut(2 * node_count * shape[2])
        .zip(inverse.first().data().par_chunks(4 * node_count))
        .for_each(|(grad, inv1)| gradient_element(grad, inv1, node_count));
}

/// Apply the second-order chain rule to every parametric Hessian in place.
///
/// `gradients` must still be parametric; callers push Hessians forward
/// before gradients. Requires the second derivatives of the inverse map.
pub fn push_forward_hessians<T: RealScalar>(
    hessians: &mut Array4D<T>,
    gradients: &Array4D<T>,
    inverse: &InverseMapData<T>,
) {
    let shape = hessians.shape();
    let node_count = shape[1];
    debug_assert_eq!(gradients.shape(), [2, node_count, shape[2], shape[3]]);
    let second = inverse
        .second()
        .expect("Hessian pushforward requires second derivatives of the inverse map");
    debug_assert_eq!(second.shape(), [2, 3, node_count, shape[3]]);
    if 4 * node_count * shape[2] == 0 {
        return;
    }
    hessians
        .data_mut()
        .par_chunks_mut(4 * node_count * shape[2])
        .zip(gradients.data().par_chunks(2 * node_count * shape[2]))
        .zip(inverse.first().data().par_chunks(4 * node_count))
        .zip(second.data().par_chunks(6 * node_count))
        .for_each(|(((hess, grad), inv1), inv2)| {
            hessian_element(hess, grad, inv1, inv2, node_count)
        });
}
