use esi_numerics::Dense3D;

use crate::morphology::{dilate, erode};
use crate::volume::Volume;

fn build_from_fn(v: &Volume, f: impl Fn(usize, usize, usize) -> f32 + Sync) -> Volume {
    let (d1, d2, d3) = v.dims();
    let built = v.par_build_outer_planes(|i| {
        let mut plane = vec![0f32; d2 * d3];
        for j in 0..d2 {
            for k in 0..d3 {
                plane[j * d3 + k] = f(i, j, k);
            }
        }
        plane
    });
    let mut out = v.clone();
    let mut dense = Dense3D::<f32>::new(d1, d2, d3);
    dense.as_mut_slice().copy_from_slice(built.as_slice());
    *out.data_mut() = dense;
    out
}

/// `KCurvature`: a discrete finite-difference estimate of mean curvature,
/// the 6-neighbor Laplacian normalized by neighbor count (spec.md §4.3).
/// Positive where the field is locally convex, negative where concave.
pub fn k_curvature(v: &Volume) -> Volume {
    let (d1, d2, d3) = v.dims();
    let data = v.data();
    let background = v.background();
    build_from_fn(v, move |i, j, k| {
        let center = *data.get_unchecked(i, j, k);
        let mut sum = 0.0f32;
        let mut n = 0;
        let offsets = [
            (-1i64, 0i64, 0i64),
            (1, 0, 0),
            (0, -1, 0),
            (0, 1, 0),
            (0, 0, -1),
            (0, 0, 1),
        ];
        for (di, dj, dk) in offsets {
            let (ni, nj, nk) = (i as i64 + di, j as i64 + dj, k as i64 + dk);
            if ni < 0 || nj < 0 || nk < 0 || ni as usize >= d1 || nj as usize >= d2 || nk as usize >= d3 {
                sum += background;
            } else {
                sum += *data.get_unchecked(ni as usize, nj as usize, nk as usize);
            }
            n += 1;
        }
        (sum / n as f32) - center
    })
}

/// Internal morphological gradient: `V - erode(V)`, the boundary shell
/// carved from inside the mask.
pub fn morph_gradient_internal(v: &Volume, diameter: f64) -> Volume {
    let eroded = erode(v, diameter);
    let mut out = v.clone();
    let (d1, d2, d3) = v.dims();
    let mut dense = Dense3D::<f32>::new(d1, d2, d3);
    for idx in 0..dense.len() {
        let (i, j, k) = dense.xyz_of(idx);
        let val = *v.data().get_unchecked(i, j, k) - *eroded.data().get_unchecked(i, j, k);
        dense.set_unchecked(i, j, k, val);
    }
    *out.data_mut() = dense;
    out
}

/// External morphological gradient: `dilate(V) - V`, the boundary shell
/// grown from outside the mask.
pub fn morph_gradient_external(v: &Volume, diameter: f64) -> Volume {
    let dilated = dilate(v, diameter);
    let mut out = v.clone();
    let mut dense = Dense3D::<f32>::new(v.dims().0, v.dims().1, v.dims().2);
    for idx in 0..dense.len() {
        let (i, j, k) = dense.xyz_of(idx);
        let val = *dilated.data().get_unchecked(i, j, k) - *v.data().get_unchecked(i, j, k);
        dense.set_unchecked(i, j, k, val);
    }
    *out.data_mut() = dense;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn k_curvature_is_zero_on_a_flat_field() {
        let mut v = Volume::new(4, 4, 4, 1.0);
        for idx in 0..v.data().len() {
            let (i, j, k) = v.data().xyz_of(idx);
            v.set(i, j, k, 2.0).unwrap();
        }
        let out = k_curvature(&v);
        approx::assert_abs_diff_eq!(out.get(2, 2, 2).unwrap(), 0.0, epsilon = 1e-6);
    }

    #[test]
    fn internal_and_external_gradients_are_nonnegative_on_a_mask() {
        let mut v = Volume::new(5, 5, 5, 1.0);
        for idx in 0..v.data().len() {
            let (i, j, k) = v.data().xyz_of(idx);
            let inside = i.abs_diff(2) <= 1 && j.abs_diff(2) <= 1 && k.abs_diff(2) <= 1;
            v.set(i, j, k, if inside { 1.0 } else { 0.0 }).unwrap();
        }
        let internal = morph_gradient_internal(&v, 3.0);
        let external = morph_gradient_external(&v, 3.0);
        assert!(internal.data().iter().all(|&x| x >= -1e-6));
        assert!(external.data().iter().all(|&x| x >= -1e-6));
    }
}
