use esi_numerics::Dense3D;
use esi_stats::Stats;

use crate::volume::Volume;
use crate::window::{for_each_cube_offset, sample_or_background};

fn gaussian_weight(d2: i64, sigma: f64) -> f64 {
    (-(d2 as f64) / (2.0 * sigma * sigma)).exp()
}

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

/// True discrete Gaussian convolution, truncated at `3 * sigma` voxels
/// in each direction.
pub fn gaussian(v: &Volume, sigma: f64) -> Volume {
    let radius = (3.0 * sigma).ceil() as i64;
    let dims = v.dims();
    let background = v.background();
    let data = v.data();
    build_from_fn(v, move |i, j, k| {
        let mut sum = 0.0;
        let mut weight_sum = 0.0;
        for_each_cube_offset(radius, |di, dj, dk| {
            let dist2 = (di * di + dj * dj + dk * dk) as i64;
            let w = gaussian_weight(dist2, sigma);
            let x = sample_or_background(
                data,
                dims,
                i as i64 + di,
                j as i64 + dj,
                k as i64 + dk,
                background,
            ) as f64;
            sum += w * x;
            weight_sum += w;
        });
        (sum / weight_sum) as f32
    })
}

/// Approximate Gaussian via three passes of a box-average filter, the
/// classic fast approximation (spec.md §4.3 `FastGaussian`); the
/// equivalent box radius follows the standard relation
/// `r = sqrt((12*sigma^2/n) + 1) / 2` with `n = 3` passes.
pub fn fast_gaussian(v: &Volume, sigma: f64) -> Volume {
    let ideal_width = ((12.0 * sigma * sigma / 3.0) + 1.0).sqrt();
    let radius = ((ideal_width - 1.0) / 2.0).round().max(1.0) as i64;
    let mut current = v.clone();
    for _ in 0..3 {
        let dims = current.dims();
        let background = current.background();
        let snapshot = current.clone();
        current = build_from_fn(&current, move |i, j, k| {
            let mut sum = 0.0;
            let mut n = 0.0;
            for_each_cube_offset(radius, |di, dj, dk| {
                sum += sample_or_background(
                    snapshot.data(),
                    dims,
                    i as i64 + di,
                    j as i64 + dj,
                    k as i64 + dk,
                    background,
                ) as f64;
                n += 1.0;
            });
            (sum / n) as f32
        });
    }
    current
}

/// `Relax`: a single 3x3x3 neighborhood average, counting only
/// neighbors inside the grid (no background padding), matching the
/// original's "iterated average with count" contract. Applying it
/// `iterations` times smooths progressively stronger.
pub fn relax(v: &Volume, iterations: usize) -> Volume {
    let mut current = v.clone();
    for _ in 0..iterations {
        let dims = current.dims();
        let snapshot = current.clone();
        current = build_from_fn(&current, move |i, j, k| {
            let mut sum = 0.0;
            let mut n = 0.0;
            let (d1, d2, d3) = dims;
            for di in -1i64..=1 {
                for dj in -1i64..=1 {
                    for dk in -1i64..=1 {
                        let (ni, nj, nk) = (i as i64 + di, j as i64 + dj, k as i64 + dk);
                        if ni < 0 || nj < 0 || nk < 0 {
                            continue;
                        }
                        let (ni, nj, nk) = (ni as usize, nj as usize, nk as usize);
                        if ni >= d1 || nj >= d2 || nk >= d3 {
                            continue;
                        }
                        sum += *snapshot.data().get_unchecked(ni, nj, nk) as f64;
                        n += 1.0;
                    }
                }
            }
            (sum / n) as f32
        });
    }
    current
}

/// `Median`: replaces each voxel with the median of its structuring-
/// element neighborhood (border-padded with background).
pub fn median(v: &Volume, diameter: f64) -> Volume {
    let radius = crate::window::radius_from_diameter(diameter);
    let dims = v.dims();
    let background = v.background();
    let data = v.data();
    build_from_fn(v, move |i, j, k| {
        let mut stats = Stats::stored_with_capacity(8);
        for_each_cube_offset(radius, |di, dj, dk| {
            let x = sample_or_background(
                data,
                dims,
                i as i64 + di,
                j as i64 + dj,
                k as i64 + dk,
                background,
            );
            stats.add(x as f64);
        });
        stats.median(false).unwrap_or(background as f64) as f32
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaussian_preserves_constant_field() {
        let mut v = Volume::new(5, 5, 5, 1.0);
        for idx in 0..v.data().len() {
            let (i, j, k) = v.data().xyz_of(idx);
            v.set(i, j, k, 3.0).unwrap();
        }
        let out = gaussian(&v, 1.0);
        approx::assert_abs_diff_eq!(out.get(2, 2, 2).unwrap(), 3.0, epsilon = 1e-3);
    }

    #[test]
    fn median_removes_salt_and_pepper_outlier() {
        let mut v = Volume::new(3, 3, 3, 1.0);
        for idx in 0..v.data().len() {
            let (i, j, k) = v.data().xyz_of(idx);
            v.set(i, j, k, 5.0).unwrap();
        }
        v.set(1, 1, 1, 999.0).unwrap();
        let out = median(&v, 3.0);
        approx::assert_abs_diff_eq!(out.get(1, 1, 1).unwrap(), 5.0, epsilon = 1e-3);
    }
}
