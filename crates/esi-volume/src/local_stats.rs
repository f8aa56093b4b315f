use esi_numerics::Dense3D;

use crate::volume::Volume;
use crate::window::{for_each_cube_offset, radius_from_diameter, sample_or_background};

struct LocalMoments {
    mean: f64,
    sd: f64,
    nonzero_fraction: f64,
}

fn local_moments(v: &Volume, i: usize, j: usize, k: usize, radius: i64) -> LocalMoments {
    let dims = v.dims();
    let background = v.background();
    let data = v.data();
    let mut sum = 0.0;
    let mut sum2 = 0.0;
    let mut nonzero = 0u64;
    let mut n = 0u64;
    for_each_cube_offset(radius, |di, dj, dk| {
        let x = sample_or_background(
            data,
            dims,
            i as i64 + di,
            j as i64 + dj,
            k as i64 + dk,
            background,
        ) as f64;
        sum += x;
        sum2 += x * x;
        if x != background as f64 {
            nonzero += 1;
        }
        n += 1;
    });
    let mean = sum / n as f64;
    let variance = (sum2 / n as f64 - mean * mean).max(0.0);
    LocalMoments {
        mean,
        sd: variance.sqrt(),
        nonzero_fraction: nonzero as f64 / n as f64,
    }
}

fn map_with_local_moments(v: &Volume, diameter: f64, f: impl Fn(f32, &LocalMoments) -> f32 + Sync) -> Volume {
    let radius = radius_from_diameter(diameter);
    let (d1, d2, d3) = v.dims();
    let built = v.par_build_outer_planes(|i| {
        let mut plane = vec![0f32; d2 * d3];
        for j in 0..d2 {
            for k in 0..d3 {
                let moments = local_moments(v, i, j, k, radius);
                let x = v.get(i, j, k).unwrap_or(v.background());
                plane[j * d3 + k] = f(x, &moments);
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

/// `MeanSubtraction`: `x - localMean`, a bias-field-robust sensitivity
/// field used by skull-stripping recipes 1A/1B (spec.md §4.4).
pub fn mean_subtraction(v: &Volume, diameter: f64) -> Volume {
    map_with_local_moments(v, diameter, |x, m| x - m.mean as f32)
}

/// `MeanDivision`: `x / localMean - 1`, used by recipes 2/3.
pub fn mean_division(v: &Volume, diameter: f64) -> Volume {
    map_with_local_moments(v, diameter, |x, m| {
        if m.mean == 0.0 {
            0.0
        } else {
            (x as f64 / m.mean - 1.0) as f32
        }
    })
}

/// `CoV`: local SD / local mean.
pub fn cov(v: &Volume, diameter: f64) -> Volume {
    map_with_local_moments(v, diameter, |_, m| {
        if m.mean == 0.0 { 0.0 } else { (m.sd / m.mean) as f32 }
    })
}

/// `PercentFullness`: fraction of non-background voxels in the
/// neighborhood, times 100.
pub fn percent_fullness(v: &Volume, diameter: f64) -> Volume {
    map_with_local_moments(v, diameter, |_, m| (m.nonzero_fraction * 100.0) as f32)
}

/// `LogSNR`: `log(localMean / localSD)`.
pub fn log_snr(v: &Volume, diameter: f64) -> Volume {
    map_with_local_moments(v, diameter, |_, m| {
        if m.sd == 0.0 { 0.0 } else { (m.mean / m.sd).ln() as f32 }
    })
}
