use esi_numerics::Dense3D;
use esi_points::PointCloud;
use esi_volume::Volume;
use rayon::prelude::*;

use crate::weighted4::{Weighted4, NO_SOLUTION_POINT};
use crate::zindex::ZIndex;

/// spec.md §4.6 "1-NN build": for every voxel inside `mask`, the nearest
/// solution point by Chebyshev (max-axis) distance, kept only when that
/// distance is within `step * 0.5 * sqrt(3)` (half the body diagonal of
/// a step-sized cube). `points` must already be z-sorted
/// ([`esi_points::PointCloud::sort_lexicographic_zxy`]).
pub fn build_1nn(points: &PointCloud, mask: &Volume, step: f64) -> Dense3D<Weighted4> {
    let radius = step * 0.5 * 3f64.sqrt();
    let z_index = ZIndex::build(points, mask, radius);
    let pts = points.points();
    let (d1, d2, d3) = mask.dims();
    let background = mask.background();

    let mut out = Dense3D::<Weighted4>::new(d1, d2, d3);
    let plane_len = d2 * d3;
    out.as_mut_slice().par_chunks_mut(plane_len).enumerate().for_each(|(i, chunk)| {
        for j in 0..d2 {
            for k in 0..d3 {
                if *mask.data().get_unchecked(i, j, k) == background {
                    continue;
                }
                let absolute = mask.voxel_to_absolute(i, j, k);
                let (lo, hi) = z_index.range(k);
                let nearest = (lo..hi)
                    .map(|p| (p, pts[p].chebyshev_distance(absolute)))
                    .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
                if let Some((p, distance)) = nearest {
                    if distance <= radius {
                        chunk[j * d3 + k] = Weighted4::single(p as u16);
                    }
                }
            }
        }
    });
    out
}

/// Widens `[lo, hi)` outward until it spans at least `min_candidates`
/// indices or exhausts the cloud, since the 4-NN scan needs more slack in
/// z than the 1-NN radius gives it.
fn widen_range(lo: usize, hi: usize, len: usize, min_candidates: usize) -> (usize, usize) {
    let (mut lo, mut hi) = (lo, hi);
    while hi - lo < min_candidates && (lo > 0 || hi < len) {
        if lo > 0 {
            lo -= 1;
        }
        if hi < len {
            hi += 1;
        }
    }
    (lo, hi)
}

/// Insertion-sorted top-4 by ascending squared distance.
fn insert_top4(best: &mut Vec<(usize, f64)>, candidate: (usize, f64)) {
    let pos = best.partition_point(|&(_, d)| d <= candidate.1);
    if pos < 4 {
        best.insert(pos, candidate);
        best.truncate(4);
    }
}

/// spec.md §4.6 "4-NN build" weight formula, applied to an already-sorted
/// (ascending distance) candidate list of up to 4 entries.
fn finalize_4nn(best: &[(usize, f64)], step: f64) -> Weighted4 {
    if best.is_empty() {
        return Weighted4::EMPTY;
    }
    if best[0].1 <= 0.0 {
        return Weighted4::single(best[0].0 as u16);
    }

    let inv_distances: Vec<f64> = best
        .iter()
        .map(|&(_, d2)| {
            let d = (d2.sqrt() / step).max(1e-12);
            1.0 / d
        })
        .collect();
    let sum: f64 = inv_distances.iter().sum();

    let mut indices = [NO_SOLUTION_POINT; 4];
    let mut weights = [0u8; 4];
    let mut sum_w123 = 0u32;
    let leading = best.len().min(3);
    for i in 0..leading {
        indices[i] = best[i].0 as u16;
        let w = ((inv_distances[i] / sum) * 255.0).round().clamp(0.0, 255.0) as u32;
        weights[i] = w as u8;
        sum_w123 += w;
    }

    if best.len() >= 4 {
        indices[3] = best[3].0 as u16;
        weights[3] = 255u32.saturating_sub(sum_w123).min(255) as u8;
    } else if leading > 0 {
        // Fewer than 4 eligible solution points: fold the residual into
        // the farthest present slot so the weight sum still totals 255.
        let last = leading - 1;
        let residual = 255u32.saturating_sub(sum_w123);
        weights[last] = weights[last].saturating_add(residual.min(255 - weights[last] as u32) as u8);
    }

    Weighted4 { indices, weights }
}

/// spec.md §4.6 "4-NN build": for every voxel inside `mask`, the four
/// nearest solution points by squared Euclidean distance, with integer
/// weights summing to exactly 255 (spec.md §8 invariant 1).
pub fn build_4nn(points: &PointCloud, mask: &Volume, step: f64) -> Dense3D<Weighted4> {
    let z_index = ZIndex::build(points, mask, step * 4.0);
    let pts = points.points();
    let (d1, d2, d3) = mask.dims();
    let background = mask.background();

    let mut out = Dense3D::<Weighted4>::new(d1, d2, d3);
    let plane_len = d2 * d3;
    out.as_mut_slice().par_chunks_mut(plane_len).enumerate().for_each(|(i, chunk)| {
        for j in 0..d2 {
            for k in 0..d3 {
                if *mask.data().get_unchecked(i, j, k) == background {
                    continue;
                }
                let absolute = mask.voxel_to_absolute(i, j, k);
                let (raw_lo, raw_hi) = z_index.range(k);
                let (lo, hi) = widen_range(raw_lo, raw_hi, pts.len(), 4);
                let mut best: Vec<(usize, f64)> = Vec::with_capacity(5);
                for p in lo..hi {
                    insert_top4(&mut best, (p, pts[p].distance2(absolute)));
                }
                chunk[j * d3 + k] = finalize_4nn(&best, step);
            }
        }
    });
    out
}
