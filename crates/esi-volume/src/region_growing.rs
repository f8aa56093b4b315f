use esi_numerics::Dense3D;
use tracing::{debug, trace};

use crate::volume::Volume;

/// Voxel connectivity for region growing (spec.md §4.3.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Neighborhood {
    Six,
    Eighteen,
    TwentySix,
}

impl Neighborhood {
    fn offsets(self) -> Vec<(i64, i64, i64)> {
        let mut out = Vec::new();
        let bound = match self {
            Neighborhood::Six => 1,
            Neighborhood::Eighteen => 1,
            Neighborhood::TwentySix => 1,
        };
        for di in -bound..=bound {
            for dj in -bound..=bound {
                for dk in -bound..=bound {
                    if di == 0 && dj == 0 && dk == 0 {
                        continue;
                    }
                    let manhattan = di.abs() + dj.abs() + dk.abs();
                    let keep = match self {
                        Neighborhood::Six => manhattan == 1,
                        Neighborhood::Eighteen => manhattan <= 2,
                        Neighborhood::TwentySix => true,
                    };
                    if keep {
                        out.push((di, dj, dk));
                    }
                }
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RegionGrowingOptions {
    pub neighborhood: Neighborhood,
    pub tolerance: f64,
    pub local_stats_width: f64,
    pub less_neighbors_than: usize,
    pub max_iterations: usize,
    /// Reject a newly accepted voxel if it would be connected to the
    /// grown region by a single neighbor only (a "1-voxel-thick arm").
    pub reject_thin_arms: bool,
}

impl Default for RegionGrowingOptions {
    fn default() -> Self {
        Self {
            neighborhood: Neighborhood::Eighteen,
            tolerance: 2.0,
            local_stats_width: 5.0,
            less_neighbors_than: 1,
            max_iterations: 50,
            reject_thin_arms: true,
        }
    }
}

/// Iteratively grows `seed_mask` within `bounding_mask`, accepting a
/// frontier voxel when its intensity in `source` is within
/// `tolerance * localSD` of the local mean intensity of the region's own
/// voxels nearby (spec.md §4.3.1). Returns the final binary mask
/// (`1.0` in, `0.0` out); deterministic regardless of thread scheduling
/// because every iteration's accepted set is computed against a
/// snapshot of the previous iteration (double buffering) and committed
/// all at once.
pub fn region_grow(
    source: &Volume,
    seed_mask: &Volume,
    bounding_mask: &Volume,
    options: RegionGrowingOptions,
) -> Volume {
    let (d1, d2, d3) = source.dims();
    let offsets = options.neighborhood.offsets();
    let stats_radius = (options.local_stats_width / 2.0).round() as i64;

    let mut region = vec![false; d1 * d2 * d3];
    for idx in 0..region.len() {
        let (i, j, k) = source.data().xyz_of(idx);
        region[idx] = *seed_mask.data().get_unchecked(i, j, k) != 0.0;
    }

    let in_bounds = |i: i64, j: i64, k: i64| -> bool {
        i >= 0 && j >= 0 && k >= 0 && (i as usize) < d1 && (j as usize) < d2 && (k as usize) < d3
    };
    let is_bounded = |i: usize, j: usize, k: usize| -> bool {
        *bounding_mask.data().get_unchecked(i, j, k) != 0.0
    };

    for iteration in 0..options.max_iterations {
        let snapshot = region.clone();

        // Collect the current frontier: bounded voxels not yet in the
        // region, adjacent to at least one region voxel.
        let mut frontier = Vec::new();
        for idx in 0..snapshot.len() {
            if snapshot[idx] {
                continue;
            }
            let (i, j, k) = source.data().xyz_of(idx);
            if !is_bounded(i, j, k) {
                continue;
            }
            let has_region_neighbor = offsets.iter().any(|&(di, dj, dk)| {
                let (ni, nj, nk) = (i as i64 + di, j as i64 + dj, k as i64 + dk);
                in_bounds(ni, nj, nk) && snapshot[source.data().index(ni as usize, nj as usize, nk as usize)]
            });
            if has_region_neighbor {
                frontier.push((i, j, k));
            }
        }

        if frontier.is_empty() {
            trace!(target: "volume.region_growing", iteration, "frontier empty, stopping");
            break;
        }

        let mut accepted = Vec::new();
        for &(i, j, k) in &frontier {
            let mut sum = 0.0;
            let mut sum2 = 0.0;
            let mut n = 0u64;
            for di in -stats_radius..=stats_radius {
                for dj in -stats_radius..=stats_radius {
                    for dk in -stats_radius..=stats_radius {
                        let (ni, nj, nk) = (i as i64 + di, j as i64 + dj, k as i64 + dk);
                        if !in_bounds(ni, nj, nk) {
                            continue;
                        }
                        let idx = source.data().index(ni as usize, nj as usize, nk as usize);
                        if snapshot[idx] {
                            let x = *source.data().get_unchecked(ni as usize, nj as usize, nk as usize) as f64;
                            sum += x;
                            sum2 += x * x;
                            n += 1;
                        }
                    }
                }
            }
            if n == 0 {
                continue;
            }
            let local_mean = sum / n as f64;
            let local_sd = (sum2 / n as f64 - local_mean * local_mean).max(0.0).sqrt();
            let value = *source.data().get_unchecked(i, j, k) as f64;
            let within_tolerance = if local_sd == 0.0 {
                (value - local_mean).abs() < 1e-9
            } else {
                (value - local_mean).abs() <= options.tolerance * local_sd
            };
            if !within_tolerance {
                continue;
            }

            let region_neighbor_count = offsets
                .iter()
                .filter(|&&(di, dj, dk)| {
                    let (ni, nj, nk) = (i as i64 + di, j as i64 + dj, k as i64 + dk);
                    in_bounds(ni, nj, nk) && snapshot[source.data().index(ni as usize, nj as usize, nk as usize)]
                })
                .count();
            if region_neighbor_count < options.less_neighbors_than {
                continue;
            }

            accepted.push((i, j, k, region_neighbor_count));
        }

        if accepted.is_empty() {
            trace!(target: "volume.region_growing", iteration, "no frontier voxel qualified, stopping");
            break;
        }

        for &(i, j, k, neighbor_count) in &accepted {
            if options.reject_thin_arms && neighbor_count < 2 {
                continue;
            }
            region[source.data().index(i, j, k)] = true;
        }
        trace!(target: "volume.region_growing", iteration, accepted = accepted.len(), "grew frontier");
    }

    let mut out = Dense3D::<f32>::new(d1, d2, d3);
    for idx in 0..out.len() {
        let (i, j, k) = out.xyz_of(idx);
        out.set_unchecked(i, j, k, if region[idx] { 1.0 } else { 0.0 });
    }
    let mut result = source.clone();
    *result.data_mut() = out;
    let kept = region.iter().filter(|&&b| b).count();
    debug!(target: "volume.region_growing", kept, "region growing complete");
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_volume(side: usize, value: f32) -> Volume {
        let mut v = Volume::new(side, side, side, 1.0);
        for idx in 0..v.data().len() {
            let (i, j, k) = v.data().xyz_of(idx);
            v.set(i, j, k, value).unwrap();
        }
        v
    }

    #[test]
    fn growing_stops_once_no_new_voxels_qualify() {
        let side = 9;
        let source = uniform_volume(side, 100.0);
        let mut seed = uniform_volume(side, 0.0);
        seed.set(4, 4, 4, 1.0).unwrap();
        let bounding = uniform_volume(side, 1.0);

        let options = RegionGrowingOptions {
            reject_thin_arms: false,
            less_neighbors_than: 0,
            ..Default::default()
        };
        let grown = region_grow(&source, &seed, &bounding, options);
        // uniform intensity means every bounded voxel eventually qualifies
        assert_eq!(grown.get(0, 0, 0).unwrap(), 1.0);
        assert_eq!(grown.get(side - 1, side - 1, side - 1).unwrap(), 1.0);
    }

    #[test]
    fn growing_never_crosses_outside_the_bounding_mask() {
        let side = 9;
        let source = uniform_volume(side, 100.0);
        let mut seed = uniform_volume(side, 0.0);
        seed.set(4, 4, 4, 1.0).unwrap();
        let mut bounding = uniform_volume(side, 0.0);
        for i in 3..=5 {
            for j in 3..=5 {
                for k in 3..=5 {
                    bounding.set(i, j, k, 1.0).unwrap();
                }
            }
        }
        let options = RegionGrowingOptions {
            reject_thin_arms: false,
            less_neighbors_than: 0,
            max_iterations: 20,
            ..Default::default()
        };
        let grown = region_grow(&source, &seed, &bounding, options);
        assert_eq!(grown.get(0, 0, 0).unwrap(), 0.0);
        assert_eq!(grown.get(4, 4, 4).unwrap(), 1.0);
    }
}
