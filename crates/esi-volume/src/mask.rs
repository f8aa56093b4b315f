use std::collections::VecDeque;

use esi_numerics::Dense3D;

use crate::volume::Volume;

const NEIGHBORS_6: [(i64, i64, i64); 6] = [
    (-1, 0, 0),
    (1, 0, 0),
    (0, -1, 0),
    (0, 1, 0),
    (0, 0, -1),
    (0, 0, 1),
];

/// `ToMask`: flood-fills background from the volume's exterior using
/// `threshold`, then sets everything the flood never reached to
/// `new_value` (spec.md §4.3, §8 invariant 5). With `carve_back = true`,
/// interior holes below the threshold but unreachable from the outside
/// are filled — the mask "carves from the outside in" rather than
/// thresholding voxel-by-voxel. With `carve_back = false` the filter is
/// a plain per-voxel threshold with no flood fill.
pub fn to_mask(v: &Volume, threshold: f32, new_value: f32, carve_back: bool) -> Volume {
    let (d1, d2, d3) = v.dims();
    let background = v.background();
    let mut out = Dense3D::<f32>::new(d1, d2, d3);

    if !carve_back {
        for idx in 0..out.len() {
            let (i, j, k) = out.xyz_of(idx);
            let x = *v.data().get_unchecked(i, j, k);
            out.set_unchecked(i, j, k, if x > threshold { new_value } else { background });
        }
        let mut result = v.clone();
        *result.data_mut() = out;
        return result;
    }

    let mut visited = vec![false; d1 * d2 * d3];
    let mut queue = VecDeque::new();
    let is_background_like = |i: usize, j: usize, k: usize| -> bool { *v.data().get_unchecked(i, j, k) <= threshold };

    for i in 0..d1 {
        for j in 0..d2 {
            for k in 0..d3 {
                let on_boundary = i == 0 || j == 0 || k == 0 || i == d1 - 1 || j == d2 - 1 || k == d3 - 1;
                if on_boundary && is_background_like(i, j, k) {
                    let idx = out.index(i, j, k);
                    if !visited[idx] {
                        visited[idx] = true;
                        queue.push_back((i, j, k));
                    }
                }
            }
        }
    }

    while let Some((i, j, k)) = queue.pop_front() {
        for (di, dj, dk) in NEIGHBORS_6 {
            let (ni, nj, nk) = (i as i64 + di, j as i64 + dj, k as i64 + dk);
            if ni < 0 || nj < 0 || nk < 0 || ni as usize >= d1 || nj as usize >= d2 || nk as usize >= d3 {
                continue;
            }
            let (ni, nj, nk) = (ni as usize, nj as usize, nk as usize);
            let nidx = out.index(ni, nj, nk);
            if !visited[nidx] && is_background_like(ni, nj, nk) {
                visited[nidx] = true;
                queue.push_back((ni, nj, nk));
            }
        }
    }

    for idx in 0..out.len() {
        let (i, j, k) = out.xyz_of(idx);
        out.set_unchecked(i, j, k, if visited[idx] { background } else { new_value });
    }

    let mut result = v.clone();
    *result.data_mut() = out;
    result
}

/// Keeps only the largest foreground connected component (6-connectivity),
/// scored by `size / surface_voxel_count` to favor compact blobs over
/// thin sprawling ones (spec.md §4.4 step 5: "compact-count scoring").
/// Everything outside the winning component becomes background.
pub fn largest_compact_component(v: &Volume) -> Volume {
    let (d1, d2, d3) = v.dims();
    let background = v.background();
    let mut labels = vec![0i64; d1 * d2 * d3];
    let mut next_label = 1i64;
    let mut sizes = Vec::new();
    let mut surfaces = Vec::new();

    let is_foreground = |i: usize, j: usize, k: usize| -> bool { *v.data().get_unchecked(i, j, k) != background };

    for start_idx in 0..labels.len() {
        if labels[start_idx] != 0 {
            continue;
        }
        let (si, sj, sk) = v.data().xyz_of(start_idx);
        if !is_foreground(si, sj, sk) {
            continue;
        }
        let label = next_label;
        next_label += 1;
        labels[start_idx] = label;
        let mut queue = VecDeque::new();
        queue.push_back((si, sj, sk));
        let mut size = 0u64;
        let mut surface = 0u64;

        while let Some((i, j, k)) = queue.pop_front() {
            size += 1;
            let mut touches_boundary = false;
            for (di, dj, dk) in NEIGHBORS_6 {
                let (ni, nj, nk) = (i as i64 + di, j as i64 + dj, k as i64 + dk);
                if ni < 0 || nj < 0 || nk < 0 || ni as usize >= d1 || nj as usize >= d2 || nk as usize >= d3 {
                    touches_boundary = true;
                    continue;
                }
                let (ni, nj, nk) = (ni as usize, nj as usize, nk as usize);
                if !is_foreground(ni, nj, nk) {
                    touches_boundary = true;
                    continue;
                }
                let nidx = v.data().index(ni, nj, nk);
                if labels[nidx] == 0 {
                    labels[nidx] = label;
                    queue.push_back((ni, nj, nk));
                }
            }
            if touches_boundary {
                surface += 1;
            }
        }
        sizes.push(size);
        surfaces.push(surface.max(1));
    }

    if next_label == 1 {
        return v.clone();
    }

    let winner = (1..next_label)
        .max_by(|&a, &b| {
            let score_a = sizes[(a - 1) as usize] as f64 / surfaces[(a - 1) as usize] as f64;
            let score_b = sizes[(b - 1) as usize] as f64 / surfaces[(b - 1) as usize] as f64;
            score_a.partial_cmp(&score_b).unwrap()
        })
        .unwrap();

    let mut out = Dense3D::<f32>::new(d1, d2, d3);
    for idx in 0..out.len() {
        let (i, j, k) = out.xyz_of(idx);
        let keep = labels[idx] == winner;
        out.set_unchecked(
            i,
            j,
            k,
            if keep { *v.data().get_unchecked(i, j, k) } else { background },
        );
    }
    let mut result = v.clone();
    *result.data_mut() = out;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_mask_fills_interior_holes() {
        let mut v = Volume::new(7, 7, 7, 1.0);
        for idx in 0..v.data().len() {
            let (i, j, k) = v.data().xyz_of(idx);
            let inside_shell = i.abs_diff(3) <= 2 && j.abs_diff(3) <= 2 && k.abs_diff(3) <= 2;
            v.set(i, j, k, if inside_shell { 100.0 } else { 0.0 }).unwrap();
        }
        // Carve a hole in the center that's below threshold but fully enclosed.
        v.set(3, 3, 3, 0.0).unwrap();

        let masked = to_mask(&v, 50.0, 1.0, true);
        assert_eq!(masked.get(3, 3, 3).unwrap(), 1.0, "interior hole must be filled");
        assert_eq!(masked.get(0, 0, 0).unwrap(), 0.0, "exterior stays background");
    }

    #[test]
    fn largest_compact_component_drops_small_specks() {
        let mut v = Volume::new(10, 10, 10, 1.0);
        for i in 2..=4 {
            for j in 2..=4 {
                for k in 2..=4 {
                    v.set(i, j, k, 1.0).unwrap();
                }
            }
        }
        v.set(9, 9, 9, 1.0).unwrap();

        let kept = largest_compact_component(&v);
        assert_eq!(kept.get(3, 3, 3).unwrap(), 1.0);
        assert_eq!(kept.get(9, 9, 9).unwrap(), 0.0);
    }
}
