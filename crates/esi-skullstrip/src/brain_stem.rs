use esi_volume::{erode, Volume};

use crate::constants::{BRAIN_STEM_ERODE_MM, BRAIN_STEM_EXPAND_FACTOR};

struct VoxelBox {
    min: (usize, usize, usize),
    max: (usize, usize, usize),
}

fn voxel_bbox_of_foreground(v: &Volume) -> Option<VoxelBox> {
    let background = v.background();
    let mut min = (usize::MAX, usize::MAX, usize::MAX);
    let mut max = (0usize, 0usize, 0usize);
    let mut found = false;
    for idx in 0..v.data().len() {
        if *v.data().as_slice().get(idx).unwrap() == background {
            continue;
        }
        found = true;
        let (i, j, k) = v.data().xyz_of(idx);
        min = (min.0.min(i), min.1.min(j), min.2.min(k));
        max = (max.0.max(i), max.1.max(j), max.2.max(k));
    }
    found.then_some(VoxelBox { min, max })
}

/// Removes the inferior brain-stem elongation without a model (spec.md
/// §4.4 post-pass): erode by a voxel radius proportional to
/// `10mm / voxel_size`, take the bounding box of what survives, expand it
/// by `1.70x` that radius, then clear everything outside the expanded
/// box in the *original* (un-eroded) mask.
pub fn remove_brain_stem(mask: &Volume, voxel_size: f64) -> Volume {
    let erode_radius_vox = (BRAIN_STEM_ERODE_MM / voxel_size).round().max(1.0) as i64;
    let eroded = erode(mask, (erode_radius_vox * 2) as f64);

    let Some(bbox) = voxel_bbox_of_foreground(&eroded) else {
        return mask.clone();
    };

    let expand_vox = (erode_radius_vox as f64 * BRAIN_STEM_EXPAND_FACTOR).round() as i64;
    let (d1, d2, d3) = mask.dims();
    let lo = (
        (bbox.min.0 as i64 - expand_vox).max(0) as usize,
        (bbox.min.1 as i64 - expand_vox).max(0) as usize,
        (bbox.min.2 as i64 - expand_vox).max(0) as usize,
    );
    let hi = (
        ((bbox.max.0 as i64 + expand_vox).max(0) as usize).min(d1 - 1),
        ((bbox.max.1 as i64 + expand_vox).max(0) as usize).min(d2 - 1),
        ((bbox.max.2 as i64 + expand_vox).max(0) as usize).min(d3 - 1),
    );

    let mut out = mask.clone();
    let background = mask.background();
    for idx in 0..out.data().len() {
        let (i, j, k) = out.data().xyz_of(idx);
        let inside_box = i >= lo.0 && i <= hi.0 && j >= lo.1 && j <= hi.1 && k >= lo.2 && k <= hi.2;
        if !inside_box {
            out.data_mut().set_unchecked(i, j, k, background);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clears_voxels_far_outside_the_expanded_box() {
        let mut v = Volume::new(30, 30, 30, 1.0);
        for i in 10..=20 {
            for j in 10..=20 {
                for k in 10..=20 {
                    v.set(i, j, k, 1.0).unwrap();
                }
            }
        }
        // Elongated "brain stem" spike.
        for k in 0..10 {
            v.set(15, 15, k, 1.0).unwrap();
        }
        let cleaned = remove_brain_stem(&v, 1.0);
        assert_eq!(cleaned.get(15, 15, 15).unwrap(), 1.0);
        assert_eq!(cleaned.get(15, 15, 0).unwrap(), 0.0);
    }
}
