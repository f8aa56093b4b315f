use esi_numerics::Dense3D;

use crate::volume::Volume;

/// `Rank`: replaces each non-background voxel with its 1-based rank
/// among all non-background voxels (ties broken by voxel index, stable);
/// background voxels are left untouched (spec.md §4.3).
pub fn rank(v: &Volume) -> Volume {
    let (d1, d2, d3) = v.dims();
    let background = v.background();

    let mut order: Vec<usize> = (0..v.data().len())
        .filter(|&idx| *v.data().as_slice().get(idx).unwrap() != background)
        .collect();
    order.sort_by(|&a, &b| {
        v.data().as_slice()[a]
            .partial_cmp(&v.data().as_slice()[b])
            .unwrap()
    });

    let mut out = Dense3D::<f32>::new(d1, d2, d3);
    out.as_mut_slice().copy_from_slice(v.data().as_slice());
    for (rank, &idx) in order.iter().enumerate() {
        let (i, j, k) = out.xyz_of(idx);
        out.set_unchecked(i, j, k, (rank + 1) as f32);
    }

    let mut result = v.clone();
    *result.data_mut() = out;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_orders_nonbackground_voxels_ascending() {
        let mut v = Volume::new(3, 1, 1, 1.0);
        v.set(0, 0, 0, 50.0).unwrap();
        v.set(1, 0, 0, 10.0).unwrap();
        v.set(2, 0, 0, 0.0).unwrap(); // background, left alone
        let out = rank(&v);
        assert_eq!(out.get(1, 0, 0).unwrap(), 1.0);
        assert_eq!(out.get(0, 0, 0).unwrap(), 2.0);
        assert_eq!(out.get(2, 0, 0).unwrap(), 0.0);
    }
}
