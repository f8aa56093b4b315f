use esi_numerics::Dense3D;

/// Converts a structuring-element "diameter in voxels" (spec.md §4.3) to
/// an integer radius: the number of voxels on each side of the center
/// voxel the neighborhood extends.
pub fn radius_from_diameter(diameter: f64) -> i64 {
    ((diameter / 2.0).round() as i64).max(0)
}

/// Reads the volume at `(i + di, j + dj, k + dk)`, returning `background`
/// for any coordinate outside the grid (spec.md §4.3: "border voxels
/// treated as background").
#[inline]
pub fn sample_or_background(
    data: &Dense3D<f32>,
    dims: (usize, usize, usize),
    i: i64,
    j: i64,
    k: i64,
    background: f32,
) -> f32 {
    let (d1, d2, d3) = dims;
    if i < 0 || j < 0 || k < 0 || i as usize >= d1 || j as usize >= d2 || k as usize >= d3 {
        background
    } else {
        *data.get_unchecked(i as usize, j as usize, k as usize)
    }
}

/// Invokes `f(di, dj, dk)` for every offset of a cube structuring element
/// of the given radius, `di/dj/dk` each ranging over `-radius..=radius`.
pub fn for_each_cube_offset(radius: i64, mut f: impl FnMut(i64, i64, i64)) {
    for di in -radius..=radius {
        for dj in -radius..=radius {
            for dk in -radius..=radius {
                f(di, dj, dk);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_from_diameter_rounds() {
        assert_eq!(radius_from_diameter(3.0), 2);
        assert_eq!(radius_from_diameter(1.0), 1);
        assert_eq!(radius_from_diameter(0.0), 0);
    }

    #[test]
    fn sample_or_background_clamps_outside_grid() {
        let mut d = Dense3D::<f32>::new(2, 2, 2);
        d.set(0, 0, 0, 5.0).unwrap();
        assert_eq!(sample_or_background(&d, (2, 2, 2), -1, 0, 0, -1.0), -1.0);
        assert_eq!(sample_or_background(&d, (2, 2, 2), 0, 0, 0, -1.0), 5.0);
    }
}
