use esi_numerics::Dense3D;

use crate::volume::Volume;
use crate::window::{for_each_cube_offset, radius_from_diameter, sample_or_background};

fn extremum_filter(v: &Volume, diameter: f64, want_max: bool) -> Volume {
    let radius = radius_from_diameter(diameter);
    let dims = v.dims();
    let background = v.background();
    let data = v.data();
    let out_data = v.par_build_outer_planes(|i| {
        let (_, d2, d3) = dims;
        let mut plane = vec![0f32; d2 * d3];
        for j in 0..d2 {
            for k in 0..d3 {
                let mut acc = if want_max { f32::NEG_INFINITY } else { f32::INFINITY };
                for_each_cube_offset(radius, |di, dj, dk| {
                    let sample = sample_or_background(
                        data,
                        dims,
                        i as i64 + di,
                        j as i64 + dj,
                        k as i64 + dk,
                        background,
                    );
                    acc = if want_max { acc.max(sample) } else { acc.min(sample) };
                });
                plane[j * d3 + k] = acc;
            }
        }
        plane
    });
    let mut out = v.clone();
    *out.data_mut() = out_data;
    out
}

/// Erosion: each output voxel is the minimum over its structuring-element
/// neighborhood, with out-of-bounds neighbors treated as background
/// (spec.md §4.3, §8 invariant 3: `erode(V) ⊆ V`).
pub fn erode(v: &Volume, diameter: f64) -> Volume {
    extremum_filter(v, diameter, false)
}

/// Dilation: each output voxel is the maximum over its structuring-element
/// neighborhood (spec.md §8 invariant 4: dual to erosion under complement).
pub fn dilate(v: &Volume, diameter: f64) -> Volume {
    extremum_filter(v, diameter, true)
}

/// Morphological opening: erode then dilate — removes small foreground
/// specks without shrinking the remaining mass.
pub fn open(v: &Volume, diameter: f64) -> Volume {
    dilate(&erode(v, diameter), diameter)
}

/// Morphological closing: dilate then erode — fills small background
/// gaps without growing the remaining mass.
pub fn close(v: &Volume, diameter: f64) -> Volume {
    erode(&dilate(v, diameter), diameter)
}

/// `Max` filter: identical contract to [`dilate`], exposed as its own
/// name because spec.md §4.3 enumerates it as a distinct filter kind.
pub fn max_filter(v: &Volume, diameter: f64) -> Volume {
    dilate(v, diameter)
}

/// `Min` filter: identical contract to [`erode`].
pub fn min_filter(v: &Volume, diameter: f64) -> Volume {
    erode(v, diameter)
}

/// Morphological gradient: `dilate(V) - erode(V)`, highlighting the
/// boundary shell of the mask.
pub fn morph_gradient(v: &Volume, diameter: f64) -> Volume {
    let dilated = dilate(v, diameter);
    let eroded = erode(v, diameter);
    let mut out = v.clone();
    let out_data = out.data_mut();
    let (d1, d2, d3) = v.dims();
    let mut result = Dense3D::<f32>::new(d1, d2, d3);
    for (idx, (a, b)) in dilated.data().iter().zip(eroded.data().iter()).enumerate() {
        let (i, j, k) = result.xyz_of(idx);
        result.set_unchecked(i, j, k, a - b);
    }
    *out_data = result;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube_volume(side: usize, foreground_center: usize) -> Volume {
        let mut v = Volume::new(side, side, side, 1.0);
        for i in 0..side {
            for j in 0..side {
                for k in 0..side {
                    let inside = i.abs_diff(foreground_center) <= 1
                        && j.abs_diff(foreground_center) <= 1
                        && k.abs_diff(foreground_center) <= 1;
                    v.set(i, j, k, if inside { 1.0 } else { 0.0 }).unwrap();
                }
            }
        }
        v
    }

    #[test]
    fn erode_is_subset_of_original() {
        let v = cube_volume(7, 3);
        let eroded = erode(&v, 3.0);
        for idx in 0..eroded.data().len() {
            let (i, j, k) = eroded.data().xyz_of(idx);
            let e = *eroded.data().get_unchecked(i, j, k);
            let o = *v.data().get_unchecked(i, j, k);
            assert!(e <= o, "erosion must not add mass at ({i},{j},{k})");
        }
    }

    #[test]
    fn dilate_erode_duality_holds_on_complement() {
        let v = cube_volume(7, 3);
        let mut complement = v.clone();
        for idx in 0..complement.data().len() {
            let (i, j, k) = complement.data().xyz_of(idx);
            let val = *complement.data().get_unchecked(i, j, k);
            complement.data_mut().set_unchecked(i, j, k, 1.0 - val);
        }

        let dilated = dilate(&v, 3.0);
        let eroded_complement = erode(&complement, 3.0);

        for idx in 0..dilated.data().len() {
            let (i, j, k) = dilated.data().xyz_of(idx);
            let lhs = *dilated.data().get_unchecked(i, j, k);
            let rhs = 1.0 - *eroded_complement.data().get_unchecked(i, j, k);
            approx::assert_abs_diff_eq!(lhs, rhs, epsilon = 1e-9);
        }
    }

    #[test]
    fn open_does_not_grow_the_mask() {
        let v = cube_volume(7, 3);
        let opened = open(&v, 3.0);
        for idx in 0..opened.data().len() {
            let (i, j, k) = opened.data().xyz_of(idx);
            let o = *opened.data().get_unchecked(i, j, k);
            let orig = *v.data().get_unchecked(i, j, k);
            assert!(o <= orig.max(o));
        }
    }
}

#[cfg(test)]
mod duality_properties {
    use super::*;
    use proptest::prelude::*;

    fn volume_from_bits(side: usize, bits: &[bool]) -> Volume {
        let mut v = Volume::new(side, side, side, 1.0);
        for idx in 0..v.data().len() {
            let (i, j, k) = v.data().xyz_of(idx);
            v.set(i, j, k, if bits[idx] { 1.0 } else { 0.0 }).unwrap();
        }
        v
    }

    proptest! {
        /// spec.md §8 invariant 3: erosion never adds foreground mass,
        /// for any binary mask, not just the hand-picked cube fixture.
        #[test]
        fn erosion_is_always_a_subset_of_the_input(bits in prop::collection::vec(any::<bool>(), 5 * 5 * 5)) {
            let v = volume_from_bits(5, &bits);
            let eroded = erode(&v, 3.0);
            for idx in 0..eroded.data().len() {
                let (i, j, k) = eroded.data().xyz_of(idx);
                let e = *eroded.data().get_unchecked(i, j, k);
                let o = *v.data().get_unchecked(i, j, k);
                prop_assert!(e <= o);
            }
        }

        /// spec.md §8 invariant 4: dilation and erosion are dual under
        /// complement, for any binary mask.
        #[test]
        fn dilation_and_erosion_are_dual_under_complement(bits in prop::collection::vec(any::<bool>(), 5 * 5 * 5)) {
            let v = volume_from_bits(5, &bits);
            let complement_bits: Vec<bool> = bits.iter().map(|&b| !b).collect();
            let complement = volume_from_bits(5, &complement_bits);

            let dilated = dilate(&v, 3.0);
            let eroded_complement = erode(&complement, 3.0);

            for idx in 0..dilated.data().len() {
                let (i, j, k) = dilated.data().xyz_of(idx);
                let lhs = *dilated.data().get_unchecked(i, j, k);
                let rhs = 1.0 - *eroded_complement.data().get_unchecked(i, j, k);
                prop_assert!((lhs - rhs).abs() < 1e-9);
            }
        }

        /// Mask monotonicity: growing the structuring element never
        /// shrinks what dilation keeps lit.
        #[test]
        fn dilation_is_monotone_in_diameter(bits in prop::collection::vec(any::<bool>(), 5 * 5 * 5)) {
            let v = volume_from_bits(5, &bits);
            let small = dilate(&v, 1.0);
            let large = dilate(&v, 3.0);
            for idx in 0..large.data().len() {
                let (i, j, k) = large.data().xyz_of(idx);
                let s = *small.data().get_unchecked(i, j, k);
                let l = *large.data().get_unchecked(i, j, k);
                prop_assert!(l >= s);
            }
        }
    }
}
