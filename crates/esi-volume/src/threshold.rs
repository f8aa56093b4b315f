use esi_numerics::Dense3D;

use crate::volume::Volume;

fn map_values(v: &Volume, f: impl Fn(f32) -> f32 + Sync) -> Volume {
    let (d1, d2, d3) = v.dims();
    let mapped = v.par_map_outer_planes(|_, plane| plane.iter().map(|&x| f(x)).collect());
    let mut out = v.clone();
    let mut dense = Dense3D::<f32>::new(d1, d2, d3);
    dense.as_mut_slice().copy_from_slice(mapped.as_slice());
    *out.data_mut() = dense;
    out
}

/// `Binarize`: `x > 0 -> 1`, else `0` (spec.md §4.3).
pub fn binarize(v: &Volume) -> Volume {
    map_values(v, |x| if x > 0.0 { 1.0 } else { 0.0 })
}

/// `ThresholdAbove(t)`: values `<= t` are set to background; values `> t`
/// pass through unchanged.
pub fn threshold_above(v: &Volume, t: f32) -> Volume {
    let background = v.background();
    map_values(v, move |x| if x > t { x } else { background })
}

/// `ThresholdBinarize(min, max, val)`: voxels within `[min, max]` become
/// `val`; everything else becomes background.
pub fn threshold_binarize(v: &Volume, min: f32, max: f32, val: f32) -> Volume {
    let background = v.background();
    map_values(v, move |x| if x >= min && x <= max { val } else { background })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binarize_clamps_to_zero_one() {
        let mut v = Volume::new(2, 1, 1, 1.0);
        v.set(0, 0, 0, -3.0).unwrap();
        v.set(1, 0, 0, 5.0).unwrap();
        let out = binarize(&v);
        assert_eq!(out.get(0, 0, 0).unwrap(), 0.0);
        assert_eq!(out.get(1, 0, 0).unwrap(), 1.0);
    }

    #[test]
    fn threshold_binarize_keeps_only_the_band() {
        let mut v = Volume::new(3, 1, 1, 1.0);
        v.set(0, 0, 0, 1.0).unwrap();
        v.set(1, 0, 0, 5.0).unwrap();
        v.set(2, 0, 0, 9.0).unwrap();
        let out = threshold_binarize(&v, 4.0, 6.0, 42.0);
        assert_eq!(out.get(0, 0, 0).unwrap(), 0.0);
        assert_eq!(out.get(1, 0, 0).unwrap(), 42.0);
        assert_eq!(out.get(2, 0, 0).unwrap(), 0.0);
    }
}
