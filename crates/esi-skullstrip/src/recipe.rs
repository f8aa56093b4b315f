use esi_core::{Environment, Error, Result};
use esi_numerics::BoundingBox;
use esi_stats::{Histogram, HistogramOptions};
use esi_volume::{
    binarize, cov, dilate, fast_gaussian, largest_compact_component, mean_division,
    mean_subtraction, percent_fullness, region_grow, threshold_binarize, to_mask,
    RegionGrowingOptions, Volume,
};
use tracing::{debug, info};

use crate::brain_stem::remove_brain_stem;
use crate::constants::{RECIPE_1_KERNEL_CONSTANT_MM, RECIPE_23_KERNEL_CONSTANT_MM};
use crate::voxel_size::estimate_voxel_size;

/// The four fixed pipelines spec.md §4.4 selects between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipe {
    OneA,
    OneB,
    Two,
    Three,
}

impl Recipe {
    fn uses_mean_division(self) -> bool {
        matches!(self, Recipe::Two | Recipe::Three)
    }

    fn kernel_constant_mm(self) -> f64 {
        if self.uses_mean_division() {
            RECIPE_23_KERNEL_CONSTANT_MM
        } else {
            RECIPE_1_KERNEL_CONSTANT_MM
        }
    }

    fn clip_field_is_percent_fullness(self) -> bool {
        matches!(self, Recipe::OneB | Recipe::Three)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SkullStripOptions {
    pub recipe: Recipe,
    pub declared_voxel_size_mm: f64,
    pub remove_brain_stem: bool,
    pub seed_low_percentile: f64,
    pub seed_high_percentile: f64,
    pub clip_percentile: f64,
    pub region_growing: RegionGrowingOptions,
}

impl Default for SkullStripOptions {
    fn default() -> Self {
        Self {
            recipe: Recipe::OneA,
            declared_voxel_size_mm: 1.0,
            remove_brain_stem: true,
            seed_low_percentile: 0.70,
            seed_high_percentile: 0.995,
            clip_percentile: 0.90,
            region_growing: RegionGrowingOptions::default(),
        }
    }
}

fn head_bounding_box(mri: &Volume, head_mask: &Volume) -> BoundingBox {
    let mut bbox = BoundingBox::empty();
    for idx in 0..head_mask.data().len() {
        if *head_mask.data().as_slice().get(idx).unwrap() == 0.0 {
            continue;
        }
        let (i, j, k) = head_mask.data().xyz_of(idx);
        bbox.extend(mri.voxel_to_absolute(i, j, k));
    }
    bbox
}

fn logical_and(a: &Volume, b: &Volume) -> Volume {
    let mut out = a.clone();
    for idx in 0..out.data().len() {
        let (i, j, k) = out.data().xyz_of(idx);
        let av = *a.data().get_unchecked(i, j, k);
        let bv = *b.data().get_unchecked(i, j, k);
        let keep = av != 0.0 && bv != 0.0;
        out.data_mut().set_unchecked(i, j, k, if keep { av } else { 0.0 });
    }
    out
}

fn logical_or(a: &Volume, b: &Volume) -> Volume {
    let mut out = a.clone();
    for idx in 0..out.data().len() {
        let (i, j, k) = out.data().xyz_of(idx);
        let av = *a.data().get_unchecked(i, j, k);
        let bv = *b.data().get_unchecked(i, j, k);
        let value = if av != 0.0 { av } else { bv };
        out.data_mut().set_unchecked(i, j, k, value);
    }
    out
}

fn gather_masked(field: &Volume, mask: &Volume) -> Vec<f64> {
    let mut values = Vec::new();
    for idx in 0..field.data().len() {
        if *mask.data().as_slice().get(idx).unwrap() == 0.0 {
            continue;
        }
        values.push(*field.data().as_slice().get(idx).unwrap() as f64);
    }
    values
}

fn check_cancelled(env: &Environment<'_>, stage: &str) -> Result<()> {
    if env.progress.is_cancelled() {
        return Err(Error::cancelled(stage));
    }
    Ok(())
}

/// Runs the selected recipe end to end (spec.md §4.4): head mask, a
/// sensitivity field, seed isolation by histogram percentiles, clipping
/// by an auxiliary field, largest-component selection, region growing,
/// CSF fill, and a final thin-leak clip against a heavily smoothed "big
/// mask". Applies the resulting binary mask to `mri` and optionally
/// removes the brain stem.
pub fn run(mri: &Volume, env: &Environment<'_>, options: SkullStripOptions) -> Result<Volume> {
    if mri.is_all_background() {
        return Err(Error::degenerate("skullstrip::run", "input MRI is entirely background"));
    }
    info!(target: "skullstrip", recipe = ?options.recipe, "starting skull-strip pipeline");
    env.progress.start("skullstrip", 9);

    check_cancelled(env, "head_mask")?;
    let head_mask = to_mask(mri, mri.background(), 1.0, true);
    env.progress.advance(1);

    let head_bbox = head_bounding_box(mri, &head_mask);
    let voxel_size = estimate_voxel_size(options.declared_voxel_size_mm, head_bbox);
    debug!(target: "skullstrip.voxel_size", voxel_size, "estimated voxel size");

    check_cancelled(env, "sensitivity_field")?;
    let kernel_diameter = (options.recipe.kernel_constant_mm() / voxel_size).max(3.0);
    let sensitivity = if options.recipe.uses_mean_division() {
        mean_division(mri, kernel_diameter)
    } else {
        mean_subtraction(mri, kernel_diameter)
    };
    debug!(target: "skullstrip.sensitivity_field", kernel_diameter, "computed sensitivity field");
    env.progress.advance(2);

    check_cancelled(env, "seed_threshold")?;
    let masked_sensitivity = gather_masked(&sensitivity, &head_mask);
    if masked_sensitivity.len() < 8 {
        return Err(Error::degenerate("skullstrip::run", "head mask too small to seed a brain region"));
    }
    let sensitivity_hist = Histogram::from_samples(&masked_sensitivity, HistogramOptions::default())?;
    let low = sensitivity_hist.percentile_position(options.seed_low_percentile);
    let high = sensitivity_hist.percentile_position(options.seed_high_percentile);
    let (low, high) = (low.min(high), low.max(high));
    let mut seed = threshold_binarize(&sensitivity, low as f32, high as f32, 1.0);
    seed = logical_and(&seed, &head_mask);
    debug!(target: "skullstrip.seed_threshold", low, high, "isolated seed by histogram percentiles");
    env.progress.advance(3);

    check_cancelled(env, "clip_field")?;
    let clip_field = if options.recipe.clip_field_is_percent_fullness() {
        percent_fullness(mri, kernel_diameter)
    } else {
        cov(mri, kernel_diameter)
    };
    let masked_clip = gather_masked(&clip_field, &head_mask);
    if masked_clip.len() >= 8 {
        let clip_hist = Histogram::from_samples(&masked_clip, HistogramOptions::default())?;
        let clip_threshold = clip_hist.percentile_position(options.clip_percentile);
        let clip_mask = threshold_binarize(&clip_field, f32::MIN, clip_threshold as f32, 1.0);
        seed = logical_and(&seed, &clip_mask);
    }
    env.progress.advance(4);

    check_cancelled(env, "largest_component")?;
    let seed = largest_compact_component(&seed);
    if seed.is_all_background() {
        return Err(Error::degenerate("skullstrip::run", "no brain seed survived thresholding"));
    }
    env.progress.advance(5);

    check_cancelled(env, "region_growing")?;
    let grown = region_grow(mri, &seed, &head_mask, options.region_growing);
    debug!(target: "skullstrip.region_growing", "grew seed region under the head mask");
    env.progress.advance(6);

    check_cancelled(env, "merge_and_fill")?;
    let merged = logical_or(&seed, &grown);
    let filled = to_mask(&merged, 0.0, 1.0, true);
    env.progress.advance(7);

    check_cancelled(env, "big_mask_clip")?;
    let big_mask_diameter = (kernel_diameter * 2.0).max(3.0);
    let smoothed = fast_gaussian(&filled, big_mask_diameter / 3.0);
    let mut big_mask = binarize(&smoothed);
    big_mask = dilate(&big_mask, big_mask_diameter);
    let clipped = logical_and(&filled, &big_mask);
    env.progress.advance(8);

    check_cancelled(env, "apply_mask")?;
    let mut brain = mri.clone();
    for idx in 0..brain.data().len() {
        let (i, j, k) = brain.data().xyz_of(idx);
        if *clipped.data().get_unchecked(i, j, k) == 0.0 {
            brain.data_mut().set_unchecked(i, j, k, mri.background());
        }
    }

    let brain = if options.remove_brain_stem {
        remove_brain_stem(&brain, voxel_size)
    } else {
        brain
    };
    env.progress.advance(9);
    env.progress.finish("skullstrip");

    if brain.is_all_background() {
        return Err(Error::degenerate("skullstrip::run", "final mask is empty"));
    }
    info!(target: "skullstrip", recipe = ?options.recipe, "finished skull-strip pipeline");
    Ok(brain)
}
