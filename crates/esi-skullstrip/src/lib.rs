//! Skull-stripping pipeline (spec.md §4 component 6): orchestrates
//! `esi-volume` filters in the four fixed recipes to extract a brain
//! volume from a head MRI, then removes the inferior brain-stem
//! elongation.

mod brain_stem;
mod constants;
mod recipe;
mod voxel_size;

pub use brain_stem::remove_brain_stem;
pub use constants::{
    BRAIN_STEM_ERODE_MM, BRAIN_STEM_EXPAND_FACTOR, RECIPE_1_KERNEL_CONSTANT_MM,
    RECIPE_23_KERNEL_CONSTANT_MM, VOXEL_SIZE_REFERENCE_MM,
};
pub use recipe::{run, Recipe, SkullStripOptions};
pub use voxel_size::estimate_voxel_size;
