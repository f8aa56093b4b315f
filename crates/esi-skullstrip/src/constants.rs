/// Scales the local-statistics kernel width for recipes 1A/1B
/// (`MeanSubtraction`). Provenance undocumented in the source this was
/// distilled from; reproduced verbatim per spec.md §9 — do not
/// "simplify" without regression tests against Scenario A.
pub const RECIPE_1_KERNEL_CONSTANT_MM: f64 = 3.47;

/// Scales the local-statistics kernel width for recipes 2/3
/// (`MeanDivision`). Same provenance caveat as
/// [`RECIPE_1_KERNEL_CONSTANT_MM`].
pub const RECIPE_23_KERNEL_CONSTANT_MM: f64 = 2.83;

/// Reference head size (mm) used to estimate voxel size when the file's
/// declared voxel size looks unreliable (spec.md §4.4).
pub const VOXEL_SIZE_REFERENCE_MM: f64 = 170.0;

/// Brain-stem erosion depth in millimeters before bounding-box expansion.
pub const BRAIN_STEM_ERODE_MM: f64 = 10.0;

/// Factor the eroded brain-stem bounding box is expanded by before the
/// exterior is cleared.
pub const BRAIN_STEM_EXPAND_FACTOR: f64 = 1.70;
