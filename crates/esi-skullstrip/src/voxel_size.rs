use esi_numerics::BoundingBox;

use crate::constants::VOXEL_SIZE_REFERENCE_MM;

/// Estimates the effective voxel size (spec.md §4.4): the larger of the
/// voxel size declared by the file and `170mm / mean extent of the head
/// bounding box`. All morphological radii in the recipes scale with this
/// estimate rather than the raw declared value, since declared voxel
/// sizes are sometimes wrong in practice.
pub fn estimate_voxel_size(declared_mm: f64, head_bbox: BoundingBox) -> f64 {
    if head_bbox.is_empty() {
        return declared_mm;
    }
    let from_bbox = VOXEL_SIZE_REFERENCE_MM / head_bbox.mean_size().max(1e-6);
    declared_mm.max(from_bbox)
}
