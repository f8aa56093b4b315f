use esi_points::PointCloud;
use esi_volume::Volume;

/// Per-slice solution-point index ranges (spec.md §4.6 "Z-indexing"):
/// `range(k)` returns `[first, last)` into a z-sorted [`PointCloud`] such
/// that every solution point within `search_radius` of slice `k`'s
/// absolute z-coordinate falls inside that range. Built once per MRI grid
/// and reused by every voxel in the slice, rather than binary-searching
/// per voxel.
#[derive(Debug, Clone)]
pub struct ZIndex {
    ranges: Vec<(usize, usize)>,
}

impl ZIndex {
    /// `points` must already be sorted by [`PointCloud::sort_lexicographic_zxy`]
    /// (z ascending is all this index relies on).
    pub fn build(points: &PointCloud, mask: &Volume, search_radius: f64) -> Self {
        let (_, _, d3) = mask.dims();
        let zs: Vec<f64> = points.points().iter().map(|p| p.z).collect();
        let mut ranges = Vec::with_capacity(d3);
        for k in 0..d3 {
            let z = mask.voxel_to_absolute(0, 0, k).z;
            let lo = zs.partition_point(|&zp| zp < z - search_radius);
            let hi = zs.partition_point(|&zp| zp <= z + search_radius);
            ranges.push((lo, hi));
        }
        Self { ranges }
    }

    pub fn range(&self, k: usize) -> (usize, usize) {
        self.ranges.get(k).copied().unwrap_or((0, 0))
    }
}
