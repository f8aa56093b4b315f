use esi_core::{Environment, Error, Result};
use esi_numerics::Dense3D;
use esi_points::PointCloud;
use esi_volume::dilate;
use esi_volume::Volume;
use tracing::{debug, info};

use crate::build::{build_1nn, build_4nn};
use crate::weighted4::Weighted4;

/// Solution-point layout regularity (spec.md §3 "SolutionPointsDoc").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryType {
    Irregular,
    GridAligned,
    GridNotAligned,
}

/// Dilation diameter (in voxels) used for the grey-matter mask's
/// one-voxel pre-pass (spec.md §4.6 "dilate... by one voxel
/// (6-connectivity max)"). [`esi_volume::dilate`]'s cube structuring
/// element is a deliberate approximation of strict 6-connectivity
/// dilation: the workspace has no dedicated 6-connectivity operator, and
/// for a single-voxel pass the two agree on face neighbors and only
/// differ on the voxel's 8 corners.
const PRE_PASS_DILATION_DIAMETER: f64 = 3.0;

/// Fraction of solution points allowed to fall outside the dilated mask
/// before the build asks for confirmation (spec.md §4.6).
const MAX_OUTSIDE_FRACTION: f64 = 0.25;

fn check_cancelled(env: &Environment<'_>, stage: &str) -> Result<()> {
    if env.progress.is_cancelled() {
        return Err(Error::cancelled(stage));
    }
    Ok(())
}

/// Classifies a point cloud's regularity in two stages (spec.md §3
/// "SolutionPointsDoc"). First, each axis's sorted, deduplicated
/// coordinates are checked for an evenly spaced lattice (within 1% of
/// the axis's own step); any axis failing this is `Irregular` outright.
/// Second, when all three axes are individually periodic, the cloud is
/// checked against the full Cartesian product of those per-axis
/// coordinates: `GridAligned` when every `(x, y, z)` combination of the
/// per-axis lattices appears exactly once (a true rectilinear grid
/// sharing one consistent origin across all three axes), and
/// `GridNotAligned` when the per-axis periodicity holds but the points
/// don't realize that full product — e.g. two interleaved lattices
/// offset from each other, or an axis whose lattice extends past what
/// the other two axes actually cover.
fn classify_geometry(points: &PointCloud) -> GeometryType {
    fn dedup_sorted(mut values: Vec<f64>) -> Vec<f64> {
        values.sort_by(|a, b| a.partial_cmp(b).unwrap());
        values.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
        values
    }

    fn axis_is_lattice(values: &[f64]) -> bool {
        if values.len() < 2 {
            return true;
        }
        let step = values[1] - values[0];
        if step <= 0.0 {
            return false;
        }
        values.windows(2).all(|w| ((w[1] - w[0]) / step - 1.0).abs() < 0.01)
    }

    fn axis_index(value: f64, axis: &[f64]) -> Option<usize> {
        axis.iter().position(|&v| (v - value).abs() < 1e-9)
    }

    let xs = dedup_sorted(points.points().iter().map(|p| p.x).collect());
    let ys = dedup_sorted(points.points().iter().map(|p| p.y).collect());
    let zs = dedup_sorted(points.points().iter().map(|p| p.z).collect());

    if !(axis_is_lattice(&xs) && axis_is_lattice(&ys) && axis_is_lattice(&zs)) {
        return GeometryType::Irregular;
    }

    let expected = xs.len() * ys.len() * zs.len();
    if expected != points.points().len() {
        return GeometryType::GridNotAligned;
    }

    let mut seen = std::collections::HashSet::with_capacity(points.points().len());
    for p in points.points() {
        let indices = (axis_index(p.x, &xs), axis_index(p.y, &ys), axis_index(p.z, &zs));
        match indices {
            (Some(ix), Some(iy), Some(iz)) if seen.insert((ix, iy, iz)) => {}
            _ => return GeometryType::GridNotAligned,
        }
    }
    GeometryType::GridAligned
}

/// A solution-point layout plus its interpolation caches (spec.md §3
/// "SolutionPointsDoc", §4.6): points are stored pre-sorted in
/// lexicographic (z, x, y) order, and the 1-NN/4-NN caches are built
/// lazily against a given grey-matter mask rather than at construction.
#[derive(Debug, Clone)]
pub struct SolutionPointsDoc {
    points: PointCloud,
    voxel_size: f64,
    geometry: GeometryType,
    step: f64,
    nn1: Option<Dense3D<Weighted4>>,
    nn4: Option<Dense3D<Weighted4>>,
}

impl SolutionPointsDoc {
    /// `points` need not already be sorted; this constructor sorts it.
    pub fn new(mut points: PointCloud, voxel_size: f64) -> Result<Self> {
        if voxel_size <= 0.0 {
            return Err(Error::invalid_input("SolutionPointsDoc::new", "voxel size must be positive"));
        }
        points.sort_lexicographic_zxy();
        let step = points.median_nearest_neighbor_distance()?;
        let geometry = classify_geometry(&points);
        Ok(Self {
            points,
            voxel_size,
            geometry,
            step,
            nn1: None,
            nn4: None,
        })
    }

    pub fn points(&self) -> &PointCloud {
        &self.points
    }

    pub fn voxel_size(&self) -> f64 {
        self.voxel_size
    }

    pub fn geometry(&self) -> GeometryType {
        self.geometry
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn nn1(&self) -> Option<&Dense3D<Weighted4>> {
        self.nn1.as_ref()
    }

    pub fn nn4(&self) -> Option<&Dense3D<Weighted4>> {
        self.nn4.as_ref()
    }

    /// Fraction of solution points that fall outside `mask` (background
    /// voxel or out-of-bounds).
    fn fraction_outside_mask(&self, mask: &Volume) -> f64 {
        if self.points.is_empty() {
            return 0.0;
        }
        let (d1, d2, d3) = mask.dims();
        let background = mask.background();
        let outside = self
            .points
            .points()
            .iter()
            .filter(|&&p| {
                let rel = p - mask.origin();
                let (i, j, k) = (
                    (rel.x / mask.voxel_size()).round(),
                    (rel.y / mask.voxel_size()).round(),
                    (rel.z / mask.voxel_size()).round(),
                );
                if i < 0.0 || j < 0.0 || k < 0.0 {
                    return true;
                }
                let (i, j, k) = (i as usize, j as usize, k as usize);
                i >= d1 || j >= d2 || k >= d3 || *mask.data().get_unchecked(i, j, k) == background
            })
            .count();
        outside as f64 / self.points.len() as f64
    }

    /// Builds both interpolation caches against `grey_matter_mask`
    /// (spec.md §4.6): dilates the mask by one voxel so border solution
    /// points aren't spuriously rejected, asks for confirmation through
    /// `env.asker` when more than [`MAX_OUTSIDE_FRACTION`] of solution
    /// points still fall outside it, then builds the 1-NN and 4-NN
    /// caches against the dilated mask.
    pub fn build_caches(&mut self, grey_matter_mask: &Volume, env: &Environment<'_>) -> Result<()> {
        env.progress.start("solutionpoints", 3);

        let dilated = dilate(grey_matter_mask, PRE_PASS_DILATION_DIAMETER);
        check_cancelled(env, "dilate_mask")?;
        env.progress.advance(1);

        let outside_fraction = self.fraction_outside_mask(&dilated);
        debug!(target: "solutionpoints", outside_fraction, "checked solution points against grey-matter mask");
        if outside_fraction > MAX_OUTSIDE_FRACTION {
            let question = format!(
                "{:.1}% of solution points fall outside the grey-matter mask; continue?",
                outside_fraction * 100.0
            );
            if !env.asker.confirm(&question, true) {
                return Err(Error::cancelled("solutionpoints_confirmation"));
            }
        }
        check_cancelled(env, "fraction_check")?;
        env.progress.advance(2);

        self.nn1 = Some(build_1nn(&self.points, &dilated, self.step));
        self.nn4 = Some(build_4nn(&self.points, &dilated, self.step));
        check_cancelled(env, "build_caches")?;
        env.progress.advance(3);
        env.progress.finish("solutionpoints");
        info!(target: "solutionpoints", points = self.points.len(), "built 1-NN and 4-NN interpolation caches");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esi_core::NullEnvironment;
    use esi_numerics::Vec3;

    fn grid_points() -> PointCloud {
        let mut points = Vec::new();
        for i in 0..4 {
            for j in 0..4 {
                for k in 0..4 {
                    points.push(Vec3::new(i as f64, j as f64, k as f64));
                }
            }
        }
        PointCloud::from_points(points)
    }

    #[test]
    fn regular_grid_classifies_as_grid_aligned() {
        let doc = SolutionPointsDoc::new(grid_points(), 1.0).unwrap();
        assert_eq!(doc.geometry(), GeometryType::GridAligned);
    }

    #[test]
    fn incomplete_product_of_periodic_axes_classifies_as_grid_not_aligned() {
        // Every axis is individually a lattice (step 1), but one x value
        // (2.0) only ever pairs with a single (y, z), so the cloud isn't
        // the full 3x2x2 product its own axes imply.
        let mut points = Vec::new();
        for i in 0..2 {
            for j in 0..2 {
                for k in 0..2 {
                    points.push(Vec3::new(i as f64, j as f64, k as f64));
                }
            }
        }
        points.push(Vec3::new(2.0, 0.0, 0.0));
        let doc = SolutionPointsDoc::new(PointCloud::from_points(points), 1.0).unwrap();
        assert_eq!(doc.geometry(), GeometryType::GridNotAligned);
    }

    #[test]
    fn scattered_points_classify_as_irregular() {
        let points = vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.3, 0.0),
            Vec3::new(2.7, 1.0, 0.0),
        ];
        let doc = SolutionPointsDoc::new(PointCloud::from_points(points), 1.0).unwrap();
        assert_eq!(doc.geometry(), GeometryType::Irregular);
    }

    #[test]
    fn negative_voxel_size_is_rejected() {
        assert!(SolutionPointsDoc::new(grid_points(), -1.0).is_err());
    }

    #[test]
    fn build_caches_produces_both_nn_volumes() {
        let mut doc = SolutionPointsDoc::new(grid_points(), 1.0).unwrap();
        let mut mask = Volume::new(4, 4, 4, 1.0);
        for idx in 0..mask.data().len() {
            let (i, j, k) = mask.data().xyz_of(idx);
            mask.set(i, j, k, 1.0).unwrap();
        }
        let env = NullEnvironment::new();
        doc.build_caches(&mask, &env.as_environment()).unwrap();
        assert!(doc.nn1().is_some());
        assert!(doc.nn4().is_some());
    }
}
