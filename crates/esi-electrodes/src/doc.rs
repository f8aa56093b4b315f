use esi_core::{Environment, Error, Result};
use esi_numerics::Vec3;
use esi_points::PointCloud;
use tracing::info;

use crate::cluster::PointCluster;
use crate::orientation::{auto_orientation, Orientation};
use crate::projection::{layout_auxiliary_cluster, project_azimuthal};
use crate::tesselation::{tesselate, DEFAULT_THRESHOLD_FACTOR};

fn check_cancelled(env: &Environment<'_>, stage: &str) -> Result<()> {
    if env.progress.is_cancelled() {
        return Err(Error::cancelled(stage));
    }
    Ok(())
}

/// An electrode layout document (spec.md §3 "ElectrodesDoc"): every
/// cluster's points flattened into one 3-D cloud and its 2-D projection,
/// the cloud's own orientation, and the adjacency the tesselation built
/// once in 3-D and reuses as-is for the 2-D layout (spec.md §4.5 "the
/// same topology is re-used for the projected space").
#[derive(Debug, Clone)]
pub struct ElectrodesDoc {
    clusters: Vec<PointCluster>,
    points_3d: PointCloud,
    points_2d: PointCloud,
    orientation: Orientation,
    neighbors: Vec<Vec<u32>>,
}

impl ElectrodesDoc {
    pub fn clusters(&self) -> &[PointCluster] {
        &self.clusters
    }

    pub fn points_3d(&self) -> &PointCloud {
        &self.points_3d
    }

    pub fn points_2d(&self) -> &PointCloud {
        &self.points_2d
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Adjacency list: `neighbors()[i]` holds the indices of electrode
    /// `i`'s neighbors in both `points_3d()` and `points_2d()` (they
    /// share an index space).
    pub fn neighbors(&self) -> &[Vec<u32>] {
        &self.neighbors
    }

    /// Builds a complete document from its clusters (spec.md §4.5):
    /// flattens every cluster's points into one indexed cloud, determines
    /// the cloud's orientation (name-based, falling back to geometry),
    /// projects to 2-D (3-D clusters via azimuthal projection about the
    /// rectified up axis, other clusters laid out beside the projected
    /// head), and builds the neighbor adjacency once from the 3-D
    /// positions.
    pub fn build(clusters: Vec<PointCluster>, env: &Environment<'_>, orientation_seed: u64) -> Result<Self> {
        if clusters.is_empty() || clusters.iter().all(|c| c.points.is_empty()) {
            return Err(Error::degenerate("ElectrodesDoc::build", "no electrodes"));
        }

        env.progress.start("electrodes", 4);

        let mut points_3d = PointCloud::new();
        for cluster in &clusters {
            for (i, &p) in cluster.points.points().iter().enumerate() {
                points_3d.push(p, cluster.points.name(i).map(str::to_string));
            }
        }
        check_cancelled(env, "flatten")?;
        env.progress.advance(1);

        let orientation = auto_orientation(&points_3d, orientation_seed);
        check_cancelled(env, "orientation")?;
        env.progress.advance(2);

        let median_distance = points_3d.median_nearest_neighbor_distance().unwrap_or(1.0);
        let projected_3d = project_azimuthal(points_3d.points(), orientation);
        let head_radius = projected_3d
            .iter()
            .map(|p| (p.x * p.x + p.y * p.y).sqrt())
            .fold(0.0_f64, f64::max);

        let mut points_2d = PointCloud::new();
        let mut cursor = 0usize;
        for (cluster_index, cluster) in clusters.iter().enumerate() {
            let n = cluster.points.len();
            let names: Vec<Option<String>> = (cursor..cursor + n).map(|i| points_3d.name(i).map(str::to_string)).collect();
            let placed: Vec<Vec3> = if cluster_index == 0 {
                projected_3d[cursor..cursor + n].to_vec()
            } else {
                layout_auxiliary_cluster(cluster_index, &projected_3d[cursor..cursor + n], median_distance, head_radius)
            };
            for (p, name) in placed.into_iter().zip(names) {
                points_2d.push(p, name);
            }
            cursor += n;
        }
        check_cancelled(env, "projection")?;
        env.progress.advance(3);

        let neighbors = tesselate(points_3d.points(), median_distance, DEFAULT_THRESHOLD_FACTOR);
        check_cancelled(env, "tesselation")?;
        env.progress.advance(4);
        env.progress.finish("electrodes");

        info!(
            target: "electrodes",
            clusters = clusters.len(),
            electrodes = points_3d.len(),
            orientation = ?orientation,
            "built electrode document"
        );

        Ok(Self {
            clusters,
            points_3d,
            points_2d,
            orientation,
            neighbors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esi_core::NullEnvironment;
    use esi_points::ClusterKind;

    fn grid_cluster() -> PointCluster {
        let mut cloud = PointCloud::new();
        for i in 0..3 {
            for j in 0..3 {
                cloud.push(Vec3::new(i as f64, j as f64, 1.0), Some(format!("E{i}{j}")));
            }
        }
        PointCluster::new("Grid", ClusterKind::Grid, cloud)
    }

    #[test]
    fn build_flattens_every_cluster_point() {
        let env = NullEnvironment::new();
        let doc = ElectrodesDoc::build(vec![grid_cluster()], &env.as_environment(), 1).unwrap();
        assert_eq!(doc.points_3d().len(), 9);
        assert_eq!(doc.points_2d().len(), 9);
        assert_eq!(doc.neighbors().len(), 9);
    }

    #[test]
    fn empty_cluster_list_is_degenerate() {
        let env = NullEnvironment::new();
        assert!(ElectrodesDoc::build(Vec::new(), &env.as_environment(), 1).is_err());
    }

    #[test]
    fn neighbor_adjacency_shares_index_space_with_points() {
        let env = NullEnvironment::new();
        let doc = ElectrodesDoc::build(vec![grid_cluster()], &env.as_environment(), 1).unwrap();
        for (i, row) in doc.neighbors().iter().enumerate() {
            for &j in row {
                assert!((j as usize) < doc.points_3d().len());
                assert_ne!(j as usize, i);
            }
        }
    }
}
