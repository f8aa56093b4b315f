use esi_numerics::BoundingBox;
use esi_points::{ClusterKind, ElsCluster, PointCloud};

/// A named group of electrodes sharing a geometry type (spec.md §3
/// "PointCluster"): wraps the point-format layer's [`ClusterKind`] and
/// points with the per-cluster bounding box the electrodes subsystem
/// derives once at build time (spec.md §3 "built once at document
/// open; read-only after").
#[derive(Debug, Clone)]
pub struct PointCluster {
    pub name: String,
    pub kind: ClusterKind,
    pub points: PointCloud,
    pub bounding_box: BoundingBox,
}

impl PointCluster {
    pub fn new(name: impl Into<String>, kind: ClusterKind, points: PointCloud) -> Self {
        let bounding_box = BoundingBox::from_points(points.iter().copied());
        Self {
            name: name.into(),
            kind,
            points,
            bounding_box,
        }
    }

    pub fn electrode_count(&self) -> usize {
        self.points.len()
    }
}

impl From<ElsCluster> for PointCluster {
    fn from(cluster: ElsCluster) -> Self {
        PointCluster::new(cluster.name, cluster.kind, cluster.points)
    }
}
