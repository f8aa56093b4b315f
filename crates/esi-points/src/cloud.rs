use esi_core::{Error, Result};
use esi_numerics::Vec3;

/// A dynamic sequence of 3-D points, each with an optional name
/// (spec.md §3 "PointCloud"). Append-only from the outside; the document
/// that owns one may sort it in place (e.g. the lexicographic Z-X-Y order
/// solution points require for their slice index, spec.md §4.6).
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    points: Vec<Vec3>,
    names: Vec<Option<String>>,
}

impl PointCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            names: Vec::with_capacity(capacity),
        }
    }

    pub fn from_points(points: Vec<Vec3>) -> Self {
        let names = vec![None; points.len()];
        Self { points, names }
    }

    pub fn push(&mut self, point: Vec3, name: Option<String>) {
        self.points.push(point);
        self.names.push(name);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<Vec3> {
        self.points
            .get(index)
            .copied()
            .ok_or_else(|| Error::out_of_range("PointCloud::get", index, self.points.len()))
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).and_then(|n| n.as_deref())
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    pub fn names(&self) -> &[Option<String>] {
        &self.names
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Vec3> {
        self.points.iter()
    }

    /// Linear-scan nearest element by Euclidean distance; returns
    /// `(index, distance)`. `O(n)` — callers doing many repeated queries
    /// over a static cloud (solution points, electrodes) build their own
    /// spatial index instead.
    pub fn nearest(&self, query: Vec3) -> Option<(usize, f64)> {
        self.points
            .iter()
            .enumerate()
            .map(|(i, &p)| (i, p.distance(query)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
    }

    /// Median of each point's distance to its own nearest neighbor — the
    /// "step" quantity used throughout §4.6/§4.5 to scale search radii
    /// and projection offsets.
    pub fn median_nearest_neighbor_distance(&self) -> Result<f64> {
        if self.points.len() < 2 {
            return Err(Error::not_enough_data(
                "PointCloud::median_nearest_neighbor_distance",
                2,
                self.points.len(),
            ));
        }
        let mut nn_distances: Vec<f64> = Vec::with_capacity(self.points.len());
        for (i, &p) in self.points.iter().enumerate() {
            let mut best = f64::INFINITY;
            for (j, &q) in self.points.iter().enumerate() {
                if i == j {
                    continue;
                }
                let d = p.distance(q);
                if d < best {
                    best = d;
                }
            }
            nn_distances.push(best);
        }
        nn_distances.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let n = nn_distances.len();
        let median = if n % 2 == 1 {
            nn_distances[n / 2]
        } else {
            (nn_distances[n / 2 - 1] + nn_distances[n / 2]) / 2.0
        };
        if median <= 0.0 {
            return Err(Error::degenerate(
                "PointCloud::median_nearest_neighbor_distance",
                "zero median distance",
            ));
        }
        Ok(median)
    }

    /// Sorts the cloud (points and names together) in ascending
    /// lexicographic (z, x, y) order, the layout solution points require
    /// for their per-slice index range (spec.md §4.6).
    pub fn sort_lexicographic_zxy(&mut self) {
        let mut order: Vec<usize> = (0..self.points.len()).collect();
        order.sort_by(|&a, &b| {
            let pa = self.points[a];
            let pb = self.points[b];
            pa.z.partial_cmp(&pb.z)
                .unwrap()
                .then(pa.x.partial_cmp(&pb.x).unwrap())
                .then(pa.y.partial_cmp(&pb.y).unwrap())
        });
        let points: Vec<Vec3> = order.iter().map(|&i| self.points[i]).collect();
        let names: Vec<Option<String>> = order.iter().map(|&i| self.names[i].clone()).collect();
        self.points = points;
        self.names = names;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearest_finds_the_closest_point() {
        let cloud = PointCloud::from_points(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
        ]);
        let (idx, dist) = cloud.nearest(Vec3::new(1.5, 0.0, 0.0)).unwrap();
        assert_eq!(idx, 2);
        assert!((dist - 0.5).abs() < 1e-9);
    }

    #[test]
    fn median_nearest_neighbor_distance_on_regular_grid() {
        let mut points = Vec::new();
        for i in 0..5 {
            points.push(Vec3::new(i as f64 * 2.0, 0.0, 0.0));
        }
        let cloud = PointCloud::from_points(points);
        let median = cloud.median_nearest_neighbor_distance().unwrap();
        assert!((median - 2.0).abs() < 1e-9);
    }

    #[test]
    fn sort_lexicographic_zxy_orders_correctly() {
        let mut cloud = PointCloud::new();
        cloud.push(Vec3::new(1.0, 1.0, 2.0), Some("b".into()));
        cloud.push(Vec3::new(0.0, 0.0, 1.0), Some("a".into()));
        cloud.push(Vec3::new(0.0, 0.0, 2.0), Some("c".into()));
        cloud.sort_lexicographic_zxy();
        assert_eq!(cloud.name(0), Some("a"));
        assert_eq!(cloud.points()[1].z, 2.0);
    }

    #[test]
    fn single_point_cloud_has_no_defined_nn_distance() {
        let cloud = PointCloud::from_points(vec![Vec3::ZERO]);
        assert!(cloud.median_nearest_neighbor_distance().is_err());
    }
}
