use esi_numerics::Vec3;

/// Default scale factor applied to the cloud's median inter-electrode
/// distance to get the proximity-graph connection threshold. Chosen so a
/// roughly uniform lattice connects direct neighbors without also
/// connecting second-ring/diagonal points.
pub const DEFAULT_THRESHOLD_FACTOR: f64 = 1.5;

/// Ragged neighbor-index adjacency built from pairwise distances (spec.md
/// §4.5 "tesselation"/"neighborhoods"): two points are adjacent whenever
/// their distance is within `threshold_factor * median_distance`.
///
/// No Delaunay/convex-hull crate is part of this workspace's dependency
/// stack, so this approximates the Delaunay-edge adjacency the original
/// system builds with a distance-threshold proximity graph instead of an
/// incremental triangulation. For the roughly uniform electrode spacing
/// this subsystem targets the two agree; on irregular layouts this can
/// add edges a strict Delaunay triangulation would not.
pub fn tesselate(points: &[Vec3], median_distance: f64, threshold_factor: f64) -> Vec<Vec<u32>> {
    let threshold = median_distance * threshold_factor;
    let n = points.len();
    let mut neighbors = vec![Vec::new(); n];
    for i in 0..n {
        for j in (i + 1)..n {
            if points[i].distance(points[j]) <= threshold {
                neighbors[i].push(j as u32);
                neighbors[j].push(i as u32);
            }
        }
    }
    for row in neighbors.iter_mut() {
        row.sort_unstable();
    }
    neighbors
}

/// For each point, every other point ordered by ascending distance and
/// normalized by `median_distance` (spec.md §4.5 "optional
/// distance-sorted neighborhood").
pub fn distance_sorted_neighbors(points: &[Vec3], median_distance: f64) -> Vec<Vec<(u32, f64)>> {
    let n = points.len();
    (0..n)
        .map(|i| {
            let mut row: Vec<(u32, f64)> = (0..n)
                .filter(|&j| j != i)
                .map(|j| (j as u32, points[i].distance(points[j]) / median_distance))
                .collect();
            row.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_neighbors_are_symmetric() {
        let mut points = Vec::new();
        for i in 0..3 {
            for j in 0..3 {
                points.push(Vec3::new(i as f64, j as f64, 0.0));
            }
        }
        let neighbors = tesselate(&points, 1.0, DEFAULT_THRESHOLD_FACTOR);
        for (i, row) in neighbors.iter().enumerate() {
            for &j in row {
                assert!(neighbors[j as usize].contains(&(i as u32)));
            }
        }
    }

    #[test]
    fn center_of_3x3_grid_has_four_neighbors() {
        let mut points = Vec::new();
        for i in 0..3 {
            for j in 0..3 {
                points.push(Vec3::new(i as f64, j as f64, 0.0));
            }
        }
        let neighbors = tesselate(&points, 1.0, DEFAULT_THRESHOLD_FACTOR);
        // index 4 is (1, 1), the grid center.
        assert_eq!(neighbors[4].len(), 4);
    }

    #[test]
    fn distance_sorted_neighbors_are_ascending() {
        let points = vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)];
        let rows = distance_sorted_neighbors(&points, 1.0);
        let distances: Vec<f64> = rows[0].iter().map(|&(_, d)| d).collect();
        assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    }
}
