use esi_numerics::{Mat4, Vec3};

use crate::orientation::Orientation;

fn centroid_of(points: &[Vec3]) -> Vec3 {
    if points.is_empty() {
        return Vec3::ZERO;
    }
    points.iter().fold(Vec3::ZERO, |acc, &p| acc + p) / points.len() as f64
}

/// Azimuthal equidistant projection (spec.md §4.5): rotates `points` so
/// `orientation.to_up` maps to `+Z`, then maps each rotated point `(x, y,
/// z)` to `(theta * x / r, theta * y / r, 0)` where `r = sqrt(x^2 + y^2)`
/// and `theta = atan2(r, z)` is the polar angle from `+Z`. Points at the
/// rotated centroid's own position (`r == 0`) project to the origin.
pub fn project_azimuthal(points: &[Vec3], orientation: Orientation) -> Vec<Vec3> {
    let rotation = Mat4::rotation_aligning(orientation.to_up, Vec3::new(0.0, 0.0, 1.0));
    let center = centroid_of(points);
    points
        .iter()
        .map(|&p| {
            let rotated = rotation.transform_point(p - center);
            let r = (rotated.x * rotated.x + rotated.y * rotated.y).sqrt();
            if r < 1e-12 {
                Vec3::ZERO
            } else {
                let theta = r.atan2(rotated.z);
                Vec3::new(theta * rotated.x / r, theta * rotated.y / r, 0.0)
            }
        })
        .collect()
}

/// Places a non-3-D cluster's already-flat local layout (spec.md §4.5
/// "non-3-D clusters... placed at fixed offsets next to the 2-D head")
/// to the right of the projected head, stacked vertically by cluster
/// index and spaced by `step` (the cloud's median inter-electrode
/// distance).
pub fn layout_auxiliary_cluster(cluster_index: usize, local_points: &[Vec3], step: f64, head_radius: f64) -> Vec<Vec3> {
    let offset = Vec3::new(head_radius + step * 3.0, -(cluster_index as f64) * step * 4.0, 0.0);
    local_points.iter().map(|&p| p + offset).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centroid_projects_to_origin() {
        let points = vec![Vec3::new(0.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 1.0), Vec3::new(-1.0, 0.0, 1.0)];
        let orientation = Orientation::CANONICAL;
        let projected = project_azimuthal(&points, orientation);
        approx::assert_abs_diff_eq!(projected[0].x, 0.0, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(projected[0].y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn every_projected_point_has_zero_z() {
        let points = vec![Vec3::new(0.3, 0.4, 0.8), Vec3::new(-0.2, 0.9, 0.4)];
        let projected = project_azimuthal(&points, Orientation::CANONICAL);
        for p in projected {
            assert_eq!(p.z, 0.0);
        }
    }

    #[test]
    fn auxiliary_clusters_are_offset_to_the_right() {
        let local = vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(0.1, 0.0, 0.0)];
        let placed = layout_auxiliary_cluster(0, &local, 1.0, 10.0);
        assert!(placed[0].x > 10.0);
    }
}
