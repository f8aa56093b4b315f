use crate::Vec3;

/// A dense 4x4 affine transform, row-major. Covers the voxel<->absolute
/// coordinate transforms used throughout the volume, electrodes, and
/// solution-points subsystems.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mat4 {
    pub rows: [[f64; 4]; 4],
}

impl Mat4 {
    pub const IDENTITY: Mat4 = Mat4 {
        rows: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    pub fn translation(t: Vec3) -> Mat4 {
        let mut m = Mat4::IDENTITY;
        m.rows[0][3] = t.x;
        m.rows[1][3] = t.y;
        m.rows[2][3] = t.z;
        m
    }

    pub fn scaling(s: Vec3) -> Mat4 {
        let mut m = Mat4::IDENTITY;
        m.rows[0][0] = s.x;
        m.rows[1][1] = s.y;
        m.rows[2][2] = s.z;
        m
    }

    /// Rotation that brings `from` onto `to` (both assumed normalized),
    /// via Rodrigues' formula. Used by the electrode "up axis" rectifier
    /// (spec.md §4.5) before the azimuthal projection.
    pub fn rotation_aligning(from: Vec3, to: Vec3) -> Mat4 {
        let from = from.normalized();
        let to = to.normalized();
        let axis = from.cross(to);
        let cos_theta = from.dot(to).clamp(-1.0, 1.0);
        let sin_theta = axis.norm();

        if sin_theta < 1e-12 {
            return if cos_theta > 0.0 {
                Mat4::IDENTITY
            } else {
                Mat4::scaling(Vec3::new(-1.0, -1.0, 1.0))
            };
        }

        let k = axis.normalized();
        let kx = [[0.0, -k.z, k.y], [k.z, 0.0, -k.x], [-k.y, k.x, 0.0]];

        let mut r = [[0.0f64; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                let identity = if i == j { 1.0 } else { 0.0 };
                let kx2 = (0..3).map(|m| kx[i][m] * kx[m][j]).sum::<f64>();
                r[i][j] = identity + sin_theta * kx[i][j] + (1.0 - cos_theta) * kx2;
            }
        }

        let mut m = Mat4::IDENTITY;
        for i in 0..3 {
            for j in 0..3 {
                m.rows[i][j] = r[i][j];
            }
        }
        m
    }

    pub fn mul(self, rhs: Mat4) -> Mat4 {
        let mut out = [[0.0f64; 4]; 4];
        for i in 0..4 {
            for j in 0..4 {
                out[i][j] = (0..4).map(|k| self.rows[i][k] * rhs.rows[k][j]).sum();
            }
        }
        Mat4 { rows: out }
    }

    /// Applies the transform to a point (implicit homogeneous w = 1).
    pub fn transform_point(self, p: Vec3) -> Vec3 {
        let r = &self.rows;
        Vec3::new(
            r[0][0] * p.x + r[0][1] * p.y + r[0][2] * p.z + r[0][3],
            r[1][0] * p.x + r[1][1] * p.y + r[1][2] * p.z + r[1][3],
            r[2][0] * p.x + r[2][1] * p.y + r[2][2] * p.z + r[2][3],
        )
    }

    /// Applies the linear part only (implicit homogeneous w = 0);
    /// correct for transforming direction vectors/normals.
    pub fn transform_direction(self, v: Vec3) -> Vec3 {
        let r = &self.rows;
        Vec3::new(
            r[0][0] * v.x + r[0][1] * v.y + r[0][2] * v.z,
            r[1][0] * v.x + r[1][1] * v.y + r[1][2] * v.z,
            r[2][0] * v.x + r[2][1] * v.y + r[2][2] * v.z,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn translation_moves_point() {
        let m = Mat4::translation(Vec3::new(1.0, 2.0, 3.0));
        let p = m.transform_point(Vec3::ZERO);
        assert_relative_eq!(p.x, 1.0);
        assert_relative_eq!(p.y, 2.0);
        assert_relative_eq!(p.z, 3.0);
    }

    #[test]
    fn rotation_aligning_maps_from_to_to() {
        let from = Vec3::new(0.0, 0.0, 1.0);
        let to = Vec3::new(1.0, 0.0, 0.0);
        let m = Mat4::rotation_aligning(from, to);
        let mapped = m.transform_direction(from);
        assert_relative_eq!(mapped.x, to.x, epsilon = 1e-9);
        assert_relative_eq!(mapped.y, to.y, epsilon = 1e-9);
        assert_relative_eq!(mapped.z, to.z, epsilon = 1e-9);
    }

    #[test]
    fn rotation_aligning_identical_axes_is_identity() {
        let v = Vec3::new(0.0, 1.0, 0.0);
        let m = Mat4::rotation_aligning(v, v);
        assert_eq!(m, Mat4::IDENTITY);
    }
}
