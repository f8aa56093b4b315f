use crate::Vec3;

/// An axis-aligned bounding box over `double` coordinates (§3). Empty
/// until the first point/voxel is folded in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    min: Vec3,
    max: Vec3,
    empty: bool,
}

impl Default for BoundingBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoundingBox {
    pub fn empty() -> Self {
        Self {
            min: Vec3::ZERO,
            max: Vec3::ZERO,
            empty: true,
        }
    }

    pub fn from_points<I: IntoIterator<Item = Vec3>>(points: I) -> Self {
        let mut bb = Self::empty();
        for p in points {
            bb.extend(p);
        }
        bb
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn min(&self) -> Vec3 {
        self.min
    }

    pub fn max(&self) -> Vec3 {
        self.max
    }

    pub fn extend(&mut self, p: Vec3) {
        if self.empty {
            self.min = p;
            self.max = p;
            self.empty = false;
            return;
        }
        self.min.x = self.min.x.min(p.x);
        self.min.y = self.min.y.min(p.y);
        self.min.z = self.min.z.min(p.z);
        self.max.x = self.max.x.max(p.x);
        self.max.y = self.max.y.max(p.y);
        self.max.z = self.max.z.max(p.z);
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) / 2.0
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Mean of the per-axis extents, used by skull-stripping's voxel-size
    /// estimate (spec.md §4.4: "170mm / mean extent of the head bounding
    /// box").
    pub fn mean_size(&self) -> f64 {
        let s = self.size();
        (s.x + s.y + s.z) / 3.0
    }

    pub fn contains(&self, p: Vec3) -> bool {
        !self.empty
            && p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }

    /// Symmetrically grows the box by `radius` on every axis, as used by
    /// brain-stem removal's post-erosion bounding-box expansion
    /// (spec.md §4.4).
    pub fn expanded(&self, radius: f64) -> BoundingBox {
        if self.empty {
            return *self;
        }
        let r = Vec3::new(radius, radius, radius);
        BoundingBox {
            min: self.min - r,
            max: self.max + r,
            empty: false,
        }
    }
}
