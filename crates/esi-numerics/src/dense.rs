use esi_core::{Error, Result};

/// A dense, linearized 3-D array (§9 "TArrayN<T>", generalized over
/// element type and collapsed to the two ranks the workspace actually
/// needs: 2 and 3). The last axis varies fastest, matching the source
/// model's linearization.
///
/// Bounds-checked accessors ([`Dense3D::get`]/[`Dense3D::set`]) and
/// unchecked fast-path accessors ([`Dense3D::get_unchecked`]/
/// [`Dense3D::set_unchecked`]) are distinct functions; callers pick the
/// one appropriate to the call site (§9) rather than paying bounds checks
/// in the per-voxel inner loops of `esi-volume`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dense3D<T> {
    dim: (usize, usize, usize),
    data: Vec<T>,
}

impl<T: Clone + Default> Dense3D<T> {
    pub fn new(d1: usize, d2: usize, d3: usize) -> Self {
        Self {
            dim: (d1, d2, d3),
            data: vec![T::default(); d1 * d2 * d3],
        }
    }

    pub fn empty() -> Self {
        Self {
            dim: (0, 0, 0),
            data: Vec::new(),
        }
    }

    /// Resizes in place; per the data model's invariant, resizing
    /// discards content rather than attempting to preserve it.
    pub fn resize(&mut self, d1: usize, d2: usize, d3: usize) {
        self.dim = (d1, d2, d3);
        self.data = vec![T::default(); d1 * d2 * d3];
    }
}

impl<T> Dense3D<T> {
    pub fn dims(&self) -> (usize, usize, usize) {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        let (_, d2, d3) = self.dim;
        (i * d2 + j) * d3 + k
    }

    pub fn xyz_of(&self, linear: usize) -> (usize, usize, usize) {
        let (_, d2, d3) = self.dim;
        let k = linear % d3;
        let rest = linear / d3;
        let j = rest % d2;
        let i = rest / d2;
        (i, j, k)
    }

    fn in_bounds(&self, i: usize, j: usize, k: usize) -> bool {
        i < self.dim.0 && j < self.dim.1 && k < self.dim.2
    }

    pub fn get(&self, i: usize, j: usize, k: usize) -> Result<&T> {
        if !self.in_bounds(i, j, k) {
            return Err(Error::out_of_range(
                "Dense3D::get",
                self.index(i, j, k),
                self.data.len(),
            ));
        }
        Ok(&self.data[self.index(i, j, k)])
    }

    pub fn set(&mut self, i: usize, j: usize, k: usize, value: T) -> Result<()> {
        if !self.in_bounds(i, j, k) {
            let bound = self.data.len();
            return Err(Error::out_of_range("Dense3D::set", self.index(i, j, k), bound));
        }
        let idx = self.index(i, j, k);
        self.data[idx] = value;
        Ok(())
    }

    /// Unchecked fast path: caller guarantees `(i, j, k)` is in bounds.
    #[inline]
    pub fn get_unchecked(&self, i: usize, j: usize, k: usize) -> &T {
        &self.data[self.index(i, j, k)]
    }

    #[inline]
    pub fn set_unchecked(&mut self, i: usize, j: usize, k: usize, value: T) {
        let idx = self.index(i, j, k);
        self.data[idx] = value;
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.data.iter_mut()
    }

    /// Slice covering one z-slice (the outer axis §5 parallelizes over),
    /// used by filters that scan a plane at a time.
    pub fn slice_z(&self, k: usize) -> impl Iterator<Item = &T> {
        let (d1, d2, _) = self.dim;
        (0..d1 * d2).map(move |idx| {
            let i = idx / d2;
            let j = idx % d2;
            self.get_unchecked(i, j, k)
        })
    }
}

/// A dense 2-D array, used for projected electrode coordinates and
/// inverse-matrix rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Dense2D<T> {
    dim: (usize, usize),
    data: Vec<T>,
}

impl<T: Clone + Default> Dense2D<T> {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            dim: (rows, cols),
            data: vec![T::default(); rows * cols],
        }
    }
}

impl<T> Dense2D<T> {
    pub fn dims(&self) -> (usize, usize) {
        self.dim
    }

    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.dim.1 + col
    }

    pub fn get(&self, row: usize, col: usize) -> Result<&T> {
        if row >= self.dim.0 || col >= self.dim.1 {
            return Err(Error::out_of_range("Dense2D::get", self.index(row, col), self.data.len()));
        }
        Ok(&self.data[self.index(row, col)])
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.dim.0 || col >= self.dim.1 {
            let bound = self.data.len();
            return Err(Error::out_of_range("Dense2D::set", self.index(row, col), bound));
        }
        let idx = self.index(row, col);
        self.data[idx] = value;
        Ok(())
    }

    #[inline]
    pub fn get_unchecked(&self, row: usize, col: usize) -> &T {
        &self.data[self.index(row, col)]
    }

    pub fn row(&self, row: usize) -> &[T] {
        let cols = self.dim.1;
        let start = row * cols;
        &self.data[start..start + cols]
    }

    pub fn row_mut(&mut self, row: usize) -> &mut [T] {
        let cols = self.dim.1;
        let start = row * cols;
        &mut self.data[start..start + cols]
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_roundtrips_through_xyz_of() {
        let d = Dense3D::<f32>::new(3, 4, 5);
        for i in 0..3 {
            for j in 0..4 {
                for k in 0..5 {
                    let lin = d.index(i, j, k);
                    assert_eq!(d.xyz_of(lin), (i, j, k));
                }
            }
        }
    }

    #[test]
    fn out_of_bounds_get_errors() {
        let d = Dense3D::<f32>::new(2, 2, 2);
        assert!(d.get(5, 0, 0).is_err());
    }

    #[test]
    fn resize_discards_content() {
        let mut d = Dense3D::<i32>::new(2, 2, 2);
        d.set(0, 0, 0, 7).unwrap();
        d.resize(2, 2, 2);
        assert_eq!(*d.get(0, 0, 0).unwrap(), 0);
    }

    #[test]
    fn last_axis_varies_fastest() {
        let d = Dense3D::<f32>::new(2, 2, 2);
        assert_eq!(d.index(0, 0, 0), 0);
        assert_eq!(d.index(0, 0, 1), 1);
        assert_eq!(d.index(0, 1, 0), 2);
        assert_eq!(d.index(1, 0, 0), 4);
    }
}
