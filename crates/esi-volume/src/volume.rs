use esi_core::Result;
use esi_numerics::{Dense3D, Vec3};
use rayon::prelude::*;

/// A 3-D scalar field over a regular grid (spec.md §3 "Volume"): a
/// [`Dense3D<f32>`] plus the physical metadata (voxel size, origin,
/// orientation label) every filter needs to translate between voxel and
/// absolute coordinates.
#[derive(Debug, Clone)]
pub struct Volume {
    data: Dense3D<f32>,
    voxel_size: f64,
    origin: Vec3,
    orientation: String,
    background: f32,
}

impl Volume {
    pub fn new(d1: usize, d2: usize, d3: usize, voxel_size: f64) -> Self {
        Self {
            data: Dense3D::new(d1, d2, d3),
            voxel_size,
            origin: Vec3::ZERO,
            orientation: String::from("RAS"),
            background: 0.0,
        }
    }

    pub fn from_dense(data: Dense3D<f32>, voxel_size: f64, origin: Vec3) -> Self {
        Self {
            data,
            voxel_size,
            origin,
            orientation: String::from("RAS"),
            background: 0.0,
        }
    }

    pub fn dims(&self) -> (usize, usize, usize) {
        self.data.dims()
    }

    pub fn voxel_size(&self) -> f64 {
        self.voxel_size
    }

    pub fn set_voxel_size(&mut self, voxel_size: f64) {
        self.voxel_size = voxel_size;
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn orientation(&self) -> &str {
        &self.orientation
    }

    pub fn set_orientation(&mut self, orientation: impl Into<String>) {
        self.orientation = orientation.into();
    }

    pub fn background(&self) -> f32 {
        self.background
    }

    pub fn set_background(&mut self, value: f32) {
        self.background = value;
    }

    pub fn data(&self) -> &Dense3D<f32> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Dense3D<f32> {
        &mut self.data
    }

    pub fn get(&self, i: usize, j: usize, k: usize) -> Result<f32> {
        self.data.get(i, j, k).map(|v| *v)
    }

    pub fn set(&mut self, i: usize, j: usize, k: usize, value: f32) -> Result<()> {
        self.data.set(i, j, k, value)
    }

    /// Converts a voxel index to the absolute (physical) coordinate of
    /// its center, used by the solution-points and electrodes subsystems
    /// to relate a grid position to real-world geometry.
    pub fn voxel_to_absolute(&self, i: usize, j: usize, k: usize) -> Vec3 {
        self.origin
            + Vec3::new(
                i as f64 * self.voxel_size,
                j as f64 * self.voxel_size,
                k as f64 * self.voxel_size,
            )
    }

    pub fn nonzero_count(&self) -> usize {
        self.data.iter().filter(|&&v| v != self.background).count()
    }

    pub fn is_all_background(&self) -> bool {
        self.data.iter().all(|&v| v == self.background)
    }

    /// Runs `f` over every outermost-axis plane (`dims().0` planes, each
    /// contiguous in the backing storage since the last axis varies
    /// fastest) in parallel, then writes each plane's result back.
    /// Matches spec.md §5/§9: "parallelism is over the outermost volume
    /// axis... per-thread scratch buffers allocated once per filter call".
    pub fn par_map_outer_planes<F>(&self, f: F) -> Dense3D<f32>
    where
        F: Fn(usize, &[f32]) -> Vec<f32> + Sync,
    {
        let (d1, d2, d3) = self.dims();
        let plane_len = d2 * d3;
        let src = self.data.as_slice();
        let mut out = Dense3D::<f32>::new(d1, d2, d3);
        let out_slice = out.as_mut_slice();
        out_slice
            .par_chunks_mut(plane_len)
            .enumerate()
            .for_each(|(i, chunk)| {
                let plane = &src[i * plane_len..(i + 1) * plane_len];
                let result = f(i, plane);
                chunk.copy_from_slice(&result);
            });
        out
    }

    /// Same as [`Self::par_map_outer_planes`] but `f` also receives a
    /// neighborhood into the *whole* volume (via `&Dense3D<f32>`) so
    /// filters that read across plane boundaries (morphology, smoothing)
    /// can look outside their own plane; output planes are still written
    /// back independently with no cross-thread synchronization beyond the
    /// final write.
    pub fn par_build_outer_planes<F>(&self, f: F) -> Dense3D<f32>
    where
        F: Fn(usize) -> Vec<f32> + Sync,
    {
        let (d1, d2, d3) = self.dims();
        let plane_len = d2 * d3;
        let mut out = Dense3D::<f32>::new(d1, d2, d3);
        let out_slice = out.as_mut_slice();
        out_slice
            .par_chunks_mut(plane_len)
            .enumerate()
            .for_each(|(i, chunk)| {
                let result = f(i);
                chunk.copy_from_slice(&result);
            });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voxel_to_absolute_scales_by_voxel_size() {
        let v = Volume::new(4, 4, 4, 2.0);
        assert_eq!(v.voxel_to_absolute(1, 2, 3), Vec3::new(2.0, 4.0, 6.0));
    }

    #[test]
    fn par_map_outer_planes_preserves_values() {
        let mut v = Volume::new(2, 2, 2, 1.0);
        for i in 0..2 {
            for j in 0..2 {
                for k in 0..2 {
                    v.set(i, j, k, (i * 4 + j * 2 + k) as f32).unwrap();
                }
            }
        }
        let out = v.par_map_outer_planes(|_, plane| plane.to_vec());
        assert_eq!(out.as_slice(), v.data().as_slice());
    }
}
