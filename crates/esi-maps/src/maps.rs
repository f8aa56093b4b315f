use esi_core::{Error, Result};
use esi_numerics::Dense2D;
use tracing::debug;

use crate::atom::AtomType;

/// Re-referencing mode for [`Maps::set_reference`] (spec.md §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceMode {
    NoReference,
    AverageReference,
}

/// A time x channel dense matrix with a sampling frequency (spec.md §3
/// "EEGMap" generalized to a whole time series, §4.8 "Maps"): the common
/// representation for EEG topographies and current-density frames alike,
/// distinguished only by `atom_type`. Columns are laid out atom-major:
/// atom `a`'s components occupy columns `a * stride .. a * stride +
/// stride`, where `stride = atom_type.components()`.
#[derive(Debug, Clone)]
pub struct Maps {
    data: Dense2D<f64>,
    num_atoms: usize,
    atom_type: AtomType,
    sampling_frequency: f64,
}

impl Maps {
    pub fn new(num_frames: usize, num_atoms: usize, atom_type: AtomType, sampling_frequency: f64) -> Self {
        let cols = num_atoms * atom_type.components();
        Self {
            data: Dense2D::new(num_frames, cols),
            num_atoms,
            atom_type,
            sampling_frequency,
        }
    }

    /// Builds a scalar `Maps` from one row per frame; every row must have
    /// the same length (the channel count).
    pub fn from_scalar_rows(rows: &[Vec<f64>], sampling_frequency: f64) -> Result<Self> {
        let num_atoms = rows.first().map(|r| r.len()).unwrap_or(0);
        if num_atoms == 0 {
            return Err(Error::degenerate("Maps::from_scalar_rows", "no channels"));
        }
        let mut maps = Self::new(rows.len(), num_atoms, AtomType::Scalar, sampling_frequency);
        for (t, row) in rows.iter().enumerate() {
            if row.len() != num_atoms {
                return Err(Error::invalid_input("Maps::from_scalar_rows", "ragged rows"));
            }
            maps.data.row_mut(t).copy_from_slice(row);
        }
        debug!(target: "maps", num_frames = rows.len(), num_atoms, sampling_frequency, "built scalar maps from rows");
        Ok(maps)
    }

    pub fn num_frames(&self) -> usize {
        self.data.dims().0
    }

    pub fn num_atoms(&self) -> usize {
        self.num_atoms
    }

    pub fn atom_type(&self) -> AtomType {
        self.atom_type
    }

    pub fn sampling_frequency(&self) -> f64 {
        self.sampling_frequency
    }

    fn check_frame(&self, context: &str, t: usize) -> Result<()> {
        if t >= self.num_frames() {
            return Err(Error::out_of_range(context, t, self.num_frames()));
        }
        Ok(())
    }

    pub fn frame(&self, t: usize) -> Result<&[f64]> {
        self.check_frame("Maps::frame", t)?;
        Ok(self.data.row(t))
    }

    pub fn frame_mut(&mut self, t: usize) -> Result<&mut [f64]> {
        self.check_frame("Maps::frame_mut", t)?;
        Ok(self.data.row_mut(t))
    }

    /// The `comp`-th component (0 for scalar atoms, 0..3 for vectorial)
    /// of atom `atom` at frame `t`.
    pub fn component(&self, t: usize, atom: usize, comp: usize) -> Result<f64> {
        self.check_frame("Maps::component", t)?;
        let stride = self.atom_type.components();
        let col = atom * stride + comp;
        self.data.get(t, col).map(|v| *v)
    }

    /// Mean of every frame in the inclusive range `[t1, t2]` (used by the
    /// inverse-matrix evaluator's `AverageBeforeInverse` temporal window).
    pub fn mean_frame(&self, t1: usize, t2: usize) -> Result<Vec<f64>> {
        let n = self.num_frames();
        if n == 0 || t1 > t2 || t2 >= n {
            return Err(Error::out_of_range("Maps::mean_frame", t2, n));
        }
        let cols = self.data.dims().1;
        let mut acc = vec![0.0; cols];
        let count = (t2 - t1 + 1) as f64;
        for t in t1..=t2 {
            for (a, &v) in acc.iter_mut().zip(self.data.row(t).iter()) {
                *a += v;
            }
        }
        for a in acc.iter_mut() {
            *a /= count;
        }
        Ok(acc)
    }

    /// §4.8 `setReference`: for `AverageReference`, subtracts the
    /// per-frame channel mean from every scalar channel. `NoReference` is
    /// the identity. Vectorial atoms are never re-referenced.
    pub fn set_reference(&mut self, mode: ReferenceMode) {
        if mode == ReferenceMode::NoReference || self.atom_type != AtomType::Scalar {
            return;
        }
        for t in 0..self.num_frames() {
            let row = self.data.row_mut(t);
            let mean = row.iter().sum::<f64>() / row.len() as f64;
            for v in row.iter_mut() {
                *v -= mean;
            }
        }
    }

    /// §4.8 `normalize`: per-frame L2 normalization across every
    /// component; with `center_average` set (scalar atoms only), first
    /// subtracts the frame's channel mean.
    pub fn normalize(&mut self, center_average: bool) {
        let scalar = self.atom_type == AtomType::Scalar;
        for t in 0..self.num_frames() {
            let row = self.data.row_mut(t);
            if center_average && scalar {
                let mean = row.iter().sum::<f64>() / row.len() as f64;
                for v in row.iter_mut() {
                    *v -= mean;
                }
            }
            let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
            if norm > 0.0 {
                for v in row.iter_mut() {
                    *v /= norm;
                }
            }
        }
    }

    /// GFP (GLOSSARY): spatial standard deviation of frame `t` across
    /// channels. Defined for scalar atoms.
    pub fn gfp(&self, t: usize) -> Result<f64> {
        let row = self.frame(t)?;
        let mean = row.iter().sum::<f64>() / row.len() as f64;
        let var = row.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / row.len() as f64;
        Ok(var.sqrt())
    }

    /// Pearson correlation between two equal-length frames; 0.0 if either
    /// has zero variance.
    pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
        let n = a.len();
        if n == 0 {
            return 0.0;
        }
        let mean_a = a.iter().sum::<f64>() / n as f64;
        let mean_b = b.iter().sum::<f64>() / n as f64;
        let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
        for (&x, &y) in a.iter().zip(b) {
            cov += (x - mean_a) * (y - mean_b);
            var_a += (x - mean_a).powi(2);
            var_b += (y - mean_b).powi(2);
        }
        if var_a == 0.0 || var_b == 0.0 {
            return 0.0;
        }
        cov / (var_a.sqrt() * var_b.sqrt())
    }

    /// GLOSSARY "Dissimilarity": `sqrt(2 * (1 - correlation))`.
    pub fn dissimilarity(a: &[f64], b: &[f64]) -> f64 {
        (2.0 * (1.0 - Maps::correlation(a, b))).max(0.0).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_scalar_rows_rejects_ragged_input() {
        let rows = vec![vec![1.0, 2.0], vec![1.0]];
        assert!(Maps::from_scalar_rows(&rows, 256.0).is_err());
    }

    #[test]
    fn set_reference_zero_sums_every_frame() {
        let rows = vec![vec![1.0, 2.0, 3.0], vec![-1.0, 0.0, 4.0]];
        let mut maps = Maps::from_scalar_rows(&rows, 256.0).unwrap();
        maps.set_reference(ReferenceMode::AverageReference);
        for t in 0..maps.num_frames() {
            let sum: f64 = maps.frame(t).unwrap().iter().sum();
            approx::assert_abs_diff_eq!(sum, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn normalize_makes_every_frame_unit_norm() {
        let rows = vec![vec![3.0, 4.0], vec![1.0, 0.0]];
        let mut maps = Maps::from_scalar_rows(&rows, 256.0).unwrap();
        maps.normalize(false);
        for t in 0..maps.num_frames() {
            let norm: f64 = maps.frame(t).unwrap().iter().map(|v| v * v).sum::<f64>().sqrt();
            approx::assert_abs_diff_eq!(norm, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn identical_frames_have_zero_dissimilarity() {
        let a = [1.0, 2.0, -1.0, 0.5];
        assert!(Maps::dissimilarity(&a, &a) < 1e-9);
    }

    #[test]
    fn opposite_frames_have_correlation_minus_one() {
        let a = [1.0, 2.0, 3.0];
        let b = [-1.0, -2.0, -3.0];
        approx::assert_abs_diff_eq!(Maps::correlation(&a, &b), -1.0, epsilon = 1e-9);
    }

    #[test]
    fn mean_frame_averages_the_requested_window() {
        let rows = vec![vec![0.0, 0.0], vec![2.0, 4.0], vec![4.0, 8.0]];
        let maps = Maps::from_scalar_rows(&rows, 256.0).unwrap();
        let mean = maps.mean_frame(0, 2).unwrap();
        approx::assert_abs_diff_eq!(mean[0], 2.0, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(mean[1], 4.0, epsilon = 1e-9);
    }
}
