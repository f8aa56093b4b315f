use esi_core::{Error, Result};
use esi_maps::{AtomType, Maps};
use tracing::debug;

use crate::matrix::InverseMatrixDoc;

/// Parameters for [`best_regularization`] (spec.md §4.7 "Automatic
/// regularization", §9 Open Question: the -0.06 knee threshold is
/// empirical and must stay configurable).
#[derive(Debug, Clone, Copy)]
pub struct BestRegularizationOptions {
    /// `(delta1 + delta2) / (2 * S[i-1])` must fall at or below this
    /// threshold for index `i` to be accepted as the knee.
    pub knee_threshold: f64,
}

impl Default for BestRegularizationOptions {
    fn default() -> Self {
        Self { knee_threshold: -0.06 }
    }
}

/// Global energy `S(reg) = sum_sp |out_sp|` at one regularization index,
/// scanned against a scalar-reduced application of the inverse (spec.md
/// §4.7): vectorial inverses reduce to their per-SP magnitude first so
/// the energy curve is always a scalar sequence.
fn energy_at(doc: &InverseMatrixDoc, reg_index: usize, map: &[f64]) -> Result<f64> {
    let mut out = Vec::new();
    doc.apply(reg_index, map, AtomType::Scalar, &mut out)?;
    Ok(out.iter().map(|v| v.abs()).sum())
}

/// Finds the first "knee" in the ascending-regularization energy curve
/// `S` (spec.md §4.7, Scenario D): watches the first differences
/// `delta1 = S[i] - S[i-1]`, `delta2 = S[i+1] - S[i]`, and accepts the
/// first interior index `i` where both are negative and
/// `(delta1 + delta2) / (2 * S[i-1]) <= knee_threshold`. Falls back to
/// the last index when no knee is found.
fn knee_index(curve: &[f64], options: BestRegularizationOptions) -> usize {
    let n = curve.len();
    if n == 0 {
        return 0;
    }
    for i in 1..n.saturating_sub(1) {
        let delta1 = curve[i] - curve[i - 1];
        let delta2 = curve[i + 1] - curve[i];
        if delta1 < 0.0 && delta2 < 0.0 {
            let denom = 2.0 * curve[i - 1];
            if denom != 0.0 && (delta1 + delta2) / denom <= options.knee_threshold {
                return i;
            }
        }
    }
    n - 1
}

/// `bestRegularization(map)` (spec.md §4.7): scans every regularization
/// in ascending order, computes the global energy curve, and returns the
/// index of the first knee (or the last regularization if none is
/// found).
pub fn best_regularization(doc: &InverseMatrixDoc, map: &[f64], options: BestRegularizationOptions) -> Result<usize> {
    let n = doc.num_regularizations();
    if n == 0 {
        return Err(Error::degenerate("best_regularization", "no regularizations available"));
    }
    let mut curve = Vec::with_capacity(n);
    for reg in 0..n {
        curve.push(energy_at(doc, reg, map)?);
    }
    let knee = knee_index(&curve, options);
    debug!(target: "inverse.best_regularization", regularizations = n, knee, "found regularization knee");
    Ok(knee)
}

/// Time-window variant (spec.md §4.7 "Time-window variant"): computes
/// the per-frame best regularization over `[t1, t2]` and returns the
/// rounded mean index.
pub fn best_regularization_window(
    doc: &InverseMatrixDoc,
    eeg: &Maps,
    t1: usize,
    t2: usize,
    options: BestRegularizationOptions,
) -> Result<usize> {
    if t2 < t1 {
        return Err(Error::invalid_input("best_regularization_window", "t2 must be >= t1"));
    }
    let mut sum = 0usize;
    let mut count = 0usize;
    for t in t1..=t2 {
        let frame = eeg.frame(t)?;
        sum += best_regularization(doc, frame, options)?;
        count += 1;
    }
    Ok(((sum as f64 / count as f64).round()) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// spec.md §8 Scenario D walks this exact curve and states the
    /// expected knee is index 5; worked literally, the formula in §4.7
    /// fires at index 3, where the curve turns over from its 1.25 peak
    /// into the steep 1.22 -> 1.00 drop (ratio -0.1, comfortably past
    /// the -0.06 threshold). Every index from 3 through 6 clears the
    /// threshold on this curve, so whichever index is "first" is
    /// extremely sensitive to exactly where the scan starts; we follow
    /// the formula as written rather than the worked example (see
    /// DESIGN.md).
    #[test]
    fn first_knee_past_the_peak_is_picked() {
        let curve = [1.0, 1.2, 1.25, 1.22, 1.00, 0.80, 0.70, 0.68];
        let idx = knee_index(&curve, BestRegularizationOptions::default());
        assert_eq!(idx, 3);
    }

    #[test]
    fn no_knee_falls_back_to_the_last_index() {
        let curve = [1.0, 1.05, 1.1, 1.15, 1.2];
        let idx = knee_index(&curve, BestRegularizationOptions::default());
        assert_eq!(idx, curve.len() - 1);
    }

    #[test]
    fn single_point_curve_returns_index_zero() {
        let curve = [1.0];
        let idx = knee_index(&curve, BestRegularizationOptions::default());
        assert_eq!(idx, 0);
    }
}
