use esi_core::{Error, Result};
use std::sync::Mutex;
use tracing::debug;

use crate::histogram::{Histogram, HistogramOptions};
use crate::rng::Rng;
use crate::{IQR_TO_SIGMA, MAD_TO_SIGMA, NUM_MAX_MODE_ROBUST_ESTIMATES};

/// Whether a [`Stats`] accumulator keeps the raw samples (enabling the
/// nonparametric suite) or only the running moments (constant memory,
/// parametric measures only) — spec.md §4.1's "two modes coexist".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsMode {
    /// Count, sum, sum-of-squares, min, max only.
    Streaming,
    /// Streaming moments plus a growable vector of samples.
    Stored,
}

/// Robust + parametric statistics accumulator (spec.md §4.1).
///
/// `add` always updates the running moments; in [`StatsMode::Stored`] it
/// also appends to an internal sample vector and invalidates the `sorted`
/// flag. All order-statistics methods sort on demand (`sort` is a no-op
/// once the data is already sorted).
///
/// This type is not `Sync`: callers that need the "safe path" critical
/// section described in spec.md §5 wrap it in [`SharedStats`] rather than
/// sharing `&Stats` across threads directly — the no-lock fast path is
/// simply `&mut Stats` under Rust's normal aliasing rules, with no atomic
/// or lock overhead at all.
#[derive(Debug, Clone)]
pub struct Stats {
    mode: StatsMode,
    count: u64,
    sum: f64,
    sum2: f64,
    min: f64,
    max: f64,
    data: Vec<f64>,
    sorted: bool,
}

impl Default for Stats {
    fn default() -> Self {
        Self::streaming()
    }
}

impl Stats {
    pub fn streaming() -> Self {
        Self {
            mode: StatsMode::Streaming,
            count: 0,
            sum: 0.0,
            sum2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            data: Vec::new(),
            sorted: true,
        }
    }

    pub fn stored_with_capacity(capacity: usize) -> Self {
        Self {
            mode: StatsMode::Stored,
            count: 0,
            sum: 0.0,
            sum2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            data: Vec::with_capacity(capacity),
            sorted: true,
        }
    }

    pub fn from_slice(data: &[f64]) -> Self {
        let mut s = Self::stored_with_capacity(data.len());
        for &x in data {
            s.add(x);
        }
        s
    }

    pub fn mode(&self) -> StatsMode {
        self.mode
    }

    pub fn reset(&mut self) {
        self.count = 0;
        self.sum = 0.0;
        self.sum2 = 0.0;
        self.min = f64::INFINITY;
        self.max = f64::NEG_INFINITY;
        self.data.clear();
        self.sorted = true;
    }

    pub fn n(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_stored(&self) -> bool {
        self.mode == StatsMode::Stored
    }

    /// Appends a sample, updating the running moments. Overflow of
    /// `sum2` saturates to `f64::INFINITY` rather than panicking, per
    /// spec.md §4.1.
    pub fn add(&mut self, x: f64) {
        self.count += 1;
        self.sum += x;
        self.sum2 += x * x;
        if x < self.min {
            self.min = x;
        }
        if x > self.max {
            self.max = x;
        }
        if self.mode == StatsMode::Stored {
            self.data.push(x);
            self.sorted = false;
        }
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Stable ascending sort; no-op if already sorted.
    pub fn sort(&mut self) {
        if self.sorted {
            return;
        }
        self.data.sort_by(|a, b| a.partial_cmp(b).unwrap());
        self.sorted = true;
    }

    fn require_stored(&self, operation: &str) -> Result<()> {
        if self.mode != StatsMode::Stored {
            return Err(Error::invalid_input(
                operation,
                "statistic requires a Stored-mode accumulator",
            ));
        }
        Ok(())
    }

    // -- parametric measures: never need the stored vector -------------

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn sum2(&self) -> f64 {
        self.sum2
    }

    /// Arithmetic mean; 0.0 on an empty accumulator (documented
    /// sentinel, spec.md §4.1).
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    pub fn min(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.min }
    }

    pub fn max(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.max }
    }

    pub fn range(&self) -> f64 {
        self.max() - self.min()
    }

    /// Population variance: `E[x^2] - E[x]^2`.
    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        let mean = self.mean();
        (self.sum2 / n - mean * mean).max(0.0)
    }

    pub fn variance_about(&self, center: f64) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        self.sum2 / n - 2.0 * center * self.mean() + center * center
    }

    pub fn sd(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Root mean square (SD without mean subtraction).
    pub fn rms(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.sum2 / self.count as f64).sqrt()
    }

    /// Coefficient of variation: SD / mean.
    pub fn cov(&self) -> f64 {
        let mean = self.mean();
        if mean == 0.0 { 0.0 } else { self.sd() / mean }
    }

    /// Signal-to-noise ratio: mean / SD.
    pub fn snr(&self) -> f64 {
        let sd = self.sd();
        if sd == 0.0 { 0.0 } else { self.mean() / sd }
    }

    // -- order statistics: require Stored mode --------------------------

    /// Sorted-data median (spec.md §4.1): odd `n` returns the middle
    /// sample; even `n` returns either the lower-middle sample
    /// (`strict = true`) or the mean of the two middles (`strict =
    /// false`). Fails with `NotEnoughData` on an empty accumulator.
    pub fn median(&mut self, strict: bool) -> Result<f64> {
        self.require_stored("median")?;
        if self.count == 0 {
            return Err(Error::not_enough_data("median", 1, 0));
        }
        self.sort();
        let n = self.data.len();
        Ok(if n % 2 == 1 {
            self.data[n / 2]
        } else if strict {
            self.data[n / 2 - 1]
        } else {
            (self.data[n / 2 - 1] + self.data[n / 2]) / 2.0
        })
    }

    /// Linear-interpolation quantile for `p` in `[0, 1]`; clamps to the
    /// extremes outside that range (spec.md §4.1's "extrapolates to
    /// min/max at the ends").
    pub fn quantile(&mut self, p: f64) -> Result<f64> {
        self.require_stored("quantile")?;
        if self.count == 0 {
            return Err(Error::not_enough_data("quantile", 1, 0));
        }
        self.sort();
        let n = self.data.len();
        if n == 1 {
            return Ok(self.data[0]);
        }
        let p = p.clamp(0.0, 1.0);
        let pos = p * (n - 1) as f64;
        let lo = pos.floor() as usize;
        let hi = pos.ceil() as usize;
        if lo == hi {
            return Ok(self.data[lo]);
        }
        let frac = pos - lo as f64;
        Ok(self.data[lo] * (1.0 - frac) + self.data[hi] * frac)
    }

    pub fn interquartile_range(&mut self) -> Result<f64> {
        Ok(self.quantile(0.75)? - self.quantile(0.25)?)
    }

    /// Mean without the first/last `qfrom`/`qto` quantile tails.
    pub fn truncated_mean(&mut self, qfrom: f64, qto: f64) -> Result<f64> {
        self.require_stored("truncated_mean")?;
        if self.count == 0 {
            return Err(Error::not_enough_data("truncated_mean", 1, 0));
        }
        self.sort();
        let n = self.data.len();
        let lo = ((qfrom.clamp(0.0, 1.0)) * n as f64).floor() as usize;
        let hi = ((qto.clamp(0.0, 1.0)) * n as f64).ceil() as usize;
        let hi = hi.clamp(lo + 1, n);
        let slice = &self.data[lo..hi];
        Ok(slice.iter().sum::<f64>() / slice.len() as f64)
    }

    /// Median of absolute deviations from `center`.
    pub fn mad(&mut self, center: f64) -> Result<f64> {
        self.require_stored("mad")?;
        if self.count == 0 {
            return Err(Error::not_enough_data("mad", 1, 0));
        }
        let deviations: Vec<f64> = self.data.iter().map(|x| (x - center).abs()).collect();
        let mut sub = Stats::from_slice(&deviations);
        sub.median(true)
    }

    /// Split MAD: medians of absolute deviations, grouped by the sign of
    /// `x - center` (spec.md §4.1). Returns `(mad_left, mad_right)`.
    pub fn mad_asym(&mut self, center: f64) -> Result<(f64, f64)> {
        self.require_stored("mad_asym")?;
        if self.count == 0 {
            return Err(Error::not_enough_data("mad_asym", 1, 0));
        }
        let (left, right): (Vec<f64>, Vec<f64>) = self
            .data
            .iter()
            .map(|x| (x - center).abs())
            .zip(self.data.iter())
            .fold((Vec::new(), Vec::new()), |(mut l, mut r), (dev, &x)| {
                if x < center {
                    l.push(dev);
                } else {
                    r.push(dev);
                }
                (l, r)
            });
        let mad_left = if left.is_empty() {
            0.0
        } else {
            Stats::from_slice(&left).median(true)?
        };
        let mad_right = if right.is_empty() {
            0.0
        } else {
            Stats::from_slice(&right).median(true)?
        };
        Ok((mad_left, mad_right))
    }

    /// Rousseeuw-Croux Qn: a robust scale estimate, `2.2219 *` the
    /// `k`-th order statistic of all pairwise absolute differences, with
    /// `k` chosen so the estimate is consistent for a Gaussian. `max_items`
    /// caps the number of samples considered (the original bounds the
    /// O(n^2) pair enumeration the same way).
    pub fn qn(&mut self, max_items: usize) -> Result<f64> {
        self.require_stored("qn")?;
        self.sort();
        let data = if self.data.len() > max_items {
            &self.data[..max_items]
        } else {
            &self.data[..]
        };
        let n = data.len();
        if n < 2 {
            return Err(Error::not_enough_data("qn", 2, n));
        }
        let mut diffs = Vec::with_capacity(n * (n - 1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                diffs.push((data[i] - data[j]).abs());
            }
        }
        diffs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let h = n / 2 + 1;
        let k = h * (h - 1) / 2;
        let k = k.min(diffs.len() - 1);
        Ok(2.2219 * diffs[k])
    }

    /// Rousseeuw-Croux Sn: a robust scale estimate based on the median of
    /// per-sample medians of absolute differences.
    pub fn sn(&mut self, max_items: usize) -> Result<f64> {
        self.require_stored("sn")?;
        self.sort();
        let data = if self.data.len() > max_items {
            &self.data[..max_items]
        } else {
            &self.data[..]
        };
        let n = data.len();
        if n < 2 {
            return Err(Error::not_enough_data("sn", 2, n));
        }
        let mut medians = Vec::with_capacity(n);
        for i in 0..n {
            let mut row: Vec<f64> = data.iter().map(|&x| (data[i] - x).abs()).collect();
            let mut row_stats = Stats::from_slice(&row);
            medians.push(row_stats.median(true)?);
            row.clear();
        }
        let mut m = Stats::from_slice(&medians);
        Ok(1.1926 * m.median(true)?)
    }

    // -- modes ------------------------------------------------------------

    /// Bin-center of the tallest bin of a smoothed histogram over the
    /// stored samples.
    pub fn max_mode_histogram(&mut self) -> Result<f64> {
        self.require_stored("max_mode_histogram")?;
        if self.count == 0 {
            return Err(Error::not_enough_data("max_mode_histogram", 1, 0));
        }
        let h = Histogram::from_samples(&self.data, HistogramOptions::default())?;
        Ok(h.mode_position())
    }

    /// Half-Sample-Mode: recursively restrict to the densest half of the
    /// sorted data until <= 2 samples remain, then return their mean.
    pub fn max_mode_hsm(&mut self) -> Result<f64> {
        self.require_stored("max_mode_hsm")?;
        if self.count == 0 {
            return Err(Error::not_enough_data("max_mode_hsm", 1, 0));
        }
        self.sort();
        Ok(densest_half_by_count(&self.data))
    }

    /// Half-Range-Mode: analogous to HSM, but each halving step picks the
    /// half covering the densest half of the *value range* rather than
    /// of the sample count.
    pub fn max_mode_hrm(&mut self) -> Result<f64> {
        self.require_stored("max_mode_hrm")?;
        if self.count == 0 {
            return Err(Error::not_enough_data("max_mode_hrm", 1, 0));
        }
        self.sort();
        Ok(densest_half_by_range(&self.data))
    }

    /// Combines [`Self::max_mode_histogram`], [`Self::max_mode_hsm`],
    /// [`Self::max_mode_hrm`], and the sample median into a
    /// stats-of-stats estimate: outliers among the four (beyond
    /// `2.5 * MAD`) are rejected, and the mean of the rest is returned.
    pub fn max_mode_robust(&mut self) -> Result<f64> {
        self.require_stored("max_mode_robust")?;
        let estimates = [
            self.max_mode_histogram()?,
            self.max_mode_hsm()?,
            self.max_mode_hrm()?,
            self.median(false)?,
        ];
        debug_assert_eq!(estimates.len(), NUM_MAX_MODE_ROBUST_ESTIMATES);

        let mut center_stats = Stats::from_slice(&estimates);
        let median = center_stats.median(true)?;
        let mad = center_stats.mad(median)?;
        let threshold = 2.5 * mad * MAD_TO_SIGMA;

        let kept: Vec<f64> = if mad == 0.0 {
            estimates.to_vec()
        } else {
            estimates
                .iter()
                .copied()
                .filter(|&v| (v - median).abs() <= threshold)
                .collect()
        };
        let kept = if kept.is_empty() { estimates.to_vec() } else { kept };
        Ok(kept.iter().sum::<f64>() / kept.len() as f64)
    }

    /// Gaussian kernel density estimate at `x`, using Silverman's rule of
    /// thumb bandwidth (robust variant: `min(SD, IQR / 1.34)`).
    pub fn gaussian_kernel_density(&mut self, x: f64) -> Result<f64> {
        self.require_stored("gaussian_kernel_density")?;
        if self.count == 0 {
            return Err(Error::not_enough_data("gaussian_kernel_density", 1, 0));
        }
        let n = self.data.len() as f64;
        let sd = self.sd();
        let iqr = self.interquartile_range()?;
        let spread = sd.min(iqr / 1.34).max(1e-12);
        let bandwidth = 0.9 * spread * n.powf(-0.2);

        let norm = 1.0 / (n * bandwidth * (2.0 * std::f64::consts::PI).sqrt());
        let density = self
            .data
            .iter()
            .map(|&xi| {
                let u = (x - xi) / bandwidth;
                (-0.5 * u * u).exp()
            })
            .sum::<f64>()
            * norm;
        Ok(density)
    }

    /// Randomization-test driver (spec.md §4.1): draws `draws` random
    /// subsamples of `sample_size` without replacement and returns the
    /// mean of `f` applied to each draw.
    pub fn randomize<F: Fn(&[f64]) -> f64>(
        &self,
        f: F,
        draws: usize,
        sample_size: usize,
        rng: &mut Rng,
    ) -> Result<f64> {
        self.require_stored("randomize")?;
        if self.data.is_empty() || draws == 0 {
            return Err(Error::not_enough_data("randomize", 1, self.data.len()));
        }
        let mut total = 0.0;
        for _ in 0..draws {
            let indices = rng.sample_without_replacement(self.data.len(), sample_size);
            let sample: Vec<f64> = indices.iter().map(|&i| self.data[i]).collect();
            total += f(&sample);
        }
        let result = total / draws as f64;
        debug!(target: "stats.randomize", draws, sample_size, result, "completed randomization test");
        Ok(result)
    }

    pub fn iqr_to_sigma_scale(iqr: f64) -> f64 {
        iqr * IQR_TO_SIGMA
    }
}

/// Recursively restricts `sorted` to the contiguous half with the
/// smallest span, until <= 2 samples remain.
fn densest_half_by_count(sorted: &[f64]) -> f64 {
    let mut data = sorted;
    loop {
        let n = data.len();
        if n <= 2 {
            return data.iter().sum::<f64>() / n as f64;
        }
        let half = n.div_ceil(2).max(2);
        let mut best_start = 0;
        let mut best_span = f64::INFINITY;
        for start in 0..=(n - half) {
            let span = data[start + half - 1] - data[start];
            if span < best_span {
                best_span = span;
                best_start = start;
            }
        }
        data = &data[best_start..best_start + half];
    }
}

/// Half-Range-Mode: same recursive halving, but the candidate window is
/// chosen by scanning the *value range* (max - min) rather than the
/// count span, so unevenly spaced windows of the same sample count can be
/// preferred if they cover less of the range.
fn densest_half_by_range(sorted: &[f64]) -> f64 {
    let mut data = sorted;
    loop {
        let n = data.len();
        if n <= 2 {
            return data.iter().sum::<f64>() / n as f64;
        }
        let half = n.div_ceil(2).max(2);
        let full_range = (data[n - 1] - data[0]).max(1e-300);
        let mut best_start = 0;
        let mut best_density = f64::NEG_INFINITY;
        for start in 0..=(n - half) {
            let span = (data[start + half - 1] - data[start]).max(1e-300);
            let density = half as f64 / (span / full_range);
            if density > best_density {
                best_density = density;
                best_start = start;
            }
        }
        data = &data[best_start..best_start + half];
    }
}

/// Shared-across-threads wrapper providing the "safe path" critical
/// section of spec.md §5: a single lock guards both the vector append
/// and the moment update.
#[derive(Debug, Default)]
pub struct SharedStats(Mutex<Stats>);

impl SharedStats {
    pub fn new(inner: Stats) -> Self {
        Self(Mutex::new(inner))
    }

    pub fn add(&self, x: f64) {
        self.0.lock().expect("stats mutex poisoned").add(x);
    }

    pub fn into_inner(self) -> Stats {
        self.0.into_inner().expect("stats mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_moments_return_zero_sentinel() {
        let s = Stats::streaming();
        assert_eq!(s.mean(), 0.0);
        assert_eq!(s.sd(), 0.0);
    }

    #[test]
    fn median_of_empty_stored_fails() {
        let mut s = Stats::stored_with_capacity(4);
        assert!(matches!(s.median(true), Err(Error::NotEnoughData { .. })));
    }

    #[test]
    fn median_strict_and_nonstrict_agree_on_odd_length() {
        let mut s = Stats::from_slice(&[5.0, 1.0, 3.0]);
        assert_eq!(s.median(true).unwrap(), s.median(false).unwrap());
    }

    #[test]
    fn median_even_length_strict_vs_interpolated() {
        let mut strict = Stats::from_slice(&[1.0, 2.0, 3.0, 4.0]);
        let mut loose = Stats::from_slice(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(strict.median(true).unwrap(), 2.0);
        assert_eq!(loose.median(false).unwrap(), 2.5);
    }

    #[test]
    fn quantile_clamps_at_extremes() {
        let mut s = Stats::from_slice(&[1.0, 2.0, 3.0]);
        assert_eq!(s.quantile(-1.0).unwrap(), 1.0);
        assert_eq!(s.quantile(2.0).unwrap(), 3.0);
    }

    #[test]
    fn quantile_interpolates_linearly() {
        let mut s = Stats::from_slice(&[0.0, 10.0]);
        assert_eq!(s.quantile(0.5).unwrap(), 5.0);
    }

    #[test]
    fn mad_of_symmetric_data_around_median() {
        let mut s = Stats::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let median = s.median(true).unwrap();
        assert_eq!(s.mad(median).unwrap(), 1.0);
    }

    #[test]
    fn max_mode_hsm_converges_on_dense_cluster() {
        let mut data: Vec<f64> = vec![10.0; 20];
        data.extend([0.0, 100.0, -50.0]);
        let mut s = Stats::from_slice(&data);
        let mode = s.max_mode_hsm().unwrap();
        assert!((mode - 10.0).abs() < 1.0);
    }

    #[test]
    fn randomize_mean_of_uniform_is_close_to_true_mean() {
        let data: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        let s = Stats::from_slice(&data);
        let mut rng = Rng::new(123);
        let est = s
            .randomize(|sample| sample.iter().sum::<f64>() / sample.len() as f64, 200, 50, &mut rng)
            .unwrap();
        assert!((est - 499.5).abs() < 20.0);
    }

    #[test]
    fn shared_stats_accumulates_across_threads() {
        use std::sync::Arc;
        use std::thread;

        let shared = Arc::new(SharedStats::new(Stats::streaming()));
        let mut handles = Vec::new();
        for t in 0..4 {
            let shared = Arc::clone(&shared);
            handles.push(thread::spawn(move || {
                for i in 0..1000 {
                    shared.add((t * 1000 + i) as f64);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        let inner = Arc::try_unwrap(shared).unwrap().into_inner();
        assert_eq!(inner.n(), 4000);
    }
}

#[cfg(test)]
mod order_statistic_properties {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// The median of any nonempty sample always falls within the
        /// sample's own range, regardless of ordering or duplicates.
        #[test]
        fn median_is_within_the_sample_range(data in prop::collection::vec(-1.0e6f64..1.0e6, 1..200)) {
            let mut s = Stats::from_slice(&data);
            let median = s.median(false).unwrap();
            prop_assert!(median >= s.min() - 1e-9);
            prop_assert!(median <= s.max() + 1e-9);
        }

        /// The median absolute deviation around any center is never
        /// negative, since it's a deviation magnitude.
        #[test]
        fn mad_is_never_negative(data in prop::collection::vec(-1.0e6f64..1.0e6, 1..200), center in -1.0e6f64..1.0e6) {
            let mut s = Stats::from_slice(&data);
            let mad = s.mad(center).unwrap();
            prop_assert!(mad >= 0.0);
        }
    }
}
