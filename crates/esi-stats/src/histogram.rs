use esi_core::{Error, Result};

/// Axis scale for histogram bin placement (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistogramScale {
    Linear,
    /// Bins are placed on a log scale; samples must be strictly positive.
    Log,
}

/// Construction options for [`Histogram`].
#[derive(Debug, Clone, Copy)]
pub struct HistogramOptions {
    pub num_bins: usize,
    pub scale: HistogramScale,
    /// Odd-sized 1-D boxcar smoothing applied to the bin counts before the
    /// CDF is built; 0 or 1 disables smoothing.
    pub smoothing_width: usize,
}

impl Default for HistogramOptions {
    fn default() -> Self {
        Self {
            num_bins: 256,
            scale: HistogramScale::Linear,
            smoothing_width: 3,
        }
    }
}

/// A fixed-bin histogram with a derived cumulative distribution, used for
/// thresholding (skull-stripping, region-growing masks) and for
/// [`crate::Stats::max_mode_histogram`] (spec.md §4.2).
///
/// The CDF is monotone non-decreasing and right-continuous by
/// construction; [`Histogram::percentile_position`] inverts it by linear
/// interpolation between the two bin centers straddling `p` (spec.md §8
/// invariant 6).
#[derive(Debug, Clone)]
pub struct Histogram {
    min: f64,
    max: f64,
    bin_width: f64,
    scale: HistogramScale,
    counts: Vec<u64>,
    cdf: Vec<f64>,
    total: u64,
}

impl Histogram {
    pub fn from_samples(data: &[f64], options: HistogramOptions) -> Result<Self> {
        if data.is_empty() {
            return Err(Error::not_enough_data("Histogram::from_samples", 1, 0));
        }
        if options.num_bins == 0 {
            return Err(Error::invalid_input(
                "Histogram::from_samples",
                "num_bins must be nonzero",
            ));
        }
        if options.scale == HistogramScale::Log && data.iter().any(|&x| x <= 0.0) {
            return Err(Error::invalid_input(
                "Histogram::from_samples",
                "log scale requires strictly positive samples",
            ));
        }

        let transform = |x: f64| match options.scale {
            HistogramScale::Linear => x,
            HistogramScale::Log => x.ln(),
        };

        let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
        for &x in data {
            let t = transform(x);
            lo = lo.min(t);
            hi = hi.max(t);
        }
        if !(hi > lo) {
            // Degenerate: every sample identical. Widen artificially so a
            // single bin can still hold them.
            hi = lo + 1.0;
        }

        let bin_width = (hi - lo) / options.num_bins as f64;
        let mut counts = vec![0u64; options.num_bins];
        for &x in data {
            let t = transform(x);
            let bin = (((t - lo) / bin_width) as usize).min(options.num_bins - 1);
            counts[bin] += 1;
        }

        if options.smoothing_width > 1 {
            counts = boxcar_smooth(&counts, options.smoothing_width);
        }

        let total: u64 = counts.iter().sum();
        let mut cdf = Vec::with_capacity(counts.len());
        let mut running = 0u64;
        for &c in &counts {
            running += c;
            cdf.push(running as f64 / total as f64);
        }

        Ok(Self {
            min: lo,
            max: hi,
            bin_width,
            scale: options.scale,
            counts,
            cdf,
            total,
        })
    }

    pub fn num_bins(&self) -> usize {
        self.counts.len()
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    fn untransform(&self, t: f64) -> f64 {
        match self.scale {
            HistogramScale::Linear => t,
            HistogramScale::Log => t.exp(),
        }
    }

    /// The original-scale coordinate of the center of bin `index`.
    pub fn bin_center(&self, index: usize) -> f64 {
        let t = self.min + self.bin_width * (index as f64 + 0.5);
        self.untransform(t)
    }

    /// Value at the tallest bin's center; ties resolve to the first.
    pub fn mode_position(&self) -> f64 {
        let (idx, _) = self
            .counts
            .iter()
            .enumerate()
            .max_by_key(|&(_, &c)| c)
            .unwrap_or((0, &0));
        self.bin_center(idx)
    }

    /// Position of the first nonempty bin.
    pub fn first_position(&self) -> f64 {
        let idx = self.counts.iter().position(|&c| c > 0).unwrap_or(0);
        self.bin_center(idx)
    }

    /// Position of the last nonempty bin.
    pub fn last_position(&self) -> f64 {
        let idx = self
            .counts
            .iter()
            .rposition(|&c| c > 0)
            .unwrap_or(self.counts.len() - 1);
        self.bin_center(idx)
    }

    /// Inverts the CDF at probability `p` (clamped to `[0, 1]`) by linear
    /// interpolation between the bin centers straddling it.
    pub fn percentile_position(&self, p: f64) -> f64 {
        let p = p.clamp(0.0, 1.0);
        if p <= self.cdf[0] {
            return self.bin_center(0);
        }
        let last = self.cdf.len() - 1;
        if p >= self.cdf[last] {
            return self.bin_center(last);
        }
        let hi = self.cdf.partition_point(|&c| c < p).min(last);
        let lo = hi.saturating_sub(1);
        let (c_lo, c_hi) = (self.cdf[lo], self.cdf[hi]);
        if (c_hi - c_lo).abs() < f64::EPSILON {
            return self.bin_center(hi);
        }
        let frac = (p - c_lo) / (c_hi - c_lo);
        self.bin_center(lo) + frac * (self.bin_center(hi) - self.bin_center(lo))
    }

    pub fn cdf_at_bin(&self, index: usize) -> f64 {
        self.cdf[index]
    }
}

/// Odd-window moving-average smoothing with edge clamping (replicated
/// border, not zero-padded, so total mass is approximately preserved).
fn boxcar_smooth(counts: &[u64], width: usize) -> Vec<u64> {
    let half = (width / 2) as isize;
    let n = counts.len() as isize;
    (0..n)
        .map(|i| {
            let mut sum = 0u64;
            let mut n_terms = 0u64;
            for d in -half..=half {
                let j = (i + d).clamp(0, n - 1);
                sum += counts[j as usize];
                n_terms += 1;
            }
            sum / n_terms.max(1)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_errors() {
        let result = Histogram::from_samples(&[], HistogramOptions::default());
        assert!(result.is_err());
    }

    #[test]
    fn log_scale_rejects_nonpositive_samples() {
        let options = HistogramOptions {
            scale: HistogramScale::Log,
            ..Default::default()
        };
        let result = Histogram::from_samples(&[1.0, 0.0, 2.0], options);
        assert!(result.is_err());
    }

    #[test]
    fn cdf_is_monotone_nondecreasing() {
        let data: Vec<f64> = (0..500).map(|i| (i as f64) * 0.01).collect();
        let h = Histogram::from_samples(&data, HistogramOptions::default()).unwrap();
        let mut prev = 0.0;
        for i in 0..h.num_bins() {
            let c = h.cdf_at_bin(i);
            assert!(c >= prev - 1e-12);
            prev = c;
        }
        approx::assert_abs_diff_eq!(h.cdf_at_bin(h.num_bins() - 1), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn percentile_position_is_monotone_in_p() {
        let data: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        let h = Histogram::from_samples(
            &data,
            HistogramOptions {
                smoothing_width: 0,
                ..Default::default()
            },
        )
        .unwrap();
        let mut prev = h.percentile_position(0.0);
        for i in 1..=100 {
            let p = i as f64 / 100.0;
            let pos = h.percentile_position(p);
            assert!(pos >= prev - 1e-6);
            prev = pos;
        }
    }

    #[test]
    fn percentile_position_extremes_hit_the_first_and_last_bin_centers() {
        let data: Vec<f64> = (0..200).map(|i| i as f64).collect();
        let h = Histogram::from_samples(&data, HistogramOptions::default()).unwrap();
        assert_eq!(h.percentile_position(0.0), h.bin_center(0));
        assert_eq!(
            h.percentile_position(1.0),
            h.bin_center(h.num_bins() - 1)
        );
    }

    #[test]
    fn mode_position_finds_the_tallest_bin() {
        let mut data = vec![50.0; 300];
        data.extend((0..50).map(|i| i as f64));
        let h = Histogram::from_samples(
            &data,
            HistogramOptions {
                smoothing_width: 0,
                ..Default::default()
            },
        )
        .unwrap();
        assert!((h.mode_position() - 50.0).abs() < 2.0);
    }
}
