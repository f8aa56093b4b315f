//! Robust statistics engine (spec.md §4.1) and histogram/thresholding
//! (§4.2): the numerical policies used by every higher-level document in
//! the workspace (skull-stripping thresholds, region-growing tolerances,
//! electrode auto-orientation, maps z-scoring).

mod histogram;
mod rng;
mod stats;

pub use histogram::{Histogram, HistogramOptions, HistogramScale};
pub use rng::Rng;
pub use stats::{SharedStats, Stats, StatsMode};

/// Factor that scales the MAD to have the same spread as a Gaussian SD
/// (`original_source/Src/Utils/Math.Stats.h`).
pub const MAD_TO_SIGMA: f64 = 1.482_579_688_6;

/// Factor that scales the IQR to have the same spread as a Gaussian SD.
pub const IQR_TO_SIGMA: f64 = 0.741_289_844_3;

/// Number of independent mode estimates combined by `Stats::max_mode_robust`.
pub const NUM_MAX_MODE_ROBUST_ESTIMATES: usize = 4;
