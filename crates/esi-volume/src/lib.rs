//! Volume subsystem (spec.md §4 component 5): a 3-D scalar field plus
//! every morphological, statistical, smoothing, and shape filter used by
//! the skull-stripping pipeline and the solution-points interpolation's
//! grey-matter masking.
//!
//! Filters are pure: each reads the input volume (and, for anything with
//! a neighborhood, an implicit background padding) and produces a new
//! volume — no filter mutates its input, so callers chain them with
//! ordinary function composition rather than a builder.

mod io;
mod local_stats;
mod mask;
mod morphology;
mod rank;
mod region_growing;
mod shape;
mod smoothing;
mod threshold;
mod volume;
mod window;

pub use io::{read_volume, write_volume};
pub use local_stats::{cov, log_snr, mean_division, mean_subtraction, percent_fullness};
pub use mask::{largest_compact_component, to_mask};
pub use morphology::{close, dilate, erode, max_filter, min_filter, morph_gradient, open};
pub use rank::rank;
pub use region_growing::{region_grow, Neighborhood, RegionGrowingOptions};
pub use shape::{k_curvature, morph_gradient_external, morph_gradient_internal};
pub use smoothing::{fast_gaussian, gaussian, median, relax};
pub use threshold::{binarize, threshold_above, threshold_binarize};
pub use volume::Volume;
pub use window::radius_from_diameter;
