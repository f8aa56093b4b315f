//! Solution-points subsystem (spec.md §4.6): a z-sorted cloud of current-
//! density sample locations plus the 1-NN and 4-NN interpolation caches
//! that let the inverse-matrix evaluator and the volumetric display
//! resample onto the MRI grid.

mod build;
mod doc;
mod weighted4;
mod zindex;

pub use build::{build_1nn, build_4nn};
pub use doc::{GeometryType, SolutionPointsDoc};
pub use weighted4::{Weighted4, NO_SOLUTION_POINT};
pub use zindex::ZIndex;
