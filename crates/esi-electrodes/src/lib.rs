//! Electrodes subsystem (spec.md §4.5): electrode layouts as named point
//! clusters, each document carrying its own auto-detected orientation,
//! a 2-D azimuthal projection for on-screen layouts, and a neighbor
//! adjacency shared between the 3-D and 2-D views.

mod cluster;
mod doc;
mod orientation;
mod projection;
mod tesselation;

pub use cluster::PointCluster;
pub use doc::ElectrodesDoc;
pub use orientation::{auto_orientation, Orientation};
pub use projection::{layout_auxiliary_cluster, project_azimuthal};
pub use tesselation::{distance_sorted_neighbors, tesselate, DEFAULT_THRESHOLD_FACTOR};
