//! Point cloud subsystem (spec.md §4 component 4): a dynamic list of 3-D
//! points with geometric queries and file round-tripping for the text/
//! binary point formats the core must read and write byte-exactly
//! (spec.md §6).

mod cloud;
mod formats;

pub use cloud::PointCloud;
pub use formats::{read_els, read_loc, read_spi, read_xyz, write_els, write_loc, write_spi, write_xyz};
pub use formats::{ClusterKind, ElsCluster, ElsDoc, LocReadOptions};
