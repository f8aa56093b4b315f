//! Numeric primitives shared by every geometric and volumetric crate in
//! the workspace: 3-D vectors, 4x4 affine transforms, a generic dense
//! array with rank-1/2/3 linearization, and axis-aligned bounding boxes.
//!
//! This crate owns layout and indexing (§9 "TArrayN<T>"): every other
//! crate that needs a dense buffer of voxels, weights, or matrix rows
//! reaches for [`Dense3D`]/[`Dense2D`] rather than rolling its own
//! linearization.

mod bbox;
mod dense;
mod mat4;
mod vec3;

pub use bbox::BoundingBox;
pub use dense::{Dense2D, Dense3D};
pub use mat4::Mat4;
pub use vec3::Vec3;
