//! Maps subsystem (spec.md §4.8): a time x channel dense matrix and the
//! operations every higher-level consumer needs from it — reference
//! transforms, normalization, centroid operators, frame-wise correlation,
//! and per-channel z-scoring. The atom-type split (scalar vs vectorial)
//! is the one piece of polymorphism the whole workspace needs (§9
//! "Polymorphic maps/tracks"): every operation here branches once on it
//! at entry rather than dispatching per component.

mod atom;
mod centroid;
mod config;
mod correlate;
mod maps;
mod zscore;

pub use atom::AtomType;
pub use centroid::{compute_centroid, CentroidKind};
pub use config::{load_from_path, load_from_str, AtomTypeConfig, MapsConfig, ReferenceModeConfig};
pub use correlate::{correlate, CorrelationKind};
pub use maps::{Maps, ReferenceMode};
pub use zscore::{apply_z_score, compute_z_score, ZScoreModel};
