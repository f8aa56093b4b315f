use std::path::Path;

use serde::Deserialize;

use crate::atom::AtomType;
use crate::maps::ReferenceMode;

/// TOML-loadable defaults for the maps subsystem, the same "small typed
/// context, unknown fields ignored" pattern the core config layer uses
/// for pipeline options (SPEC_FULL.md §0).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MapsConfig {
    #[serde(default = "default_reference")]
    pub reference: ReferenceModeConfig,
    #[serde(default = "default_atom_type")]
    pub atom_type: AtomTypeConfig,
    #[serde(default)]
    pub center_before_normalize: bool,
}

impl Default for MapsConfig {
    fn default() -> Self {
        Self {
            reference: default_reference(),
            atom_type: default_atom_type(),
            center_before_normalize: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceModeConfig {
    NoReference,
    AverageReference,
}

impl From<ReferenceModeConfig> for ReferenceMode {
    fn from(value: ReferenceModeConfig) -> Self {
        match value {
            ReferenceModeConfig::NoReference => ReferenceMode::NoReference,
            ReferenceModeConfig::AverageReference => ReferenceMode::AverageReference,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtomTypeConfig {
    Scalar,
    Vectorial,
}

impl From<AtomTypeConfig> for AtomType {
    fn from(value: AtomTypeConfig) -> Self {
        match value {
            AtomTypeConfig::Scalar => AtomType::Scalar,
            AtomTypeConfig::Vectorial => AtomType::Vectorial,
        }
    }
}

fn default_reference() -> ReferenceModeConfig {
    ReferenceModeConfig::AverageReference
}

fn default_atom_type() -> AtomTypeConfig {
    AtomTypeConfig::Scalar
}

/// Parses a `MapsConfig` from a TOML string; fields absent from the
/// input fall back to their documented defaults.
pub fn load_from_str(toml_str: &str) -> Result<MapsConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Reads and parses a `MapsConfig` from a file on disk.
pub fn load_from_path(path: impl AsRef<Path>) -> esi_core::Result<MapsConfig> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| esi_core::Error::io(path, e))?;
    load_from_str(&raw).map_err(|e| esi_core::Error::invalid_input("maps_config", e.to_string()))
}
