//! Serde data file structs for conveyor content.
//!
//! These define the on-disk format of belt types and world settings. They are
//! deserialized from RON, JSON, or TOML files and then resolved into core
//! types by the loader.

use serde::Deserialize;

// ===========================================================================
// Belts
// ===========================================================================

/// A belt type definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct BeltData {
    pub name: String,
    /// Tiles travelled per tick. Stored with three decimal digits.
    pub speed: f64,
}

/// TOML has no top-level arrays, so belt lists live under a `belts` key.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlBelts {
    pub belts: Vec<BeltData>,
}

// ===========================================================================
// World
// ===========================================================================

/// Optional world settings. Missing fields keep their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorldData {
    #[serde(default)]
    pub max_segment_length: Option<u32>,
}
