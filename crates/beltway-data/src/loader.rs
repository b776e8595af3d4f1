//! Loading pipeline: finds data files, parses them in whichever format they
//! use, and builds the belt registry and world settings.
//!
//! A data directory holds `belts.{ron,toml,json}` (required) and
//! `world.{ron,toml,json}` (optional). At most one format may exist per
//! base name.

use crate::schema::{BeltData, WorldData};
use beltway_core::fixed::LineDist;
use beltway_core::id::BeltTypeId;
use beltway_core::registry::{BeltRegistry, BeltRegistryBuilder, RegistryError};
use beltway_spatial::{ConveyorWorld, WorldConfig};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    #[error("duplicate belt '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    #[error("invalid value in {file}: {detail}")]
    InvalidValue { file: PathBuf, detail: String },

    /// The belt definitions parsed but failed registry validation.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

impl Format {
    const ALL: [Format; 3] = [Format::Ron, Format::Toml, Format::Json];

    fn extension(self) -> &'static str {
        match self {
            Format::Ron => "ron",
            Format::Toml => "toml",
            Format::Json => "json",
        }
    }
}

/// Detect the format of a file from its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    let ext = path.extension().and_then(|e| e.to_str());
    Format::ALL
        .into_iter()
        .find(|f| Some(f.extension()) == ext)
        .ok_or_else(|| DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        })
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Look in `dir` for `{base_name}.ron`, `.toml` or `.json`.
///
/// Returns `Ok(None)` if none exists and `ConflictingFormats` if more than
/// one does.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;
    for format in Format::ALL {
        let candidate = dir.join(format!("{base_name}.{}", format.extension()));
        if !candidate.exists() {
            continue;
        }
        if let Some(existing) = found {
            return Err(DataLoadError::ConflictingFormats {
                a: existing,
                b: candidate,
            });
        }
        found = Some(candidate);
    }
    Ok(found)
}

/// Like [`find_data_file`], but a missing file is an error.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse<T: DeserializeOwned>(path: &Path, format: Format, content: &str) -> Result<T, DataLoadError> {
    let parsed = match format {
        Format::Ron => ron::from_str(content).map_err(|e| e.to_string()),
        Format::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        Format::Toml => toml::from_str(content).map_err(|e| e.to_string()),
    };
    parsed.map_err(|detail| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail,
    })
}

/// Read a file and deserialize it in the format its extension names.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    parse(path, format, &content)
}

/// Deserialize a list. RON and JSON files hold the list directly; TOML files
/// hold it under `toml_key` in the top-level table.
pub fn deserialize_list<T: DeserializeOwned>(path: &Path, toml_key: &str) -> Result<Vec<T>, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    if format != Format::Toml {
        return parse(path, format, &content);
    }

    let mut table: toml::Table = parse(path, format, &content)?;
    let value = table.remove(toml_key).ok_or_else(|| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: format!("missing key '{toml_key}' in TOML file"),
    })?;
    value.try_into().map_err(|e: toml::de::Error| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: e.to_string(),
    })
}

// ===========================================================================
// Resolution
// ===========================================================================

/// Everything a data directory defines, resolved into core types.
#[derive(Debug, Clone)]
pub struct ConveyorData {
    pub registry: BeltRegistry,
    pub config: WorldConfig,
    pub belt_ids: HashMap<String, BeltTypeId>,
}

impl ConveyorData {
    pub fn belt(&self, name: &str) -> Option<BeltTypeId> {
        self.belt_ids.get(name).copied()
    }

    /// An empty world using these belts and settings.
    pub fn into_world(self) -> ConveyorWorld {
        ConveyorWorld::new(self.registry, self.config)
    }
}

/// Load every data file in `dir` and build the registry.
pub fn load_conveyor_data(dir: &Path) -> Result<ConveyorData, DataLoadError> {
    let belts_path = require_data_file(dir, "belts")?;
    let belts: Vec<BeltData> = deserialize_list(&belts_path, "belts")?;
    let (registry, belt_ids) = build_registry(&belts_path, &belts)?;

    let config = match find_data_file(dir, "world")? {
        Some(path) => resolve_world(&path, deserialize_file(&path)?)?,
        None => WorldConfig::default(),
    };

    log::debug!(
        "loaded {} belt types from {}",
        registry.belt_count(),
        dir.display()
    );
    Ok(ConveyorData {
        registry,
        config,
        belt_ids,
    })
}

fn build_registry(
    file: &Path,
    belts: &[BeltData],
) -> Result<(BeltRegistry, HashMap<String, BeltTypeId>), DataLoadError> {
    let mut builder = BeltRegistryBuilder::new();
    let mut ids = HashMap::new();
    for belt in belts {
        if ids.contains_key(&belt.name) {
            return Err(DataLoadError::DuplicateName {
                file: file.to_path_buf(),
                name: belt.name.clone(),
            });
        }
        if !belt.speed.is_finite() {
            return Err(DataLoadError::InvalidValue {
                file: file.to_path_buf(),
                detail: format!("belt '{}' has speed {}", belt.name, belt.speed),
            });
        }
        let id = builder.register_belt(&belt.name, LineDist::from_f64(belt.speed));
        ids.insert(belt.name.clone(), id);
    }
    Ok((builder.build()?, ids))
}

fn resolve_world(file: &Path, data: WorldData) -> Result<WorldConfig, DataLoadError> {
    let mut config = WorldConfig::default();
    if let Some(max) = data.max_segment_length {
        if max == 0 {
            return Err(DataLoadError::InvalidValue {
                file: file.to_path_buf(),
                detail: "max_segment_length must be at least 1".to_string(),
            });
        }
        config.max_segment_length = max;
    }
    Ok(config)
}

// ===========================================================================
// Tests
// ===========================================================================
