//! Loading pipeline: finds data files, detects their format, deserializes
//! prefab definitions and settings, and builds the part catalog.

use crate::schema::PrefabData;
use serde::de::DeserializeOwned;
use snapwright_core::catalog::PartCatalog;
use snapwright_core::config::BuilderConfig;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// Two prefabs share a key.
    #[error("duplicate prefab key '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// An I/O error occurred.
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

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for `{base_name}.ron`, `.toml` or `.json`.
///
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// more than one format exists for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its extension.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list from a file. TOML cannot hold a bare top-level array,
/// so for TOML the list is read from the array at `toml_key`. RON and JSON
/// files hold the list directly.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    if detect_format(path)? != Format::Toml {
        return deserialize_file(path);
    }

    let content = std::fs::read_to_string(path)?;
    let table: toml::Table = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
    let array = table
        .get(toml_key)
        .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?
        .clone();
    array
        .try_into()
        .map_err(|e: toml::de::Error| parse_error(path, e))
}

// ===========================================================================
// Catalog and settings
// ===========================================================================

/// Everything the builder needs from a data directory.
#[derive(Debug, Clone)]
pub struct BuilderData {
    pub catalog: PartCatalog,
    pub config: BuilderConfig,
}

/// Load prefabs from a single data file. Duplicate keys are an error.
pub fn load_catalog_file(path: &Path) -> Result<PartCatalog, DataLoadError> {
    let prefabs: Vec<PrefabData> = deserialize_list(path, "prefabs")?;
    let mut catalog = PartCatalog::new();
    for data in prefabs {
        if catalog.contains(&data.key) {
            return Err(DataLoadError::DuplicateName {
                file: path.to_path_buf(),
                name: data.key,
            });
        }
        catalog.insert(data.into_prefab());
    }
    Ok(catalog)
}

/// Load `parts.{ron,toml,json}` from `dir`. The file is required.
pub fn load_catalog(dir: &Path) -> Result<PartCatalog, DataLoadError> {
    let path = require_data_file(dir, "parts")?;
    load_catalog_file(&path)
}

/// Load `settings.{ron,toml,json}` from `dir`, or defaults when absent.
pub fn load_settings(dir: &Path) -> Result<BuilderConfig, DataLoadError> {
    match find_data_file(dir, "settings")? {
        Some(path) => deserialize_file(&path),
        None => Ok(BuilderConfig::default()),
    }
}

/// Load the catalog and settings from a data directory.
pub fn load_builder_data(dir: &Path) -> Result<BuilderData, DataLoadError> {
    let catalog = load_catalog(dir)?;
    let config = load_settings(dir)?;
    tracing::debug!(dir = %dir.display(), prefabs = catalog.len(), "loaded builder data");
    Ok(BuilderData { catalog, config })
}

// ===========================================================================
// Tests
// ===========================================================================
