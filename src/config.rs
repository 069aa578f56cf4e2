use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Compression applied to entries of a bundled archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveCompression {
    Stored,
    #[default]
    Deflated,
}

/// Engine settings, owned by the caller and passed in explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Filename of the single document a merge produces.
    pub merged_filename: String,
    /// Archive filename used when the caller does not name one.
    pub archive_name: String,
    pub archive_compression: ArchiveCompression,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            merged_filename: "merged.pdf".to_string(),
            archive_name: "documents.zip".to_string(),
            archive_compression: ArchiveCompression::default(),
        }
    }
}

impl Config {
    /// Read a JSON config file, or fall back to defaults when none is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Config::default());
        };

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }
}
