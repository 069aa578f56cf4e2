//! Packaging output documents for delivery.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

use crate::archive::{ArchiveEncoder, ArchiveFormat};
use crate::compose::OutputDocument;
use crate::error::ComposeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleMode {
    /// Each document is its own download.
    Single,
    /// All documents inside one archive.
    Zip,
}

/// Something the user can download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl From<OutputDocument> for Artifact {
    fn from(document: OutputDocument) -> Self {
        Artifact {
            filename: document.filename,
            bytes: document.bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bundle {
    One(Artifact),
    Many(Vec<Artifact>),
}

impl Bundle {
    pub fn artifacts(&self) -> &[Artifact] {
        match self {
            Bundle::One(artifact) => std::slice::from_ref(artifact),
            Bundle::Many(artifacts) => artifacts,
        }
    }

    pub fn into_artifacts(self) -> Vec<Artifact> {
        match self {
            Bundle::One(artifact) => vec![artifact],
            Bundle::Many(artifacts) => artifacts,
        }
    }
}

/// Where finished artifacts end up (browser download, directory, ...).
pub trait DownloadSink {
    fn deliver(&self, bytes: &[u8], filename: &str) -> std::io::Result<()>;
}

pub struct ResultBundler<'a, A> {
    format: &'a A,
}

impl<'a, A: ArchiveFormat> ResultBundler<'a, A> {
    pub fn new(format: &'a A) -> Self {
        ResultBundler { format }
    }

    pub async fn bundle(
        &self,
        results: Vec<OutputDocument>,
        mode: BundleMode,
        archive_name: &str,
    ) -> Result<Bundle, ComposeError> {
        if results.is_empty() {
            return Err(ComposeError::EmptyResultSet);
        }

        match mode {
            BundleMode::Single if results.len() == 1 => {
                let artifact = results.into_iter().map(Artifact::from).next();
                Ok(Bundle::One(artifact.ok_or(ComposeError::EmptyResultSet)?))
            }
            BundleMode::Single => {
                debug!(count = results.len(), "bundling as individual artifacts");
                Ok(Bundle::Many(results.into_iter().map(Artifact::from).collect()))
            }
            BundleMode::Zip => {
                let mut encoder = self.format.encoder();
                let mut used = HashSet::new();
                for document in &results {
                    let name = unique_name(&document.filename, &mut used);
                    encoder.add_file(&name, &document.bytes)?;
                }
                let bytes = encoder.finalize().await?;

                info!(
                    archive = archive_name,
                    entries = results.len(),
                    bytes = bytes.len(),
                    "bundled archive"
                );
                Ok(Bundle::One(Artifact {
                    filename: archive_name.to_string(),
                    bytes,
                }))
            }
        }
    }
}

/// `name`, or `name (2)`, `name (3)`, ... if it is already taken.
fn unique_name(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_string()) {
        return name.to_string();
    }

    let path = Path::new(name);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(name);
    let extension = path.extension().and_then(|s| s.to_str());

    (2..)
        .map(|n| match extension {
            Some(ext) => format!("{} ({}).{}", stem, n, ext),
            None => format!("{} ({})", stem, n),
        })
        .find(|candidate| used.insert(candidate.clone()))
        .unwrap_or_else(|| name.to_string())
}
