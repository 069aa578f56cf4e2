pub mod info;
pub mod merge;
pub mod organize;
pub mod split;

use anyhow::{anyhow, Context, Result};
use pagecraft::pdf::PdfDocument;
use pagecraft::{
    Bundle, ComposeError, DownloadSink, Engine, LopdfCodec, SourceId, WorkingSet, ZipFormat,
};
use std::path::{Path, PathBuf};

pub type PdfEngine = Engine<LopdfCodec, ZipFormat>;
pub type PdfSources = WorkingSet<PdfDocument>;

/// Read a PDF from disk into the working set.
pub async fn load_file(
    engine: &PdfEngine,
    sources: &mut PdfSources,
    path: &Path,
) -> Result<SourceId> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read PDF: {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("document.pdf");

    engine
        .load(sources, name, &bytes)
        .await
        .with_context(|| format!("Failed to open PDF: {}", path.display()))
}

/// Turn an engine error into the message the user should see.
pub fn report(err: ComposeError) -> anyhow::Error {
    anyhow!(err.user_message())
}

/// Writes artifacts into a directory under their own filenames.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn create<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        Ok(DirectorySink {
            dir: dir.to_path_buf(),
        })
    }

    /// Deliver every artifact, returning the paths written.
    pub fn deliver_all(&self, bundle: &Bundle) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for artifact in bundle.artifacts() {
            self.deliver(&artifact.bytes, &artifact.filename)
                .with_context(|| format!("Failed to write {}", artifact.filename))?;
            written.push(self.dir.join(&artifact.filename));
        }
        Ok(written)
    }
}

impl DownloadSink for DirectorySink {
    fn deliver(&self, bytes: &[u8], filename: &str) -> std::io::Result<()> {
        // Never let a crafted filename escape the output directory.
        let name = Path::new(filename).file_name().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty filename")
        })?;
        std::fs::write(self.dir.join(name), bytes)
    }
}
