//! Archive encoding for bundled results.

use async_trait::async_trait;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::ArchiveCompression;
use crate::error::ArchiveError;

/// Accumulates named files and produces the archive bytes.
#[async_trait]
pub trait ArchiveEncoder: Send {
    fn add_file(&mut self, name: &str, bytes: &[u8]) -> Result<(), ArchiveError>;

    async fn finalize(self) -> Result<Vec<u8>, ArchiveError>;
}

/// Hands out a fresh encoder per archive.
pub trait ArchiveFormat: Send + Sync {
    type Encoder: ArchiveEncoder;

    fn encoder(&self) -> Self::Encoder;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ZipFormat {
    pub compression: ArchiveCompression,
}

impl ZipFormat {
    pub fn new(compression: ArchiveCompression) -> Self {
        ZipFormat { compression }
    }
}

impl ArchiveFormat for ZipFormat {
    type Encoder = ZipEncoder;

    fn encoder(&self) -> ZipEncoder {
        let method = match self.compression {
            ArchiveCompression::Stored => CompressionMethod::Stored,
            ArchiveCompression::Deflated => CompressionMethod::Deflated,
        };
        ZipEncoder {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
            options: SimpleFileOptions::default().compression_method(method),
        }
    }
}

pub struct ZipEncoder {
    writer: ZipWriter<Cursor<Vec<u8>>>,
    options: SimpleFileOptions,
}

#[async_trait]
impl ArchiveEncoder for ZipEncoder {
    fn add_file(&mut self, name: &str, bytes: &[u8]) -> Result<(), ArchiveError> {
        self.writer
            .start_file(name, self.options)
            .map_err(|e| ArchiveError::Encode(format!("Failed to create entry {}: {}", name, e)))?;
        self.writer.write_all(bytes)?;
        Ok(())
    }

    async fn finalize(self) -> Result<Vec<u8>, ArchiveError> {
        let cursor = self
            .writer
            .finish()
            .map_err(|e| ArchiveError::Encode(format!("Failed to finalize archive: {}", e)))?;
        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use zip::ZipArchive;

    #[tokio::test]
    async fn test_zip_round_trip_entries() {
        for compression in [ArchiveCompression::Stored, ArchiveCompression::Deflated] {
            let mut encoder = ZipFormat::new(compression).encoder();
            encoder.add_file("one.pdf", b"first").unwrap();
            encoder.add_file("two.pdf", b"second").unwrap();
            let bytes = encoder.finalize().await.unwrap();

            let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
            assert_eq!(archive.len(), 2);

            let mut entry = archive.by_name("two.pdf").unwrap();
            let mut contents = String::new();
            entry.read_to_string(&mut contents).unwrap();
            assert_eq!(contents, "second");
        }
    }
}
