use thiserror::Error;

use crate::source::SourceId;

/// Failures reported by a [`DocumentCodec`](crate::pdf::DocumentCodec).
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Page index {index} is out of range (document has {page_count} pages)")]
    IndexOutOfRange { index: u32, page_count: u32 },

    #[error("Failed to copy page: {0}")]
    CopyFailed(String),

    #[error("Failed to serialize document: {0}")]
    Serialize(String),
}

/// Failures reported by an [`ArchiveEncoder`](crate::archive::ArchiveEncoder).
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Archive I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive encoding failed: {0}")]
    Encode(String),
}

/// Failures reported by a [`Rasterizer`](crate::source::Rasterizer).
#[derive(Error, Debug)]
#[error("Failed to render page {page_number}: {message}")]
pub struct RenderError {
    pub page_number: u32,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum ComposeError {
    #[error("No pages selected from any source document")]
    EmptyResult,

    #[error("No pages selected")]
    EmptySelection,

    #[error("No valid page ranges")]
    NoValidRanges,

    #[error("Pages per file must be at least 1 (got {0})")]
    InvalidChunkSize(u32),

    #[error("Every page was removed, the result would be empty")]
    ResultWouldBeEmpty,

    #[error("Rotation of {0} degrees is not a multiple of 90")]
    InvalidRotation(i32),

    #[error("Plan contains no pages")]
    EmptyPlan,

    #[error("No documents to bundle")]
    EmptyResultSet,

    #[error("Page {page_number} does not exist in source {source_id} ({page_count} pages)")]
    SourcePageOutOfRange {
        source_id: SourceId,
        page_number: u32,
        page_count: u32,
    },

    #[error("Unknown source document {0}")]
    UnknownSource(SourceId),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl ComposeError {
    /// Precondition failures the user can fix by changing their input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ComposeError::EmptyResult
                | ComposeError::EmptySelection
                | ComposeError::NoValidRanges
                | ComposeError::InvalidChunkSize(_)
                | ComposeError::ResultWouldBeEmpty
                | ComposeError::InvalidRotation(_)
                | ComposeError::EmptyPlan
                | ComposeError::EmptyResultSet
        )
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        if self.is_validation() {
            self.to_string()
        } else {
            format!("Processing failed: {}", self)
        }
    }
}
