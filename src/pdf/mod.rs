//! The document codec seam.
//!
//! The engine never touches document bytes itself: it loads, copies pages
//! and serializes through these traits. [`LopdfCodec`] is the PDF
//! implementation.

use async_trait::async_trait;

use crate::error::CodecError;

pub mod document;

pub use document::{LopdfCodec, PdfDocument, PdfInfo, PdfPage};

#[async_trait]
pub trait DocumentCodec: Send + Sync {
    type Document: DecodedDocument;

    /// Decode raw bytes. Fails with [`CodecError::InvalidDocument`].
    async fn load(&self, bytes: &[u8]) -> Result<Self::Document, CodecError>;

    /// An empty document to append copied pages into.
    fn new_document(&self) -> Self::Document;
}

#[async_trait]
pub trait DecodedDocument: Send + Sync {
    type Page: PageHandle;

    fn page_count(&self) -> u32;

    /// Copy the page at a 0-based index out of this document.
    async fn copy_page(&self, index: u32) -> Result<Self::Page, CodecError>;

    fn append_page(&mut self, page: Self::Page) -> Result<(), CodecError>;

    async fn serialize(&mut self) -> Result<Vec<u8>, CodecError>;
}

pub trait PageHandle: Send {
    /// Current rotation in degrees, in `[0, 360)`.
    fn rotation(&self) -> u16;

    fn set_rotation(&mut self, degrees: u16);
}
