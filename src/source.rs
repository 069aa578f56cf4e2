//! Loaded input documents.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::error::{CodecError, RenderError};
use crate::pdf::{DecodedDocument, DocumentCodec};

/// Stable identifier of a source within its [`WorkingSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(u64);

impl SourceId {
    pub fn new(raw: u64) -> Self {
        SourceId(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opaque reference to a thumbnail owned by the rasterizer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThumbnailRef(pub String);

/// Page renderer used for previews. Output documents never depend on it.
#[async_trait]
pub trait Rasterizer<D: Sync>: Send + Sync {
    async fn render_page(
        &self,
        document: &D,
        page_number: u32,
        scale: f32,
    ) -> Result<ThumbnailRef, RenderError>;
}

/// A decoded input document. Read-only once loaded.
pub struct SourceDocument<D> {
    id: SourceId,
    name: String,
    byte_size: u64,
    page_count: u32,
    handle: Arc<D>,
    thumbnails: OnceCell<Vec<ThumbnailRef>>,
}

impl<D: DecodedDocument> SourceDocument<D> {
    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The display name without its extension, used to name outputs.
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("document")
    }

    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn handle(&self) -> &Arc<D> {
        &self.handle
    }

    /// Per-page thumbnails, rendered on first request and cached.
    ///
    /// The scale of the first successful call is the one that sticks.
    pub async fn thumbnails<R>(
        &self,
        rasterizer: &R,
        scale: f32,
    ) -> Result<&[ThumbnailRef], RenderError>
    where
        R: Rasterizer<D>,
    {
        let thumbnails = self
            .thumbnails
            .get_or_try_init(|| async move {
                let mut thumbnails = Vec::with_capacity(self.page_count as usize);
                for page_number in 1..=self.page_count {
                    let thumbnail = rasterizer
                        .render_page(self.handle.as_ref(), page_number, scale)
                        .await?;
                    thumbnails.push(thumbnail);
                }
                debug!(source = %self.id, pages = self.page_count, "rendered thumbnails");
                Ok::<_, RenderError>(thumbnails)
            })
            .await?;
        Ok(thumbnails.as_slice())
    }
}

/// The documents a user is currently working with.
pub struct WorkingSet<D> {
    sources: Vec<SourceDocument<D>>,
    next_id: u64,
}

impl<D: DecodedDocument> WorkingSet<D> {
    pub fn new() -> Self {
        WorkingSet {
            sources: Vec::new(),
            next_id: 1,
        }
    }

    /// Decode `bytes` and add the document. Ids are never reused, even
    /// after [`remove`](Self::remove) or [`reset`](Self::reset).
    pub async fn load<C>(
        &mut self,
        codec: &C,
        name: impl Into<String>,
        bytes: &[u8],
    ) -> Result<SourceId, CodecError>
    where
        C: DocumentCodec<Document = D>,
    {
        let name = name.into();
        let document = codec.load(bytes).await?;

        let id = SourceId(self.next_id);
        self.next_id += 1;

        let page_count = document.page_count();
        info!(
            source = %id,
            name = %name,
            pages = page_count,
            bytes = bytes.len(),
            "loaded source document"
        );

        self.sources.push(SourceDocument {
            id,
            name,
            byte_size: bytes.len() as u64,
            page_count,
            handle: Arc::new(document),
            thumbnails: OnceCell::new(),
        });
        Ok(id)
    }

    pub fn get(&self, id: SourceId) -> Option<&SourceDocument<D>> {
        self.sources.iter().find(|source| source.id == id)
    }

    pub fn remove(&mut self, id: SourceId) -> Option<SourceDocument<D>> {
        let position = self.sources.iter().position(|source| source.id == id)?;
        debug!(source = %id, "removed source document");
        Some(self.sources.remove(position))
    }

    pub fn reset(&mut self) {
        debug!(count = self.sources.len(), "reset working set");
        self.sources.clear();
    }

    /// Sources in the order they were loaded.
    pub fn iter(&self) -> impl Iterator<Item = &SourceDocument<D>> {
        self.sources.iter()
    }

    pub fn ids(&self) -> Vec<SourceId> {
        self.sources.iter().map(|source| source.id).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl<D: DecodedDocument> Default for WorkingSet<D> {
    fn default() -> Self {
        Self::new()
    }
}
