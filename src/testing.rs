//! Fixtures shared by the unit tests.

use async_trait::async_trait;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};

use crate::error::{CodecError, RenderError};
use crate::pdf::{DecodedDocument, DocumentCodec, PageHandle};
use crate::source::{Rasterizer, ThumbnailRef};

/// A PDF with `num_pages` pages whose content reads `<prefix>-Page-<n>`.
pub fn pdf_with_pages(num_pages: u32, prefix: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut page_ids = Vec::new();
    for page_num in 1..=num_pages {
        let content = format!("BT /F1 12 Tf 50 700 Td ({}-Page-{}) Tj ET", prefix, page_num);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));

        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(612),
                    Object::Integer(792),
                ]),
            ),
            ("Contents", Object::Reference(content_id)),
        ]);
        page_ids.push(doc.add_object(page));
    }

    let pages = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Count", Object::Integer(num_pages as i64)),
        (
            "Kids",
            Object::Array(page_ids.iter().map(|id| Object::Reference(*id)).collect()),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// A PDF whose pages all draw one `image_len`-byte image XObject through a
/// single indirect `/Resources` dictionary.
pub fn pdf_with_shared_image(num_pages: u32, image_len: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let image_id = doc.add_object(Stream::new(
        Dictionary::from_iter(vec![
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Image".to_vec())),
            ("Width", Object::Integer(1)),
            ("Height", Object::Integer(1)),
        ]),
        vec![0x5A; image_len],
    ));
    let resources_id = doc.add_object(Dictionary::from_iter(vec![(
        "XObject",
        Object::Dictionary(Dictionary::from_iter(vec![("Im1", Object::Reference(image_id))])),
    )]));

    let mut page_ids = Vec::new();
    for page_num in 1..=num_pages {
        let content = format!("q /Im1 Do Q BT (I-Page-{}) Tj ET", page_num);
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
        page_ids.push(doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Resources", Object::Reference(resources_id)),
            ("Contents", Object::Reference(content_id)),
        ])));
    }

    finish_page_tree(doc, pages_id, page_ids)
}

/// A one-page PDF whose `/Rotate` is an indirect integer object.
pub fn pdf_with_indirect_rotate(degrees: i64) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let rotate_id = doc.add_object(Object::Integer(degrees));
    let content_id = doc.add_object(Stream::new(
        Dictionary::new(),
        b"BT (X-1) Tj ET".to_vec(),
    ));
    let page_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Page".to_vec())),
        ("Parent", Object::Reference(pages_id)),
        ("Rotate", Object::Reference(rotate_id)),
        ("Contents", Object::Reference(content_id)),
    ]));

    finish_page_tree(doc, pages_id, vec![page_id])
}

fn finish_page_tree(mut doc: Document, pages_id: ObjectId, page_ids: Vec<ObjectId>) -> Vec<u8> {
    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(page_ids.len() as i64)),
            (
                "Kids",
                Object::Array(page_ids.into_iter().map(Object::Reference).collect()),
            ),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

/// The text marker drawn on a 1-based page, e.g. `A-Page-2`.
pub fn page_marker(doc: &Document, page_number: u32) -> Option<String> {
    let page_id = *doc.get_pages().get(&page_number)?;
    let content = doc.get_page_content(page_id).ok()?;
    let text = String::from_utf8_lossy(&content);
    let start = text.find('(')? + 1;
    let end = start + text[start..].find(')')?;
    Some(text[start..end].to_string())
}

/// Every page of a serialized PDF as `(marker, rotation)`.
pub fn pdf_pages(bytes: &[u8]) -> Vec<(String, i64)> {
    let doc = Document::load_mem(bytes).unwrap();
    doc.get_pages()
        .into_iter()
        .map(|(number, page_id)| {
            let rotation = doc
                .get_dictionary(page_id)
                .unwrap()
                .get(b"Rotate")
                .and_then(Object::as_i64)
                .unwrap_or(0);
            (page_marker(&doc, number).unwrap_or_default(), rotation)
        })
        .collect()
}

/// In-memory codec whose documents are JSON lists of labelled pages.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryCodec;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryDocument {
    pub pages: Vec<MemoryPage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryPage {
    pub label: String,
    pub rotation: u16,
}

impl MemoryDocument {
    pub fn with_pages(prefix: &str, count: u32) -> Self {
        MemoryDocument {
            pages: (1..=count)
                .map(|n| MemoryPage {
                    label: format!("{}{}", prefix, n),
                    rotation: 0,
                })
                .collect(),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap()
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        serde_json::from_slice(bytes).unwrap()
    }

    /// `(label, rotation)` for each page, in order.
    pub fn summary(&self) -> Vec<(&str, u16)> {
        self.pages
            .iter()
            .map(|page| (page.label.as_str(), page.rotation))
            .collect()
    }
}

#[async_trait]
impl DocumentCodec for MemoryCodec {
    type Document = MemoryDocument;

    async fn load(&self, bytes: &[u8]) -> Result<MemoryDocument, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::InvalidDocument(e.to_string()))
    }

    fn new_document(&self) -> MemoryDocument {
        MemoryDocument::default()
    }
}

#[async_trait]
impl DecodedDocument for MemoryDocument {
    type Page = MemoryPage;

    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    async fn copy_page(&self, index: u32) -> Result<MemoryPage, CodecError> {
        self.pages
            .get(index as usize)
            .cloned()
            .ok_or(CodecError::IndexOutOfRange {
                index,
                page_count: self.page_count(),
            })
    }

    fn append_page(&mut self, page: MemoryPage) -> Result<(), CodecError> {
        self.pages.push(page);
        Ok(())
    }

    async fn serialize(&mut self) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(self).map_err(|e| CodecError::Serialize(e.to_string()))
    }
}

impl PageHandle for MemoryPage {
    fn rotation(&self) -> u16 {
        self.rotation
    }

    fn set_rotation(&mut self, degrees: u16) {
        self.rotation = degrees;
    }
}

/// Rasterizer that names each thumbnail after its page and counts calls.
#[derive(Debug, Default)]
pub struct CountingRasterizer {
    pub calls: std::sync::atomic::AtomicUsize,
}

#[async_trait]
impl Rasterizer<MemoryDocument> for CountingRasterizer {
    async fn render_page(
        &self,
        document: &MemoryDocument,
        page_number: u32,
        scale: f32,
    ) -> Result<ThumbnailRef, RenderError> {
        self.calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let page = document
            .pages
            .get(page_number as usize - 1)
            .ok_or_else(|| RenderError {
                page_number,
                message: "no such page".to_string(),
            })?;
        Ok(ThumbnailRef(format!("{}@{}", page.label, scale)))
    }
}
