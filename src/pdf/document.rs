use async_trait::async_trait;
use lopdf::{Dictionary, Document, Object, ObjectId};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use super::{DecodedDocument, DocumentCodec, PageHandle};
use crate::error::CodecError;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Distinguishes documents, so pages copied from the same one can share
/// objects in an output.
static NEXT_DOCUMENT_KEY: AtomicU64 = AtomicU64::new(1);

fn next_document_key() -> u64 {
    NEXT_DOCUMENT_KEY.fetch_add(1, Ordering::Relaxed)
}

/// PDF codec backed by lopdf.
#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfCodec;

#[async_trait]
impl DocumentCodec for LopdfCodec {
    type Document = PdfDocument;

    async fn load(&self, bytes: &[u8]) -> Result<PdfDocument, CodecError> {
        PdfDocument::from_bytes(bytes)
    }

    fn new_document(&self) -> PdfDocument {
        PdfDocument::new()
    }
}

pub struct PdfDocument {
    pub doc: Document,
    key: u64,
    pages: Vec<ObjectId>,
    pages_root: ObjectId,
    /// `(source document key, source object id)` to the id of its copy here.
    copied: HashMap<(u64, ObjectId), ObjectId>,
}

impl PdfDocument {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let doc =
            Document::load_mem(bytes).map_err(|e| CodecError::InvalidDocument(e.to_string()))?;

        let pages_root = doc
            .catalog()
            .and_then(|catalog| catalog.get(b"Pages"))
            .and_then(|pages| pages.as_reference())
            .map_err(|e| CodecError::InvalidDocument(format!("No page tree: {}", e)))?;

        // get_pages is keyed by 1-based page number, so values come out in order
        let pages = doc.get_pages().into_values().collect();

        Ok(PdfDocument {
            doc,
            key: next_document_key(),
            pages,
            pages_root,
            copied: HashMap::new(),
        })
    }

    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_root = doc.new_object_id();

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Kids", Object::Array(Vec::new()));
        pages.set("Count", Object::Integer(0));
        doc.objects.insert(pages_root, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_root));
        let catalog_id = doc.add_object(catalog);
        doc.trailer.set("Root", Object::Reference(catalog_id));

        PdfDocument {
            doc,
            key: next_document_key(),
            pages: Vec::new(),
            pages_root,
            copied: HashMap::new(),
        }
    }

    /// Get metadata from the document info dictionary
    pub fn info(&self) -> PdfInfo {
        let mut info = PdfInfo::default();

        if let Ok(Object::Reference(info_ref)) = self.doc.trailer.get(b"Info") {
            if let Ok(Object::Dictionary(dict)) = self.doc.get_object(*info_ref) {
                info.title = get_string_from_dict(dict, b"Title");
                info.author = get_string_from_dict(dict, b"Author");
                info.creator = get_string_from_dict(dict, b"Creator");
                info.producer = get_string_from_dict(dict, b"Producer");
                info.creation_date = get_string_from_dict(dict, b"CreationDate");
                info.mod_date = get_string_from_dict(dict, b"ModDate");
                info.subject = get_string_from_dict(dict, b"Subject");
                info.keywords = get_string_from_dict(dict, b"Keywords");
            }
        }

        info.page_count = self.pages.len() as u32;
        info
    }

    /// Walk up the page tree looking for an inherited attribute.
    fn inherited_attribute(&self, page_id: ObjectId, key: &[u8]) -> Option<Object> {
        let mut current = self.doc.get_dictionary(page_id).ok()?;
        let mut visited = HashSet::from([page_id]);

        loop {
            let parent_id = current.get(b"Parent").ok()?.as_reference().ok()?;
            if !visited.insert(parent_id) {
                return None;
            }
            current = self.doc.get_dictionary(parent_id).ok()?;
            if let Ok(value) = current.get(key) {
                return Some(value.clone());
            }
        }
    }

    fn sync_page_tree(&mut self) -> Result<(), CodecError> {
        let kids: Vec<Object> = self.pages.iter().map(|&id| Object::Reference(id)).collect();
        let count = kids.len() as i64;

        let root = self
            .doc
            .get_dictionary_mut(self.pages_root)
            .map_err(|e| CodecError::CopyFailed(format!("Invalid page tree: {}", e)))?;
        root.set("Kids", Object::Array(kids));
        root.set("Count", Object::Integer(count));
        Ok(())
    }
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DecodedDocument for PdfDocument {
    type Page = PdfPage;

    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Copy a page together with every object it references.
    ///
    /// Inherited attributes are pulled down onto the page so it renders the
    /// same outside its original tree. References to other pages (link
    /// destinations, form field parents) are not followed.
    async fn copy_page(&self, index: u32) -> Result<PdfPage, CodecError> {
        let page_id = *self
            .pages
            .get(index as usize)
            .ok_or(CodecError::IndexOutOfRange {
                index,
                page_count: self.page_count(),
            })?;

        let mut dict = self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| CodecError::CopyFailed(e.to_string()))?
            .clone();
        dict.remove(b"Parent");
        for key in INHERITABLE {
            if !dict.has(key) {
                if let Some(value) = self.inherited_attribute(page_id, key) {
                    dict.set(key.to_vec(), value);
                }
            }
        }

        // Rotate may be an indirect integer; PdfPage only reads direct ones.
        let rotate = dict.get(b"Rotate").ok().map(|rotate| {
            self.doc
                .dereference(rotate)
                .ok()
                .and_then(|(_, value)| value.as_i64().ok())
        });
        match rotate {
            Some(Some(degrees)) => dict.set("Rotate", Object::Integer(degrees)),
            Some(None) => {
                dict.remove(b"Rotate");
            }
            None => {}
        }

        let mut objects = BTreeMap::new();
        let mut seen = HashSet::from([page_id]);
        let mut queue = VecDeque::new();
        for (_, value) in dict.iter() {
            collect_references(value, &mut queue);
        }

        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            let Ok(object) = self.doc.get_object(id) else {
                continue;
            };
            if is_page_tree_node(object) {
                continue;
            }
            collect_references(object, &mut queue);
            objects.insert(id, object.clone());
        }

        Ok(PdfPage {
            document_key: self.key,
            source_id: page_id,
            dict,
            objects,
        })
    }

    /// Attach a copied page. Objects already brought in by an earlier page
    /// of the same source (fonts, images, shared resources) are reused.
    fn append_page(&mut self, page: PdfPage) -> Result<(), CodecError> {
        let new_page_id = self.doc.new_object_id();
        let mut ids = HashMap::from([(page.source_id, new_page_id)]);
        let mut fresh = Vec::new();
        for old_id in page.objects.keys() {
            let new_id = match self.copied.get(&(page.document_key, *old_id)) {
                Some(&existing) => existing,
                None => {
                    let new_id = self.doc.new_object_id();
                    self.copied.insert((page.document_key, *old_id), new_id);
                    fresh.push(*old_id);
                    new_id
                }
            };
            ids.insert(*old_id, new_id);
        }

        let mut objects = page.objects;
        for old_id in fresh {
            if let (Some(object), Some(&new_id)) = (objects.remove(&old_id), ids.get(&old_id)) {
                self.doc.objects.insert(new_id, remap_references(object, &ids));
            }
        }

        let mut dict = remap_dictionary(page.dict, &ids);
        dict.set("Parent", Object::Reference(self.pages_root));
        self.doc.objects.insert(new_page_id, Object::Dictionary(dict));

        self.pages.push(new_page_id);
        self.sync_page_tree()
    }

    async fn serialize(&mut self) -> Result<Vec<u8>, CodecError> {
        let mut buffer = Vec::new();
        self.doc
            .save_to(&mut buffer)
            .map_err(|e| CodecError::Serialize(e.to_string()))?;
        Ok(buffer)
    }
}

/// A page lifted out of its source document, not yet attached anywhere.
pub struct PdfPage {
    document_key: u64,
    source_id: ObjectId,
    dict: Dictionary,
    objects: BTreeMap<ObjectId, Object>,
}

impl PageHandle for PdfPage {
    fn rotation(&self) -> u16 {
        self.dict
            .get(b"Rotate")
            .and_then(|rotate| rotate.as_i64())
            .map(|degrees| degrees.rem_euclid(360) as u16)
            .unwrap_or(0)
    }

    fn set_rotation(&mut self, degrees: u16) {
        self.dict
            .set("Rotate", Object::Integer(i64::from(degrees % 360)));
    }
}

fn is_page_tree_node(object: &Object) -> bool {
    match object {
        Object::Dictionary(dict) => matches!(
            dict.get(b"Type"),
            Ok(Object::Name(name)) if matches!(name.as_slice(), b"Page" | b"Pages" | b"Catalog")
        ),
        _ => false,
    }
}

fn collect_references(object: &Object, out: &mut VecDeque<ObjectId>) {
    match object {
        Object::Reference(id) => out.push_back(*id),
        Object::Array(items) => {
            for item in items {
                collect_references(item, out);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter() {
                collect_references(value, out);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter() {
                collect_references(value, out);
            }
        }
        _ => {}
    }
}

/// Rewrite references through `ids`; anything not copied becomes null.
fn remap_references(object: Object, ids: &HashMap<ObjectId, ObjectId>) -> Object {
    match object {
        Object::Reference(id) => ids
            .get(&id)
            .map_or(Object::Null, |&new_id| Object::Reference(new_id)),
        Object::Array(items) => Object::Array(
            items
                .into_iter()
                .map(|item| remap_references(item, ids))
                .collect(),
        ),
        Object::Dictionary(dict) => Object::Dictionary(remap_dictionary(dict, ids)),
        Object::Stream(mut stream) => {
            stream.dict = remap_dictionary(stream.dict, ids);
            Object::Stream(stream)
        }
        other => other,
    }
}

fn remap_dictionary(mut dict: Dictionary, ids: &HashMap<ObjectId, ObjectId>) -> Dictionary {
    for (_, value) in dict.iter_mut() {
        *value = remap_references(std::mem::replace(value, Object::Null), ids);
    }
    dict
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct PdfInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub mod_date: Option<String>,
    pub subject: Option<String>,
    pub keywords: Option<String>,
    pub page_count: u32,
}

fn get_string_from_dict(dict: &lopdf::Dictionary, key: &[u8]) -> Option<String> {
    dict.get(key).ok().and_then(|obj| match obj {
        Object::String(bytes, _) => decode_pdf_string(bytes),
        _ => None,
    })
}

fn decode_pdf_string(bytes: &[u8]) -> Option<String> {
    // Check for UTF-16 BOM
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        // UTF-16 BE
        let u16_chars: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect();
        String::from_utf16(&u16_chars).ok()
    } else {
        // Try as Latin-1 / PDFDocEncoding (simplified)
        Some(bytes.iter().map(|&b| b as char).collect())
    }
}
