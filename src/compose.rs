//! Building output documents from plans.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::ComposeError;
use crate::pdf::{DecodedDocument, DocumentCodec, PageHandle};
use crate::plan::{OperationKind, OutputPlan, Plan};
use crate::source::{SourceId, WorkingSet};

/// A finished document, ready to bundle or deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDocument {
    pub label: String,
    pub filename: String,
    pub bytes: Vec<u8>,
    pub byte_size: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OperationSummary {
    pub kind: OperationKind,
    pub pages_touched: usize,
    pub source_count: usize,
}

/// Every output of one operation, in plan order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    pub outputs: Vec<OutputDocument>,
    pub summary: OperationSummary,
}

pub struct DocumentComposer<'a, C> {
    codec: &'a C,
}

impl<'a, C: DocumentCodec> DocumentComposer<'a, C> {
    pub fn new(codec: &'a C) -> Self {
        DocumentComposer { codec }
    }

    /// Build one document whose pages follow `plan.entries` exactly.
    ///
    /// Either every planned page is copied or an error is returned; no
    /// partial document escapes. Sources are only read.
    pub async fn compose(
        &self,
        plan: &OutputPlan,
        sources: &WorkingSet<C::Document>,
    ) -> Result<OutputDocument, ComposeError> {
        if plan.entries.is_empty() {
            return Err(ComposeError::EmptyPlan);
        }

        let mut handles: HashMap<SourceId, Arc<C::Document>> = HashMap::new();
        let mut output = self.codec.new_document();

        for entry in &plan.entries {
            let handle = match handles.get(&entry.source_id) {
                Some(handle) => Arc::clone(handle),
                None => {
                    let source = sources
                        .get(entry.source_id)
                        .ok_or(ComposeError::UnknownSource(entry.source_id))?;
                    let handle = Arc::clone(source.handle());
                    handles.insert(entry.source_id, Arc::clone(&handle));
                    handle
                }
            };

            let page_count = handle.page_count();
            if entry.page_number == 0 || entry.page_number > page_count {
                return Err(ComposeError::SourcePageOutOfRange {
                    source_id: entry.source_id,
                    page_number: entry.page_number,
                    page_count,
                });
            }

            let mut page = handle.copy_page(entry.page_number - 1).await?;
            let delta = entry.rotation_delta % 360;
            if delta != 0 {
                page.set_rotation((page.rotation() + delta) % 360);
            }
            output.append_page(page)?;
        }

        let bytes = output.serialize().await?;
        debug!(
            filename = %plan.filename,
            pages = plan.entries.len(),
            sources = handles.len(),
            bytes = bytes.len(),
            "composed output document"
        );

        Ok(OutputDocument {
            label: plan.label.clone(),
            filename: plan.filename.clone(),
            byte_size: bytes.len(),
            bytes,
        })
    }

    /// Compose every output of a plan, one after another.
    pub async fn compose_all(
        &self,
        plan: &Plan,
        sources: &WorkingSet<C::Document>,
    ) -> Result<OperationResult, ComposeError> {
        let mut outputs = Vec::with_capacity(plan.outputs.len());
        for output in &plan.outputs {
            outputs.push(self.compose(output, sources).await?);
        }

        let summary = OperationSummary {
            kind: plan.kind,
            pages_touched: plan.pages_touched(),
            source_count: plan.source_count(),
        };
        info!(
            kind = %summary.kind,
            outputs = outputs.len(),
            pages = summary.pages_touched,
            sources = summary.source_count,
            "operation complete"
        );

        Ok(OperationResult { outputs, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::LopdfCodec;
    use crate::plan::PagePlanEntry;
    use crate::testing::{
        pdf_pages, pdf_with_indirect_rotate, pdf_with_pages, pdf_with_shared_image, MemoryCodec,
        MemoryDocument,
    };
    use pretty_assertions::assert_eq;

    fn output_plan(entries: Vec<PagePlanEntry>) -> OutputPlan {
        OutputPlan {
            label: "Test".to_string(),
            filename: "test.pdf".to_string(),
            entries,
        }
    }

    fn entry(source_id: SourceId, page_number: u32, rotation_delta: u16) -> PagePlanEntry {
        PagePlanEntry {
            source_id,
            page_number,
            rotation_delta,
        }
    }

    #[tokio::test]
    async fn test_output_follows_plan_order() {
        let mut set = WorkingSet::new();
        let a = set
            .load(&MemoryCodec, "a", &MemoryDocument::with_pages("A", 2).to_bytes())
            .await
            .unwrap();
        let b = set
            .load(&MemoryCodec, "b", &MemoryDocument::with_pages("B", 2).to_bytes())
            .await
            .unwrap();

        let plan = output_plan(vec![
            entry(b, 2, 0),
            entry(a, 1, 0),
            entry(b, 1, 0),
            entry(a, 1, 0),
        ]);
        let output = DocumentComposer::new(&MemoryCodec)
            .compose(&plan, &set)
            .await
            .unwrap();

        let doc = MemoryDocument::from_bytes(&output.bytes);
        assert_eq!(
            doc.summary(),
            vec![("B2", 0), ("A1", 0), ("B1", 0), ("A1", 0)]
        );
        assert_eq!(output.filename, "test.pdf");
        assert_eq!(output.byte_size, output.bytes.len());
    }

    #[tokio::test]
    async fn test_rotation_adds_to_existing() {
        let mut source = MemoryDocument::with_pages("R", 2);
        source.pages[0].rotation = 270;
        let mut set = WorkingSet::new();
        let id = set.load(&MemoryCodec, "r", &source.to_bytes()).await.unwrap();

        let plan = output_plan(vec![entry(id, 1, 180), entry(id, 2, 90), entry(id, 1, 0)]);
        let output = DocumentComposer::new(&MemoryCodec)
            .compose(&plan, &set)
            .await
            .unwrap();

        let doc = MemoryDocument::from_bytes(&output.bytes);
        assert_eq!(doc.summary(), vec![("R1", 90), ("R2", 90), ("R1", 270)]);
    }

    #[tokio::test]
    async fn test_sources_are_not_mutated() {
        let mut set = WorkingSet::new();
        let id = set
            .load(&MemoryCodec, "s", &MemoryDocument::with_pages("S", 1).to_bytes())
            .await
            .unwrap();

        let plan = output_plan(vec![entry(id, 1, 90)]);
        DocumentComposer::new(&MemoryCodec)
            .compose(&plan, &set)
            .await
            .unwrap();

        let source = set.get(id).unwrap();
        assert_eq!(source.handle().pages[0].rotation, 0);
    }

    #[tokio::test]
    async fn test_empty_plan() {
        let set = WorkingSet::<MemoryDocument>::new();
        let result = DocumentComposer::new(&MemoryCodec)
            .compose(&output_plan(Vec::new()), &set)
            .await;
        assert!(matches!(result, Err(ComposeError::EmptyPlan)));
    }

    #[tokio::test]
    async fn test_out_of_range_aborts_whole_document() {
        let mut set = WorkingSet::new();
        let id = set
            .load(&MemoryCodec, "s", &MemoryDocument::with_pages("S", 2).to_bytes())
            .await
            .unwrap();

        for bad_page in [0, 3] {
            let plan = output_plan(vec![entry(id, 1, 0), entry(id, bad_page, 0)]);
            let result = DocumentComposer::new(&MemoryCodec).compose(&plan, &set).await;
            assert!(matches!(
                result,
                Err(ComposeError::SourcePageOutOfRange { page_count: 2, .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_unknown_source() {
        let set = WorkingSet::<MemoryDocument>::new();
        let plan = output_plan(vec![entry(SourceId::new(5), 1, 0)]);
        let result = DocumentComposer::new(&MemoryCodec).compose(&plan, &set).await;
        assert!(matches!(result, Err(ComposeError::UnknownSource(_))));
    }

    #[tokio::test]
    async fn test_merge_two_single_page_pdfs() {
        let mut set = WorkingSet::new();
        let a = set
            .load(&LopdfCodec, "a.pdf", &pdf_with_pages(1, "A"))
            .await
            .unwrap();
        let b = set
            .load(&LopdfCodec, "b.pdf", &pdf_with_pages(1, "B"))
            .await
            .unwrap();

        let plan = output_plan(vec![entry(a, 1, 0), entry(b, 1, 0)]);
        let output = DocumentComposer::new(&LopdfCodec)
            .compose(&plan, &set)
            .await
            .unwrap();

        assert_eq!(
            pdf_pages(&output.bytes),
            vec![("A-Page-1".to_string(), 0), ("B-Page-1".to_string(), 0)]
        );
    }

    #[tokio::test]
    async fn test_organize_pdf_order_and_rotation() {
        let mut set = WorkingSet::new();
        let id = set
            .load(&LopdfCodec, "o.pdf", &pdf_with_pages(3, "O"))
            .await
            .unwrap();

        let plan = output_plan(vec![entry(id, 3, 90), entry(id, 1, 0), entry(id, 2, 180)]);
        let output = DocumentComposer::new(&LopdfCodec)
            .compose(&plan, &set)
            .await
            .unwrap();

        assert_eq!(
            pdf_pages(&output.bytes),
            vec![
                ("O-Page-3".to_string(), 90),
                ("O-Page-1".to_string(), 0),
                ("O-Page-2".to_string(), 180),
            ]
        );
    }

    #[tokio::test]
    async fn test_pdf_output_does_not_grow_with_shared_resources() {
        const IMAGE_LEN: usize = 200 * 1024;
        let input = pdf_with_shared_image(10, IMAGE_LEN);
        let mut set = WorkingSet::new();
        let id = set.load(&LopdfCodec, "i.pdf", &input).await.unwrap();

        let plan = output_plan((1..=10).map(|page| entry(id, page, 0)).collect());
        let output = DocumentComposer::new(&LopdfCodec)
            .compose(&plan, &set)
            .await
            .unwrap();

        assert!(
            output.byte_size < input.len() + IMAGE_LEN / 2,
            "input {} bytes, output {} bytes",
            input.len(),
            output.byte_size
        );
        assert_eq!(pdf_pages(&output.bytes).len(), 10);
    }

    #[tokio::test]
    async fn test_pdf_rotation_adds_to_indirect_rotate() {
        let mut set = WorkingSet::new();
        let id = set
            .load(&LopdfCodec, "x.pdf", &pdf_with_indirect_rotate(90))
            .await
            .unwrap();

        let plan = output_plan(vec![entry(id, 1, 90)]);
        let output = DocumentComposer::new(&LopdfCodec)
            .compose(&plan, &set)
            .await
            .unwrap();

        assert_eq!(pdf_pages(&output.bytes), vec![("X-1".to_string(), 180)]);
    }
}
