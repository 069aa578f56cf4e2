//! Page composition for multi-page documents.
//!
//! Merge several documents into one, split one into many (by range
//! expression, explicit selection or fixed page count) and reorder, rotate
//! or delete pages. The flow is always the same:
//!
//! 1. [`plan()`] turns an [`Operation`] into an ordered page-copy plan.
//! 2. [`DocumentComposer`] copies those pages, in order, into new documents
//!    through a [`DocumentCodec`].
//! 3. [`ResultBundler`] hands the outputs back individually or as one
//!    archive.
//!
//! Document decoding, archive encoding and thumbnail rendering are
//! collaborators behind traits; [`LopdfCodec`] and [`ZipFormat`] are the
//! PDF and zip implementations.

pub mod archive;
pub mod bundle;
pub mod compose;
pub mod config;
pub mod engine;
pub mod error;
pub mod page_range;
pub mod pdf;
pub mod plan;
pub mod resolve;
pub mod source;

#[cfg(test)]
mod testing;

pub use archive::{ArchiveEncoder, ArchiveFormat, ZipFormat};
pub use bundle::{Artifact, Bundle, BundleMode, DownloadSink, ResultBundler};
pub use compose::{DocumentComposer, OperationResult, OperationSummary, OutputDocument};
pub use config::{ArchiveCompression, Config};
pub use engine::{deliver, Engine, RequestTicket, RequestTracker};
pub use error::{ArchiveError, CodecError, ComposeError, RenderError};
pub use page_range::{parse_page_order, parse_page_ranges, PageRange, Rotation};
pub use pdf::{DecodedDocument, DocumentCodec, LopdfCodec, PageHandle};
pub use plan::{
    plan, plan_merge, plan_organize, plan_split_by_fixed_count, plan_split_by_range,
    plan_split_by_selection, MergeSource, Operation, OperationKind, OrganizeEntry, OutputPlan,
    PagePlanEntry, Plan, SelectionMode,
};
pub use resolve::{resolve, resolve_selection, SelectionOrder};
pub use source::{Rasterizer, SourceDocument, SourceId, ThumbnailRef, WorkingSet};
