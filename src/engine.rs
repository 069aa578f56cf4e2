//! The engine facade: load, plan, compose, bundle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::archive::{ArchiveFormat, ZipFormat};
use crate::bundle::{Bundle, BundleMode, DownloadSink, ResultBundler};
use crate::compose::{DocumentComposer, OperationResult};
use crate::config::Config;
use crate::error::ComposeError;
use crate::pdf::{DocumentCodec, LopdfCodec};
use crate::plan::{self, Operation, Plan};
use crate::source::{SourceId, WorkingSet};

/// Holds the collaborators and settings. Has no mutable state of its own,
/// so one engine can serve any number of concurrent operations.
#[derive(Debug)]
pub struct Engine<C, A> {
    codec: C,
    archive: A,
    config: Config,
}

impl Engine<LopdfCodec, ZipFormat> {
    /// PDF documents bundled into zip archives.
    pub fn pdf(config: Config) -> Self {
        let archive = ZipFormat::new(config.archive_compression);
        Engine::new(LopdfCodec, archive, config)
    }
}

impl<C: DocumentCodec, A: ArchiveFormat> Engine<C, A> {
    pub fn new(codec: C, archive: A, config: Config) -> Self {
        Engine {
            codec,
            archive,
            config,
        }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn load(
        &self,
        sources: &mut WorkingSet<C::Document>,
        name: impl Into<String>,
        bytes: &[u8],
    ) -> Result<SourceId, ComposeError> {
        Ok(sources.load(&self.codec, name, bytes).await?)
    }

    pub fn plan(
        &self,
        operation: &Operation,
        sources: &WorkingSet<C::Document>,
    ) -> Result<Plan, ComposeError> {
        plan::plan(operation, sources, &self.config)
    }

    /// Plan and compose an operation. Nothing is returned unless every
    /// output document was built.
    pub async fn run(
        &self,
        operation: &Operation,
        sources: &WorkingSet<C::Document>,
    ) -> Result<OperationResult, ComposeError> {
        let plan = self.plan(operation, sources)?;
        debug!(kind = %plan.kind, outputs = plan.outputs.len(), "running operation");
        DocumentComposer::new(&self.codec)
            .compose_all(&plan, sources)
            .await
    }

    /// Package a result. `archive_name` falls back to the configured name.
    pub async fn bundle(
        &self,
        result: OperationResult,
        mode: BundleMode,
        archive_name: Option<&str>,
    ) -> Result<Bundle, ComposeError> {
        let archive_name = archive_name.unwrap_or(&self.config.archive_name);
        ResultBundler::new(&self.archive)
            .bundle(result.outputs, mode, archive_name)
            .await
    }
}

/// Issues tickets for in-flight requests. Starting a new request or
/// resetting invalidates every older ticket.
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    current: Arc<AtomicU64>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> RequestTicket {
        let generation = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        RequestTicket {
            generation,
            current: Arc::clone(&self.current),
        }
    }

    /// Abandon whatever is in flight, e.g. when the user resets the tool.
    pub fn reset(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub struct RequestTicket {
    generation: u64,
    current: Arc<AtomicU64>,
}

impl RequestTicket {
    pub fn is_live(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.generation
    }
}

/// Hand every artifact to the sink, unless the request was abandoned.
///
/// Returns whether anything was delivered.
pub fn deliver<S: DownloadSink>(
    ticket: &RequestTicket,
    bundle: &Bundle,
    sink: &S,
) -> std::io::Result<bool> {
    if !ticket.is_live() {
        warn!(generation = ticket.generation, "dropping result of abandoned request");
        return Ok(false);
    }

    for artifact in bundle.artifacts() {
        sink.deliver(&artifact.bytes, &artifact.filename)?;
    }
    Ok(true)
}
