use anyhow::Result;
use rmcp::{
    ServerHandler, ServiceExt,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    schemars, tool, tool_router,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::cli::SplitMode;
use crate::commands::merge::MergeInput;
use crate::commands::split::SplitTarget;
use crate::commands::{info, merge, organize, split, PdfEngine};

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PathRequest {
    #[schemars(description = "Path to the PDF file")]
    pub path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MergeInputRequest {
    #[schemars(description = "Path to a PDF file, or a directory of PDFs merged in name order")]
    pub path: String,
    #[schemars(description = "Page ranges to take (e.g., '1-3,5'); all pages when omitted")]
    #[serde(default)]
    pub pages: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfMergeRequest {
    #[schemars(description = "Documents to merge, in output order. The same file may appear more than once")]
    pub inputs: Vec<MergeInputRequest>,
    #[schemars(description = "Output file path")]
    pub output: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfSplitRequest {
    #[schemars(description = "Path to the PDF file to split")]
    pub path: String,
    #[schemars(description = "One document per range (e.g., '1-3,5,8-10')")]
    #[serde(default)]
    pub ranges: Option<String>,
    #[schemars(description = "Selected pages (e.g., '1,4,6-8') in one document")]
    #[serde(default)]
    pub pages: Option<String>,
    #[schemars(description = "With pages: one document per selected page (default: false)")]
    #[serde(default)]
    pub separate: bool,
    #[schemars(description = "Fixed number of pages per document")]
    #[serde(default)]
    pub every: Option<u32>,
    #[schemars(description = "Output directory")]
    pub output_dir: String,
    #[schemars(description = "Bundle outputs into one zip archive with this name; empty string uses the default name")]
    #[serde(default)]
    pub zip: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PdfOrganizeRequest {
    #[schemars(description = "Path to the PDF file")]
    pub path: String,
    #[schemars(description = "New page order; omitted pages are deleted. Suffix R, D or L rotates 90, 180 or 270 degrees (e.g., '3R,1,2D,5-end')")]
    pub order: String,
    #[schemars(description = "Output file path")]
    pub output: String,
}

#[derive(Debug, Clone)]
pub struct PdfServer {
    engine: Arc<PdfEngine>,
    #[allow(dead_code)]
    tool_router: ToolRouter<Self>,
}

impl PdfServer {
    pub fn new(engine: PdfEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            tool_router: Self::tool_router(),
        }
    }
}

fn to_json<T: Serialize>(result: Result<T>) -> String {
    match result {
        Ok(value) => {
            serde_json::to_string_pretty(&value).unwrap_or_else(|e| format!("Error: {}", e))
        }
        Err(e) => format!("Error: {:#}", e),
    }
}

#[tool_router]
impl PdfServer {
    #[tool(description = "Get PDF metadata including title, author, creator, producer, creation date, size, and page count")]
    async fn pdf_info(&self, Parameters(PathRequest { path }): Parameters<PathRequest>) -> String {
        to_json(info::execute(&self.engine, Path::new(&path)).await)
    }

    #[tool(description = "Merge PDFs into one file, optionally taking only some pages of each. Use page range syntax like '1-3,5'.")]
    async fn pdf_merge(&self, Parameters(req): Parameters<PdfMergeRequest>) -> String {
        let inputs = req
            .inputs
            .into_iter()
            .map(|input| MergeInput {
                path: input.path.into(),
                ranges: input.pages,
            })
            .collect();
        to_json(merge::execute(&self.engine, inputs, Path::new(&req.output)).await)
    }

    #[tool(description = "Split a PDF by ranges (one file per range), by selected pages, or every N pages. Outputs go to a directory, optionally as one zip archive.")]
    async fn pdf_split(&self, Parameters(req): Parameters<PdfSplitRequest>) -> String {
        let chosen = [req.ranges.is_some(), req.pages.is_some(), req.every.is_some()];
        if chosen.iter().filter(|&&set| set).count() != 1 {
            return "Error: Specify exactly one of ranges, pages or every".to_string();
        }

        let mode = SplitMode {
            ranges: req.ranges,
            pages: req.pages,
            separate: req.separate,
            every: req.every,
        };
        let target = SplitTarget {
            output_dir: Path::new(&req.output_dir),
            zip: req.zip.as_deref(),
        };
        to_json(split::execute(&self.engine, Path::new(&req.path), &mode, target).await)
    }

    #[tool(description = "Reorder, rotate and delete pages of a PDF and save the result to a new file")]
    async fn pdf_organize(&self, Parameters(req): Parameters<PdfOrganizeRequest>) -> String {
        to_json(
            organize::execute(
                &self.engine,
                Path::new(&req.path),
                &req.order,
                Path::new(&req.output),
            )
            .await,
        )
    }
}

impl ServerHandler for PdfServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "PDF page composition tools. Use pdf_info to inspect a document, pdf_merge to \
                 combine documents or parts of them, pdf_split to break one into several files, \
                 and pdf_organize to reorder, rotate or delete pages."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

pub async fn run_server(engine: PdfEngine) -> Result<()> {
    let server = PdfServer::new(engine);
    tracing::info!("serving MCP on stdio");

    let service = server.serve((tokio::io::stdin(), tokio::io::stdout())).await?;
    service.waiting().await?;

    Ok(())
}
