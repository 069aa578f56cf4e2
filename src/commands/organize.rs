use super::{load_file, report, PdfEngine};
use anyhow::{Context, Result};
use pagecraft::{parse_page_order, Operation, OrganizeEntry, WorkingSet};
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct OrganizeReport {
    pub output: String,
    pub pages_before: u32,
    pub pages_after: usize,
}

pub async fn execute(
    engine: &PdfEngine,
    path: &Path,
    order: &str,
    output: &Path,
) -> Result<OrganizeReport> {
    let mut sources = WorkingSet::new();
    let source_id = load_file(engine, &mut sources, path).await?;
    let page_count = sources
        .get(source_id)
        .context("Source vanished after loading")?
        .page_count();

    let pages: Vec<OrganizeEntry> = parse_page_order(order, page_count)?
        .into_iter()
        .map(|page| OrganizeEntry {
            page_number: page.page_number,
            rotation: page.rotation.degrees(),
        })
        .collect();

    let result = engine
        .run(&Operation::Organize { source_id, pages }, &sources)
        .await
        .map_err(report)?;
    let organized = result
        .outputs
        .into_iter()
        .next()
        .context("Organize produced no document")?;

    tokio::fs::write(output, &organized.bytes)
        .await
        .with_context(|| format!("Failed to save PDF: {}", output.display()))?;

    Ok(OrganizeReport {
        output: output.display().to_string(),
        pages_before: page_count,
        pages_after: result.summary.pages_touched,
    })
}

pub async fn run(engine: &PdfEngine, path: &Path, order: &str, output: &Path) -> Result<()> {
    let report = execute(engine, path, order, output).await?;
    println!(
        "Wrote {} of {} pages to {}",
        report.pages_after, report.pages_before, report.output
    );
    Ok(())
}
