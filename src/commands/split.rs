use super::{load_file, report, DirectorySink, PdfEngine};
use crate::cli::SplitMode;
use anyhow::{bail, Context, Result};
use pagecraft::{parse_page_ranges, BundleMode, Operation, SelectionMode, WorkingSet};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct SplitReport {
    pub documents: usize,
    pub pages: usize,
    pub files: Vec<String>,
}

/// Where the outputs of a split go.
#[derive(Debug, Clone, Copy)]
pub struct SplitTarget<'a> {
    pub output_dir: &'a Path,
    /// `Some("")` zips under the configured archive name.
    pub zip: Option<&'a str>,
}

pub async fn execute(
    engine: &PdfEngine,
    path: &Path,
    mode: &SplitMode,
    target: SplitTarget<'_>,
) -> Result<SplitReport> {
    let mut sources = WorkingSet::new();
    let source_id = load_file(engine, &mut sources, path).await?;
    let page_count = sources
        .get(source_id)
        .context("Source vanished after loading")?
        .page_count();

    let operation = if let Some(expression) = &mode.ranges {
        Operation::SplitByRange {
            source_id,
            expression: expression.clone(),
        }
    } else if let Some(selection) = &mode.pages {
        let pages: BTreeSet<u32> = parse_page_ranges(selection, page_count)
            .iter()
            .flat_map(|range| range.pages())
            .collect();
        Operation::SplitBySelection {
            source_id,
            pages,
            mode: if mode.separate {
                SelectionMode::Separate
            } else {
                SelectionMode::Single
            },
        }
    } else if let Some(pages_per_file) = mode.every {
        Operation::SplitByFixedCount {
            source_id,
            pages_per_file,
        }
    } else {
        bail!("Specify one of --ranges, --pages or --every");
    };

    let result = engine.run(&operation, &sources).await.map_err(report)?;
    let documents = result.outputs.len();
    let pages = result.summary.pages_touched;

    let (bundle_mode, archive_name) = match target.zip {
        Some(name) => (BundleMode::Zip, Some(name).filter(|name| !name.is_empty())),
        None => (BundleMode::Single, None),
    };
    let bundle = engine
        .bundle(result, bundle_mode, archive_name)
        .await
        .map_err(report)?;

    let written = DirectorySink::create(target.output_dir)?.deliver_all(&bundle)?;
    Ok(SplitReport {
        documents,
        pages,
        files: written.iter().map(|p| p.display().to_string()).collect(),
    })
}

pub async fn run(
    engine: &PdfEngine,
    path: &Path,
    mode: &SplitMode,
    target: SplitTarget<'_>,
) -> Result<()> {
    let report = execute(engine, path, mode, target).await?;

    println!(
        "Split {} into {} documents ({} pages)",
        path.display(),
        report.documents,
        report.pages
    );
    for file in &report.files {
        println!("  {}", file);
    }
    Ok(())
}
