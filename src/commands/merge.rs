use super::{load_file, report, PdfEngine};
use anyhow::{bail, Context, Result};
use pagecraft::{parse_page_ranges, MergeSource, Operation, SourceId, WorkingSet};
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// One merge input: a file and, optionally, the pages to take from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeInput {
    pub path: PathBuf,
    pub ranges: Option<String>,
}

impl MergeInput {
    /// Parse `PATH` or `PATH:RANGES`. The suffix only counts as ranges when
    /// it looks like a page range expression and the whole argument is not
    /// itself an existing file.
    pub fn parse(arg: &str) -> Self {
        if let Some((path, ranges)) = arg.rsplit_once(':') {
            let looks_like_ranges = !ranges.trim().is_empty()
                && ranges
                    .chars()
                    .all(|c| c.is_ascii_digit() || matches!(c, ',' | '-' | ' '));
            if !path.is_empty() && looks_like_ranges && !Path::new(arg).exists() {
                return MergeInput {
                    path: PathBuf::from(path),
                    ranges: Some(ranges.to_string()),
                };
            }
        }
        MergeInput {
            path: PathBuf::from(arg),
            ranges: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MergeReport {
    pub output: String,
    pub files: usize,
    pub pages: usize,
    pub byte_size: usize,
}

/// Replace directory inputs with the PDFs inside them, sorted by name.
/// Ranges on a directory apply to each of its files.
pub fn expand_inputs(inputs: Vec<MergeInput>) -> Result<Vec<MergeInput>> {
    let mut expanded = Vec::new();
    for input in inputs {
        if !input.path.is_dir() {
            expanded.push(input);
            continue;
        }

        for entry in WalkDir::new(&input.path).sort_by_file_name() {
            let entry = entry
                .with_context(|| format!("Failed to read directory: {}", input.path.display()))?;
            if entry.file_type().is_file() && is_pdf(entry.path()) {
                expanded.push(MergeInput {
                    path: entry.into_path(),
                    ranges: input.ranges.clone(),
                });
            }
        }
    }
    Ok(expanded)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

pub async fn execute(
    engine: &PdfEngine,
    inputs: Vec<MergeInput>,
    output: &Path,
) -> Result<MergeReport> {
    let inputs = expand_inputs(inputs)?;
    if inputs.is_empty() {
        bail!("No input files specified");
    }

    // A file named twice is decoded once and referenced from both entries.
    let mut sources = WorkingSet::new();
    let mut loaded: HashMap<PathBuf, SourceId> = HashMap::new();
    let mut merge_sources = Vec::with_capacity(inputs.len());
    for input in &inputs {
        let id = match loaded.get(&input.path) {
            Some(&id) => id,
            None => {
                let id = load_file(engine, &mut sources, &input.path).await?;
                loaded.insert(input.path.clone(), id);
                id
            }
        };
        let page_count = sources.get(id).map_or(0, |source| source.page_count());
        merge_sources.push(MergeSource {
            source_id: id,
            ranges: input
                .ranges
                .as_deref()
                .map(|expr| parse_page_ranges(expr, page_count)),
        });
    }

    let result = engine
        .run(&Operation::Merge { sources: merge_sources }, &sources)
        .await
        .map_err(report)?;
    let merged = result
        .outputs
        .into_iter()
        .next()
        .context("Merge produced no document")?;

    tokio::fs::write(output, &merged.bytes)
        .await
        .with_context(|| format!("Failed to save merged PDF: {}", output.display()))?;

    Ok(MergeReport {
        output: output.display().to_string(),
        files: inputs.len(),
        pages: result.summary.pages_touched,
        byte_size: merged.byte_size,
    })
}

pub async fn run(engine: &PdfEngine, inputs: &[String], output: &Path) -> Result<()> {
    let inputs = inputs.iter().map(|arg| MergeInput::parse(arg)).collect();
    let report = execute(engine, inputs, output).await?;
    println!(
        "Merged {} files ({} pages) into {}",
        report.files, report.pages, report.output
    );
    Ok(())
}
