//! Turning user operations into page-copy plans.
//!
//! Every planner is a pure function of its inputs. A plan lists, for each
//! output document, which source pages go into it and in what order. The
//! composer follows that order exactly.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

use crate::config::Config;
use crate::error::ComposeError;
use crate::page_range::{clamp_page, parse_page_ranges, PageRange};
use crate::pdf::DecodedDocument;
use crate::resolve::{resolve, resolve_selection, SelectionOrder};
use crate::source::{SourceDocument, SourceId, WorkingSet};

/// One page to copy: 1-based page number and clockwise rotation to add.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagePlanEntry {
    pub source_id: SourceId,
    pub page_number: u32,
    pub rotation_delta: u16,
}

impl PagePlanEntry {
    pub fn new(source_id: SourceId, page_number: u32) -> Self {
        PagePlanEntry {
            source_id,
            page_number,
            rotation_delta: 0,
        }
    }
}

/// The pages of a single output document, in output order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPlan {
    pub label: String,
    pub filename: String,
    pub entries: Vec<PagePlanEntry>,
}

/// All output documents one operation produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub kind: OperationKind,
    pub outputs: Vec<OutputPlan>,
}

impl Plan {
    pub fn pages_touched(&self) -> usize {
        self.outputs.iter().map(|output| output.entries.len()).sum()
    }

    pub fn source_count(&self) -> usize {
        self.outputs
            .iter()
            .flat_map(|output| output.entries.iter().map(|entry| entry.source_id))
            .collect::<HashSet<_>>()
            .len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// All selected pages in one document.
    Single,
    /// One document per selected page.
    Separate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSource {
    pub source_id: SourceId,
    /// `None` takes every page.
    #[serde(default)]
    pub ranges: Option<Vec<PageRange>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizeEntry {
    pub page_number: u32,
    /// Clockwise degrees; any multiple of 90, negative values allowed.
    #[serde(default)]
    pub rotation: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Operation {
    Merge {
        sources: Vec<MergeSource>,
    },
    SplitByRange {
        source_id: SourceId,
        expression: String,
    },
    SplitBySelection {
        source_id: SourceId,
        pages: BTreeSet<u32>,
        mode: SelectionMode,
    },
    SplitByFixedCount {
        source_id: SourceId,
        pages_per_file: u32,
    },
    Organize {
        source_id: SourceId,
        pages: Vec<OrganizeEntry>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Merge,
    SplitByRange,
    SplitBySelection,
    SplitByFixedCount,
    Organize,
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OperationKind::Merge => "merge",
            OperationKind::SplitByRange => "split-by-range",
            OperationKind::SplitBySelection => "split-by-selection",
            OperationKind::SplitByFixedCount => "split-by-fixed-count",
            OperationKind::Organize => "organize",
        };
        f.write_str(name)
    }
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Merge { .. } => OperationKind::Merge,
            Operation::SplitByRange { .. } => OperationKind::SplitByRange,
            Operation::SplitBySelection { .. } => OperationKind::SplitBySelection,
            Operation::SplitByFixedCount { .. } => OperationKind::SplitByFixedCount,
            Operation::Organize { .. } => OperationKind::Organize,
        }
    }
}

/// Normalize any clockwise rotation into `[0, 360)`.
pub fn normalize_rotation(degrees: i32) -> u16 {
    degrees.rem_euclid(360) as u16
}

fn entries_for<D: DecodedDocument>(
    source: &SourceDocument<D>,
    pages: impl IntoIterator<Item = u32>,
) -> Vec<PagePlanEntry> {
    pages
        .into_iter()
        .map(|page_number| PagePlanEntry::new(source.id(), page_number))
        .collect()
}

/// Concatenate sources into one document, in the order given.
///
/// A source without ranges contributes every page; one with ranges
/// contributes the pages they cover, ascending.
pub fn plan_merge<D: DecodedDocument>(
    sources: &[(&SourceDocument<D>, Option<&[PageRange]>)],
    filename: &str,
) -> Result<OutputPlan, ComposeError> {
    let mut entries = Vec::new();

    for &(source, ranges) in sources {
        let total = source.page_count();
        match ranges {
            None => entries.extend(entries_for(source, 1..=total)),
            Some(ranges) => {
                let indices = resolve(ranges, total);
                entries.extend(entries_for(source, indices.into_iter().map(|i| i + 1)));
            }
        }
    }

    if entries.is_empty() {
        return Err(ComposeError::EmptyResult);
    }

    debug!(sources = sources.len(), pages = entries.len(), "planned merge");
    Ok(OutputPlan {
        label: "Merged document".to_string(),
        filename: filename.to_string(),
        entries,
    })
}

/// One output per range in the expression.
///
/// Ranges may overlap, in which case the same page appears in several
/// outputs. Identical ranges are collapsed by the parser.
pub fn plan_split_by_range<D: DecodedDocument>(
    source: &SourceDocument<D>,
    expression: &str,
) -> Result<Vec<OutputPlan>, ComposeError> {
    let total = source.page_count();
    if total == 0 {
        return Err(ComposeError::NoValidRanges);
    }

    let ranges = parse_page_ranges(expression, total);
    if ranges.is_empty() {
        return Err(ComposeError::NoValidRanges);
    }

    let stem = source.stem();
    let outputs: Vec<OutputPlan> = ranges
        .iter()
        .map(|range| {
            let (label, filename) = if range.start == range.end {
                (
                    format!("Page {}", range.start),
                    format!("{}_page_{}.pdf", stem, range.start),
                )
            } else {
                (
                    format!("Pages {}", range),
                    format!("{}_pages_{}.pdf", stem, range),
                )
            };
            OutputPlan {
                label,
                filename,
                entries: entries_for(source, range.pages()),
            }
        })
        .collect();

    debug!(source = %source.id(), outputs = outputs.len(), "planned split by range");
    Ok(outputs)
}

pub fn plan_split_by_selection<D: DecodedDocument>(
    source: &SourceDocument<D>,
    pages: &BTreeSet<u32>,
    mode: SelectionMode,
) -> Result<Vec<OutputPlan>, ComposeError> {
    let pages: Vec<u32> = resolve_selection(
        pages.iter().copied(),
        source.page_count(),
        SelectionOrder::Ascending,
    )
    .into_iter()
    .map(|index| index + 1)
    .collect();

    if pages.is_empty() {
        return Err(ComposeError::EmptySelection);
    }

    let stem = source.stem();
    let outputs = match mode {
        SelectionMode::Single => vec![OutputPlan {
            label: "Selected pages".to_string(),
            filename: format!("{}_selected.pdf", stem),
            entries: entries_for(source, pages),
        }],
        SelectionMode::Separate => pages
            .into_iter()
            .map(|page| OutputPlan {
                label: format!("Page {}", page),
                filename: format!("{}_page_{}.pdf", stem, page),
                entries: vec![PagePlanEntry::new(source.id(), page)],
            })
            .collect(),
    };

    debug!(source = %source.id(), ?mode, outputs = outputs.len(), "planned split by selection");
    Ok(outputs)
}

/// Consecutive chunks of `pages_per_file` pages; the last may be shorter.
pub fn plan_split_by_fixed_count<D: DecodedDocument>(
    source: &SourceDocument<D>,
    pages_per_file: u32,
) -> Result<Vec<OutputPlan>, ComposeError> {
    if pages_per_file < 1 {
        return Err(ComposeError::InvalidChunkSize(pages_per_file));
    }

    let total = source.page_count();
    if total == 0 {
        return Err(ComposeError::EmptyResult);
    }

    let stem = source.stem();
    let outputs: Vec<OutputPlan> = (1..=total)
        .step_by(pages_per_file as usize)
        .enumerate()
        .map(|(i, start)| {
            let range = PageRange::new(start, start.saturating_add(pages_per_file - 1).min(total));
            OutputPlan {
                label: format!("Part {} (pages {})", i + 1, range),
                filename: format!("{}_part_{}.pdf", stem, i + 1),
                entries: entries_for(source, range.pages()),
            }
        })
        .collect();

    debug!(
        source = %source.id(),
        pages_per_file,
        outputs = outputs.len(),
        "planned fixed-size split"
    );
    Ok(outputs)
}

/// Pages in exactly the caller's order, each with its own rotation.
///
/// Pages left out of the list are deleted. A page listed twice keeps its
/// first position.
pub fn plan_organize<D: DecodedDocument>(
    source: &SourceDocument<D>,
    pages: &[OrganizeEntry],
) -> Result<OutputPlan, ComposeError> {
    let total = source.page_count();
    if pages.is_empty() || total == 0 {
        return Err(ComposeError::ResultWouldBeEmpty);
    }

    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(pages.len());
    for entry in pages {
        let rotation_delta = normalize_rotation(entry.rotation);
        if rotation_delta % 90 != 0 {
            return Err(ComposeError::InvalidRotation(entry.rotation));
        }

        let page_number = clamp_page(entry.page_number, total);
        if seen.insert(page_number) {
            entries.push(PagePlanEntry {
                source_id: source.id(),
                page_number,
                rotation_delta,
            });
        }
    }

    debug!(source = %source.id(), pages = entries.len(), "planned organize");
    Ok(OutputPlan {
        label: "Organized document".to_string(),
        filename: format!("{}_organized.pdf", source.stem()),
        entries,
    })
}

fn lookup<D: DecodedDocument>(
    sources: &WorkingSet<D>,
    id: SourceId,
) -> Result<&SourceDocument<D>, ComposeError> {
    sources.get(id).ok_or(ComposeError::UnknownSource(id))
}

/// Plan any operation against the documents in `sources`.
pub fn plan<D: DecodedDocument>(
    operation: &Operation,
    sources: &WorkingSet<D>,
    config: &Config,
) -> Result<Plan, ComposeError> {
    let outputs = match operation {
        Operation::Merge { sources: inputs } => {
            let resolved = inputs
                .iter()
                .map(|input| Ok((lookup(sources, input.source_id)?, input.ranges.as_deref())))
                .collect::<Result<Vec<_>, ComposeError>>()?;
            vec![plan_merge(&resolved, &config.merged_filename)?]
        }
        Operation::SplitByRange {
            source_id,
            expression,
        } => plan_split_by_range(lookup(sources, *source_id)?, expression)?,
        Operation::SplitBySelection {
            source_id,
            pages,
            mode,
        } => plan_split_by_selection(lookup(sources, *source_id)?, pages, *mode)?,
        Operation::SplitByFixedCount {
            source_id,
            pages_per_file,
        } => plan_split_by_fixed_count(lookup(sources, *source_id)?, *pages_per_file)?,
        Operation::Organize { source_id, pages } => {
            vec![plan_organize(lookup(sources, *source_id)?, pages)?]
        }
    };

    Ok(Plan {
        kind: operation.kind(),
        outputs,
    })
}
