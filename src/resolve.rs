//! Expansion of ranges and selections into 0-based page indices.
//!
//! Nothing here fails: out-of-bounds input is clamped and an empty or
//! zero-page input resolves to nothing.

use std::collections::{BTreeSet, HashSet};

use crate::page_range::{clamp_page, PageRange};

/// How a resolved selection is ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOrder {
    /// Batch operations: lowest page first.
    Ascending,
    /// Reordering operations: the caller's order, first occurrence wins.
    AsGiven,
}

/// Expand ranges into ascending, unique 0-based indices.
pub fn resolve(ranges: &[PageRange], total_pages: u32) -> Vec<u32> {
    if total_pages == 0 {
        return Vec::new();
    }

    let mut indices = BTreeSet::new();
    for range in ranges {
        let start = clamp_page(range.start, total_pages);
        let end = clamp_page(range.end, total_pages);
        let (start, end) = (start.min(end), start.max(end));
        indices.extend((start..=end).map(|page| page - 1));
    }

    indices.into_iter().collect()
}

/// Turn 1-based page numbers into unique 0-based indices.
pub fn resolve_selection<I>(pages: I, total_pages: u32, order: SelectionOrder) -> Vec<u32>
where
    I: IntoIterator<Item = u32>,
{
    if total_pages == 0 {
        return Vec::new();
    }

    let clamped = pages
        .into_iter()
        .map(|page| clamp_page(page, total_pages) - 1);

    match order {
        SelectionOrder::Ascending => clamped.collect::<BTreeSet<_>>().into_iter().collect(),
        SelectionOrder::AsGiven => {
            let mut seen = HashSet::new();
            clamped.filter(|index| seen.insert(*index)).collect()
        }
    }
}
