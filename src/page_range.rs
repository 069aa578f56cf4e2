//! Page-range expressions such as `1-3,5,7-9`.
//!
//! [`parse_page_ranges`] is lenient: malformed tokens are dropped rather than
//! failing the whole expression. Zero, negative and non-numeric page numbers
//! are rejected; numbers past the end of the document are clamped to the last
//! page.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// An inclusive, 1-based page interval with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    /// Build a range, swapping the endpoints if they are reversed.
    pub fn new(start: u32, end: u32) -> Self {
        if start <= end {
            PageRange { start, end }
        } else {
            PageRange {
                start: end,
                end: start,
            }
        }
    }

    pub fn single(page: u32) -> Self {
        PageRange {
            start: page,
            end: page,
        }
    }

    pub fn pages(&self) -> impl Iterator<Item = u32> {
        self.start..=self.end
    }
}

impl std::fmt::Display for PageRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// Clamp a 1-based page number into `[1, total_pages]`.
///
/// With `total_pages == 0` every value collapses to 1.
pub fn clamp_page(page: u32, total_pages: u32) -> u32 {
    page.min(total_pages).max(1)
}

/// Parse a strictly positive page number; `0`, signs and garbage yield `None`.
fn parse_positive(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match s.parse::<u32>() {
        Ok(0) => None,
        Ok(n) => Some(n),
        // More digits than fit: still a positive number, clamps to the end.
        Err(_) => Some(u32::MAX),
    }
}

fn parse_token(token: &str, total_pages: u32) -> Option<PageRange> {
    let (start, end) = match token.split_once('-') {
        Some((start, end)) => (parse_positive(start)?, parse_positive(end)?),
        None => {
            let page = parse_positive(token)?;
            (page, page)
        }
    };

    Some(PageRange::new(
        clamp_page(start, total_pages),
        clamp_page(end, total_pages),
    ))
}

/// Parse a comma-separated range expression like `"1-3, 5, 8-10"`.
///
/// Results keep first-occurrence order and contain no duplicate ranges.
pub fn parse_page_ranges(input: &str, total_pages: u32) -> Vec<PageRange> {
    let mut ranges: Vec<PageRange> = Vec::new();

    for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match parse_token(token, total_pages) {
            Some(range) => {
                if !ranges.contains(&range) {
                    ranges.push(range);
                }
            }
            None => debug!(token, "dropping malformed page range token"),
        }
    }

    ranges
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Right, // 90° clockwise (R)
    Down,  // 180° (D)
    Left,  // 90° counter-clockwise (L)
}

impl Rotation {
    pub fn degrees(self) -> i32 {
        match self {
            Rotation::None => 0,
            Rotation::Right => 90,
            Rotation::Down => 180,
            Rotation::Left => 270,
        }
    }
}

/// One page of an explicit page order, e.g. `3R`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderedPage {
    pub page_number: u32,
    pub rotation: Rotation,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid page order token: {0:?}")]
pub struct InvalidOrderToken(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
enum PageRef {
    Number(u32),
    End,
}

impl PageRef {
    fn resolve(&self, total_pages: u32) -> u32 {
        match self {
            PageRef::Number(n) => *n,
            PageRef::End => total_pages,
        }
    }
}

fn parse_page_ref(s: &str) -> Option<PageRef> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("end") {
        Some(PageRef::End)
    } else {
        parse_positive(s).map(PageRef::Number)
    }
}

/// Split a rotation suffix off a token (only when preceded by a digit or
/// `end`, so `"end"` itself keeps its trailing `d`).
fn split_rotation(token: &str) -> (&str, Rotation) {
    let bytes = token.as_bytes();
    let len = bytes.len();
    if len < 2 {
        return (token, Rotation::None);
    }

    let rotation = match bytes[len - 1] {
        b'R' | b'r' => Rotation::Right,
        b'L' | b'l' => Rotation::Left,
        b'D' | b'd' => Rotation::Down,
        _ => return (token, Rotation::None),
    };

    let body = &token[..len - 1];
    let ends_in_ref = body.as_bytes()[body.len() - 1].is_ascii_digit()
        || body.to_ascii_lowercase().ends_with("end");
    if ends_in_ref {
        (body, rotation)
    } else {
        (token, Rotation::None)
    }
}

/// Parse an explicit page order such as `"3R,1,2D"` or `"5-1,endL"`.
///
/// Unlike [`parse_page_ranges`] the order is significant and kept as
/// written: a reversed range `5-1` yields `5, 4, 3, 2, 1`. Malformed tokens
/// are an error, since silently dropping one would delete pages from the
/// result. Page numbers are clamped into `[1, total_pages]`.
pub fn parse_page_order(
    input: &str,
    total_pages: u32,
) -> Result<Vec<OrderedPage>, InvalidOrderToken> {
    let mut order = Vec::new();

    for token in input.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let (body, rotation) = split_rotation(token);
        let invalid = || InvalidOrderToken(token.to_string());

        let (start, end) = match body.split_once('-') {
            Some((start, end)) => (
                parse_page_ref(start).ok_or_else(invalid)?,
                parse_page_ref(end).ok_or_else(invalid)?,
            ),
            None => {
                let page = parse_page_ref(body).ok_or_else(invalid)?;
                (page.clone(), page)
            }
        };

        let start = clamp_page(start.resolve(total_pages), total_pages);
        let end = clamp_page(end.resolve(total_pages), total_pages);
        let pages: Vec<u32> = if start <= end {
            (start..=end).collect()
        } else {
            (end..=start).rev().collect()
        };

        order.extend(pages.into_iter().map(|page_number| OrderedPage {
            page_number,
            rotation,
        }));
    }

    Ok(order)
}
