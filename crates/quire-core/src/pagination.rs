//! Page arithmetic for post listings.
//!
//! A [`Paginator`] knows only the total item count, the page size and the
//! orphans threshold; the caller fetches `page.offset .. page.offset + page.len`
//! from storage. A final page holding `orphans` items or fewer is folded into
//! the page before it.

use serde::Serialize;
use thiserror::Error;

pub const DEFAULT_PER_PAGE: u64 = 3;
pub const DEFAULT_ORPHANS: u64 = 1;

/// Why a requested page number was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PageError {
    #[error("That page number is not an integer")]
    NotAnInteger,

    #[error("That page number is less than 1")]
    LessThanOne,

    #[error("That page contains no results")]
    OutOfRange,
}

/// Pagination over `count` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    count: u64,
    per_page: u64,
    orphans: u64,
}

/// One resolved page of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Page {
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
    pub per_page: u64,
    /// Index of the first item on this page.
    pub offset: u64,
    /// Number of items on this page.
    pub len: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<u64>,
    pub previous_page_number: Option<u64>,
}

impl Paginator {
    /// A zero page size is treated as one.
    pub fn new(count: u64, per_page: u64, orphans: u64) -> Self {
        Self {
            count,
            per_page: per_page.max(1),
            orphans,
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Total number of pages. Never zero: an empty listing has one empty page.
    pub fn num_pages(&self) -> u64 {
        let hits = self.count.saturating_sub(self.orphans).max(1);
        hits.div_ceil(self.per_page)
    }

    /// Parse and range-check a raw page number.
    pub fn validate_number(&self, raw: &str) -> Result<u64, PageError> {
        let raw = raw.trim();
        let number = match raw.parse::<i64>() {
            Ok(n) => n,
            // Well-formed but too large for i64: still a number, just past the end.
            Err(_) if is_integer_literal(raw) => {
                return Err(if raw.starts_with('-') {
                    PageError::LessThanOne
                } else {
                    PageError::OutOfRange
                });
            }
            Err(_) => return Err(PageError::NotAnInteger),
        };

        if number < 1 {
            return Err(PageError::LessThanOne);
        }
        let number = number as u64;
        if number > self.num_pages() {
            return Err(PageError::OutOfRange);
        }
        Ok(number)
    }

    /// The page with the given 1-based number.
    pub fn page(&self, number: u64) -> Result<Page, PageError> {
        if number < 1 {
            return Err(PageError::LessThanOne);
        }
        if number > self.num_pages() {
            return Err(PageError::OutOfRange);
        }
        Ok(self.build(number))
    }

    /// Resolve the `page` query parameter the way the listing endpoints do:
    /// missing means 1, garbage means 1, anything out of range means the last
    /// page.
    pub fn page_or_fallback(&self, raw: Option<&str>) -> Page {
        match self.validate_number(raw.unwrap_or("1")) {
            Ok(number) => self.build(number),
            Err(PageError::NotAnInteger) => self.build(1),
            Err(PageError::LessThanOne | PageError::OutOfRange) => self.build(self.num_pages()),
        }
    }

    fn build(&self, number: u64) -> Page {
        let num_pages = self.num_pages();
        let bottom = (number - 1) * self.per_page;
        let mut top = bottom + self.per_page;
        if top + self.orphans >= self.count {
            top = self.count;
        }
        let has_next = number < num_pages;
        let has_previous = number > 1;

        Page {
            number,
            num_pages,
            count: self.count,
            per_page: self.per_page,
            offset: bottom,
            len: top.saturating_sub(bottom),
            has_next,
            has_previous,
            next_page_number: has_next.then_some(number + 1),
            previous_page_number: has_previous.then_some(number - 1),
        }
    }
}

/// Resolve the `per_page` query parameter: positive integers are accepted up
/// to `max`, anything else falls back to `default`.
pub fn resolve_per_page(raw: Option<&str>, default: u64, max: u64) -> u64 {
    let max = max.max(1);
    match raw.map(str::trim).and_then(|s| s.parse::<u64>().ok()) {
        Some(0) | None => default.clamp(1, max),
        Some(n) => n.min(max),
    }
}

fn is_integer_literal(raw: &str) -> bool {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}
