//! Document-level text.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::PageResult;
use crate::error::{Error, PageWarning, Result};
use crate::options::PageSeparator;
use crate::policy::Decision;

/// Form feed, the classic page break of plain-text output.
const FORM_FEED: &str = "\x0c";

/// The text of a whole document: one segment per page, in page order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentText {
    /// Resolved pages, in physical order
    pub pages: Vec<PageResult>,

    /// Delimiter used when rendering the document
    pub separator: PageSeparator,
}

impl DocumentText {
    /// Create an empty document text.
    pub fn new(separator: PageSeparator) -> Self {
        Self {
            pages: Vec::new(),
            separator,
        }
    }

    /// Append the next page. Pages are never reordered or revisited.
    pub fn push(&mut self, page: PageResult) {
        self.pages.push(page);
    }

    /// Get the number of pages.
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Get a page by number (1-indexed).
    pub fn get_page(&self, number: u32) -> Option<&PageResult> {
        if number == 0 {
            return None;
        }
        self.pages.get((number - 1) as usize)
    }

    /// Page texts, one per page, in page order.
    pub fn segments(&self) -> Vec<&str> {
        self.pages.iter().map(|p| p.text.as_str()).collect()
    }

    /// All recoverable failures, in page order.
    pub fn warnings(&self) -> impl Iterator<Item = &PageWarning> {
        self.pages.iter().flat_map(|p| p.warnings.iter())
    }

    /// Check if any page reported a recoverable failure.
    pub fn has_warnings(&self) -> bool {
        self.pages.iter().any(PageResult::has_warnings)
    }

    /// Render the document as a single string.
    pub fn text(&self) -> String {
        match self.separator {
            PageSeparator::Header => self
                .pages
                .iter()
                .map(|p| format!("--- Page {} ---\n\n{}", p.number, p.text))
                .collect::<Vec<_>>()
                .join("\n\n"),
            PageSeparator::FormFeed => self.segments().join(FORM_FEED),
            PageSeparator::BlankLine => self.segments().join("\n\n"),
        }
    }

    /// Summary counters for this run.
    pub fn stats(&self) -> ExtractionStats {
        let mut stats = ExtractionStats::new();
        for page in &self.pages {
            stats.add_page(page);
        }
        stats
    }

    /// Serialize the per-page results as JSON.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let result = if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        };
        result.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
    }
}

impl fmt::Display for DocumentText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// Counters collected over a conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Total number of pages processed
    pub page_count: u32,

    /// Pages resolved from embedded text
    pub embedded_pages: u32,

    /// Pages resolved from OCR text
    pub ocr_pages: u32,

    /// Pages that kept both sources
    pub combined_pages: u32,

    /// Pages whose resolved text is empty
    pub empty_pages: u32,

    /// Recoverable failures
    pub warning_count: u32,

    /// Approximate word count (whitespace-separated tokens)
    pub word_count: u32,

    /// Character count (excluding whitespace)
    pub char_count: u32,
}

impl ExtractionStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one resolved page.
    pub fn add_page(&mut self, page: &PageResult) {
        self.page_count += 1;
        match page.decision {
            Decision::UseEmbedded => self.embedded_pages += 1,
            Decision::UseOcr => self.ocr_pages += 1,
            Decision::UseBoth => self.combined_pages += 1,
        }
        if page.is_empty() {
            self.empty_pages += 1;
        }
        self.warning_count += page.warnings.len() as u32;
        self.word_count += page.text.split_whitespace().count() as u32;
        self.char_count += page.text.chars().filter(|c| !c.is_whitespace()).count() as u32;
    }
}
