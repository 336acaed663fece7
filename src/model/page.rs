//! Page-level results.

use serde::{Deserialize, Serialize};

use crate::error::PageWarning;
use crate::policy::Decision;

/// The resolved text of a single page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResult {
    /// Page number (1-indexed)
    pub number: u32,

    /// Resolved page text (possibly empty)
    pub text: String,

    /// Source(s) the policy chose for this page
    pub decision: Decision,

    /// Whether OCR ran successfully and contributed to `text`
    pub ocr_used: bool,

    /// Trimmed length of the embedded text, as seen by the policy
    pub embedded_chars: usize,

    /// Recoverable failures on this page
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<PageWarning>,
}

impl PageResult {
    /// Create a page result without warnings.
    pub fn new(number: u32, text: impl Into<String>, decision: Decision) -> Self {
        Self {
            number,
            text: text.into(),
            decision,
            ocr_used: false,
            embedded_chars: 0,
            warnings: Vec::new(),
        }
    }

    /// Check if the page resolved to no visible text.
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Check if a recoverable failure occurred on this page.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
