//! Per-page extraction policy.
//!
//! Decides, for each page, whether the embedded text layer is trusted, the
//! page is sent to OCR, or both sources are kept. The policy is a pure
//! function of the page's embedded text and the configured mode; it never
//! touches a document or an OCR engine.

use serde::{Deserialize, Serialize};

use crate::options::{ExtractOptions, OcrMode, DEFAULT_MIN_CHARS};

/// Marker line placed between embedded and OCR text when both are kept.
pub const COMBINED_MARKER: &str = "[OCR]";

/// Which source(s) resolve a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Use the embedded text layer as is.
    UseEmbedded,
    /// Use OCR text; embedded text is discarded.
    UseOcr,
    /// Keep embedded text and append OCR text after a marker line.
    UseBoth,
}

impl Decision {
    /// Whether the page must be rasterized and recognized.
    pub fn needs_ocr(&self) -> bool {
        !matches!(self, Decision::UseEmbedded)
    }
}

/// Length of embedded text as seen by the sufficiency threshold.
///
/// Leading and trailing whitespace do not count; characters, not bytes, are counted.
pub fn sufficiency_len(text: &str) -> usize {
    text.trim().chars().count()
}

/// Stateless decision policy, configured once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDecisionPolicy {
    mode: OcrMode,
    min_chars: usize,
    ocr_image_pages: bool,
}

impl PageDecisionPolicy {
    /// Create a policy for `mode` with the given sufficiency threshold.
    pub fn new(mode: OcrMode, min_chars: usize) -> Self {
        Self {
            mode,
            min_chars,
            ocr_image_pages: false,
        }
    }

    /// Build the policy described by conversion options.
    pub fn from_options(options: &ExtractOptions) -> Self {
        Self::new(options.ocr_mode, options.min_chars).with_image_pages(options.ocr_image_pages)
    }

    /// Also OCR image-bearing pages whose text is sufficient (auto mode only).
    pub fn with_image_pages(mut self, enabled: bool) -> Self {
        self.ocr_image_pages = enabled;
        self
    }

    /// The configured mode.
    pub fn mode(&self) -> OcrMode {
        self.mode
    }

    /// The configured threshold.
    pub fn min_chars(&self) -> usize {
        self.min_chars
    }

    /// Whether embedded text meets the threshold (inclusive).
    pub fn is_sufficient(&self, embedded: &str) -> bool {
        sufficiency_len(embedded) >= self.min_chars
    }

    /// Decide from embedded text alone.
    pub fn decide(&self, embedded: &str) -> Decision {
        self.decide_page(embedded, false)
    }

    /// Decide for a page, given whether it carries images.
    pub fn decide_page(&self, embedded: &str, has_images: bool) -> Decision {
        match self.mode {
            OcrMode::Off => Decision::UseEmbedded,
            OcrMode::Force => Decision::UseOcr,
            OcrMode::Auto => {
                if !self.is_sufficient(embedded) {
                    Decision::UseOcr
                } else if self.ocr_image_pages && has_images {
                    Decision::UseBoth
                } else {
                    Decision::UseEmbedded
                }
            }
        }
    }
}

impl Default for PageDecisionPolicy {
    fn default() -> Self {
        Self::new(OcrMode::default(), DEFAULT_MIN_CHARS)
    }
}

/// Produce a page's final text from its decision and the available sources.
///
/// `ocr` is ignored for [`Decision::UseEmbedded`]; pass an empty string when
/// OCR did not run or failed. OCR text is trimmed, since engines pad it with
/// blank lines and page terminators.
pub fn resolve(decision: Decision, embedded: &str, ocr: &str) -> String {
    match decision {
        Decision::UseEmbedded => embedded.to_string(),
        Decision::UseOcr => ocr.trim().to_string(),
        Decision::UseBoth => {
            let ocr = ocr.trim();
            if ocr.is_empty() {
                embedded.to_string()
            } else {
                format!("{}\n\n{}\n{}", embedded.trim_end(), COMBINED_MARKER, ocr)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENTENCE: &str = "Hello world, this is a real paragraph of text.";

    #[test]
    fn test_off_never_needs_ocr() {
        let policy = PageDecisionPolicy::new(OcrMode::Off, 20);
        assert_eq!(policy.decide(""), Decision::UseEmbedded);
        assert_eq!(policy.decide("   \n\t"), Decision::UseEmbedded);
        assert_eq!(policy.decide(SENTENCE), Decision::UseEmbedded);
        assert_eq!(
            policy.with_image_pages(true).decide_page("", true),
            Decision::UseEmbedded
        );
    }

    #[test]
    fn test_force_always_ocr() {
        let policy = PageDecisionPolicy::new(OcrMode::Force, 20);
        assert_eq!(policy.decide(""), Decision::UseOcr);
        assert_eq!(policy.decide(SENTENCE), Decision::UseOcr);
        assert_eq!(
            policy.with_image_pages(true).decide_page(SENTENCE, true),
            Decision::UseOcr
        );
    }

    #[test]
    fn test_auto_threshold_is_inclusive() {
        let policy = PageDecisionPolicy::new(OcrMode::Auto, 5);
        assert_eq!(policy.decide("abcd"), Decision::UseOcr);
        assert_eq!(policy.decide("abcde"), Decision::UseEmbedded);
        assert_eq!(policy.decide("abcdef"), Decision::UseEmbedded);
    }

    #[test]
    fn test_auto_ignores_surrounding_whitespace() {
        let policy = PageDecisionPolicy::new(OcrMode::Auto, 5);
        assert_eq!(policy.decide("\n\n  abcd  \n"), Decision::UseOcr);
        // Interior whitespace counts toward the trimmed length.
        assert_eq!(policy.decide("  ab cd \n"), Decision::UseEmbedded);
    }

    #[test]
    fn test_auto_counts_characters_not_bytes() {
        let policy = PageDecisionPolicy::new(OcrMode::Auto, 4);
        // 3 characters, 9 bytes
        assert_eq!(policy.decide("日本語"), Decision::UseOcr);
        assert_eq!(policy.decide("日本語だ"), Decision::UseEmbedded);
    }

    #[test]
    fn test_auto_stray_header_goes_to_ocr() {
        let policy = PageDecisionPolicy::default();
        assert_eq!(policy.decide("  12  "), Decision::UseOcr);
        assert_eq!(policy.decide(SENTENCE), Decision::UseEmbedded);
    }

    #[test]
    fn test_auto_image_pages() {
        let policy = PageDecisionPolicy::new(OcrMode::Auto, 5);
        assert_eq!(policy.decide_page(SENTENCE, true), Decision::UseEmbedded);

        let policy = policy.with_image_pages(true);
        assert_eq!(policy.decide_page(SENTENCE, true), Decision::UseBoth);
        assert_eq!(policy.decide_page(SENTENCE, false), Decision::UseEmbedded);
        assert_eq!(policy.decide_page("", true), Decision::UseOcr);
    }

    #[test]
    fn test_resolve() {
        assert_eq!(resolve(Decision::UseEmbedded, "embedded", "ocr"), "embedded");
        assert_eq!(resolve(Decision::UseOcr, "embedded", "ocr"), "ocr");
        assert_eq!(resolve(Decision::UseOcr, "embedded", ""), "");
        assert_eq!(resolve(Decision::UseOcr, "", "scanned\n\x0c"), "scanned");
        assert_eq!(
            resolve(Decision::UseBoth, "embedded\n", "  ocr text \n"),
            "embedded\n\n[OCR]\nocr text"
        );
        assert_eq!(resolve(Decision::UseBoth, "embedded", " \n"), "embedded");
    }

    #[test]
    fn test_from_options() {
        let options = ExtractOptions::new()
            .with_ocr_mode(OcrMode::Force)
            .with_min_chars(7);
        let policy = PageDecisionPolicy::from_options(&options);
        assert_eq!(policy.mode(), OcrMode::Force);
        assert_eq!(policy.min_chars(), 7);
    }

    #[test]
    fn test_needs_ocr() {
        assert!(!Decision::UseEmbedded.needs_ocr());
        assert!(Decision::UseOcr.needs_ocr());
        assert!(Decision::UseBoth.needs_ocr());
    }
}
