//! Conversion options and policy constants.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default sufficiency threshold, in characters of trimmed embedded text.
///
/// Pages below this count are treated as image-only in [`OcrMode::Auto`].
pub const DEFAULT_MIN_CHARS: usize = 20;

/// Default rasterization resolution for OCR.
pub const DEFAULT_DPI: u32 = 300;

/// Default OCR language (Tesseract code for English).
pub const DEFAULT_OCR_LANG: &str = "eng";

/// Default Tesseract executable, resolved through `PATH`.
pub const DEFAULT_TESSERACT: &str = "tesseract";

/// When OCR runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrMode {
    /// Never run OCR; embedded text only.
    Off,
    /// OCR pages whose embedded text is below the sufficiency threshold.
    #[default]
    Auto,
    /// OCR every page and ignore embedded text.
    Force,
}

impl OcrMode {
    /// Mode name as used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            OcrMode::Off => "off",
            OcrMode::Auto => "auto",
            OcrMode::Force => "force",
        }
    }
}

impl fmt::Display for OcrMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OcrMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(OcrMode::Off),
            "auto" => Ok(OcrMode::Auto),
            "force" => Ok(OcrMode::Force),
            other => Err(Error::InvalidOptions(format!(
                "unknown OCR mode '{}' (expected off, auto or force)",
                other
            ))),
        }
    }
}

/// Delimiter written between consecutive pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageSeparator {
    /// A `--- Page N ---` banner before each page, pages separated by a blank line.
    #[default]
    Header,
    /// Form feed between pages.
    FormFeed,
    /// One blank line between pages.
    BlankLine,
}

/// Options for converting a PDF document to text.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// When to run OCR
    pub ocr_mode: OcrMode,

    /// OCR engine language code, passed through untouched
    pub ocr_lang: String,

    /// Sufficiency threshold for [`OcrMode::Auto`] (inclusive)
    pub min_chars: usize,

    /// Rasterization resolution in dots per inch
    pub dpi: u32,

    /// Page delimiter in the output
    pub separator: PageSeparator,

    /// In auto mode, also OCR sufficient pages that carry images and keep both texts
    pub ocr_image_pages: bool,

    /// Tesseract executable
    pub tesseract_path: PathBuf,

    /// Directory or file of the PDFium shared library (system lookup if unset)
    pub pdfium_library_path: Option<PathBuf>,
}

impl ExtractOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set OCR mode.
    pub fn with_ocr_mode(mut self, mode: OcrMode) -> Self {
        self.ocr_mode = mode;
        self
    }

    /// Set OCR language.
    pub fn with_ocr_lang(mut self, lang: impl Into<String>) -> Self {
        self.ocr_lang = lang.into();
        self
    }

    /// Set the sufficiency threshold.
    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }

    /// Set rasterization DPI.
    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Set page separator.
    pub fn with_separator(mut self, separator: PageSeparator) -> Self {
        self.separator = separator;
        self
    }

    /// OCR image-bearing pages in auto mode even when their text is sufficient.
    pub fn with_ocr_image_pages(mut self, enabled: bool) -> Self {
        self.ocr_image_pages = enabled;
        self
    }

    /// Set Tesseract executable path.
    pub fn with_tesseract_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.tesseract_path = path.into();
        self
    }

    /// Set PDFium library location.
    pub fn with_pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.pdfium_library_path = Some(path.into());
        self
    }

    /// Whether any page could be sent to OCR under these options.
    pub fn may_run_ocr(&self) -> bool {
        self.ocr_mode != OcrMode::Off
    }

    /// Reject options that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<()> {
        if self.may_run_ocr() {
            if self.ocr_lang.trim().is_empty() {
                return Err(Error::InvalidOptions(
                    "OCR language must not be empty".to_string(),
                ));
            }
            if self.dpi == 0 {
                return Err(Error::InvalidOptions(
                    "rasterization DPI must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            ocr_mode: OcrMode::Auto,
            ocr_lang: DEFAULT_OCR_LANG.to_string(),
            min_chars: DEFAULT_MIN_CHARS,
            dpi: DEFAULT_DPI,
            separator: PageSeparator::Header,
            ocr_image_pages: false,
            tesseract_path: PathBuf::from(DEFAULT_TESSERACT),
            pdfium_library_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ExtractOptions::default();
        assert_eq!(options.ocr_mode, OcrMode::Auto);
        assert_eq!(options.ocr_lang, "eng");
        assert_eq!(options.min_chars, DEFAULT_MIN_CHARS);
        assert_eq!(options.dpi, 300);
        assert_eq!(options.separator, PageSeparator::Header);
        assert!(!options.ocr_image_pages);
        assert_eq!(options.tesseract_path, PathBuf::from("tesseract"));
    }

    #[test]
    fn test_options_builder() {
        let options = ExtractOptions::new()
            .with_ocr_mode(OcrMode::Force)
            .with_ocr_lang("deu")
            .with_min_chars(5)
            .with_dpi(150)
            .with_separator(PageSeparator::FormFeed)
            .with_tesseract_path("/opt/tesseract/bin/tesseract")
            .with_pdfium_library("/opt/pdfium/lib");

        assert_eq!(options.ocr_mode, OcrMode::Force);
        assert_eq!(options.ocr_lang, "deu");
        assert_eq!(options.min_chars, 5);
        assert_eq!(options.dpi, 150);
        assert_eq!(options.separator, PageSeparator::FormFeed);
        assert_eq!(
            options.pdfium_library_path,
            Some(PathBuf::from("/opt/pdfium/lib"))
        );
    }

    #[test]
    fn test_ocr_mode_parse() {
        assert_eq!("off".parse::<OcrMode>().unwrap(), OcrMode::Off);
        assert_eq!("AUTO".parse::<OcrMode>().unwrap(), OcrMode::Auto);
        assert_eq!(" force ".parse::<OcrMode>().unwrap(), OcrMode::Force);
        assert!(matches!(
            "sometimes".parse::<OcrMode>(),
            Err(Error::InvalidOptions(_))
        ));
        assert_eq!(OcrMode::Force.to_string(), "force");
    }

    #[test]
    fn test_validate_language() {
        let options = ExtractOptions::new().with_ocr_lang("  ");
        assert!(matches!(options.validate(), Err(Error::InvalidOptions(_))));

        // Language is irrelevant when OCR can never run.
        let options = options.with_ocr_mode(OcrMode::Off);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_dpi() {
        let options = ExtractOptions::new().with_dpi(0);
        assert!(options.validate().is_err());
        assert!(ExtractOptions::default().validate().is_ok());
    }
}
