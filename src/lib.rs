//! # pdfocr
//!
//! PDF to plain text conversion with OCR fallback for Rust.
//!
//! Each page's embedded text layer is used when it carries enough text;
//! pages that are scanned images (or nearly empty) are rendered and run
//! through OCR instead. The result is one text segment per page, in page
//! order.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfocr::{pdf_to_text_with_options, ExtractOptions, OcrMode};
//!
//! fn main() -> pdfocr::Result<()> {
//!     let options = ExtractOptions::new()
//!         .with_ocr_mode(OcrMode::Auto)
//!         .with_ocr_lang("eng");
//!     let document = pdf_to_text_with_options("scan.pdf", &options)?;
//!
//!     for warning in document.warnings() {
//!         eprintln!("warning: {}", warning);
//!     }
//!     std::fs::write("scan.txt", document.text())?;
//!     Ok(())
//! }
//! ```
//!
//! ## OCR modes
//!
//! - `off`: embedded text only, OCR never runs
//! - `auto` (default): OCR pages whose trimmed embedded text is shorter than
//!   [`ExtractOptions::min_chars`]
//! - `force`: OCR every page and ignore embedded text
//!
//! Rendering uses PDFium (loaded at runtime) and recognition uses the
//! Tesseract executable. Neither is touched unless a page needs OCR.

pub mod assemble;
pub mod detect;
pub mod error;
pub mod extract;
pub mod model;
pub mod ocr;
pub mod options;
pub mod policy;
pub mod raster;

// Re-export commonly used types
pub use assemble::{plan, DocumentAssembler};
pub use error::{Error, PageWarning, Result, WarningKind};
pub use extract::{EmbeddedText, LopdfExtractor, PageTextExtractor};
pub use model::{DocumentText, ExtractionStats, PageResult};
pub use ocr::{OcrReader, TesseractReader};
pub use options::{
    ExtractOptions, OcrMode, PageSeparator, DEFAULT_DPI, DEFAULT_MIN_CHARS, DEFAULT_OCR_LANG,
};
pub use policy::{Decision, PageDecisionPolicy};
pub use raster::{PageRasterizer, PdfiumEngine, PdfiumRasterizer, RasterImage};

use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Convert a PDF file to text with default options (`auto` OCR, English).
///
/// # Example
///
/// ```no_run
/// let document = pdfocr::pdf_to_text("document.pdf").unwrap();
/// println!("{}", document);
/// ```
pub fn pdf_to_text<P: AsRef<Path>>(path: P) -> Result<DocumentText> {
    pdf_to_text_with_options(path, &ExtractOptions::default())
}

/// Convert a PDF file to text with custom options.
pub fn pdf_to_text_with_options<P: AsRef<Path>>(
    path: P,
    options: &ExtractOptions,
) -> Result<DocumentText> {
    Converter::new(options.clone()).convert_file(path)
}

/// Convert an in-memory PDF to text.
pub fn pdf_bytes_to_text(data: &[u8], options: &ExtractOptions) -> Result<DocumentText> {
    Converter::new(options.clone()).convert_bytes(data)
}

/// Extract plain text from a PDF file, rendered with the default separator.
///
/// # Example
///
/// ```no_run
/// let text = pdfocr::extract_text("document.pdf").unwrap();
/// println!("{}", text);
/// ```
pub fn extract_text<P: AsRef<Path>>(path: P) -> Result<String> {
    Ok(pdf_to_text(path)?.text())
}

/// Builder wiring the lopdf, PDFium and Tesseract adapters into a run.
///
/// # Example
///
/// ```no_run
/// use pdfocr::{Converter, ExtractOptions, OcrMode};
///
/// let report = |done: u32, total: u32| eprintln!("{}/{}", done, total);
/// let document = Converter::new(ExtractOptions::new().with_ocr_mode(OcrMode::Force))
///     .with_progress(&report)
///     .convert_file("scan.pdf")?;
/// # Ok::<(), pdfocr::Error>(())
/// ```
pub struct Converter<'p> {
    options: ExtractOptions,
    cancel: Option<Arc<AtomicBool>>,
    progress: Option<&'p dyn Fn(u32, u32)>,
}

impl<'p> Converter<'p> {
    /// Create a converter with the given options.
    pub fn new(options: ExtractOptions) -> Self {
        Self {
            options,
            cancel: None,
            progress: None,
        }
    }

    /// Stop between pages once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Report `(pages_done, total_pages)` after each page.
    pub fn with_progress(mut self, progress: &'p dyn Fn(u32, u32)) -> Self {
        self.progress = Some(progress);
        self
    }

    /// The options this converter runs with.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Convert a PDF file. The file is read once; nothing is written.
    pub fn convert_file<P: AsRef<Path>>(&self, path: P) -> Result<DocumentText> {
        let path = path.as_ref();
        detect::sniff_file(path)?;
        let data = std::fs::read(path)?;
        log::debug!("Read {} ({} bytes)", path.display(), data.len());
        self.convert_bytes(&data)
    }

    /// Convert an in-memory PDF.
    pub fn convert_bytes(&self, data: &[u8]) -> Result<DocumentText> {
        self.options.validate()?;

        let extractor = LopdfExtractor::load_bytes(data)?;
        let engine = PdfiumEngine::new(self.options.pdfium_library_path.clone());
        let rasterizer = PdfiumRasterizer::new(&engine, data);
        let reader = TesseractReader::new(&self.options.tesseract_path);

        let mut assembler = DocumentAssembler::new(&extractor, &rasterizer, &reader, &self.options);
        if let Some(flag) = &self.cancel {
            assembler = assembler.with_cancel_flag(Arc::clone(flag));
        }
        if let Some(progress) = self.progress {
            assembler = assembler.with_progress(progress);
        }
        assembler.run()
    }

    /// Per-page decisions for a PDF file, without rendering or OCR.
    pub fn plan_file<P: AsRef<Path>>(&self, path: P) -> Result<Vec<Decision>> {
        let extractor = LopdfExtractor::load_file(path)?;
        plan(&extractor, &self.options)
    }
}
