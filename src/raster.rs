//! Page rasterization for OCR.
//!
//! PDFium is bound lazily: a run whose pages never need OCR never loads the
//! shared library, and a missing library is only reported once a page
//! actually has to be rendered.

use std::cell::OnceCell;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use pdfium_render::prelude::*;

use crate::error::{Error, Result};

/// PDF user space units per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// A rendered page bitmap.
#[derive(Debug, Clone)]
pub struct RasterImage {
    page: u32,
    dpi: u32,
    image: DynamicImage,
}

impl RasterImage {
    /// Wrap a rendered bitmap of `page` (1-indexed) at `dpi`.
    pub fn new(page: u32, dpi: u32, image: DynamicImage) -> Self {
        Self { page, dpi, image }
    }

    /// Page the bitmap was rendered from.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Resolution the page was rendered at.
    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// The underlying bitmap.
    pub fn as_image(&self) -> &DynamicImage {
        &self.image
    }

    /// Write the bitmap as an 8-bit grayscale PNG.
    pub fn write_grayscale_png(&self, path: &Path) -> Result<()> {
        DynamicImage::ImageLuma8(self.image.to_luma8())
            .save_with_format(path, ImageFormat::Png)
            .map_err(|e| Error::OcrRecognition {
                page: self.page,
                message: format!("cannot write page image: {}", e),
            })
    }
}

/// Renders single pages of an opened document.
pub trait PageRasterizer {
    /// Render `page` (1-indexed) at `dpi`.
    ///
    /// Fails with [`Error::Rasterization`] when this page cannot be rendered,
    /// and with [`Error::OcrEngineUnavailable`] when no page can be.
    fn rasterize(&self, page: u32, dpi: u32) -> Result<RasterImage>;
}

/// Pixel size of a page edge of `points` length at `dpi`.
pub fn pixels_for(points: f32, dpi: u32) -> i32 {
    (points * dpi as f32 / POINTS_PER_INCH).ceil().max(1.0) as i32
}

/// A lazily bound PDFium library.
///
/// Binding happens on the first [`PdfiumEngine::pdfium`] call; a failure is
/// cached and reported again on later calls without retrying.
pub struct PdfiumEngine {
    library: Option<PathBuf>,
    pdfium: OnceCell<std::result::Result<Pdfium, String>>,
}

impl PdfiumEngine {
    /// Look for PDFium at `library` (a directory or the library file) before the system paths.
    pub fn new(library: Option<PathBuf>) -> Self {
        Self {
            library,
            pdfium: OnceCell::new(),
        }
    }

    /// The bound library, binding it on first use.
    pub fn pdfium(&self) -> Result<&Pdfium> {
        self.pdfium
            .get_or_init(|| bind_pdfium(self.library.as_deref()))
            .as_ref()
            .map_err(|message| Error::OcrEngineUnavailable(message.clone()))
    }

    /// Whether binding has been attempted.
    pub fn is_bound(&self) -> bool {
        self.pdfium.get().is_some()
    }
}

/// [`PageRasterizer`] backed by PDFium (dynamically linked).
///
/// The document is opened once, when the first page is rendered, and stays
/// open until the rasterizer is dropped.
pub struct PdfiumRasterizer<'a> {
    engine: &'a PdfiumEngine,
    data: &'a [u8],
    document: OnceCell<std::result::Result<PdfDocument<'a>, String>>,
}

impl<'a> PdfiumRasterizer<'a> {
    /// Rasterizer over the bytes of an already-read PDF file.
    pub fn new(engine: &'a PdfiumEngine, data: &'a [u8]) -> Self {
        Self {
            engine,
            data,
            document: OnceCell::new(),
        }
    }

    /// Whether the document has been opened.
    pub fn is_loaded(&self) -> bool {
        self.document.get().is_some()
    }

    fn document(&self, page: u32) -> Result<&PdfDocument<'a>> {
        let engine: &'a PdfiumEngine = self.engine;
        let data: &'a [u8] = self.data;
        let pdfium = engine.pdfium()?;
        self.document
            .get_or_init(|| {
                log::debug!("Opening document in PDFium ({} bytes)", data.len());
                pdfium
                    .load_pdf_from_byte_slice(data, None)
                    .map_err(|e| format!("failed to load document: {}", e))
            })
            .as_ref()
            .map_err(|message| Error::Rasterization {
                page,
                message: message.clone(),
            })
    }
}

impl PageRasterizer for PdfiumRasterizer<'_> {
    fn rasterize(&self, page: u32, dpi: u32) -> Result<RasterImage> {
        let document = self.document(page)?;
        let failed = |message: String| Error::Rasterization { page, message };

        let index = page
            .checked_sub(1)
            .and_then(|i| u16::try_from(i).ok())
            .ok_or_else(|| failed("page number out of range".to_string()))?;
        let pdf_page = document
            .pages()
            .get(index)
            .map_err(|e| failed(format!("failed to get page: {}", e)))?;

        let width = pixels_for(pdf_page.width().value, dpi);
        let height = pixels_for(pdf_page.height().value, dpi);
        log::debug!("Rendering page {} at {} dpi ({}x{})", page, dpi, width, height);

        let config = PdfRenderConfig::new()
            .set_target_width(width)
            .set_target_height(height);
        let bitmap = pdf_page
            .render_with_config(&config)
            .map_err(|e| failed(format!("failed to render page: {}", e)))?;

        Ok(RasterImage::new(page, dpi, bitmap.as_image()))
    }
}

/// Bind to PDFium, trying the configured location first, then the system library.
fn bind_pdfium(library: Option<&Path>) -> std::result::Result<Pdfium, String> {
    let configured = library.map(|path| {
        let target = if path.is_dir() {
            Pdfium::pdfium_platform_library_name_at_path(path)
        } else {
            path.to_path_buf()
        };
        Pdfium::bind_to_library(target)
    });

    let bindings = match configured {
        Some(Ok(bindings)) => Ok(bindings),
        Some(Err(e)) => {
            log::warn!("PDFium not loadable from configured path: {:?}", e);
            Pdfium::bind_to_system_library()
        }
        None => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| format!("failed to load the PDFium library: {:?}", e))?;

    log::debug!("PDFium bound");
    Ok(Pdfium::new(bindings))
}
