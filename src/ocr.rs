//! Optical character recognition.
//!
//! [`TesseractReader`] drives the `tesseract` command-line program. The
//! executable path is fixed at construction; nothing is read from the
//! environment during recognition. Availability is checked on first use only.

use std::cell::OnceCell;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Error, Result};
use crate::raster::RasterImage;

/// Recognizes text in page bitmaps.
pub trait OcrReader {
    /// Recognize the text of `image` using the engine language code `language`.
    ///
    /// Fails with [`Error::OcrEngineUnavailable`] when the engine cannot run
    /// at all, and with [`Error::OcrRecognition`] when only this image fails.
    fn recognize(&self, image: &RasterImage, language: &str) -> Result<String>;
}

/// [`OcrReader`] running the Tesseract executable.
pub struct TesseractReader {
    binary: PathBuf,
    page_segmentation: Option<u8>,
    version: OnceCell<std::result::Result<String, String>>,
}

impl TesseractReader {
    /// Reader using the executable at `binary` (a bare name is resolved through `PATH`).
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            page_segmentation: None,
            version: OnceCell::new(),
        }
    }

    /// Pass `--psm` to Tesseract instead of using its default segmentation.
    pub fn with_page_segmentation(mut self, psm: u8) -> Self {
        self.page_segmentation = Some(psm);
        self
    }

    /// Executable this reader runs.
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Engine version line, running the executable on first call.
    pub fn version(&self) -> Result<&str> {
        self.version
            .get_or_init(|| query_version(&self.binary))
            .as_deref()
            .map_err(|message| Error::OcrEngineUnavailable(message.clone()))
    }

    fn command(&self, input: &Path, image: &RasterImage, language: &str) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.arg(input)
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .arg("--dpi")
            .arg(image.dpi().to_string());
        if let Some(psm) = self.page_segmentation {
            cmd.arg("--psm").arg(psm.to_string());
        }
        cmd
    }
}

impl OcrReader for TesseractReader {
    fn recognize(&self, image: &RasterImage, language: &str) -> Result<String> {
        self.version()?;
        let page = image.page();
        let failed = |message: String| Error::OcrRecognition { page, message };

        let input = tempfile::Builder::new()
            .prefix("pdfocr-page-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| failed(format!("cannot create temporary image: {}", e)))?;
        image.write_grayscale_png(input.path())?;

        let output = self
            .command(input.path(), image, language)
            .output()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => Error::OcrEngineUnavailable(format!(
                    "{} disappeared: {}",
                    self.binary.display(),
                    e
                )),
                _ => failed(format!("failed to run {}: {}", self.binary.display(), e)),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(failed(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            log::debug!("tesseract on page {}: {}", page, stderr.trim());
        }
        Ok(page_text(&output.stdout))
    }
}

/// Recognized text without the trailing newline and form feed Tesseract
/// appends after every page.
fn page_text(stdout: &[u8]) -> String {
    String::from_utf8_lossy(stdout).trim_end().to_string()
}

/// Run `<binary> --version` and return its first line.
fn query_version(binary: &Path) -> std::result::Result<String, String> {
    let output = Command::new(binary).arg("--version").output().map_err(|e| {
        format!(
            "cannot run {}: {} (install Tesseract or pass its path explicitly)",
            binary.display(),
            e
        )
    })?;

    if !output.status.success() {
        return Err(format!(
            "{} --version exited with {}",
            binary.display(),
            output.status
        ));
    }

    // Old releases print the banner on stderr.
    let banner = if output.stdout.is_empty() {
        &output.stderr
    } else {
        &output.stdout
    };
    let version = first_line(&String::from_utf8_lossy(banner));
    log::info!("Using {} ({})", binary.display(), version);
    Ok(version)
}

fn first_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("tesseract")
        .to_string()
}
