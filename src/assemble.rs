//! Document assembly.
//!
//! [`DocumentAssembler`] walks the pages of a document strictly in order:
//! extract embedded text, ask the policy, OCR when told to, append. A page
//! is never revisited once appended, and nothing is retried.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, PageWarning, Result, WarningKind};
use crate::extract::PageTextExtractor;
use crate::model::{DocumentText, PageResult};
use crate::ocr::OcrReader;
use crate::options::{ExtractOptions, OcrMode};
use crate::policy::{self, Decision, PageDecisionPolicy};
use crate::raster::PageRasterizer;

/// Callback invoked after each page with `(pages_done, total_pages)`.
pub type ProgressFn<'a> = &'a dyn Fn(u32, u32);

/// Drives the extraction policy over every page of a document.
pub struct DocumentAssembler<'a> {
    extractor: &'a dyn PageTextExtractor,
    rasterizer: &'a dyn PageRasterizer,
    ocr: &'a dyn OcrReader,
    options: ExtractOptions,
    policy: PageDecisionPolicy,
    cancel: Option<Arc<AtomicBool>>,
    progress: Option<ProgressFn<'a>>,
}

impl<'a> DocumentAssembler<'a> {
    /// Create an assembler over the three page capabilities.
    pub fn new(
        extractor: &'a dyn PageTextExtractor,
        rasterizer: &'a dyn PageRasterizer,
        ocr: &'a dyn OcrReader,
        options: &ExtractOptions,
    ) -> Self {
        Self {
            extractor,
            rasterizer,
            ocr,
            options: options.clone(),
            policy: PageDecisionPolicy::from_options(options),
            cancel: None,
            progress: None,
        }
    }

    /// Stop between pages once `flag` is set.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Report progress after each appended page.
    pub fn with_progress(mut self, progress: ProgressFn<'a>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// The policy this assembler applies.
    pub fn policy(&self) -> &PageDecisionPolicy {
        &self.policy
    }

    /// Process every page and return the document text.
    ///
    /// Fatal errors (unreadable document, OCR engine missing while a page
    /// needs it, cancellation) abort the run and no text is returned.
    pub fn run(&self) -> Result<DocumentText> {
        self.options.validate()?;

        let total = self.extractor.page_count();
        log::debug!(
            "Converting {} page(s), ocr={}, min_chars={}",
            total,
            self.options.ocr_mode,
            self.options.min_chars
        );

        let mut document = DocumentText::new(self.options.separator);
        for number in 1..=total {
            if self.is_cancelled() {
                log::info!("Cancelled before page {}", number);
                return Err(Error::Cancelled {
                    completed: number - 1,
                });
            }

            let page = self.process_page(number)?;
            document.push(page);

            if let Some(progress) = self.progress {
                progress(number, total);
            }
        }

        let stats = document.stats();
        log::info!(
            "Converted {} page(s): {} embedded, {} OCR, {} combined, {} warning(s)",
            stats.page_count,
            stats.embedded_pages,
            stats.ocr_pages,
            stats.combined_pages,
            stats.warning_count
        );
        Ok(document)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn process_page(&self, number: u32) -> Result<PageResult> {
        let extracted = self.extractor.extract(number)?;
        let embedded = extracted.text;
        let has_images = self.wants_image_signal() && self.extractor.has_images(number);
        let decision = self.policy.decide_page(&embedded, has_images);
        let embedded_chars = policy::sufficiency_len(&embedded);
        log::debug!(
            "Page {}: {} embedded char(s) -> {:?}",
            number,
            embedded_chars,
            decision
        );

        let mut warnings = Vec::new();
        if !extracted.undecoded_fonts.is_empty() {
            let warning = PageWarning {
                page: number,
                kind: WarningKind::TextDecoding,
                message: format!("skipped font(s) {}", extracted.undecoded_fonts.join("; ")),
            };
            log::warn!("{}", warning);
            warnings.push(warning);
        }
        let mut ocr_used = false;
        let ocr_text = if decision.needs_ocr() {
            match self.recognize_page(number) {
                Ok(text) => {
                    ocr_used = true;
                    text
                }
                Err(err) => {
                    let warning: PageWarning = err.into_warning()?;
                    log::warn!("{}", warning);
                    warnings.push(warning);
                    String::new()
                }
            }
        } else {
            String::new()
        };

        Ok(PageResult {
            number,
            text: policy::resolve(decision, &embedded, &ocr_text),
            decision,
            ocr_used,
            embedded_chars,
            warnings,
        })
    }

    /// Image detection only matters when the policy can act on it.
    fn wants_image_signal(&self) -> bool {
        self.options.ocr_image_pages && self.options.ocr_mode == OcrMode::Auto
    }

    fn recognize_page(&self, number: u32) -> Result<String> {
        let image = self.rasterizer.rasterize(number, self.options.dpi)?;
        self.ocr.recognize(&image, &self.options.ocr_lang)
    }
}

/// Decision for each page of a document without running OCR.
///
/// Extracts embedded text only; useful to preview what a run would do.
pub fn plan(extractor: &dyn PageTextExtractor, options: &ExtractOptions) -> Result<Vec<Decision>> {
    let policy = PageDecisionPolicy::from_options(options);
    let images = options.ocr_image_pages && options.ocr_mode == OcrMode::Auto;
    (1..=extractor.page_count())
        .map(|page| {
            let embedded = extractor.extract(page)?;
            Ok(policy.decide_page(&embedded.text, images && extractor.has_images(page)))
        })
        .collect()
}
