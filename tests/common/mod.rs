//! Shared fakes and fixtures for integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashSet;

use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use pdfocr::{EmbeddedText, Error, OcrReader, PageRasterizer, PageTextExtractor, RasterImage, Result};

/// A line comfortably above the default 20 character threshold.
pub const LONG_TEXT: &str = "This page carries a full paragraph of embedded text.";

/// Extractor serving canned page texts.
pub struct FakeExtractor {
    pages: Vec<String>,
    images: HashSet<u32>,
    broken: HashSet<u32>,
    undecodable: HashSet<u32>,
    pub extracted: RefCell<Vec<u32>>,
}

impl FakeExtractor {
    pub fn new(pages: &[&str]) -> Self {
        Self {
            pages: pages.iter().map(|p| p.to_string()).collect(),
            images: HashSet::new(),
            broken: HashSet::new(),
            undecodable: HashSet::new(),
            extracted: RefCell::new(Vec::new()),
        }
    }

    /// Mark `page` as painting an image.
    pub fn with_image(mut self, page: u32) -> Self {
        self.images.insert(page);
        self
    }

    /// Report a skipped font on `page`, keeping its canned text.
    pub fn with_undecodable_font(mut self, page: u32) -> Self {
        self.undecodable.insert(page);
        self
    }

    /// Make extraction of `page` fail as a malformed page would.
    pub fn with_broken_page(mut self, page: u32) -> Self {
        self.broken.insert(page);
        self
    }
}

impl PageTextExtractor for FakeExtractor {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn extract(&self, page: u32) -> Result<EmbeddedText> {
        self.extracted.borrow_mut().push(page);
        if self.broken.contains(&page) {
            return Err(Error::DocumentRead(format!("page {} is malformed", page)));
        }
        let mut text = EmbeddedText::new(self.pages[(page - 1) as usize].clone());
        if self.undecodable.contains(&page) {
            text.undecoded_fonts.push("F9: no ToUnicode map".into());
        }
        Ok(text)
    }

    fn has_images(&self, page: u32) -> bool {
        self.images.contains(&page)
    }
}

/// Rasterizer producing 1x1 bitmaps, optionally failing on chosen pages.
#[derive(Default)]
pub struct FakeRasterizer {
    failing: HashSet<u32>,
    unavailable: bool,
    pub rendered: RefCell<Vec<(u32, u32)>>,
}

impl FakeRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, page: u32) -> Self {
        self.failing.insert(page);
        self
    }

    /// Behave as if the rendering library cannot be loaded.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.rendered.borrow().len()
    }
}

impl PageRasterizer for FakeRasterizer {
    fn rasterize(&self, page: u32, dpi: u32) -> Result<RasterImage> {
        self.rendered.borrow_mut().push((page, dpi));
        if self.unavailable {
            return Err(Error::OcrEngineUnavailable("renderer not installed".into()));
        }
        if self.failing.contains(&page) {
            return Err(Error::Rasterization {
                page,
                message: "corrupt page".into(),
            });
        }
        Ok(RasterImage::new(page, dpi, DynamicImage::new_luma8(1, 1)))
    }
}

enum OcrBehavior {
    Recognize,
    Unavailable,
    FailOn(HashSet<u32>),
}

/// OCR reader answering `OCR text of page N`.
pub struct FakeOcr {
    behavior: OcrBehavior,
    calls: Cell<usize>,
    pub languages: RefCell<Vec<String>>,
}

impl FakeOcr {
    pub fn new() -> Self {
        Self::with_behavior(OcrBehavior::Recognize)
    }

    /// Behave as if the engine is not installed.
    pub fn unavailable() -> Self {
        Self::with_behavior(OcrBehavior::Unavailable)
    }

    pub fn failing_on(pages: &[u32]) -> Self {
        Self::with_behavior(OcrBehavior::FailOn(pages.iter().copied().collect()))
    }

    fn with_behavior(behavior: OcrBehavior) -> Self {
        Self {
            behavior,
            calls: Cell::new(0),
            languages: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    pub fn text_for(page: u32) -> String {
        format!("OCR text of page {}", page)
    }
}

impl OcrReader for FakeOcr {
    fn recognize(&self, image: &RasterImage, language: &str) -> Result<String> {
        self.calls.set(self.calls.get() + 1);
        self.languages.borrow_mut().push(language.to_string());
        let page = image.page();
        match &self.behavior {
            OcrBehavior::Recognize => Ok(Self::text_for(page)),
            OcrBehavior::Unavailable => {
                Err(Error::OcrEngineUnavailable("tesseract not found".into()))
            }
            OcrBehavior::FailOn(pages) if pages.contains(&page) => Err(Error::OcrRecognition {
                page,
                message: "engine crashed".into(),
            }),
            OcrBehavior::FailOn(_) => Ok(Self::text_for(page)),
        }
    }
}

/// How a fixture page paints its image, if at all.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum FixtureImage {
    None,
    /// `Do` of an image XObject in the page resources
    XObject,
    /// `Do` of a Form XObject whose own resources hold the image
    InForm,
    /// `BI ... ID ... EI` in the page content stream
    Inline,
}

/// Use of a `Type0` font with `Identity-H` encoding and no `ToUnicode` map.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum CidFont {
    None,
    /// Listed in the page resources as `F2`, never selected
    Unused,
    /// Selected for a second text object after the `F1` text
    Shown,
}

/// One page of a generated PDF.
pub struct FixturePage<'a> {
    pub text: &'a str,
    pub image: FixtureImage,
    pub cid_font: CidFont,
}

impl<'a> FixturePage<'a> {
    pub fn text(text: &'a str) -> Self {
        Self {
            text,
            image: FixtureImage::None,
            cid_font: CidFont::None,
        }
    }

    pub fn blank() -> Self {
        Self::text("")
    }

    pub fn with_image(text: &'a str) -> Self {
        Self::text(text).painting(FixtureImage::XObject)
    }

    pub fn painting(mut self, image: FixtureImage) -> Self {
        self.image = image;
        self
    }

    pub fn with_cid_font(mut self, cid_font: CidFont) -> Self {
        self.cid_font = cid_font;
        self
    }

    /// Pages that need more than the inherited font get their own resources.
    fn own_resources(&self) -> bool {
        self.image != FixtureImage::None || self.cid_font != CidFont::None
    }
}

/// Build a PDF whose pages show the given text lines.
///
/// Fonts live on the `Pages` node as an inline dictionary and are inherited;
/// pages with an image or a CID font get their own resource dictionary.
pub fn fixture_pdf(pages: &[FixturePage<'_>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let cid_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => "NotoSansCJK-Regular",
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::Dictionary(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => "NotoSansCJK-Regular",
        })],
    });
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 1,
            "Height" => 1,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        vec![0u8],
    ));
    let form_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), 1.into(), 1.into()],
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im1" => image_id },
            },
        },
        b"q 1 0 0 1 0 0 cm /Im1 Do Q".to_vec(),
    ));

    let mut kids: Vec<Object> = Vec::new();
    for page in pages {
        let mut operations = Vec::new();
        if !page.text.is_empty() {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(page.text)]),
                Operation::new("ET", vec![]),
            ]);
        }
        if page.cid_font == CidFont::Shown {
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F2".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        vec![0x00, 0x2a, 0x01, 0x1f],
                        lopdf::StringFormat::Hexadecimal,
                    )],
                ),
                Operation::new("ET", vec![]),
            ]);
        }
        match page.image {
            FixtureImage::XObject | FixtureImage::InForm => {
                let name = if page.image == FixtureImage::XObject {
                    "Im1"
                } else {
                    "Fm1"
                };
                operations.extend([
                    Operation::new("q", vec![]),
                    Operation::new(
                        "cm",
                        vec![100.into(), 0.into(), 0.into(), 100.into(), 72.into(), 72.into()],
                    ),
                    Operation::new("Do", vec![name.into()]),
                    Operation::new("Q", vec![]),
                ]);
            }
            FixtureImage::Inline | FixtureImage::None => {}
        }
        let mut content = Content { operations }
            .encode()
            .expect("encode content stream");
        if page.image == FixtureImage::Inline {
            content.extend_from_slice(b"\nq 100 0 0 100 72 72 cm\nBI /W 2 /H 1 /CS /G /BPC 8 ID \x00\xff EI\nQ\n");
        }
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));

        let mut page_dict = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        };
        if page.own_resources() {
            let mut fonts = dictionary! { "F1" => font_id };
            if page.cid_font != CidFont::None {
                fonts.set("F2", cid_font_id);
            }
            let mut resources = dictionary! { "Font" => fonts };
            match page.image {
                FixtureImage::XObject => {
                    resources.set("XObject", dictionary! { "Im1" => image_id });
                }
                FixtureImage::InForm => {
                    resources.set("XObject", dictionary! { "Fm1" => form_id });
                }
                FixtureImage::Inline | FixtureImage::None => {}
            }
            page_dict.set("Resources", resources);
        }
        kids.push(doc.add_object(page_dict).into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("serialize fixture PDF");
    out
}
