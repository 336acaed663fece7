//! Embedded text extraction.
//!
//! [`PageTextExtractor`] isolates the concrete PDF library (lopdf) from the
//! assembler, so the page loop can be driven by a fake in tests.
//!
//! [`LopdfExtractor`] walks the page content stream itself instead of using
//! `lopdf::Document::extract_text`: fonts are looked up through inherited
//! resources (inline or referenced), encodings are only built for fonts a
//! page actually selects, and a font that cannot be decoded costs its own
//! strings only.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Range;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document as LopdfDocument, Encoding, Object, ObjectId, Stream};

use crate::detect;
use crate::error::{Error, Result};

/// Guard against runaway `Parent` chains and nested Form XObjects.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// TJ adjustments below this (thousandths of an em) read as a word gap.
const TJ_SPACE_THRESHOLD: f32 = -100.0;

/// Text read from a page's embedded text layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedText {
    /// Decoded text, in content-stream order
    pub text: String,

    /// Fonts whose strings were skipped, as `name: reason`
    pub undecoded_fonts: Vec<String>,
}

impl EmbeddedText {
    /// Text decoded without skipping anything.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            undecoded_fonts: Vec::new(),
        }
    }

    /// Check if every shown string could be decoded.
    pub fn is_complete(&self) -> bool {
        self.undecoded_fonts.is_empty()
    }
}

impl From<&str> for EmbeddedText {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for EmbeddedText {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

/// Access to the embedded text layer of an opened document.
///
/// Page numbers are 1-indexed.
pub trait PageTextExtractor {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Text encoded in the page's content stream, in content-stream order.
    ///
    /// Returns empty text for pages without text operators. Strings in fonts
    /// that cannot be decoded are skipped and reported in
    /// [`EmbeddedText::undecoded_fonts`]. Fails with [`Error::DocumentRead`]
    /// only when the page structure itself cannot be read.
    fn extract(&self, page: u32) -> Result<EmbeddedText>;

    /// Whether the page paints images.
    fn has_images(&self, _page: u32) -> bool {
        false
    }
}

/// [`PageTextExtractor`] backed by `lopdf::Document`.
pub struct LopdfExtractor {
    doc: LopdfDocument,
    pages: BTreeMap<u32, ObjectId>,
    version: String,
}

impl LopdfExtractor {
    /// Load from a file path.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let version = detect::sniff_file(path)?;
        let doc = LopdfDocument::load(path)?;
        Ok(Self::from_document(doc, version))
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let version = detect::sniff_version(data)?;
        let doc = LopdfDocument::load_mem(data)?;
        Ok(Self::from_document(doc, version))
    }

    fn from_document(doc: LopdfDocument, version: String) -> Self {
        if doc.is_encrypted() {
            log::warn!("Document is encrypted; embedded text may be unreadable");
        }
        let pages = doc.get_pages();
        Self {
            doc,
            pages,
            version,
        }
    }

    /// PDF version declared in the file header.
    pub fn version(&self) -> &str {
        &self.version
    }

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        self.pages.get(&page).copied().ok_or_else(|| {
            Error::DocumentRead(format!(
                "page {} does not exist (document has {} pages)",
                page,
                self.pages.len()
            ))
        })
    }

    /// Follow a reference to a dictionary, or take an inline one.
    fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        match obj {
            Object::Reference(r) => self.doc.get_dictionary(*r).ok(),
            Object::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    /// Page resources, inherited from ancestors in the page tree when absent.
    ///
    /// A `Parent` chain that loops back on itself is a structural error.
    fn page_resources(&self, page: u32, page_id: ObjectId) -> Result<Option<&Dictionary>> {
        let broken = |what: &str| Error::DocumentRead(format!("page {}: {}", page, what));

        let mut node = self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| broken(&e.to_string()))?;
        let mut seen = HashSet::from([page_id]);
        for _ in 0..MAX_INHERITANCE_DEPTH {
            if let Some(resources) = node.get(b"Resources").ok().and_then(|r| self.resolve_dict(r))
            {
                return Ok(Some(resources));
            }
            let Ok(parent) = node.get(b"Parent").and_then(Object::as_reference) else {
                return Ok(None);
            };
            if !seen.insert(parent) {
                return Err(broken("reference cycle in the page tree"));
            }
            node = self
                .doc
                .get_dictionary(parent)
                .map_err(|e| broken(&e.to_string()))?;
        }
        Err(broken("page tree nested too deeply"))
    }

    /// Entries of a resource category (`Font`, `XObject`), references resolved.
    fn named_dicts<'a>(&'a self, resources: &'a Dictionary, category: &[u8]) -> Option<&'a Dictionary> {
        resources
            .get(category)
            .ok()
            .and_then(|d| self.resolve_dict(d))
    }

    fn stream<'a>(&'a self, obj: &'a Object) -> Option<&'a Stream> {
        match obj {
            Object::Reference(r) => self.doc.get_object(*r).and_then(Object::as_stream).ok(),
            Object::Stream(s) => Some(s),
            _ => None,
        }
    }

    /// Whether an XObject dictionary paints an image, directly or through
    /// nested Form XObjects.
    fn xobjects_paint_image(
        &self,
        xobjects: &Dictionary,
        seen: &mut HashSet<ObjectId>,
        depth: usize,
    ) -> bool {
        if depth >= MAX_INHERITANCE_DEPTH {
            return false;
        }
        for (_, obj) in xobjects.iter() {
            if let Object::Reference(id) = obj {
                if !seen.insert(*id) {
                    continue;
                }
            }
            let Some(stream) = self.stream(obj) else {
                continue;
            };
            match stream.dict.get(b"Subtype").and_then(Object::as_name) {
                Ok(b"Image") => return true,
                Ok(b"Form") => {
                    let content = stream
                        .decompressed_content()
                        .unwrap_or_else(|_| stream.content.clone());
                    if !inline_image_spans(&content).is_empty() {
                        return true;
                    }
                    let nested = stream
                        .dict
                        .get(b"Resources")
                        .ok()
                        .and_then(|r| self.resolve_dict(r))
                        .and_then(|r| self.named_dicts(r, b"XObject"));
                    if let Some(nested) = nested {
                        if self.xobjects_paint_image(nested, seen, depth + 1) {
                            return true;
                        }
                    }
                }
                _ => {}
            }
        }
        false
    }
}

impl PageTextExtractor for LopdfExtractor {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn extract(&self, page: u32) -> Result<EmbeddedText> {
        let page_id = self.page_id(page)?;
        let fonts = self
            .page_resources(page, page_id)?
            .and_then(|r| self.named_dicts(r, b"Font"));

        let raw = self
            .doc
            .get_page_content(page_id)
            .map_err(|e| Error::DocumentRead(format!("page {}: {}", page, e)))?;
        let content = Content::decode(&strip_inline_images(&raw))
            .map_err(|e| Error::DocumentRead(format!("page {}: {}", page, e)))?;

        let mut decoder = TextDecoder::new(self, fonts);
        for operation in &content.operations {
            decoder.apply(operation);
        }
        let text = decoder.finish();
        if !text.is_complete() {
            log::debug!(
                "Page {}: skipped text in {}",
                page,
                text.undecoded_fonts.join(", ")
            );
        }
        Ok(text)
    }

    fn has_images(&self, page: u32) -> bool {
        let Ok(page_id) = self.page_id(page) else {
            return false;
        };
        let xobjects = self
            .page_resources(page, page_id)
            .ok()
            .flatten()
            .and_then(|r| self.named_dicts(r, b"XObject"));
        if let Some(xobjects) = xobjects {
            if self.xobjects_paint_image(xobjects, &mut HashSet::new(), 0) {
                return true;
            }
        }
        self.doc
            .get_page_content(page_id)
            .map(|raw| !inline_image_spans(&raw).is_empty())
            .unwrap_or(false)
    }
}

/// Text state while walking one page's content stream.
struct TextDecoder<'a> {
    extractor: &'a LopdfExtractor,
    fonts: Option<&'a Dictionary>,
    encodings: HashMap<Vec<u8>, Option<Encoding<'a>>>,
    current: Option<Vec<u8>>,
    text: String,
    skipped: BTreeMap<String, String>,
}

impl<'a> TextDecoder<'a> {
    fn new(extractor: &'a LopdfExtractor, fonts: Option<&'a Dictionary>) -> Self {
        Self {
            extractor,
            fonts,
            encodings: HashMap::new(),
            current: None,
            text: String::new(),
            skipped: BTreeMap::new(),
        }
    }

    fn apply(&mut self, operation: &Operation) {
        match operation.operator.as_str() {
            "Tf" => {
                self.current = operation
                    .operands
                    .first()
                    .and_then(|o| o.as_name().ok())
                    .map(<[u8]>::to_vec);
                if let Some(name) = self.current.clone() {
                    self.load_encoding(&name);
                }
            }
            "Tj" | "TJ" => self.show(&operation.operands),
            "'" => {
                self.end_line();
                self.show(&operation.operands);
            }
            "\"" => {
                self.end_line();
                self.show(operation.operands.get(2..).unwrap_or_default());
            }
            "ET" => self.end_line(),
            _ => {}
        }
    }

    fn end_line(&mut self) {
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
    }

    fn skip(&mut self, name: &[u8], reason: impl Into<String>) {
        self.skipped
            .entry(String::from_utf8_lossy(name).into_owned())
            .or_insert_with(|| reason.into());
    }

    /// Build the encoding of a selected font once; failures are remembered.
    fn load_encoding(&mut self, name: &[u8]) {
        if self.encodings.contains_key(name) {
            return;
        }
        let extractor = self.extractor;
        let font = self
            .fonts
            .and_then(|fonts| fonts.get(name).ok())
            .and_then(|f| extractor.resolve_dict(f));
        let encoding = match font {
            None => Err("font not found in page resources".to_string()),
            Some(font) if !font.type_is(b"Font") => Err("not a font dictionary".to_string()),
            Some(font) => font
                .get_font_encoding(&extractor.doc)
                .map_err(|e| e.to_string()),
        };
        let encoding = match encoding {
            Ok(encoding) => Some(encoding),
            Err(reason) => {
                self.skip(name, reason);
                None
            }
        };
        self.encodings.insert(name.to_vec(), encoding);
    }

    fn show(&mut self, operands: &[Object]) {
        let Some(name) = self.current.clone() else {
            if operands_have_strings(operands) {
                self.skip(b"(none)", "text shown before any font was selected");
            }
            return;
        };
        let mut shown = String::new();
        let result = match self.encodings.get(&name) {
            Some(Some(encoding)) => collect_text(&mut shown, encoding, operands),
            _ => return,
        };
        match result {
            Ok(()) => self.text.push_str(&shown),
            Err(e) => {
                self.skip(&name, e.to_string());
                self.encodings.insert(name, None);
            }
        }
    }

    fn finish(self) -> EmbeddedText {
        EmbeddedText {
            text: self.text,
            undecoded_fonts: self
                .skipped
                .into_iter()
                .map(|(name, reason)| format!("{}: {}", name, reason))
                .collect(),
        }
    }
}

fn operands_have_strings(operands: &[Object]) -> bool {
    operands.iter().any(|o| match o {
        Object::String(..) => true,
        Object::Array(items) => operands_have_strings(items),
        _ => false,
    })
}

fn collect_text(text: &mut String, encoding: &Encoding<'_>, operands: &[Object]) -> lopdf::Result<()> {
    for operand in operands {
        match operand {
            Object::String(bytes, _) => text.push_str(&LopdfDocument::decode_text(encoding, bytes)?),
            Object::Array(items) => {
                collect_text(text, encoding, items)?;
                text.push(' ');
            }
            Object::Integer(_) | Object::Real(_) => {
                if operand.as_float().is_ok_and(|gap| gap < TJ_SPACE_THRESHOLD) {
                    text.push(' ');
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn is_delimiter(byte: u8) -> bool {
    byte == 0 || byte.is_ascii_whitespace() || b"()<>[]{}/%".contains(&byte)
}

/// Position of `token` standing alone (delimited on both sides) at or after `from`.
fn find_token(data: &[u8], from: usize, token: &[u8]) -> Option<usize> {
    let mut i = from;
    while i + token.len() <= data.len() {
        if &data[i..i + token.len()] == token
            && (i == 0 || is_delimiter(data[i - 1]))
            && data.get(i + token.len()).map_or(true, |&b| is_delimiter(b))
        {
            return Some(i);
        }
        i += 1;
    }
    None
}

/// Byte ranges of inline images (`BI ... ID <data> EI`) in a content stream.
fn inline_image_spans(data: &[u8]) -> Vec<Range<usize>> {
    let mut spans = Vec::new();
    let mut pos = 0;
    while let Some(start) = find_token(data, pos, b"BI") {
        let Some(id) = find_token(data, start + 2, b"ID") else {
            break;
        };
        // One whitespace byte separates ID from the image data.
        let body = (id + 3).min(data.len());
        let end = find_token(data, body, b"EI").map_or(data.len(), |ei| ei + 2);
        spans.push(start..end);
        pos = end;
    }
    spans
}

/// Content stream with inline image data blanked out, since the content
/// parser stops at the first binary image byte.
fn strip_inline_images(data: &[u8]) -> Cow<'_, [u8]> {
    let spans = inline_image_spans(data);
    if spans.is_empty() {
        return Cow::Borrowed(data);
    }
    let mut out = Vec::with_capacity(data.len());
    let mut last = 0;
    for span in spans {
        out.extend_from_slice(&data[last..span.start]);
        out.push(b' ');
        last = span.end;
    }
    out.extend_from_slice(&data[last..]);
    Cow::Owned(out)
}
