//! PDF header sniffing.
//!
//! A file is only handed to the PDF parser once its first bytes look like a
//! PDF header, so that a text file or an image renamed to `.pdf` fails with a
//! clear document error instead of an obscure parser message.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
/// Bytes needed to read "%PDF-x.y".
const HEADER_LEN: usize = PDF_MAGIC.len() + 3;
/// Some producers prepend junk before the header; readers tolerate up to 1 KiB.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Locate the PDF header in `data` and return the version it declares (e.g. "1.7").
pub fn sniff_version(data: &[u8]) -> Result<String> {
    let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
    let start = window
        .windows(PDF_MAGIC.len())
        .position(|w| w == PDF_MAGIC)
        .ok_or(Error::UnknownFormat)?;

    let header = data
        .get(start..start + HEADER_LEN)
        .ok_or(Error::UnknownFormat)?;
    let version = String::from_utf8_lossy(&header[PDF_MAGIC.len()..]).to_string();

    let bytes = version.as_bytes();
    if bytes[0].is_ascii_digit() && bytes[1] == b'.' && bytes[2].is_ascii_digit() {
        Ok(version)
    } else {
        Err(Error::UnsupportedVersion(version))
    }
}

/// Read the head of a file and sniff its PDF version.
pub fn sniff_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let mut head = Vec::with_capacity(HEADER_SEARCH_WINDOW);
    File::open(path)?
        .take(HEADER_SEARCH_WINDOW as u64)
        .read_to_end(&mut head)?;
    sniff_version(&head)
}

/// Check if bytes start like a PDF document.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    sniff_version(data).is_ok()
}
