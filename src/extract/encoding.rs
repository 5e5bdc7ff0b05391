//! Text-safe encodings of an embedded PDF.
//!
//! ECG carts frequently ship the report base64-encoded inside an element such
//! as `<StudyData>`, sometimes in a UTF-16 document and sometimes line-wrapped
//! with character references for the line breaks.

use std::borrow::Cow;
use std::ops::Range;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, PAD};
use base64::Engine as _;
use memchr::memmem;

/// `%PDF-` rendered in base64. A base64 PDF always starts with it.
pub const BASE64_PDF_ANCHOR: &[u8] = b"JVBERi";

/// Fewest significant base64 characters accepted as a plausible block.
pub const MIN_BLOCK_LEN: usize = 16;

/// Standard alphabet with padding. Non-zero trailing bits in the final
/// symbol are accepted; some cart encoders emit them.
const LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, PAD.with_decode_allow_trailing_bits(true));

/// Line-break character references tolerated inside a wrapped block.
const LINE_BREAK_REFS: [&[u8]; 4] = [b"&#xA;", b"&#xD;", b"&#10;", b"&#13;"];

/// A base64 run located inside a text payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base64Block {
    /// Span of the block in the scanned text, wrapping included.
    pub span: Range<usize>,
    /// Significant characters only, ready for decoding.
    pub encoded: Vec<u8>,
}

impl Base64Block {
    /// Decode the block with the standard alphabet and required padding.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        LENIENT.decode(&self.encoded)
    }
}

/// Re-encode UTF-16 text (detected by byte-order mark) as UTF-8.
///
/// Anything without a UTF-16 BOM is returned untouched.
pub fn normalize_text(data: &[u8]) -> Cow<'_, [u8]> {
    match data {
        [0xFF, 0xFE, rest @ ..] => Cow::Owned(decode_utf16(rest, u16::from_le_bytes)),
        [0xFE, 0xFF, rest @ ..] => Cow::Owned(decode_utf16(rest, u16::from_be_bytes)),
        _ => Cow::Borrowed(data),
    }
}

fn decode_utf16(data: &[u8], unit: fn([u8; 2]) -> u16) -> Vec<u8> {
    let units: Vec<u16> = data
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units).into_bytes()
}

/// Find the first base64 PDF block in `text`.
///
/// A block starts at a `JVBERi` anchor and runs over the base64 alphabet,
/// padding, ASCII whitespace and line-break character references. Runs with
/// fewer than [`MIN_BLOCK_LEN`] significant characters are skipped and the
/// search resumes after them.
pub fn find_base64_block(text: &[u8]) -> Option<Base64Block> {
    let finder = memmem::Finder::new(BASE64_PDF_ANCHOR);
    let mut from = 0;
    while let Some(found) = finder.find(&text[from..]) {
        let start = from + found;
        let (block, stop) = read_run(text, start);
        if block.encoded.len() >= MIN_BLOCK_LEN {
            return Some(block);
        }
        from = stop;
    }
    None
}

/// Consume the run starting at `start`, returning it and the offset where
/// scanning stopped.
fn read_run(text: &[u8], start: usize) -> (Base64Block, usize) {
    let mut encoded = Vec::new();
    let mut end = start;
    let mut pos = start;
    while pos < text.len() {
        let byte = text[pos];
        if is_base64_byte(byte) {
            encoded.push(byte);
            pos += 1;
            end = pos;
        } else if byte.is_ascii_whitespace() {
            pos += 1;
        } else if let Some(skip) = line_break_ref_len(&text[pos..]) {
            pos += skip;
        } else {
            break;
        }
    }

    let block = Base64Block {
        span: start..end,
        encoded,
    };
    (block, pos)
}

#[inline]
fn is_base64_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'+' | b'/' | b'=')
}

fn line_break_ref_len(rest: &[u8]) -> Option<usize> {
    LINE_BREAK_REFS
        .iter()
        .find(|reference| rest.starts_with(reference))
        .map(|reference| reference.len())
}
