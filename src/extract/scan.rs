//! Binary marker scanning.
//!
//! First/last occurrence search over raw bytes using `memchr::memmem`, which
//! keeps the worst case linear in the payload size.

use std::ops::Range;

use memchr::memmem;

/// PDF start-of-file magic.
pub const PDF_MAGIC: &[u8] = b"%PDF";

/// PDF end-of-file marker.
pub const PDF_EOF: &[u8] = b"%%EOF";

/// Result of scanning a buffer for a PDF document span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdfSpan {
    /// No start marker anywhere in the buffer.
    Absent,
    /// Start marker found but no end marker after it.
    Unterminated { start: usize },
    /// Widest span from the first start marker through the last end marker.
    Found(Range<usize>),
}

/// Locate the widest PDF span in `data`.
///
/// The end marker is searched from the back so that partial `%%EOF`
/// sequences inside incremental updates or XML escaping never truncate the
/// document.
pub fn locate_pdf(data: &[u8]) -> PdfSpan {
    let Some(start) = memmem::find(data, PDF_MAGIC) else {
        return PdfSpan::Absent;
    };

    match memmem::rfind(&data[start..], PDF_EOF) {
        Some(offset) => PdfSpan::Found(start..start + offset + PDF_EOF.len()),
        None => PdfSpan::Unterminated { start },
    }
}

/// Whether `data` begins with the PDF magic.
#[inline]
pub fn is_pdf(data: &[u8]) -> bool {
    data.starts_with(PDF_MAGIC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_on_empty_and_plain_text() {
        assert_eq!(locate_pdf(b""), PdfSpan::Absent);
        assert_eq!(locate_pdf(b"<Report><Note>ok</Note></Report>"), PdfSpan::Absent);
    }

    #[test]
    fn span_is_inclusive_of_both_markers() {
        let data = b"<a>%PDF-1.4 body %%EOF</a>";
        let PdfSpan::Found(range) = locate_pdf(data) else {
            panic!("expected a span");
        };
        assert_eq!(&data[range], b"%PDF-1.4 body %%EOF");
    }

    #[test]
    fn prefers_widest_span() {
        let data = b"x%PDF-1 a %%EOF y %PDF-2 b %%EOF z";
        let PdfSpan::Found(range) = locate_pdf(data) else {
            panic!("expected a span");
        };
        assert_eq!(&data[range], b"%PDF-1 a %%EOF y %PDF-2 b %%EOF");
    }

    #[test]
    fn end_marker_before_start_is_unterminated() {
        let data = b"%%EOF then %PDF-1.7 and nothing else";
        assert_eq!(locate_pdf(data), PdfSpan::Unterminated { start: 11 });
    }

    #[test]
    fn magic_prefix_check() {
        assert!(is_pdf(b"%PDF-1.4\n"));
        assert!(!is_pdf(b" %PDF-1.4"));
        assert!(!is_pdf(b"%PD"));
    }
}
