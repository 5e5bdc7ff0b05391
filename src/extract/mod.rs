//! Embedded PDF extraction subsystem.
//!
//! # Data Flow
//! ```text
//! raw upload bytes
//!     → scan.rs (first %PDF / last %%EOF, binary)
//!     → encoding.rs (UTF-16 → UTF-8, base64 block anchored on JVBERi)
//!     → scan.rs again on the decoded bytes
//!     → ExtractionResult (raw payload always retained)
//! ```
//!
//! # Design Decisions
//! - Pure function over its input; no I/O, no XML parse
//! - Absence of a PDF is a normal outcome, never an error
//! - Widest span wins when markers repeat

pub mod encoding;
pub mod scan;
pub mod sniff;

use thiserror::Error;

pub use scan::{locate_pdf, PdfSpan, PDF_EOF, PDF_MAGIC};
pub use sniff::{sniff, PayloadKind};

/// Why an embedded document could not be recovered.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("base64 block at byte {offset} failed to decode: {reason}")]
    InvalidBase64 { offset: usize, reason: String },

    #[error("PDF start marker at byte {start} has no %%EOF after it")]
    Unterminated { start: usize },
}

/// Outcome of inspecting one payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    PdfFound(Vec<u8>),
    NoPdfPresent,
    MalformedInput(ExtractionError),
}

/// Extraction outcome plus the untouched original payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    outcome: ExtractionOutcome,
    raw: Vec<u8>,
}

impl ExtractionResult {
    pub fn outcome(&self) -> &ExtractionOutcome {
        &self.outcome
    }

    /// Decoded PDF bytes, present only when a document was found.
    pub fn pdf_bytes(&self) -> Option<&[u8]> {
        match &self.outcome {
            ExtractionOutcome::PdfFound(pdf) => Some(pdf),
            _ => None,
        }
    }

    pub fn raw_xml_bytes(&self) -> &[u8] {
        &self.raw
    }

    pub fn is_pdf_found(&self) -> bool {
        matches!(self.outcome, ExtractionOutcome::PdfFound(_))
    }

    pub fn into_parts(self) -> (ExtractionOutcome, Vec<u8>) {
        (self.outcome, self.raw)
    }
}

/// Inspect `raw` for an embedded PDF.
///
/// Binary markers are tried first. Only when no start marker exists is the
/// payload treated as text and searched for a base64 block, which is decoded
/// and scanned again.
pub fn extract(raw: Vec<u8>) -> ExtractionResult {
    let outcome = inspect(&raw);
    ExtractionResult { outcome, raw }
}

fn inspect(raw: &[u8]) -> ExtractionOutcome {
    match locate_pdf(raw) {
        PdfSpan::Found(range) => return ExtractionOutcome::PdfFound(raw[range].to_vec()),
        PdfSpan::Unterminated { start } => {
            return ExtractionOutcome::MalformedInput(ExtractionError::Unterminated { start })
        }
        PdfSpan::Absent => {}
    }

    let text = encoding::normalize_text(raw);
    let Some(block) = encoding::find_base64_block(&text) else {
        return ExtractionOutcome::NoPdfPresent;
    };

    let decoded = match block.decode() {
        Ok(decoded) => decoded,
        Err(e) => {
            return ExtractionOutcome::MalformedInput(ExtractionError::InvalidBase64 {
                offset: block.span.start,
                reason: e.to_string(),
            })
        }
    };

    match locate_pdf(&decoded) {
        PdfSpan::Found(range) => ExtractionOutcome::PdfFound(decoded[range].to_vec()),
        PdfSpan::Unterminated { start } => {
            ExtractionOutcome::MalformedInput(ExtractionError::Unterminated { start })
        }
        PdfSpan::Absent => ExtractionOutcome::NoPdfPresent,
    }
}
