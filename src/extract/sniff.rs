//! Content sniffing for uploaded payloads.
//!
//! Devices rarely send a useful `Content-Type`, so the stored artifact's
//! extension comes from the payload itself.

use super::encoding::normalize_text;
use super::scan::is_pdf;

/// Payloads shorter than this are never classified.
const MIN_SNIFF_LEN: usize = 10;

/// Detected kind of an uploaded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Pdf,
    Xml,
    Html,
    Json,
    Binary,
}

impl PayloadKind {
    /// File extension including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            PayloadKind::Pdf => ".pdf",
            PayloadKind::Xml => ".xml",
            PayloadKind::Html => ".html",
            PayloadKind::Json => ".json",
            PayloadKind::Binary => ".bin",
        }
    }

    /// Human-readable label used in log lines.
    pub fn label(self) -> &'static str {
        match self {
            PayloadKind::Pdf => "PDF",
            PayloadKind::Xml => "XML (ECG Data)",
            PayloadKind::Html => "HTML",
            PayloadKind::Json => "JSON",
            PayloadKind::Binary => "Unknown",
        }
    }
}

/// Classify `data` by its leading bytes.
pub fn sniff(data: &[u8]) -> PayloadKind {
    if data.len() < MIN_SNIFF_LEN {
        return PayloadKind::Binary;
    }
    if is_pdf(data) {
        return PayloadKind::Pdf;
    }
    if data.starts_with(b"<?xml") {
        return PayloadKind::Xml;
    }
    if matches!(data, [0xFF, 0xFE, ..] | [0xFE, 0xFF, ..]) {
        let head = normalize_text(&data[..data.len().min(200)]);
        if contains(&head, b"<?xml") || contains(&head, b"<restingecgdata") {
            return PayloadKind::Xml;
        }
    }

    let head = data[..data.len().min(1000)].to_ascii_lowercase();
    if contains(&head, b"<html") || contains(&head, b"<!doctype") {
        return PayloadKind::Html;
    }

    let mut lead = head.iter().copied().skip_while(|b| b.is_ascii_whitespace());
    match (lead.next(), lead.next()) {
        (Some(b'{') | Some(b'['), _) => return PayloadKind::Json,
        // Bare root element without a declaration, e.g. `<Report>`.
        (Some(b'<'), Some(next)) if next.is_ascii_alphabetic() => return PayloadKind::Xml,
        _ => {}
    }

    PayloadKind::Binary
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    memchr::memmem::find(haystack, needle).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_payload_is_binary() {
        assert_eq!(sniff(b"%PDF-1.4"), PayloadKind::Binary);
    }

    #[test]
    fn detects_common_kinds() {
        assert_eq!(sniff(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n"), PayloadKind::Pdf);
        assert_eq!(sniff(b"<?xml version=\"1.0\"?><r/>"), PayloadKind::Xml);
        assert_eq!(sniff(b"<!DOCTYPE html><html></html>"), PayloadKind::Html);
        assert_eq!(sniff(b"  {\"patient\": 1}"), PayloadKind::Json);
        assert_eq!(sniff(b"<Report><Hr>70</Hr></Report>"), PayloadKind::Xml);
        assert_eq!(sniff(&[0u8, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10]), PayloadKind::Binary);
    }

    #[test]
    fn detects_utf16_ecg_xml() {
        let mut data = vec![0xFF, 0xFE];
        for unit in "<restingecgdata><a/></restingecgdata>".encode_utf16() {
            data.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(sniff(&data), PayloadKind::Xml);
    }

    #[test]
    fn extensions_match_kind() {
        assert_eq!(PayloadKind::Xml.extension(), ".xml");
        assert_eq!(PayloadKind::Binary.extension(), ".bin");
    }
}
