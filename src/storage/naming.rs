//! Artifact naming.
//!
//! `<base>_<YYYYmmdd_HHMMSS>_<tag><ext>` for the raw payload and
//! `<base>_<YYYYmmdd_HHMMSS>_<tag>_extracted.pdf` for a recovered report.

use chrono::{DateTime, TimeZone};

use crate::extract::PayloadKind;

/// Base name used when the request carries nothing better.
pub const DEFAULT_BASE_NAME: &str = "ecg_upload";

const MAX_BASE_LEN: usize = 96;

/// Names for the artifacts of one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNames {
    stem: String,
}

impl ArtifactNames {
    /// Build names from a base, a timestamp and a short per-request tag.
    pub fn new<Tz: TimeZone>(base: &str, at: &DateTime<Tz>, tag: &str) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self {
            stem: format!("{}_{}_{}", base, at.format("%Y%m%d_%H%M%S"), tag),
        }
    }

    pub fn raw(&self, kind: PayloadKind) -> String {
        format!("{}{}", self.stem, kind.extension())
    }

    pub fn extracted_pdf(&self) -> String {
        format!("{}_extracted.pdf", self.stem)
    }
}

/// Pick a base name from `Content-Disposition`, then the request path.
///
/// The extension is dropped (the stored extension comes from sniffing) and
/// anything outside `[A-Za-z0-9._-]` becomes `_`.
pub fn base_name(content_disposition: Option<&str>, request_path: &str) -> String {
    content_disposition
        .and_then(disposition_filename)
        .or_else(|| last_path_segment(request_path))
        .map(strip_extension)
        .map(sanitize)
        .filter(|name| !name.is_empty() && name.chars().any(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| DEFAULT_BASE_NAME.to_string())
}

fn disposition_filename(value: &str) -> Option<&str> {
    let (_, rest) = value.split_once("filename=")?;
    let rest = rest.split(';').next().unwrap_or(rest).trim();
    let name = rest.trim_matches('"');
    // Browsers may send a full client-side path.
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    (!name.is_empty()).then_some(name)
}

fn last_path_segment(path: &str) -> Option<&str> {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    path.trim_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
}

fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(dot) => &name[..dot],
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .take(MAX_BASE_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn names_carry_timestamp_and_tag() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let names = ArtifactNames::new("ecg_upload", &at, "1a2b3c4d");
        assert_eq!(names.raw(PayloadKind::Xml), "ecg_upload_20240309_140507_1a2b3c4d.xml");
        assert_eq!(names.extracted_pdf(), "ecg_upload_20240309_140507_1a2b3c4d_extracted.pdf");
    }

    #[test]
    fn disposition_wins_over_path() {
        let name = base_name(Some("attachment; filename=\"patient 42.xml\""), "/upload/other.xml");
        assert_eq!(name, "patient_42");
    }

    #[test]
    fn path_segment_used_without_disposition() {
        assert_eq!(base_name(None, "/upload/ECG_0001.xml"), "ECG_0001");
        assert_eq!(base_name(None, "/ecg/report?id=3"), "report");
    }

    #[test]
    fn falls_back_to_default() {
        assert_eq!(base_name(None, "/"), DEFAULT_BASE_NAME);
        assert_eq!(base_name(Some("inline"), ""), DEFAULT_BASE_NAME);
        assert_eq!(base_name(None, "/.."), DEFAULT_BASE_NAME);
    }

    #[test]
    fn client_paths_are_reduced_to_file_name() {
        let name = base_name(Some("form-data; name=\"file\"; filename=\"C:\\ecg\\scan.pdf\""), "/");
        assert_eq!(name, "scan");
    }
}
