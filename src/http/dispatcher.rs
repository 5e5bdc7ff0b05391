//! Per-connection request dispatch.
//!
//! # Responsibilities
//! - Drive one connection: read head, check method and credentials,
//!   read body, extract, store, answer, close
//! - Turn protocol failures into compatible error responses
//! - Keep storage and extraction failures away from the device
//!
//! # Design Decisions
//! - Exactly one response per connection, then an active close
//! - In compatibility mode the device sees success once its body arrived,
//!   whatever happened on disk; strict mode reports a failed raw write
//! - Extraction and file I/O run on the blocking pool

use std::net::SocketAddr;

use chrono::Local;
use hyper::{Method, StatusCode};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::config::{AuthConfig, LimitsConfig, ResponseMode, UploadConfig};
use crate::error::{ProtocolError, UploadError};
use crate::extract::{extract, sniff, ExtractionError, ExtractionOutcome, PayloadKind};
use crate::http::auth::check_basic;
use crate::http::request::{read_body, read_head, RequestId, UploadRequest};
use crate::http::response::{
    format_continue, format_error, format_preflight, format_success, format_unauthorized, DeviceResponse,
};
use crate::net::{ConnectionGuard, ConnectionState};
use crate::observability::metrics;
use crate::storage::naming::base_name;
use crate::storage::{ArtifactNames, StorageError, StorageSink, StoredFile};

/// Body of a strict-mode failure response.
pub const FAILURE_BODY: &str = "Upload failed";

/// What happened to one upload on disk.
#[derive(Debug)]
pub struct UploadReport {
    pub kind: PayloadKind,
    pub byte_length: usize,
    pub raw: Result<StoredFile, StorageError>,
    /// Present only when a PDF was recovered from a non-PDF payload.
    pub pdf: Option<Result<StoredFile, StorageError>>,
    pub malformed: Option<ExtractionError>,
}

/// Extract and store one upload body.
///
/// The raw payload is always written first. A payload that is itself a PDF
/// is not written a second time as an extracted report.
pub fn process_upload(body: Vec<u8>, names: &ArtifactNames, sink: &StorageSink) -> UploadReport {
    let kind = sniff(&body);
    let byte_length = body.len();
    let (outcome, raw) = extract(body).into_parts();

    let raw = sink.store(&names.raw(kind), &raw);
    let (pdf, malformed) = match outcome {
        ExtractionOutcome::PdfFound(pdf) if kind != PayloadKind::Pdf => {
            (Some(sink.store(&names.extracted_pdf(), &pdf)), None)
        }
        ExtractionOutcome::PdfFound(_) | ExtractionOutcome::NoPdfPresent => (None, None),
        ExtractionOutcome::MalformedInput(e) => (None, Some(e)),
    };

    UploadReport {
        kind,
        byte_length,
        raw,
        pdf,
        malformed,
    }
}

/// Serves device connections against one configuration.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    auth: AuthConfig,
    limits: LimitsConfig,
    mode: ResponseMode,
    sink: StorageSink,
}

impl Dispatcher {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            auth: config.auth.clone(),
            limits: config.limits.clone(),
            mode: config.response.mode,
            sink: StorageSink::new(config.storage.output_dir.clone()),
        }
    }

    pub fn sink(&self) -> &StorageSink {
        &self.sink
    }

    /// Handle a single connection from first byte to close.
    ///
    /// Only transport failures are returned; everything else has already been
    /// answered on the wire.
    pub async fn serve_connection<S>(
        &self,
        stream: S,
        remote: SocketAddr,
        conn: &mut ConnectionGuard,
    ) -> Result<(), UploadError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (read_half, mut writer) = tokio::io::split(stream);
        let mut reader = BufReader::new(read_half);

        let response = match self.receive(&mut reader, &mut writer, remote, conn).await {
            Ok(Some(response)) => response,
            Ok(None) => {
                tracing::debug!(connection_id = %conn.id(), peer_addr = %remote, "Closed before request");
                conn.advance(ConnectionState::Closed);
                return Ok(());
            }
            Err(UploadError::Protocol(e)) => {
                tracing::warn!(connection_id = %conn.id(), peer_addr = %remote, error = %e, "Rejected request");
                self.reject(&e)
            }
            Err(e) => return Err(e),
        };

        conn.advance(ConnectionState::RespondAndClose);
        metrics::record_response(response.status().as_u16());
        writer.write_all(&response.to_bytes()).await?;
        writer.flush().await?;
        writer.shutdown().await?;
        conn.advance(ConnectionState::Closed);
        Ok(())
    }

    async fn receive<R, W>(
        &self,
        reader: &mut BufReader<R>,
        writer: &mut W,
        remote: SocketAddr,
        conn: &mut ConnectionGuard,
    ) -> Result<Option<DeviceResponse>, UploadError>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        conn.advance(ConnectionState::ReadHeaders);
        let Some(head) = read_head(reader, self.limits.max_header_bytes).await? else {
            return Ok(None);
        };

        let id = RequestId::new();
        tracing::debug!(
            request_id = %id,
            connection_id = %conn.id(),
            peer_addr = %remote,
            method = %head.method,
            target = %head.target,
            version = %head.version,
            "Request received"
        );

        match head.method.clone() {
            Method::OPTIONS => Ok(Some(format_preflight())),
            Method::POST | Method::PUT => {
                check_basic(head.header("authorization"), &self.auth)?;

                if head.expects_continue() {
                    writer.write_all(format_continue()).await?;
                    writer.flush().await?;
                }

                conn.advance(ConnectionState::ReadBody);
                let body = read_body(reader, &head, self.limits.max_body_size).await?;

                conn.advance(ConnectionState::Dispatch);
                let request = UploadRequest {
                    id,
                    head,
                    body,
                    remote,
                };
                Ok(Some(self.dispatch(request).await))
            }
            other => Err(ProtocolError::MethodNotAllowed(other).into()),
        }
    }

    /// Store a received upload and choose the device response.
    pub async fn dispatch(&self, request: UploadRequest) -> DeviceResponse {
        let UploadRequest {
            id,
            head,
            body,
            remote,
        } = request;
        metrics::record_upload(head.method.as_str());

        if body.is_empty() {
            tracing::warn!(request_id = %id, peer_addr = %remote, "Upload without content");
            return self.reject(&ProtocolError::EmptyBody);
        }

        let base = base_name(head.header("content-disposition"), head.path());
        let names = ArtifactNames::new(&base, &Local::now(), &id.short());
        let sink = self.sink.clone();

        let stored = match tokio::task::spawn_blocking(move || process_upload(body, &names, &sink)).await {
            Ok(report) => {
                log_report(&id, remote, &head.method, &report);
                report.raw.is_ok()
            }
            Err(e) => {
                tracing::error!(request_id = %id, peer_addr = %remote, error = %e, "Upload processing panicked");
                false
            }
        };

        if !stored && self.mode == ResponseMode::Strict {
            return format_error(StatusCode::INTERNAL_SERVER_ERROR, FAILURE_BODY);
        }
        format_success()
    }

    fn reject(&self, error: &ProtocolError) -> DeviceResponse {
        match error {
            ProtocolError::Unauthorized => format_unauthorized(&self.auth.realm),
            other => format_error(other.status(), other.message()),
        }
    }
}

fn log_report(id: &RequestId, remote: SocketAddr, method: &Method, report: &UploadReport) {
    match &report.raw {
        Ok(stored) => tracing::info!(
            request_id = %id,
            peer_addr = %remote,
            method = %method,
            kind = report.kind.label(),
            bytes = report.byte_length,
            path = %stored.destination_path.display(),
            "File received"
        ),
        Err(e) => {
            metrics::record_storage_failure(e.kind());
            tracing::error!(
                request_id = %id,
                peer_addr = %remote,
                kind = report.kind.label(),
                bytes = report.byte_length,
                error = %e,
                "Failed to store upload"
            );
        }
    }

    match &report.pdf {
        Some(Ok(stored)) => {
            metrics::record_pdf_extracted();
            tracing::info!(
                request_id = %id,
                bytes = stored.byte_length,
                path = %stored.destination_path.display(),
                "Extracted embedded PDF"
            );
        }
        Some(Err(e)) => {
            metrics::record_storage_failure(e.kind());
            tracing::error!(request_id = %id, error = %e, "Failed to store extracted PDF");
        }
        None => {}
    }

    if let Some(e) = &report.malformed {
        metrics::record_malformed_extraction();
        tracing::warn!(request_id = %id, error = %e, "Embedded PDF could not be decoded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::RequestHead;
    use chrono::TimeZone;

    const PDF: &[u8] = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n%%EOF";

    fn names() -> ArtifactNames {
        let at = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        ArtifactNames::new("ecg", &at, "abcd1234")
    }

    fn config_for(dir: &std::path::Path, mode: ResponseMode) -> UploadConfig {
        let mut config = UploadConfig::default();
        config.storage.output_dir = dir.to_path_buf();
        config.response.mode = mode;
        config
    }

    fn upload(body: &[u8]) -> UploadRequest {
        UploadRequest {
            id: RequestId::new(),
            head: RequestHead {
                method: Method::POST,
                target: "/upload".into(),
                version: "HTTP/1.1".into(),
                headers: vec![],
            },
            body: body.to_vec(),
            remote: "127.0.0.1:5000".parse().unwrap(),
        }
    }

    #[test]
    fn xml_with_pdf_writes_two_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let sink = StorageSink::new(dir.path());
        let mut xml = b"<?xml version=\"1.0\"?><Report><Pdf>".to_vec();
        xml.extend_from_slice(PDF);
        xml.extend_from_slice(b"</Pdf></Report>");

        let report = process_upload(xml.clone(), &names(), &sink);
        assert_eq!(report.kind, PayloadKind::Xml);

        let raw = report.raw.unwrap();
        assert_eq!(raw.logical_name, "ecg_20240102_030405_abcd1234.xml");
        assert_eq!(std::fs::read(raw.destination_path).unwrap(), xml);

        let pdf = report.pdf.unwrap().unwrap();
        assert_eq!(pdf.logical_name, "ecg_20240102_030405_abcd1234_extracted.pdf");
        assert_eq!(std::fs::read(pdf.destination_path).unwrap(), PDF);
    }

    #[test]
    fn raw_pdf_upload_is_stored_once() {
        let dir = tempfile::tempdir().unwrap();
        let sink = StorageSink::new(dir.path());

        let report = process_upload(PDF.to_vec(), &names(), &sink);
        assert_eq!(report.kind, PayloadKind::Pdf);
        assert!(report.raw.is_ok());
        assert!(report.pdf.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn malformed_embedding_still_stores_raw() {
        let dir = tempfile::tempdir().unwrap();
        let sink = StorageSink::new(dir.path());

        let report = process_upload(b"<?xml version=\"1.0\"?><S>JVBERi0xLjQKJSVFT0Y=bad</S>".to_vec(), &names(), &sink);
        assert!(report.raw.is_ok());
        assert!(report.pdf.is_none());
        assert!(report.malformed.is_some());
    }

    #[tokio::test]
    async fn compatibility_mode_hides_storage_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(&dir.path().join("missing"), ResponseMode::Compatibility);
        let response = Dispatcher::new(&config).dispatch(upload(b"<Report>1</Report>")).await;
        assert_eq!(response, format_success());
    }

    #[tokio::test]
    async fn strict_mode_reports_storage_failure() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(&dir.path().join("missing"), ResponseMode::Strict);
        let response = Dispatcher::new(&config).dispatch(upload(b"<Report>1</Report>")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.body(), FAILURE_BODY.as_bytes());
    }

    #[tokio::test]
    async fn empty_body_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_for(dir.path(), ResponseMode::Compatibility);
        let response = Dispatcher::new(&config).dispatch(upload(b"")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.body(), b"No content");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
