//! Device-compatible responses.
//!
//! # Responsibilities
//! - Build the fixed success/error responses ECG carts accept
//! - Serialize them byte-exactly (CRLF, fixed header order)
//!
//! # Design Decisions
//! - Embedded HTTP clients reject anything but the exact header set, so
//!   the order never varies and only status, reason and Content-Length
//!   depend on the request outcome
//! - Never chunked, never keep-alive
//! - The `Server` banner imitates Apache because several carts check it;
//!   it is a compatibility shim, not a security measure

use hyper::StatusCode;

/// Body sent on every successful upload.
pub const SUCCESS_BODY: &str = "File uploaded successfully";

/// Banner the devices expect in the `Server` header.
pub const SERVER_BANNER: &str = "Apache/2.4.0";

/// Methods advertised on a CORS preflight.
pub const ALLOWED_METHODS: &str = "POST, PUT, OPTIONS";

const CONTINUE: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

/// A complete response to one device request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceResponse {
    status: StatusCode,
    reason: &'static str,
    headers: Vec<(&'static str, String)>,
    body: String,
}

impl DeviceResponse {
    fn plain(status: StatusCode, body: &str) -> Self {
        let headers = vec![
            ("Content-Type", "text/plain".to_string()),
            ("Content-Length", body.len().to_string()),
            ("Connection", "close".to_string()),
            ("Cache-Control", "no-cache".to_string()),
            ("Pragma", "no-cache".to_string()),
            ("Server", SERVER_BANNER.to_string()),
        ];
        Self {
            status,
            reason: status.canonical_reason().unwrap_or("Unknown"),
            headers,
            body: body.to_string(),
        }
    }

    fn with_header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn reason_phrase(&self) -> &str {
        self.reason
    }

    /// Headers in wire order.
    pub fn headers(&self) -> &[(&'static str, String)] {
        &self.headers
    }

    /// First header value with this (case-insensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body(&self) -> &[u8] {
        self.body.as_bytes()
    }

    /// Serialize to the exact bytes written on the socket.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status.as_u16(), self.reason);
        for (name, value) in &self.headers {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");

        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(self.body.as_bytes());
        bytes
    }
}

/// `200 OK` with the fixed success body.
pub fn format_success() -> DeviceResponse {
    DeviceResponse::plain(StatusCode::OK, SUCCESS_BODY)
}

/// Error status with the same header shape as success.
pub fn format_error(status: StatusCode, message: &str) -> DeviceResponse {
    DeviceResponse::plain(status, message)
}

/// Success response carrying permissive CORS headers.
pub fn format_preflight() -> DeviceResponse {
    format_success()
        .with_header("Access-Control-Allow-Origin", "*")
        .with_header("Access-Control-Allow-Methods", ALLOWED_METHODS)
        .with_header("Access-Control-Allow-Headers", "Authorization, Content-Type")
}

/// Interim line sent before reading a body the client is holding back
/// behind `Expect: 100-continue`. Not a final response.
pub fn format_continue() -> &'static [u8] {
    CONTINUE
}

/// `401` in the compatible shape plus a Basic challenge.
pub fn format_unauthorized(realm: &str) -> DeviceResponse {
    format_error(StatusCode::UNAUTHORIZED, "Unauthorized")
        .with_header("WWW-Authenticate", format!("Basic realm=\"{}\"", realm))
}
