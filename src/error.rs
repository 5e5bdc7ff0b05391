//! Failure taxonomy.
//!
//! Extraction and storage failures are recovered where they happen and only
//! logged. Protocol failures become an error-status device response with the
//! usual header shape. Transport failures end the connection task.

use std::io;

use hyper::{Method, StatusCode};
use thiserror::Error;

use crate::extract::ExtractionError;
use crate::storage::StorageError;

/// The request could not be served as sent.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed request line")]
    MalformedRequestLine,

    #[error("malformed header line")]
    MalformedHeader,

    #[error("request head exceeds {limit} bytes")]
    HeadersTooLarge { limit: usize },

    #[error("invalid Content-Length")]
    InvalidContentLength,

    #[error("invalid chunked encoding")]
    InvalidChunk,

    #[error("body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },

    #[error("request has no body")]
    EmptyBody,

    #[error("method {0} is not supported")]
    MethodNotAllowed(Method),

    #[error("missing or invalid credentials")]
    Unauthorized,
}

impl ProtocolError {
    /// Status line sent back to the device.
    pub fn status(&self) -> StatusCode {
        match self {
            ProtocolError::MalformedRequestLine
            | ProtocolError::MalformedHeader
            | ProtocolError::InvalidContentLength
            | ProtocolError::InvalidChunk
            | ProtocolError::EmptyBody => StatusCode::BAD_REQUEST,
            ProtocolError::HeadersTooLarge { .. } => StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
            ProtocolError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProtocolError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            ProtocolError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    /// Short plain-text body sent back to the device.
    pub fn message(&self) -> &'static str {
        match self {
            ProtocolError::EmptyBody => "No content",
            ProtocolError::Unauthorized => "Unauthorized",
            ProtocolError::MethodNotAllowed(_) => "Method Not Allowed",
            ProtocolError::HeadersTooLarge { .. } => "Request headers too large",
            ProtocolError::BodyTooLarge { .. } => "Upload too large",
            _ => "Bad Request",
        }
    }
}

/// Any failure while serving one upload connection.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
}
