//! HTTP error mapping.

use crate::error::{ErrorKind, Stage, StampError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::net::SocketAddr;
use thiserror::Error;

/// Errors from starting or running the listener.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid listen address '{0}'")]
    InvalidAddress(String),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// How an error body is rendered: the JSON API returns `{"error": ..}`, the
/// form endpoint returns the bare message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Json,
    Text,
}

/// A failed request, ready to be turned into a response.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub format: BodyFormat,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, format: BodyFormat) -> Self {
        Self {
            status,
            message: message.into(),
            format,
        }
    }

    /// Map a pipeline failure to a status and a client-facing message.
    ///
    /// Input errors keep their own text; processing errors are reported by
    /// stage only, the details stay in the log.
    pub fn from_pipeline(err: &StampError, format: BodyFormat) -> Self {
        match err.kind() {
            ErrorKind::InvalidInput => Self::new(StatusCode::BAD_REQUEST, err.to_string(), format),
            ErrorKind::Processing => {
                let message = match err.stage() {
                    Stage::Ingest => "Failed to store upload",
                    Stage::Annotate => "Failed to process image",
                    Stage::Export => "Failed to convert image to PDF",
                    Stage::Setup => "Internal Server Error",
                };
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, format)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.format {
            BodyFormat::Json => {
                (self.status, Json(json!({ "error": self.message }))).into_response()
            }
            BodyFormat::Text => (self.status, self.message).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn input_errors_are_400_with_own_message() {
        let e = ApiError::from_pipeline(&StampError::MissingFile, BodyFormat::Json);
        assert_eq!(e.status, StatusCode::BAD_REQUEST);
        assert_eq!(e.message, "No file uploaded");

        let e = ApiError::from_pipeline(&StampError::EmptyFilename, BodyFormat::Text);
        assert_eq!(e.message, "No selected file");
    }

    #[test]
    fn processing_errors_are_500_by_stage() {
        let e = ApiError::from_pipeline(
            &StampError::PdfWriteFailed {
                path: PathBuf::from("pdfs/x.pdf"),
                detail: "disk full".into(),
            },
            BodyFormat::Json,
        );
        assert_eq!(e.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.message, "Failed to convert image to PDF");

        let e = ApiError::from_pipeline(
            &StampError::StagingWriteFailed {
                path: PathBuf::from("uploads/x.png"),
                source: std::io::Error::other("read-only"),
            },
            BodyFormat::Json,
        );
        assert_eq!(e.message, "Failed to store upload");
    }
}
