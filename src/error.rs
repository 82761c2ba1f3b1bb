use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ErrorResponse;

/// User-correctable input failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputErrorKind {
    EmptyDocument,
    InvalidEncoding,
    DocumentTooLarge,
    UnsupportedFormat,
    MalformedDocument,
    InvalidRequest,
}

impl InputErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InputErrorKind::EmptyDocument => "EmptyDocument",
            InputErrorKind::InvalidEncoding => "InvalidEncoding",
            InputErrorKind::DocumentTooLarge => "DocumentTooLarge",
            InputErrorKind::UnsupportedFormat => "UnsupportedFormat",
            InputErrorKind::MalformedDocument => "MalformedDocument",
            InputErrorKind::InvalidRequest => "InvalidRequest",
        }
    }
}

/// External dependencies whose failure ends the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    EmbeddingFailed,
    RetrievalUnavailable,
}

impl DependencyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKind::EmbeddingFailed => "EmbeddingFailed",
            DependencyKind::RetrievalUnavailable => "RetrievalUnavailable",
        }
    }
}

/// Terminal pipeline failure.
///
/// Degraded stages are not errors; they surface as `StageOutcome::Degraded`
/// and are reported in the response metadata instead.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("{message}")]
    Input { kind: InputErrorKind, message: String },

    #[error("{message}")]
    Dependency { kind: DependencyKind, message: String },
}

impl MatchError {
    pub fn input(kind: InputErrorKind, message: impl Into<String>) -> Self {
        MatchError::Input {
            kind,
            message: message.into(),
        }
    }

    pub fn dependency(kind: DependencyKind, message: impl Into<String>) -> Self {
        MatchError::Dependency {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::input(InputErrorKind::InvalidRequest, message)
    }

    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            MatchError::Input { kind, .. } => kind.as_str(),
            MatchError::Dependency { kind, .. } => kind.as_str(),
        }
    }

    pub fn is_input_error(&self) -> bool {
        matches!(self, MatchError::Input { .. })
    }
}

impl ResponseError for MatchError {
    fn status_code(&self) -> StatusCode {
        match self {
            MatchError::Input {
                kind: InputErrorKind::DocumentTooLarge,
                ..
            } => StatusCode::PAYLOAD_TOO_LARGE,
            MatchError::Input { .. } => StatusCode::BAD_REQUEST,
            MatchError::Dependency {
                kind: DependencyKind::EmbeddingFailed,
                ..
            } => StatusCode::BAD_GATEWAY,
            MatchError::Dependency {
                kind: DependencyKind::RetrievalUnavailable,
                ..
            } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if !self.is_input_error() {
            tracing::error!("Request failed ({}): {}", self.kind(), self);
        }
        HttpResponse::build(status).json(ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}
