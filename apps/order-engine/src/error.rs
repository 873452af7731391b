//! Structured errors for the HTTP surface.
//!
//! Every failure leaving the engine carries an [`ErrorCode`] that fixes its
//! HTTP status and the machine-readable `code` in the response body.
//!
//! | Code | Status | Usage |
//! |------|--------|-------|
//! | `VALIDATION_ERROR` | 400 | Missing or malformed field |
//! | `INVALID_SPECIFICATION` | 400 | Order cannot be expressed at the venue |
//! | `NOT_FOUND` | 404 | Unknown order or recommendation |
//! | `INVALID_TRANSITION` | 409 | Current order status forbids the operation |
//! | `VENUE_FAILURE` | 500 | Venue rejected or failed the request |
//! | `PARTIAL_ROLLOVER` | 500 | Prior cancelled, replacement not created |
//! | `STORAGE_ERROR` | 500 | Database failure |
//! | `NOT_CONNECTED` | 503 | No broker session |
//! | `INTERNAL_ERROR` | 500 | Anything else |

use std::collections::BTreeMap;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::LifecycleError;

/// Error codes returned to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Missing or malformed request field.
    ValidationError,
    /// The order cannot be expressed at the venue.
    InvalidSpecification,
    /// Referenced entity does not exist.
    NotFound,
    /// The order's status forbids the operation.
    InvalidTransition,
    /// No broker session.
    NotConnected,
    /// The venue refused or failed the request.
    VenueFailure,
    /// Rollover cancelled the prior order but did not create the replacement.
    PartialRollover,
    /// The store failed.
    StorageError,
    /// Unexpected failure.
    InternalError,
}

impl ErrorCode {
    /// HTTP status for this code.
    #[must_use]
    pub const fn http_status(&self) -> StatusCode {
        match self {
            Self::ValidationError | Self::InvalidSpecification => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InvalidTransition => StatusCode::CONFLICT,
            Self::NotConnected => StatusCode::SERVICE_UNAVAILABLE,
            Self::VenueFailure
            | Self::PartialRollover
            | Self::StorageError
            | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Reason string used in the response body.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::InvalidSpecification => "INVALID_SPECIFICATION",
            Self::NotFound => "NOT_FOUND",
            Self::InvalidTransition => "INVALID_TRANSITION",
            Self::NotConnected => "NOT_CONNECTED",
            Self::VenueFailure => "VENUE_FAILURE",
            Self::PartialRollover => "PARTIAL_ROLLOVER",
            Self::StorageError => "STORAGE_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reason())
    }
}

/// An error on its way to a client.
#[derive(Debug, Error)]
pub struct EngineError {
    code: ErrorCode,
    message: String,
    status: Option<StatusCode>,
    details: BTreeMap<String, String>,
}

impl EngineError {
    /// Create a new engine error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            status: None,
            details: BTreeMap::new(),
        }
    }

    /// Validation failure on a field.
    #[must_use]
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message).with_detail("field", field)
    }

    /// Add a detail entry.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Override the HTTP status implied by the code.
    #[must_use]
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    /// Error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// HTTP status of the response.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or_else(|| self.code.http_status())
    }

    /// Response body.
    #[must_use]
    pub fn to_http_response(&self) -> HttpErrorResponse {
        HttpErrorResponse {
            success: false,
            code: self.code.reason().to_string(),
            error: self.message.clone(),
            details: self.details.clone(),
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.reason(), self.message)
    }
}

impl From<LifecycleError> for EngineError {
    fn from(err: LifecycleError) -> Self {
        let message = err.to_string();
        match err {
            LifecycleError::Validation { field, .. } => {
                let error = Self::new(ErrorCode::ValidationError, message);
                match field {
                    Some(field) => error.with_detail("field", field),
                    None => error,
                }
            }
            LifecycleError::NotFound { entity, id } => Self::new(ErrorCode::NotFound, message)
                .with_detail("entity", entity)
                .with_detail("id", id),
            LifecycleError::NotConnected => Self::new(ErrorCode::NotConnected, message),
            LifecycleError::InvalidSpecification { .. } => {
                Self::new(ErrorCode::InvalidSpecification, message)
            }
            LifecycleError::VenueFailure { .. } => Self::new(ErrorCode::VenueFailure, message),
            LifecycleError::Conflict { .. } => Self::new(ErrorCode::InvalidTransition, message),
            LifecycleError::PartialRollover {
                prior_order_id,
                reason,
            } => Self::new(ErrorCode::PartialRollover, message)
                .with_detail("prior_order_id", prior_order_id.to_string())
                .with_detail("reason", reason),
            LifecycleError::Storage { .. } => Self::new(ErrorCode::StorageError, message),
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = %self.code, status = status.as_u16(), error = %self.message, "Request failed");
        } else {
            tracing::debug!(code = %self.code, status = status.as_u16(), error = %self.message, "Request rejected");
        }
        (status, Json(self.to_http_response())).into_response()
    }
}

/// HTTP error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpErrorResponse {
    /// Always false.
    pub success: bool,
    /// Error code string.
    pub code: String,
    /// Human-readable message.
    pub error: String,
    /// Additional details.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::OrderId;

    #[test]
    fn codes_map_to_http_statuses() {
        assert_eq!(ErrorCode::ValidationError.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::NotFound.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::InvalidTransition.http_status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorCode::PartialRollover.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::NotConnected.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn partial_rollover_keeps_prior_id() {
        let error = EngineError::from(LifecycleError::PartialRollover {
            prior_order_id: OrderId::new(5),
            reason: "database is locked".into(),
        });
        let body = error.to_http_response();

        assert_eq!(body.code, "PARTIAL_ROLLOVER");
        assert!(!body.success);
        assert_eq!(body.details.get("prior_order_id").map(String::as_str), Some("5"));
    }

    #[test]
    fn venue_message_is_verbatim() {
        let error = EngineError::from(LifecycleError::VenueFailure {
            message: "Order rejected - reason: No trading permissions".into(),
        });
        assert_eq!(error.message(), "Order rejected - reason: No trading permissions");
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn status_override_wins() {
        let error = EngineError::from(LifecycleError::NotConnected)
            .with_status(StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.code(), ErrorCode::NotConnected);
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn display_includes_code() {
        let error = EngineError::validation("ticker", "Missing required field: ticker");
        assert_eq!(error.to_string(), "[VALIDATION_ERROR] Missing required field: ticker");
    }
}
