//! HTTP rendering of [`FixhubError`]

use crate::error::{ErrorKind, FixhubError};
use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// JSON body of every error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// HTTP status for an error kind
///
/// - InvalidInput: 400 Bad Request
/// - Unauthenticated: 401 Unauthorized
/// - Forbidden: 403 Forbidden
/// - NotFound: 404 Not Found
/// - Conflict: 409 Conflict (retry with a fresh read)
/// - IllegalTransition: 422 Unprocessable Entity (refresh state first)
/// - Unavailable: 503 Service Unavailable
/// - Internal: 500 Internal Server Error
#[must_use]
pub const fn status_code(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::IllegalTransition => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for FixhubError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        match kind {
            ErrorKind::Unavailable | ErrorKind::Internal => {
                error!(kind = %kind, error = %self, "request failed");
            },
            _ => debug!(kind = %kind, error = %self, "request refused"),
        }

        let body = ErrorBody {
            error: kind.as_str().to_string(),
            message: self.user_message(),
        };
        let mut response = (status_code(kind), Json(body)).into_response();
        if kind == ErrorKind::Unauthenticated {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
