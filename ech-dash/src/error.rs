//! HTTP error type for ech-dash

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Unknown session or resource (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed control or query (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Work replaced by a newer request (409)
    #[error("Superseded by a newer request")]
    Superseded,

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<ech_common::Error> for ApiError {
    fn from(err: ech_common::Error) -> Self {
        use ech_common::Error as E;
        match err {
            E::Superseded => ApiError::Superseded,
            E::NotFound(msg) => ApiError::NotFound(msg),
            E::MalformedSelection(_) | E::InvalidInput(_) | E::UnknownColumn(_) => {
                ApiError::BadRequest(err.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Superseded => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_errors_map_to_status() {
        let cases = [
            (ech_common::Error::Superseded, StatusCode::CONFLICT),
            (
                ech_common::Error::MalformedSelection("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (ech_common::Error::UnknownColumn("x".into()), StatusCode::BAD_REQUEST),
            (ech_common::Error::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ech_common::Error::Load("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }
}
