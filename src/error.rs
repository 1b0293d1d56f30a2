//! Unified API error model and HTTP envelope mapping.
//! Every handler failure is reduced to one of these variants before it reaches
//! the client; the client only ever sees `{ "success": false, "message": ... }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Missing or malformed request fields.
    Validation { message: String },
    /// The request conflicts with existing state (duplicate email).
    Conflict { message: String },
    /// Unknown email or wrong password. Deliberately carries a single fixed
    /// message so the two cases cannot be told apart.
    InvalidCredentials,
    /// Missing, invalid, or expired token, or the referenced user is gone.
    Authorization { message: String },
    /// Anything unexpected. The cause is logged server-side; the client gets
    /// only the generic message.
    Internal { message: String },
}

impl ApiError {
    pub fn validation<S: Into<String>>(msg: S) -> Self { ApiError::Validation { message: msg.into() } }
    pub fn conflict<S: Into<String>>(msg: S) -> Self { ApiError::Conflict { message: msg.into() } }
    pub fn authorization<S: Into<String>>(msg: S) -> Self { ApiError::Authorization { message: msg.into() } }
    pub fn internal<S: Into<String>>(msg: S) -> Self { ApiError::Internal { message: msg.into() } }

    pub fn message(&self) -> &str {
        match self {
            ApiError::Validation { message }
            | ApiError::Conflict { message }
            | ApiError::Authorization { message }
            | ApiError::Internal { message } => message.as_str(),
            ApiError::InvalidCredentials => "Invalid credentials",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } | ApiError::Conflict { .. } => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::Authorization { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({ "success": false, "message": self.message() });
        (self.http_status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(ApiError::validation("missing fields").http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::conflict("dup").http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidCredentials.http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::authorization("no token").http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::internal("boom").http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_credentials_message_is_fixed() {
        assert_eq!(ApiError::InvalidCredentials.message(), "Invalid credentials");
    }

    #[test]
    fn envelope_shape() {
        let resp = ApiError::authorization("Not authorized, no token").into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
