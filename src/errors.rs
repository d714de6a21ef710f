use actix_web::{
    error,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use derive_more::Display;
use log::error;
use serde::Serialize;

use crate::models::JoinRejection;

#[derive(Debug, Display, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[display(fmt = "{}", _0)]
    BadRequest(String),

    #[display(fmt = "{}", _0)]
    Unauthorized(String),

    #[display(fmt = "{}", _0)]
    Forbidden(String),

    #[display(fmt = "{}", _0)]
    NotFound(String),

    #[display(fmt = "{}", _0)]
    Internal(String),
}

impl std::error::Error for ApiError {}

/// Body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorMessage {
    pub message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Forbidden(msg.into())
    }

    /// Wraps a persistence failure as a 500, echoing its message after `context`.
    pub fn internal(context: &str, err: impl std::fmt::Display) -> Self {
        ApiError::Internal(format!("{context}: {err}"))
    }
}

impl error::ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        if let ApiError::Internal(msg) = self {
            error!("INTERNAL SERVER ERROR: {}", msg);
        }
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(ErrorMessage {
                message: self.to_string(),
            })
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JoinRejection> for ApiError {
    fn from(rejection: JoinRejection) -> Self {
        match rejection {
            JoinRejection::AlreadyOpen => ApiError::bad_request("Event is already open"),
            JoinRejection::AlreadyJoined => ApiError::bad_request("User already joined"),
            JoinRejection::InvalidCode => ApiError::Unauthorized("Invalid access code".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{body::to_bytes, ResponseError};

    #[actix_rt::test]
    async fn error_body_is_json_message() {
        let err = ApiError::not_found("Event not found");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let body = to_bytes(err.error_response().into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Event not found");
    }

    #[test]
    fn join_rejections_map_to_statuses() {
        assert_eq!(
            ApiError::from(JoinRejection::AlreadyOpen).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(JoinRejection::AlreadyJoined).to_string(),
            "User already joined"
        );
        assert_eq!(
            ApiError::from(JoinRejection::InvalidCode).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn internal_errors_echo_the_cause() {
        let err = ApiError::internal("Server error fetching events", "connection reset");
        assert_eq!(err.to_string(), "Server error fetching events: connection reset");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
