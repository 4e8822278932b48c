use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;

/// Errors answered with a bare HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    BadRequest,
    Internal,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        match self {
            HttpError::BadRequest => (StatusCode::BAD_REQUEST, "bad request"),
            HttpError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
        }
        .into_response()
    }
}
