use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use crate::validate::Validation;

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: &'static str,
}

/// Plain status response, rendered as small JSON error document.
pub struct StatusJson(pub StatusCode);

impl IntoResponse for StatusJson {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.0.as_u16(),
            message: self.0.canonical_reason().unwrap_or("Unknown"),
        };

        (self.0, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for StatusJson {
    fn from(error: anyhow::Error) -> Self {
        error!(?error, "request failed");
        Self(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Rejected repository changes, reporting the validity of each field.
pub struct Invalid(pub Validation);

impl IntoResponse for Invalid {
    fn into_response(self) -> Response {
        (StatusCode::UNPROCESSABLE_ENTITY, Json(self.0)).into_response()
    }
}
