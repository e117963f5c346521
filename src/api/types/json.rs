//! JSON extractor whose rejections use the API error envelope

use axum::{
    extract::{rejection::JsonRejection as AxumRejection, FromRequest, Request},
    response::{IntoResponse, Response},
    Json as AxumJson,
};
use serde::de::DeserializeOwned;

use super::error::ApiError;

/// Drop-in for `axum::Json`; malformed bodies become `ApiError`s
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        AxumJson::<T>::from_request(req, state)
            .await
            .map(|AxumJson(value)| Json(value))
            .map_err(|rejection| rejection_error(&rejection))
    }
}

fn rejection_error(rejection: &AxumRejection) -> ApiError {
    let (message, code) = match rejection {
        AxumRejection::JsonDataError(err) => (
            format!("Invalid request body: {}", err.body_text()),
            "invalid_body",
        ),
        AxumRejection::JsonSyntaxError(err) => (
            format!("Invalid JSON syntax: {}", err.body_text()),
            "json_parse_error",
        ),
        AxumRejection::MissingJsonContentType(_) => (
            "Missing Content-Type header. Expected 'application/json'.".to_string(),
            "missing_content_type",
        ),
        AxumRejection::BytesRejection(err) => (
            format!("Failed to read request body: {}", err.body_text()),
            "body_read_error",
        ),
        _ => ("Invalid JSON request".to_string(), "json_parse_error"),
    };

    let mut error = ApiError::bad_request(message).with_code(code);
    error.status = rejection.status();
    error
}

impl<T> IntoResponse for Json<T>
where
    T: serde::Serialize,
{
    fn into_response(self) -> Response {
        AxumJson(self.0).into_response()
    }
}
