use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::modules::shader::service::SubmitError;

/// JSON envelope shared by every non-streaming endpoint.
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub status: String,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T, message: &str) -> Self {
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            data: Some(data),
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            status: "error".to_string(),
            message: message.to_string(),
            data: None,
        }
    }
}

pub struct ApiSuccess<T>(pub T, pub StatusCode);

impl<T> IntoResponse for ApiSuccess<ApiResponse<T>>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        let (response, status) = (self.0, self.1);
        (status, Json(response)).into_response()
    }
}

#[derive(Debug)]
pub struct ApiError(pub String, pub StatusCode);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (message, status) = (self.0, self.1);
        let response = ApiResponse::<()>::error(&message);
        (status, Json(response)).into_response()
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        let status = match &err {
            SubmitError::Invalid(_) => StatusCode::BAD_REQUEST,
            SubmitError::SourceNotFound(_) => StatusCode::NOT_FOUND,
            SubmitError::ShaderSupportMissing(_) | SubmitError::Staging(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        ApiError(err.to_string(), status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_errors_map_to_status_codes() {
        let cases = [
            (SubmitError::Invalid("fps".into()), StatusCode::BAD_REQUEST),
            (SubmitError::SourceNotFound("a.mp4".into()), StatusCode::NOT_FOUND),
            (
                SubmitError::ShaderSupportMissing("glfilter.js".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                SubmitError::Staging(std::io::Error::other("disk full")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).1, expected);
        }
    }
}
