use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use super::dto::UploadResponse;
use crate::common::response::{ApiError, ApiResponse, ApiSuccess};
use crate::common::upload::stream_to_file;
use crate::infrastructure::storage::local::LocalStorage;
use crate::state::AppState;

/// Upload a source video
/// Streams the `video` field to the upload directory
#[utoipa::path(
    post,
    path = "/api/v1/upload",
    request_body(content = String, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Upload successful", body = ApiResponse<UploadResponse>),
        (status = 400, description = "Bad Request"),
        (status = 500, description = "Internal Server Error")
    ),
    tag = "Media"
)]
pub async fn upload_video(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    while let Some(field) = multipart.next_field().await.unwrap_or(None) {
        if field.name() != Some("video") {
            continue;
        }

        let client_name = field.file_name().unwrap_or("video.mp4").to_string();
        let name = LocalStorage::upload_name(&client_name);
        let dest = state.storage.upload_dir.join(&name);
        info!("Starting upload: {} -> {}", client_name, name);

        return match stream_to_file(field, &dest).await {
            Ok(_) => ApiSuccess(
                ApiResponse::success(
                    UploadResponse {
                        url: format!("/uploads/{}", name),
                        filename: name,
                    },
                    "Video uploaded successfully",
                ),
                StatusCode::OK,
            )
            .into_response(),
            Err(e) => ApiError(format!("Upload failed: {}", e), StatusCode::BAD_REQUEST)
                .into_response(),
        };
    }

    ApiError("No video field found in multipart request".to_string(), StatusCode::BAD_REQUEST)
        .into_response()
}
