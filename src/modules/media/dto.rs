use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UploadResponse {
    /// Name to pass to `/api/v1/run`.
    pub filename: String,
    pub url: String,
}
