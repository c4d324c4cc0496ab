use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use crate::state::AppState;

pub mod dto;
pub mod handler;

pub fn router(upload_limit: usize) -> Router<AppState> {
    Router::new()
        .route("/upload", post(handler::upload_video))
        .layer(DefaultBodyLimit::max(upload_limit))
}
