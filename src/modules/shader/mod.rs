use axum::Router;
use axum::routing::{get, post};
use crate::state::AppState;

pub mod dto;
pub mod events;
pub mod handler;
pub mod model;
pub mod progress;
pub mod repository;
pub mod service;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/run", post(handler::run_shader))
        .route("/logs/{job}", get(handler::stream_logs))
        .route("/jobs/{job}", get(handler::get_job))
}
