use crate::state::AppState;
use axum::Router;

pub mod artifacts;
mod dto;
pub mod engine;
pub mod handlers;

pub fn router() -> Router<AppState> {
    handlers::router()
}
