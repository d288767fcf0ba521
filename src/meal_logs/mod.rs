mod dto;
pub mod handlers;
pub mod model;
mod repo;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::meal_log_routes()
}
