pub mod handlers;
pub mod model;
pub mod parser;
pub mod prompt;
pub mod repo;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub use repo::{PgPlanStore, PlanStore};
pub use services::PlanGenerator;

pub fn router() -> Router<AppState> {
    handlers::plan_routes()
}
