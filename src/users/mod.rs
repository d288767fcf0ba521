pub mod dto;
pub mod handlers;
pub mod model;
pub mod repo;
pub mod validation;

use crate::state::AppState;
use axum::Router;

pub use model::{ActivityLevel, DietPreference, Gender, UserProfile};
pub use repo::{PgProfileStore, ProfileStore};

pub fn router() -> Router<AppState> {
    handlers::profile_routes()
}
