pub mod common;
pub mod resource;

pub use common::common_routes;
pub use resource::resource_routes;

use crate::state::AppState;
use axum::Router;

/// Common routes merged with every resource's CRUD routes.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .merge(common_routes(state.clone()))
        .merge(resource_routes(state))
}
