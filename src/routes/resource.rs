//! Per-resource CRUD routes, one nested router per resolved resource.

use crate::handlers::resource::{create, delete, list, read, update};
use crate::state::{AppState, ResourceState};
use axum::{routing::get, Router};
use tower_http::limit::RequestBodyLimitLayer;

/// `GET|POST /<path>` and `GET|PUT|DELETE /<path>/:id` for every resource in the model.
pub fn resource_routes(state: AppState) -> Router {
    let mut router = Router::new();
    for resource in state.model.resources() {
        let path = format!("/{}", resource.path());
        tracing::debug!(path = %path, table = resource.table_name(), "mounting resource");
        router = router.nest(&path, crud_router(state.for_resource(resource.clone())));
    }
    router.layer(RequestBodyLimitLayer::new(state.body_limit))
}

fn crud_router(state: ResourceState) -> Router {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(read).put(update).delete(delete))
        .with_state(state)
}
