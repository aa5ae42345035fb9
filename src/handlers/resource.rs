//! Resource CRUD handlers: list, create, read, update, delete.

use crate::error::AppError;
use crate::extractors::JsonObject;
use crate::query::ListQuery;
use crate::response::{success_many, success_one, success_one_ok};
use crate::service::CrudService;
use crate::state::ResourceState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use std::collections::HashMap;

pub async fn list(
    State(state): State<ResourceState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let query = ListQuery::from_params(&state.resource, &params, &state.pages)?;
    let rows = CrudService::list(state.store.as_ref(), &state.resource, &query).await?;
    Ok(success_many(rows, query.page, query.per_page))
}

pub async fn create(
    State(state): State<ResourceState>,
    JsonObject(body): JsonObject,
) -> Result<impl IntoResponse, AppError> {
    let row = CrudService::create(state.store.as_ref(), &state.resource, &body).await?;
    Ok(success_one(row))
}

pub async fn read(
    State(state): State<ResourceState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let row = CrudService::read(state.store.as_ref(), &state.resource, &id).await?;
    Ok(success_one_ok(row))
}

pub async fn update(
    State(state): State<ResourceState>,
    Path(id): Path<String>,
    JsonObject(body): JsonObject,
) -> Result<impl IntoResponse, AppError> {
    let row = CrudService::update(state.store.as_ref(), &state.resource, &id, &body).await?;
    Ok(success_one_ok(row))
}

pub async fn delete(
    State(state): State<ResourceState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let key = CrudService::delete(state.store.as_ref(), &state.resource, &id).await?;
    Ok(success_one_ok(key))
}
