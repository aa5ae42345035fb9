#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use resource_engine::{app_router, weather_model, AppState, MemoryStore, ResolvedModel, ResourceModel, StoreDriver};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

pub fn app_with(store: Arc<dyn StoreDriver>, models: Vec<ResourceModel>) -> Router {
    let model = ResolvedModel::new(models).unwrap();
    app_router(AppState::new(store, model))
}

pub fn weather_app() -> Router {
    app_with(Arc::new(MemoryStore::new()), vec![weather_model().unwrap()])
}

pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = body.map(|v| v.to_string());
    send_raw(app, method, uri, body).await
}

pub async fn send_raw(app: &Router, method: Method, uri: &str, body: Option<String>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(b) => {
            req = req.header(header::CONTENT_TYPE, "application/json");
            Body::from(b)
        }
        None => Body::empty(),
    };
    let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

pub fn london() -> Value {
    json!({
        "city": "London",
        "country": "UK",
        "temperature": 20.5,
        "humidity": 65.0,
        "description": "Partly cloudy",
        "wind_speed": 5.2,
        "recorded_at": "2025-09-16T12:00:00.000Z"
    })
}

pub fn observation(city: &str, country: &str, description: &str, recorded_at: &str) -> Value {
    json!({
        "city": city,
        "country": country,
        "temperature": 18.0,
        "humidity": 70,
        "description": description,
        "wind_speed": 3.0,
        "recorded_at": recorded_at
    })
}
