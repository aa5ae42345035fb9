//! JSON object request body with envelope-shaped rejections.

use crate::error::AppError;
use async_trait::async_trait;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde_json::{Map, Value};

/// Request body that must be a single JSON object.
#[derive(Clone, Debug)]
pub struct JsonObject(pub Map<String, Value>);

#[async_trait]
impl<S> FromRequest<S> for JsonObject
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        match value {
            Value::Object(m) => Ok(JsonObject(m)),
            _ => Err(AppError::BadRequest("body must be a JSON object".into())),
        }
    }
}
