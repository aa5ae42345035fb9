//! Standard response envelope helpers.

use crate::service::FieldError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// `{ success, result, errors }` returned by every operation. `success` implies no errors;
/// failure implies a null result.
#[derive(Serialize, Debug)]
pub struct Envelope<T> {
    pub success: bool,
    pub result: Option<T>,
    pub errors: Vec<ErrorEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_info: Option<ResultInfo>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ErrorEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorEntry {
    pub fn new(code: &str, message: String) -> Self {
        ErrorEntry {
            code: Some(code.to_string()),
            message,
            field: None,
        }
    }
}

impl From<&FieldError> for ErrorEntry {
    fn from(e: &FieldError) -> Self {
        ErrorEntry {
            code: Some(e.code.as_str().to_string()),
            message: e.message.clone(),
            field: Some(e.field.clone()),
        }
    }
}

/// Window metadata attached to list responses.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct ResultInfo {
    pub page: u32,
    pub per_page: u32,
    pub count: u64,
}

pub fn success_one<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    (
        StatusCode::CREATED,
        Json(Envelope {
            success: true,
            result: Some(data),
            errors: Vec::new(),
            result_info: None,
        }),
    )
}

pub fn success_one_ok<T: Serialize>(data: T) -> (StatusCode, Json<Envelope<T>>) {
    (
        StatusCode::OK,
        Json(Envelope {
            success: true,
            result: Some(data),
            errors: Vec::new(),
            result_info: None,
        }),
    )
}

pub fn success_many<T: Serialize>(data: Vec<T>, page: u32, per_page: u32) -> (StatusCode, Json<Envelope<Vec<T>>>) {
    let count = data.len() as u64;
    (
        StatusCode::OK,
        Json(Envelope {
            success: true,
            result: Some(data),
            errors: Vec::new(),
            result_info: Some(ResultInfo { page, per_page, count }),
        }),
    )
}

pub fn failure(status: StatusCode, errors: Vec<ErrorEntry>) -> Response {
    let body: Envelope<()> = Envelope {
        success: false,
        result: None,
        errors,
        result_info: None,
    };
    (status, Json(body)).into_response()
}
