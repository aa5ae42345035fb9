//! Raw resource config types matching the JSON resource file.

use crate::schema::{FieldType, StringFormat};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKeyConfig {
    Single(String),
    Composite(Vec<String>),
}

impl PrimaryKeyConfig {
    pub fn columns(&self) -> Vec<String> {
        match self {
            PrimaryKeyConfig::Single(s) => vec![s.clone()],
            PrimaryKeyConfig::Composite(v) => v.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: FieldType,
    #[serde(default = "default_true")]
    pub required: bool,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub format: Option<StringFormat>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSizeConfig {
    #[serde(default)]
    pub default: Option<u32>,
    #[serde(default)]
    pub max: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// URL path segment, e.g. `weather`.
    pub path: String,
    /// Table name; defaults to `path`. May be schema-qualified (`app.weather`).
    #[serde(default)]
    pub table: Option<String>,
    pub primary_key: PrimaryKeyConfig,
    pub fields: Vec<FieldConfig>,
    #[serde(default)]
    pub search_fields: Vec<String>,
    #[serde(default)]
    pub filter_fields: Vec<String>,
    /// `"<field> [ASC|DESC]"`.
    #[serde(default)]
    pub default_order: Option<String>,
    /// Fields never exposed in responses.
    #[serde(default)]
    pub hidden: Vec<String>,
    /// Stored name → response name.
    #[serde(default)]
    pub rename: BTreeMap<String, String>,
    #[serde(default)]
    pub page_size: Option<PageSizeConfig>,
}
