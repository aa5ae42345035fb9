//! Field-level type and constraint definitions for a resource.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Primitive type of a field as seen on the wire and in the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Integer,
    Float,
    String,
    Boolean,
    /// RFC 3339 string on the wire, `timestamptz` in PostgreSQL.
    Timestamp,
}

impl FieldType {
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Timestamp => "timestamp",
        }
    }

    /// PostgreSQL type used for casts and table bootstrap.
    pub fn pg_type(&self) -> &'static str {
        match self {
            FieldType::Integer => "bigint",
            FieldType::Float => "double precision",
            FieldType::String => "text",
            FieldType::Boolean => "boolean",
            FieldType::Timestamp => "timestamptz",
        }
    }
}

/// Format constraint applied to string values.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringFormat {
    /// ISO-8601 / RFC 3339 datetime, stored in canonical UTC millisecond form.
    DateTime,
    Email,
    Uuid,
}

#[derive(Clone, Debug)]
pub struct FieldSpec {
    pub name: String,
    pub ty: FieldType,
    /// Set by the resource model from its primary key list.
    pub primary_key: bool,
    pub required: bool,
    pub nullable: bool,
    pub unique: bool,
    /// Inclusive numeric bounds.
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    /// String length bounds, counted in characters.
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub format: Option<StringFormat>,
    pub pattern: Option<Regex>,
    pub allowed: Option<Vec<Value>>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        FieldSpec {
            name: name.into(),
            ty,
            primary_key: false,
            required: true,
            nullable: false,
            unique: false,
            minimum: None,
            maximum: None,
            min_length: None,
            max_length: None,
            format: None,
            pattern: None,
            allowed: None,
        }
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Float)
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn timestamp(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Timestamp)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn min(mut self, v: f64) -> Self {
        self.minimum = Some(v);
        self
    }

    pub fn max(mut self, v: f64) -> Self {
        self.maximum = Some(v);
        self
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.min_length = Some(n);
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.max_length = Some(n);
        self
    }

    pub fn format(mut self, format: StringFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn pattern(mut self, re: Regex) -> Self {
        self.pattern = Some(re);
        self
    }

    pub fn allowed(mut self, values: Vec<Value>) -> Self {
        self.allowed = Some(values);
        self
    }
}

/// Ordered set of field specifications. Field order is declaration order and drives
/// column order in queries and validation error order.
#[derive(Clone, Debug, Default)]
pub struct SchemaDescriptor {
    fields: Vec<FieldSpec>,
}

impl SchemaDescriptor {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        SchemaDescriptor { fields }
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Reduced descriptor holding only `names`, in declaration order. Unknown names are skipped.
    pub fn project<S: AsRef<str>>(&self, names: &[S]) -> SchemaDescriptor {
        let fields = self
            .fields
            .iter()
            .filter(|f| names.iter().any(|n| n.as_ref() == f.name))
            .cloned()
            .collect();
        SchemaDescriptor { fields }
    }

    pub(crate) fn fields_mut(&mut self) -> &mut [FieldSpec] {
        &mut self.fields
    }
}
