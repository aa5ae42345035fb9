//! Resource model: a schema bound to a table, its primary key, list options and serializer.

use crate::error::ConfigError;
use crate::query::LIST_PARAMS;
use crate::schema::{FieldType, Record, SchemaDescriptor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// The five generated operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Create,
    Read,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::List,
        Operation::Create,
        Operation::Read,
        Operation::Update,
        Operation::Delete,
    ];

    /// Whether the operation writes fields from a request body.
    pub fn writes_fields(&self) -> bool {
        matches!(self, Operation::Create | Operation::Update)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("asc") {
            Some(Direction::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Some(Direction::Desc)
        } else {
            None
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        OrderBy {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        OrderBy {
            field: field.into(),
            direction: Direction::Desc,
        }
    }

    /// Parse `"field"` or `"field ASC|DESC"`.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.split_whitespace();
        let field = parts.next()?;
        let direction = match parts.next() {
            Some(d) => Direction::parse(d)?,
            None => Direction::Asc,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(OrderBy {
            field: field.to_string(),
            direction,
        })
    }
}

/// Per-resource list behavior.
#[derive(Clone, Debug)]
pub struct ListOptions {
    /// String fields matched by the free-text search term.
    pub search_fields: Vec<String>,
    /// Fields accepted as exact-match query parameters.
    pub filter_fields: Vec<String>,
    pub default_order: OrderBy,
    pub default_page_size: Option<u32>,
    pub max_page_size: Option<u32>,
}

/// Custom row → response transform installed by Rust callers.
pub type Serializer = Arc<dyn Fn(Record) -> Value + Send + Sync>;

/// Immutable binding of a schema to a table. Built once per resource and shared.
#[derive(Clone)]
pub struct ResourceModel {
    path: String,
    table_name: String,
    primary_keys: Vec<String>,
    schema: SchemaDescriptor,
    /// Operation → fields a request body may set.
    writable: HashMap<Operation, SchemaDescriptor>,
    no_fields: SchemaDescriptor,
    list: ListOptions,
    hidden: HashSet<String>,
    rename: HashMap<String, String>,
    serializer: Option<Serializer>,
}

impl fmt::Debug for ResourceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceModel")
            .field("path", &self.path)
            .field("table_name", &self.table_name)
            .field("primary_keys", &self.primary_keys)
            .field("schema", &self.schema)
            .field("list", &self.list)
            .finish_non_exhaustive()
    }
}

impl ResourceModel {
    pub fn builder(path: impl Into<String>, schema: SchemaDescriptor) -> ResourceModelBuilder {
        let path = path.into();
        ResourceModelBuilder {
            table: path.clone(),
            path,
            schema,
            primary_keys: Vec::new(),
            search_fields: Vec::new(),
            filter_fields: Vec::new(),
            default_order: None,
            hidden: Vec::new(),
            rename: HashMap::new(),
            serializer: None,
            default_page_size: None,
            max_page_size: None,
        }
    }

    /// URL path segment the resource is mounted under.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    pub fn schema(&self) -> &SchemaDescriptor {
        &self.schema
    }

    pub fn list_options(&self) -> &ListOptions {
        &self.list
    }

    /// Fields a request body may set for `op`. Empty for operations that take no body.
    pub fn fields_for(&self, op: Operation) -> &SchemaDescriptor {
        self.writable.get(&op).unwrap_or(&self.no_fields)
    }

    pub fn is_primary_key(&self, name: &str) -> bool {
        self.primary_keys.iter().any(|k| k == name)
    }

    /// Stored row → response object: hidden fields stripped, renames applied, then the
    /// custom serializer if one is installed.
    pub fn serialize(&self, mut row: Record) -> Value {
        if !self.hidden.is_empty() {
            row.retain(|k, _| !self.hidden.contains(k));
        }
        if !self.rename.is_empty() {
            row = row
                .into_iter()
                .map(|(k, v)| match self.rename.get(&k) {
                    Some(to) => (to.clone(), v),
                    None => (k, v),
                })
                .collect();
        }
        match &self.serializer {
            Some(f) => f(row),
            None => Value::Object(row),
        }
    }

    /// Name a stored field is exposed under in responses.
    pub fn response_name<'a>(&'a self, field: &'a str) -> &'a str {
        self.rename.get(field).map(String::as_str).unwrap_or(field)
    }
}

pub struct ResourceModelBuilder {
    path: String,
    table: String,
    schema: SchemaDescriptor,
    primary_keys: Vec<String>,
    search_fields: Vec<String>,
    filter_fields: Vec<String>,
    default_order: Option<OrderBy>,
    hidden: Vec<String>,
    rename: HashMap<String, String>,
    serializer: Option<Serializer>,
    default_page_size: Option<u32>,
    max_page_size: Option<u32>,
}

impl ResourceModelBuilder {
    /// Table name; defaults to the path segment.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_keys = vec![field.into()];
        self
    }

    pub fn primary_keys<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_keys = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn filter_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_order(mut self, order: OrderBy) -> Self {
        self.default_order = Some(order);
        self
    }

    pub fn hidden<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hidden = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.rename.insert(from.into(), to.into());
        self
    }

    pub fn serializer<F>(mut self, f: F) -> Self
    where
        F: Fn(Record) -> Value + Send + Sync + 'static,
    {
        self.serializer = Some(Arc::new(f));
        self
    }

    pub fn page_size(mut self, default: Option<u32>, max: Option<u32>) -> Self {
        self.default_page_size = default;
        self.max_page_size = max;
        self
    }

    pub fn build(mut self) -> Result<ResourceModel, ConfigError> {
        let path = self.path.clone();
        if path.is_empty()
            || !path
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ConfigError::Validation(format!("invalid resource path '{}'", path)));
        }
        if self.table.is_empty() {
            return Err(ConfigError::Validation(format!("resource '{}' has an empty table name", path)));
        }

        let mut seen = HashSet::new();
        for f in self.schema.fields() {
            if !seen.insert(f.name.as_str()) {
                return Err(ConfigError::DuplicateField {
                    resource: path,
                    field: f.name.clone(),
                });
            }
            if let (Some(min), Some(max)) = (f.minimum, f.maximum) {
                if min > max {
                    return Err(ConfigError::Validation(format!(
                        "{}.{}: minimum {} exceeds maximum {}",
                        path, f.name, min, max
                    )));
                }
            }
            if let (Some(min), Some(max)) = (f.min_length, f.max_length) {
                if min > max {
                    return Err(ConfigError::Validation(format!(
                        "{}.{}: min_length {} exceeds max_length {}",
                        path, f.name, min, max
                    )));
                }
            }
        }

        if self.primary_keys.is_empty() {
            return Err(ConfigError::EmptyPrimaryKey(path));
        }
        for pk in &self.primary_keys {
            let field = self.schema.field(pk).ok_or_else(|| ConfigError::InvalidPrimaryKey {
                resource: path.clone(),
                column: pk.clone(),
            })?;
            if !matches!(field.ty, FieldType::Integer | FieldType::String) {
                return Err(ConfigError::InvalidPrimaryKey {
                    resource: path.clone(),
                    column: pk.clone(),
                });
            }
        }
        for f in self.schema.fields_mut() {
            f.primary_key = self.primary_keys.contains(&f.name);
        }

        for name in &self.search_fields {
            let field = self.schema.field(name).ok_or_else(|| ConfigError::MissingReference {
                kind: "search field",
                id: format!("{}.{}", path, name),
            })?;
            if field.ty != FieldType::String {
                return Err(ConfigError::InvalidSearchField {
                    resource: path.clone(),
                    field: name.clone(),
                });
            }
        }
        for (kind, names) in [("filter field", &self.filter_fields), ("hidden field", &self.hidden)] {
            for name in names {
                if !self.schema.contains(name) {
                    return Err(ConfigError::MissingReference {
                        kind,
                        id: format!("{}.{}", path, name),
                    });
                }
            }
        }
        for name in self.rename.keys() {
            if !self.schema.contains(name) {
                return Err(ConfigError::MissingReference {
                    kind: "renamed field",
                    id: format!("{}.{}", path, name),
                });
            }
        }
        for name in &self.filter_fields {
            if LIST_PARAMS.contains(&name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "{}.{}: filter field collides with the list parameter of the same name",
                    path, name
                )));
            }
        }
        let mut response_names: HashMap<&str, &str> = HashMap::new();
        for f in self.schema.fields().iter().filter(|f| !self.hidden.contains(&f.name)) {
            let exposed = self.rename.get(&f.name).map(String::as_str).unwrap_or(f.name.as_str());
            if let Some(other) = response_names.insert(exposed, f.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "{}: fields {} and {} are both exposed as '{}'",
                    path, other, f.name, exposed
                )));
            }
        }

        let default_order = match self.default_order.take() {
            Some(order) => {
                if !self.schema.contains(&order.field) {
                    return Err(ConfigError::MissingReference {
                        kind: "order field",
                        id: format!("{}.{}", path, order.field),
                    });
                }
                order
            }
            None => OrderBy::asc(self.primary_keys[0].clone()),
        };

        match (self.default_page_size, self.max_page_size) {
            (Some(0), _) | (_, Some(0)) => {
                return Err(ConfigError::Validation(format!("{}: page sizes must be positive", path)));
            }
            (Some(d), Some(m)) if d > m => {
                return Err(ConfigError::Validation(format!(
                    "{}: default page size {} exceeds max {}",
                    path, d, m
                )));
            }
            _ => {}
        }

        let writable_names: Vec<&str> = self
            .schema
            .fields()
            .iter()
            .filter(|f| !f.primary_key)
            .map(|f| f.name.as_str())
            .collect();
        let writable_schema = self.schema.project(&writable_names);
        let writable: HashMap<Operation, SchemaDescriptor> = Operation::ALL
            .iter()
            .filter(|op| op.writes_fields())
            .map(|op| (*op, writable_schema.clone()))
            .collect();

        Ok(ResourceModel {
            path: self.path,
            table_name: self.table,
            primary_keys: self.primary_keys,
            schema: self.schema,
            writable,
            no_fields: SchemaDescriptor::default(),
            list: ListOptions {
                search_fields: self.search_fields,
                filter_fields: self.filter_fields,
                default_order,
                default_page_size: self.default_page_size,
                max_page_size: self.max_page_size,
            },
            hidden: self.hidden.into_iter().collect(),
            rename: self.rename,
            serializer: self.serializer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use serde_json::json;

    fn schema() -> SchemaDescriptor {
        SchemaDescriptor::new(vec![
            FieldSpec::integer("id"),
            FieldSpec::string("name"),
            FieldSpec::integer("age").min(0.0),
            FieldSpec::string("secret").optional(),
        ])
    }

    #[test]
    fn writable_fields_exclude_primary_key() {
        let model = ResourceModel::builder("people", schema())
            .primary_key("id")
            .build()
            .unwrap();
        let create: Vec<_> = model.fields_for(Operation::Create).names().collect();
        let update: Vec<_> = model.fields_for(Operation::Update).names().collect();
        assert_eq!(create, vec!["name", "age", "secret"]);
        assert_eq!(create, update);
        assert!(model.fields_for(Operation::Read).is_empty());
        assert!(model.schema().field("id").unwrap().primary_key);
    }

    #[test]
    fn default_order_falls_back_to_primary_key() {
        let model = ResourceModel::builder("people", schema())
            .primary_key("id")
            .build()
            .unwrap();
        assert_eq!(model.list_options().default_order, OrderBy::asc("id"));
        assert_eq!(model.table_name(), "people");
    }

    #[test]
    fn rejects_missing_primary_key() {
        let err = ResourceModel::builder("people", schema()).build().unwrap_err();
        assert!(matches!(err, ConfigError::EmptyPrimaryKey(_)));
        let err = ResourceModel::builder("people", schema())
            .primary_key("uid")
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPrimaryKey { .. }));
    }

    #[test]
    fn rejects_non_string_search_field() {
        let err = ResourceModel::builder("people", schema())
            .primary_key("id")
            .search_fields(["age"])
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSearchField { .. }));
    }

    #[test]
    fn rejects_unknown_order_field() {
        let err = ResourceModel::builder("people", schema())
            .primary_key("id")
            .default_order(OrderBy::desc("created"))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingReference { kind: "order field", .. }));
    }

    #[test]
    fn serializer_strips_hidden_and_renames() {
        let model = ResourceModel::builder("people", schema())
            .primary_key("id")
            .hidden(["secret"])
            .rename("name", "full_name")
            .build()
            .unwrap();
        let row = json!({"id": 1, "name": "Ada", "age": 36, "secret": "x"});
        let Value::Object(row) = row else { unreachable!() };
        assert_eq!(model.serialize(row), json!({"id": 1, "full_name": "Ada", "age": 36}));
    }

    #[test]
    fn custom_serializer_runs_last() {
        let model = ResourceModel::builder("people", schema())
            .primary_key("id")
            .serializer(|row| json!({ "person": row }))
            .build()
            .unwrap();
        let Value::Object(row) = json!({"id": 1}) else { unreachable!() };
        assert_eq!(model.serialize(row), json!({"person": {"id": 1}}));
    }

    #[test]
    fn rename_targets_must_stay_distinct() {
        let onto_key = ResourceModel::builder("people", schema())
            .primary_key("id")
            .rename("name", "id")
            .build();
        assert!(matches!(onto_key, Err(ConfigError::Validation(_))));

        let twice = ResourceModel::builder("people", schema())
            .primary_key("id")
            .rename("name", "label")
            .rename("age", "label")
            .build();
        assert!(matches!(twice, Err(ConfigError::Validation(_))));

        let swapped = ResourceModel::builder("people", schema())
            .primary_key("id")
            .rename("name", "age")
            .rename("age", "name")
            .build();
        assert!(swapped.is_ok());

        let onto_hidden = ResourceModel::builder("people", schema())
            .primary_key("id")
            .hidden(["secret"])
            .rename("name", "secret")
            .build();
        assert!(onto_hidden.is_ok());
    }

    #[test]
    fn filter_fields_cannot_shadow_list_parameters() {
        let schema = SchemaDescriptor::new(vec![FieldSpec::integer("id"), FieldSpec::integer("page")]);
        let err = ResourceModel::builder("books", schema.clone())
            .primary_key("id")
            .filter_fields(["page"])
            .build();
        assert!(matches!(err, Err(ConfigError::Validation(_))));
        assert!(ResourceModel::builder("books", schema).primary_key("id").build().is_ok());
    }

    #[test]
    fn order_by_parse() {
        assert_eq!(OrderBy::parse("recorded_at DESC"), Some(OrderBy::desc("recorded_at")));
        assert_eq!(OrderBy::parse("city"), Some(OrderBy::asc("city")));
        assert_eq!(OrderBy::parse("city sideways"), None);
        assert_eq!(OrderBy::parse(""), None);
    }
}
