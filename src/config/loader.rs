//! Build resource models from config: in-memory structs or a JSON resources file.

use crate::config::{validate, FieldConfig, ResolvedModel, ResourceConfig};
use crate::error::ConfigError;
use crate::schema::{FieldSpec, OrderBy, ResourceModel, SchemaDescriptor};
use regex::Regex;
use std::path::Path;

/// Build the resolved model from resource configs.
pub fn resolve(configs: &[ResourceConfig]) -> Result<ResolvedModel, ConfigError> {
    validate(configs)?;
    let models = configs
        .iter()
        .map(resource_model)
        .collect::<Result<Vec<_>, _>>()?;
    ResolvedModel::new(models)
}

/// Build one resource model. Referential checks happen in the model builder.
pub fn resource_model(config: &ResourceConfig) -> Result<ResourceModel, ConfigError> {
    let fields = config
        .fields
        .iter()
        .map(|f| field_spec(&config.path, f))
        .collect::<Result<Vec<_>, _>>()?;
    let mut builder = ResourceModel::builder(config.path.clone(), SchemaDescriptor::new(fields))
        .primary_keys(config.primary_key.columns())
        .search_fields(config.search_fields.iter())
        .filter_fields(config.filter_fields.iter())
        .hidden(config.hidden.iter());
    if let Some(table) = &config.table {
        builder = builder.table(table.clone());
    }
    if let Some(raw) = &config.default_order {
        let order = OrderBy::parse(raw).ok_or_else(|| ConfigError::InvalidOrder {
            resource: config.path.clone(),
            value: raw.clone(),
        })?;
        builder = builder.default_order(order);
    }
    for (from, to) in &config.rename {
        builder = builder.rename(from.clone(), to.clone());
    }
    if let Some(p) = &config.page_size {
        builder = builder.page_size(p.default, p.max);
    }
    builder.build()
}

fn field_spec(resource: &str, f: &FieldConfig) -> Result<FieldSpec, ConfigError> {
    let mut spec = FieldSpec::new(f.name.clone(), f.type_);
    spec.required = f.required;
    spec.nullable = f.nullable;
    spec.unique = f.unique;
    spec.minimum = f.minimum;
    spec.maximum = f.maximum;
    spec.min_length = f.min_length;
    spec.max_length = f.max_length;
    spec.format = f.format;
    spec.allowed = f.allowed.clone();
    if let Some(p) = &f.pattern {
        let re = Regex::new(p).map_err(|e| {
            ConfigError::Validation(format!("{}.{}: invalid pattern: {}", resource, f.name, e))
        })?;
        spec.pattern = Some(re);
    }
    Ok(spec)
}

/// Parse a JSON array of resource configs.
pub fn parse_resources(json: &str) -> Result<Vec<ResourceConfig>, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))
}

/// Read and parse a resources file.
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<Vec<ResourceConfig>, ConfigError> {
    let path = path.as_ref();
    tracing::debug!(path = %path.display(), "loading resources");
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse_resources(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Direction, FieldType, Operation};

    const READINGS: &str = r#"[
        {
            "path": "readings",
            "table": "sensor_readings",
            "primary_key": ["sensor", "seq"],
            "fields": [
                {"name": "sensor", "type": "string"},
                {"name": "seq", "type": "integer"},
                {"name": "value", "type": "float", "minimum": -50, "maximum": 50},
                {"name": "label", "type": "string", "required": false, "pattern": "^[a-z]+$"},
                {"name": "secret", "type": "string", "required": false}
            ],
            "search_fields": ["label"],
            "filter_fields": ["sensor"],
            "default_order": "seq desc",
            "hidden": ["secret"],
            "rename": {"value": "reading"},
            "page_size": {"default": 10, "max": 50}
        }
    ]"#;

    #[test]
    fn resolves_composite_resource_from_json() {
        let configs = parse_resources(READINGS).unwrap();
        let model = resolve(&configs).unwrap();
        let r = model.resource("readings").unwrap();
        assert_eq!(r.table_name(), "sensor_readings");
        assert_eq!(r.primary_keys(), ["sensor".to_string(), "seq".to_string()]);
        assert_eq!(r.list_options().default_order.direction, Direction::Desc);
        assert_eq!(r.list_options().max_page_size, Some(50));
        let writable: Vec<_> = r.fields_for(Operation::Create).names().collect();
        assert_eq!(writable, vec!["value", "label", "secret"]);
        assert!(r.schema().field("label").unwrap().pattern.is_some());
        assert_eq!(r.schema().field("seq").unwrap().ty, FieldType::Integer);
    }

    #[test]
    fn table_defaults_to_path() {
        let mut configs = parse_resources(READINGS).unwrap();
        configs[0].table = None;
        let model = resolve(&configs).unwrap();
        assert_eq!(model.resource("readings").unwrap().table_name(), "readings");
    }

    #[test]
    fn rejects_bad_order_and_pattern() {
        let mut configs = parse_resources(READINGS).unwrap();
        configs[0].default_order = Some("seq sideways".into());
        assert!(matches!(resolve(&configs), Err(ConfigError::InvalidOrder { .. })));

        let mut configs = parse_resources(READINGS).unwrap();
        configs[0].fields[3].pattern = Some("([a-z".into());
        assert!(matches!(resolve(&configs), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_duplicate_paths_and_unknown_keys() {
        let configs = parse_resources(READINGS).unwrap();
        let mut twice = configs.clone();
        twice.push(configs[0].clone());
        assert!(matches!(resolve(&twice), Err(ConfigError::DuplicatePathSegment(_))));

        let mut configs = parse_resources(READINGS).unwrap();
        configs[0].primary_key = crate::config::PrimaryKeyConfig::Single("missing".into());
        assert!(matches!(resolve(&configs), Err(ConfigError::InvalidPrimaryKey { .. })));
    }

    #[test]
    fn malformed_json_is_a_load_error() {
        assert!(matches!(parse_resources("{"), Err(ConfigError::Load(_))));
    }

    #[tokio::test]
    async fn missing_file_is_a_load_error() {
        let err = load_from_path("/nonexistent/resources.json").await.unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }
}
