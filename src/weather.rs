//! Built-in weather resource: served under `/weather` when no resources file is configured.

use crate::config::{resource_model, FieldConfig, PrimaryKeyConfig, ResourceConfig};
use crate::error::ConfigError;
use crate::schema::{FieldType, ResourceModel};
use std::collections::BTreeMap;

pub const WEATHER_PATH: &str = "weather";

/// Weather observations: searchable by place and description, newest first.
pub fn weather_config() -> ResourceConfig {
    let field = |name: &str, ty: FieldType| FieldConfig {
        name: name.to_string(),
        type_: ty,
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
    };
    ResourceConfig {
        path: WEATHER_PATH.to_string(),
        table: Some("weather".to_string()),
        primary_key: PrimaryKeyConfig::Single("id".to_string()),
        fields: vec![
            field("id", FieldType::Integer),
            field("city", FieldType::String),
            field("country", FieldType::String),
            field("temperature", FieldType::Float),
            FieldConfig {
                minimum: Some(0.0),
                maximum: Some(100.0),
                ..field("humidity", FieldType::Float)
            },
            field("description", FieldType::String),
            FieldConfig {
                minimum: Some(0.0),
                ..field("wind_speed", FieldType::Float)
            },
            field("recorded_at", FieldType::Timestamp),
        ],
        search_fields: vec!["city".into(), "country".into(), "description".into()],
        filter_fields: vec!["country".into()],
        default_order: Some("recorded_at DESC".to_string()),
        hidden: Vec::new(),
        rename: BTreeMap::new(),
        page_size: None,
    }
}

pub fn weather_model() -> Result<ResourceModel, ConfigError> {
    resource_model(&weather_config())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_resources;
    use crate::schema::{Direction, Operation};

    #[test]
    fn sample_resources_file_declares_the_same_weather() {
        let configs = parse_resources(include_str!("../weather_service/resources.json")).unwrap();
        let weather = configs.iter().find(|c| c.path == WEATHER_PATH).unwrap();
        assert_eq!(weather, &weather_config());
    }

    #[test]
    fn model_shape() {
        let m = weather_model().unwrap();
        assert_eq!(m.table_name(), "weather");
        assert_eq!(m.primary_keys(), ["id".to_string()]);
        assert_eq!(m.list_options().default_order.field, "recorded_at");
        assert_eq!(m.list_options().default_order.direction, Direction::Desc);
        let humidity = m.schema().field("humidity").unwrap();
        assert_eq!((humidity.minimum, humidity.maximum), (Some(0.0), Some(100.0)));
        assert!(m.schema().fields().iter().all(|f| f.min_length.is_none()));
    }

    #[test]
    fn key_is_not_writable() {
        let m = weather_model().unwrap();
        assert_eq!(m.fields_for(Operation::Create).len(), 7);
        assert!(!m.fields_for(Operation::Update).contains("id"));
        assert!(m.fields_for(Operation::Read).is_empty());
    }
}
