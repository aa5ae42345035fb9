//! Cross-resource checks: unique paths and tables. Per-resource checks live in the model builder.

use crate::config::ResourceConfig;
use crate::error::ConfigError;
use std::collections::HashSet;

pub fn validate(configs: &[ResourceConfig]) -> Result<(), ConfigError> {
    if configs.is_empty() {
        return Err(ConfigError::Validation("at least one resource required".into()));
    }
    let mut paths = HashSet::new();
    let mut tables = HashSet::new();
    for c in configs {
        if !paths.insert(c.path.as_str()) {
            return Err(ConfigError::DuplicatePathSegment(c.path.clone()));
        }
        let table = c.table.as_deref().unwrap_or(&c.path);
        if !tables.insert(table) {
            return Err(ConfigError::Validation(format!(
                "table '{}' is bound to more than one resource",
                table
            )));
        }
    }
    Ok(())
}
