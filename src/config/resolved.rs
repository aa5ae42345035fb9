//! Resolved model: every configured resource validated and built, indexed by path.

use crate::error::ConfigError;
use crate::schema::ResourceModel;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    resources: Vec<Arc<ResourceModel>>,
    by_path: HashMap<String, Arc<ResourceModel>>,
}

impl ResolvedModel {
    /// Index already-built models. Paths must be unique.
    pub fn new(models: Vec<ResourceModel>) -> Result<Self, ConfigError> {
        let mut resolved = ResolvedModel::default();
        for m in models {
            let m = Arc::new(m);
            if resolved.by_path.insert(m.path().to_string(), m.clone()).is_some() {
                return Err(ConfigError::DuplicatePathSegment(m.path().to_string()));
            }
            resolved.resources.push(m);
        }
        Ok(resolved)
    }

    pub fn resource(&self, path: &str) -> Option<&Arc<ResourceModel>> {
        self.by_path.get(path)
    }

    /// Resources in declaration order.
    pub fn resources(&self) -> &[Arc<ResourceModel>] {
        &self.resources
    }
}
