//! Shared application state. Models are immutable once resolved; the store is shared.

use crate::config::ResolvedModel;
use crate::query::PageSettings;
use crate::schema::ResourceModel;
use crate::store::StoreDriver;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StoreDriver>,
    pub model: Arc<ResolvedModel>,
    pub pages: PageSettings,
    /// Largest accepted request body, in bytes.
    pub body_limit: usize,
}

impl AppState {
    pub fn new(store: Arc<dyn StoreDriver>, model: ResolvedModel) -> Self {
        AppState {
            store,
            model: Arc::new(model),
            pages: PageSettings::default(),
            body_limit: crate::config::DEFAULT_BODY_LIMIT_BYTES,
        }
    }

    pub fn with_pages(mut self, pages: PageSettings) -> Self {
        self.pages = pages;
        self
    }

    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    pub(crate) fn for_resource(&self, resource: Arc<ResourceModel>) -> ResourceState {
        ResourceState {
            store: self.store.clone(),
            resource,
            pages: self.pages,
        }
    }
}

/// State seen by one resource's router.
#[derive(Clone)]
pub struct ResourceState {
    pub store: Arc<dyn StoreDriver>,
    pub resource: Arc<ResourceModel>,
    pub pages: PageSettings,
}
