//! Resource engine: declarative CRUD resources over a pluggable store.
//!
//! A [`ResourceModel`] binds a [`SchemaDescriptor`] to a table; the engine derives request
//! validation, store queries and the five REST operations from it.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod query;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod sql;
pub mod state;
pub mod store;
pub mod weather;

pub use config::{load_from_path, resolve, ResolvedModel, ResourceConfig, Settings, StoreBackend};
pub use error::{AppError, ConfigError, StoreError};
pub use query::{ListQuery, PageSettings, StoreOutcome, StoreQuery};
pub use response::{success_many, success_one, Envelope, ErrorEntry};
pub use routes::{app_router, common_routes, resource_routes};
pub use schema::{FieldSpec, FieldType, OrderBy, ResourceModel, SchemaDescriptor};
pub use service::{CrudService, FieldError, RequestValidator};
pub use state::AppState;
pub use store::{ensure_database_exists, MemoryStore, PgStore, StoreDriver};
pub use weather::weather_model;
