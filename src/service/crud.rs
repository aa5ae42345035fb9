//! Generic CRUD execution: validate, build one store query, execute, serialize.

use crate::error::AppError;
use crate::query::{builder, ListQuery, StoreOutcome};
use crate::schema::{Operation, Record, ResourceModel};
use crate::service::RequestValidator;
use crate::store::StoreDriver;
use serde_json::{Map, Value};

pub struct CrudService;

impl CrudService {
    /// Rows matching the list query, serialized, in the query's order.
    pub async fn list(
        store: &dyn StoreDriver,
        model: &ResourceModel,
        query: &ListQuery,
    ) -> Result<Vec<Value>, AppError> {
        let q = builder::list(model, query);
        let rows = store.execute(&q).await?.into_rows();
        tracing::debug!(resource = model.path(), count = rows.len(), "listed");
        Ok(rows.into_iter().map(|r| model.serialize(r)).collect())
    }

    /// Validate the writable fields and insert; the store assigns the key.
    pub async fn create(
        store: &dyn StoreDriver,
        model: &ResourceModel,
        body: &Map<String, Value>,
    ) -> Result<Value, AppError> {
        let record = RequestValidator::validate(body, model.fields_for(Operation::Create))?;
        let q = builder::insert(model, &record);
        let row = Self::single_row(store.execute(&q).await?)?;
        tracing::debug!(resource = model.path(), "created");
        Ok(model.serialize(row))
    }

    pub async fn read(store: &dyn StoreDriver, model: &ResourceModel, raw_key: &str) -> Result<Value, AppError> {
        let key = RequestValidator::parse_key(model, raw_key)?;
        let row = Self::single_row(store.execute(&builder::fetch(model, &key)).await?)?;
        Ok(model.serialize(row))
    }

    /// Full replace of every writable field on the addressed row. The key never changes.
    pub async fn update(
        store: &dyn StoreDriver,
        model: &ResourceModel,
        raw_key: &str,
        body: &Map<String, Value>,
    ) -> Result<Value, AppError> {
        let (key, record) = match (
            RequestValidator::parse_key(model, raw_key),
            RequestValidator::validate(body, model.fields_for(Operation::Update)),
        ) {
            (Ok(key), Ok(record)) => (key, record),
            (key, record) => {
                let mut errors = key.err().unwrap_or_default();
                errors.extend(record.err().unwrap_or_default());
                return Err(AppError::Validation(errors));
            }
        };
        let q = builder::update(model, &key, &record);
        let row = Self::single_row(store.execute(&q).await?)?;
        tracing::debug!(resource = model.path(), key = raw_key, "updated");
        Ok(model.serialize(row))
    }

    /// Delete the addressed row; the result carries its key fields.
    pub async fn delete(store: &dyn StoreDriver, model: &ResourceModel, raw_key: &str) -> Result<Value, AppError> {
        let key = RequestValidator::parse_key(model, raw_key)?;
        let outcome = store.execute(&builder::delete(model, &key)).await?;
        if outcome.affected() == 0 {
            return Err(AppError::NotFound);
        }
        tracing::debug!(resource = model.path(), key = raw_key, "deleted");
        let deleted: Map<String, Value> = key
            .into_iter()
            .map(|(name, v)| (model.response_name(&name).to_string(), v))
            .collect();
        Ok(Value::Object(deleted))
    }

    fn single_row(outcome: StoreOutcome) -> Result<Record, AppError> {
        outcome.into_rows().into_iter().next().ok_or(AppError::NotFound)
    }
}
