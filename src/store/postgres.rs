//! PostgreSQL store driver on a sqlx pool, plus database bootstrap helpers.

use crate::error::StoreError;
use crate::query::{Column, StoreOutcome, StoreQuery};
use crate::schema::{FieldType, Record, ResourceModel};
use crate::sql::{create_table, render, PgBindValue};
use crate::store::StoreDriver;
use async_trait::async_trait;
use chrono::SecondsFormat;
use serde_json::{Number, Value};
use sqlx::error::ErrorKind;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{ConnectOptions, PgPool, Row};
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(map_db_error)?;
        Ok(PgStore { pool })
    }
}

#[async_trait]
impl StoreDriver for PgStore {
    async fn execute(&self, query: &StoreQuery) -> Result<StoreOutcome, StoreError> {
        let q = render(query);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut stmt = sqlx::query(&q.sql);
        for p in &q.params {
            stmt = stmt.bind(PgBindValue::from_json(p));
        }
        let result = match query {
            StoreQuery::Select { columns, .. } => {
                let rows = stmt.fetch_all(&self.pool).await.map_err(map_db_error)?;
                rows.iter()
                    .map(|r| row_to_record(r, columns))
                    .collect::<Result<Vec<_>, _>>()
                    .map(StoreOutcome::Rows)
            }
            StoreQuery::Fetch { columns, .. }
            | StoreQuery::Insert { columns, .. }
            | StoreQuery::Update { columns, .. } => {
                let row = stmt
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(map_db_error)?
                    .ok_or(StoreError::NotFound)?;
                row_to_record(&row, columns).map(|r| StoreOutcome::Rows(vec![r]))
            }
            StoreQuery::Delete { .. } => {
                let done = stmt.execute(&self.pool).await.map_err(map_db_error)?;
                match done.rows_affected() {
                    0 => Err(StoreError::NotFound),
                    n => Ok(StoreOutcome::Affected(n)),
                }
            }
        };
        if let Err(e) = &result {
            tracing::debug!(error = %e, kind = query.kind(), table = query.table(), "query failed");
        }
        result
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .fetch_optional(&self.pool)
            .await
            .map(|_| ())
            .map_err(map_db_error)
    }

    async fn ensure_table(&self, model: &ResourceModel) -> Result<(), StoreError> {
        let ddl = create_table(model);
        tracing::debug!(sql = %ddl, "ensure table");
        sqlx::query(&ddl).execute(&self.pool).await.map_err(map_db_error)?;
        Ok(())
    }
}

/// Keep not-found, constraint and transport failures apart.
pub fn map_db_error(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) => {
            let message = db.message().to_string();
            match db.kind() {
                ErrorKind::UniqueViolation => StoreError::Unique(message),
                ErrorKind::ForeignKeyViolation | ErrorKind::NotNullViolation | ErrorKind::CheckViolation => {
                    StoreError::Constraint(message)
                }
                _ => {
                    // class 22 is data exceptions (out of range, bad datetime), 23 integrity
                    let data_error = db
                        .code()
                        .map(|c| c.starts_with("22") || c.starts_with("23"))
                        .unwrap_or(false);
                    if data_error {
                        StoreError::Constraint(message)
                    } else {
                        StoreError::Transport(e.to_string())
                    }
                }
            }
        }
        _ => StoreError::Transport(e.to_string()),
    }
}

fn row_to_record(row: &PgRow, columns: &[Column]) -> Result<Record, StoreError> {
    let mut map = Record::new();
    for c in columns {
        let v = cell_to_value(row, c)
            .map_err(|e| StoreError::Transport(format!("decode column {}: {}", c.name, e)))?;
        map.insert(c.name.clone(), v);
    }
    Ok(map)
}

fn cell_to_value(row: &PgRow, column: &Column) -> Result<Value, sqlx::Error> {
    let name = column.name.as_str();
    let v = match column.ty {
        FieldType::Integer => {
            let n = match row.try_get::<Option<i64>, _>(name) {
                Ok(v) => v,
                Err(_) => row.try_get::<Option<i32>, _>(name)?.map(i64::from),
            };
            n.map(|n| Value::Number(n.into()))
        }
        FieldType::Float => {
            let n = match row.try_get::<Option<f64>, _>(name) {
                Ok(v) => v,
                Err(_) => row.try_get::<Option<f32>, _>(name)?.map(f64::from),
            };
            n.and_then(Number::from_f64).map(Value::Number)
        }
        FieldType::String => row.try_get::<Option<String>, _>(name)?.map(Value::String),
        FieldType::Boolean => row.try_get::<Option<bool>, _>(name)?.map(Value::Bool),
        FieldType::Timestamp => {
            let s = match row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
                Ok(v) => v.map(|d| d.to_rfc3339_opts(SecondsFormat::Millis, true)),
                Err(_) => row
                    .try_get::<Option<chrono::NaiveDateTime>, _>(name)?
                    .map(|d| d.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()),
            };
            s.map(Value::String)
        }
    };
    Ok(v.unwrap_or(Value::Null))
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before creating the main pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), StoreError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| StoreError::Transport(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await.map_err(map_db_error)?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await
        .map_err(map_db_error)?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", crate::sql::quoted(&db_name)))
            .execute(&mut conn)
            .await
            .map_err(map_db_error)?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), StoreError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| StoreError::Transport("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let db_name = path_and_query.split('?').next().unwrap_or("").trim();
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = format!("{}postgres", base);
    Ok((admin_url, db_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_url_targets_postgres_database() {
        let (admin, name) = parse_db_name_from_url("postgres://u:p@localhost:5432/weather?sslmode=disable").unwrap();
        assert_eq!(admin, "postgres://u:p@localhost:5432/postgres");
        assert_eq!(name, "weather");
    }

    #[test]
    fn row_not_found_is_not_found() {
        assert_eq!(map_db_error(sqlx::Error::RowNotFound), StoreError::NotFound);
        assert!(matches!(map_db_error(sqlx::Error::PoolTimedOut), StoreError::Transport(_)));
    }
}
