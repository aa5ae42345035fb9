//! In-process store driver. Tables are vectors of rows behind one lock that is held for a
//! single query and never across an await.

use crate::error::StoreError;
use crate::query::{Column, Predicate, StoreOutcome, StoreQuery};
use crate::schema::{Direction, FieldType, Record, ResourceModel};
use crate::service::value_eq;
use crate::store::StoreDriver;
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default, Debug)]
struct MemTable {
    rows: Vec<Record>,
    /// Last integer key handed out; keys are never reused.
    sequence: i64,
}

#[derive(Default, Debug)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, MemTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently stored in `table`.
    pub fn row_count(&self, table: &str) -> usize {
        self.read()
            .map(|t| t.get(table).map(|t| t.rows.len()).unwrap_or(0))
            .unwrap_or(0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, MemTable>>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::Transport("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, MemTable>>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::Transport("memory store lock poisoned".into()))
    }

    fn run(&self, query: &StoreQuery) -> Result<StoreOutcome, StoreError> {
        match query {
            StoreQuery::Select {
                table,
                columns,
                predicates,
                order,
                window,
            } => {
                let tables = self.read()?;
                let Some(t) = tables.get(table) else {
                    return Ok(StoreOutcome::Rows(Vec::new()));
                };
                let mut rows: Vec<&Record> = t
                    .rows
                    .iter()
                    .filter(|r| predicates.iter().all(|p| matches(r, p)))
                    .collect();
                rows.sort_by(|a, b| {
                    let ord = compare(a.get(&order.column.name), b.get(&order.column.name));
                    match order.direction {
                        Direction::Asc => ord,
                        Direction::Desc => ord.reverse(),
                    }
                });
                let (offset, limit) = match window {
                    Some(w) => (w.offset as usize, w.limit as usize),
                    None => (0, usize::MAX),
                };
                Ok(StoreOutcome::Rows(
                    rows.into_iter()
                        .skip(offset)
                        .take(limit)
                        .map(|r| project(r, columns))
                        .collect(),
                ))
            }
            StoreQuery::Fetch { table, columns, key } => {
                let tables = self.read()?;
                tables
                    .get(table)
                    .and_then(|t| t.rows.iter().find(|r| matches_key(r, key)))
                    .map(|r| StoreOutcome::Rows(vec![project(r, columns)]))
                    .ok_or(StoreError::NotFound)
            }
            StoreQuery::Insert {
                table,
                columns,
                values,
                generated,
            } => {
                let mut tables = self.write()?;
                let t = tables.entry(table.clone()).or_default();
                let mut row = Record::new();
                for c in generated {
                    let v = match c.ty {
                        FieldType::Integer => {
                            t.sequence += 1;
                            Value::Number(t.sequence.into())
                        }
                        FieldType::String => Value::String(uuid::Uuid::new_v4().to_string()),
                        _ => {
                            return Err(StoreError::Constraint(format!(
                                "cannot generate a value for {}.{}",
                                table, c.name
                            )))
                        }
                    };
                    row.insert(c.name.clone(), v);
                }
                for (c, v) in values {
                    row.insert(c.name.clone(), v.clone());
                }
                for c in columns {
                    row.entry(c.name.clone()).or_insert(Value::Null);
                }
                let keyed: Vec<Column> = generated
                    .iter()
                    .map(|c| Column { unique: true, ..c.clone() })
                    .collect();
                let checked = values.iter().map(|(c, _)| c).chain(keyed.iter());
                if let Some(name) = unique_conflict(&t.rows, &row, None, checked) {
                    return Err(StoreError::Unique(format!("{}.{}", table, name)));
                }
                let out = project(&row, columns);
                t.rows.push(row);
                Ok(StoreOutcome::Rows(vec![out]))
            }
            StoreQuery::Update {
                table,
                columns,
                key,
                values,
            } => {
                let mut tables = self.write()?;
                let t = tables.get_mut(table).ok_or(StoreError::NotFound)?;
                let idx = t
                    .rows
                    .iter()
                    .position(|r| matches_key(r, key))
                    .ok_or(StoreError::NotFound)?;
                let mut row = t.rows[idx].clone();
                for (c, v) in values {
                    row.insert(c.name.clone(), v.clone());
                }
                if let Some(name) = unique_conflict(&t.rows, &row, Some(idx), values.iter().map(|(c, _)| c)) {
                    return Err(StoreError::Unique(format!("{}.{}", table, name)));
                }
                let out = project(&row, columns);
                t.rows[idx] = row;
                Ok(StoreOutcome::Rows(vec![out]))
            }
            StoreQuery::Delete { table, key } => {
                let mut tables = self.write()?;
                let t = tables.get_mut(table).ok_or(StoreError::NotFound)?;
                let before = t.rows.len();
                t.rows.retain(|r| !matches_key(r, key));
                let removed = (before - t.rows.len()) as u64;
                if removed == 0 {
                    return Err(StoreError::NotFound);
                }
                Ok(StoreOutcome::Affected(removed))
            }
        }
    }
}

#[async_trait]
impl StoreDriver for MemoryStore {
    async fn execute(&self, query: &StoreQuery) -> Result<StoreOutcome, StoreError> {
        tracing::debug!(table = query.table(), kind = query.kind(), "memory query");
        self.run(query)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.read().map(|_| ())
    }

    async fn ensure_table(&self, model: &ResourceModel) -> Result<(), StoreError> {
        self.write()?.entry(model.table_name().to_string()).or_default();
        Ok(())
    }
}

fn project(row: &Record, columns: &[Column]) -> Record {
    columns
        .iter()
        .map(|c| (c.name.clone(), row.get(&c.name).cloned().unwrap_or(Value::Null)))
        .collect()
}

fn matches_key(row: &Record, key: &[(Column, Value)]) -> bool {
    key.iter()
        .all(|(c, v)| row.get(&c.name).map(|x| value_eq(x, v)).unwrap_or(false))
}

fn matches(row: &Record, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::Eq { column, value } => row.get(&column.name).map(|x| value_eq(x, value)).unwrap_or(false),
        Predicate::Contains { columns, term } => {
            let needle = term.to_lowercase();
            columns.iter().any(|c| {
                row.get(&c.name)
                    .and_then(Value::as_str)
                    .map(|s| s.to_lowercase().contains(&needle))
                    .unwrap_or(false)
            })
        }
    }
}

/// Nulls sort first. Timestamps are canonical UTC strings, so string order is time order.
fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

/// Name of the first unique column whose value in `candidate` already exists in another row.
fn unique_conflict<'a>(
    rows: &[Record],
    candidate: &Record,
    skip: Option<usize>,
    columns: impl Iterator<Item = &'a Column>,
) -> Option<String> {
    for c in columns.filter(|c| c.unique) {
        let Some(v) = candidate.get(&c.name).filter(|v| !v.is_null()) else {
            continue;
        };
        let taken = rows
            .iter()
            .enumerate()
            .any(|(i, r)| Some(i) != skip && r.get(&c.name).map(|x| value_eq(x, v)).unwrap_or(false));
        if taken {
            return Some(c.name.clone());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{builder, ListQuery, PageSettings};
    use crate::schema::{FieldSpec, OrderBy, SchemaDescriptor};
    use serde_json::json;

    fn model() -> ResourceModel {
        ResourceModel::builder(
            "cities",
            SchemaDescriptor::new(vec![
                FieldSpec::integer("id"),
                FieldSpec::string("name").unique(),
                FieldSpec::integer("population"),
            ]),
        )
        .primary_key("id")
        .search_fields(["name"])
        .build()
        .unwrap()
    }

    fn record(v: Value) -> Record {
        match v {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    async fn insert(store: &MemoryStore, m: &ResourceModel, v: Value) -> Result<Record, StoreError> {
        let out = store.execute(&builder::insert(m, &record(v))).await?;
        Ok(out.into_rows().remove(0))
    }

    #[tokio::test]
    async fn insert_assigns_increasing_keys() {
        let store = MemoryStore::new();
        let m = model();
        let a = insert(&store, &m, json!({"name": "Oslo", "population": 700})).await.unwrap();
        let b = insert(&store, &m, json!({"name": "Bergen", "population": 290})).await.unwrap();
        assert_eq!(a["id"], json!(1));
        assert_eq!(b["id"], json!(2));
        assert_eq!(store.row_count("cities"), 2);
    }

    #[tokio::test]
    async fn keys_are_not_reused_after_delete() {
        let store = MemoryStore::new();
        let m = model();
        insert(&store, &m, json!({"name": "Oslo", "population": 700})).await.unwrap();
        let key = [("id".to_string(), json!(1))];
        assert_eq!(store.execute(&builder::delete(&m, &key)).await.unwrap(), StoreOutcome::Affected(1));
        let c = insert(&store, &m, json!({"name": "Oslo", "population": 700})).await.unwrap();
        assert_eq!(c["id"], json!(2));
    }

    #[tokio::test]
    async fn unique_columns_are_enforced() {
        let store = MemoryStore::new();
        let m = model();
        insert(&store, &m, json!({"name": "Oslo", "population": 700})).await.unwrap();
        let err = insert(&store, &m, json!({"name": "Oslo", "population": 1})).await.unwrap_err();
        assert_eq!(err, StoreError::Unique("cities.name".into()));

        insert(&store, &m, json!({"name": "Bergen", "population": 290})).await.unwrap();
        let q = builder::update(&m, &[("id".to_string(), json!(2))], &record(json!({"name": "Oslo", "population": 3})));
        assert!(matches!(store.execute(&q).await, Err(StoreError::Unique(_))));
        // a row may keep its own value
        let q = builder::update(&m, &[("id".to_string(), json!(2))], &record(json!({"name": "Bergen", "population": 3})));
        assert!(store.execute(&q).await.is_ok());
    }

    #[tokio::test]
    async fn missing_keys_are_not_found() {
        let store = MemoryStore::new();
        let m = model();
        let key = [("id".to_string(), json!(99))];
        assert_eq!(store.execute(&builder::fetch(&m, &key)).await, Err(StoreError::NotFound));
        assert_eq!(store.execute(&builder::delete(&m, &key)).await, Err(StoreError::NotFound));
        let q = builder::update(&m, &key, &record(json!({"name": "x", "population": 1})));
        assert_eq!(store.execute(&q).await, Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn select_searches_orders_and_windows() {
        let store = MemoryStore::new();
        let m = model();
        for (name, pop) in [("Oslo", 700), ("Bergen", 290), ("Trondheim", 210), ("Bodø", 53)] {
            insert(&store, &m, json!({"name": name, "population": pop})).await.unwrap();
        }

        let mut q = ListQuery::for_model(&m, &PageSettings::default());
        q.order = OrderBy::desc("population");
        let rows = store.execute(&builder::list(&m, &q)).await.unwrap().into_rows();
        let names: Vec<_> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Oslo", "Bergen", "Trondheim", "Bodø"]);

        q.search = Some("O".into());
        let rows = store.execute(&builder::list(&m, &q)).await.unwrap().into_rows();
        let names: Vec<_> = rows.iter().map(|r| r["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["Oslo", "Trondheim", "Bodø"]);

        q.search = None;
        q.page = 2;
        q.per_page = 3;
        let rows = store.execute(&builder::list(&m, &q)).await.unwrap().into_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], json!("Bodø"));
    }

    #[tokio::test]
    async fn select_on_unknown_table_is_empty() {
        let store = MemoryStore::new();
        let m = model();
        let q = ListQuery::for_model(&m, &PageSettings::default());
        assert!(store.execute(&builder::list(&m, &q)).await.unwrap().into_rows().is_empty());
        store.ensure_table(&m).await.unwrap();
        store.ping().await.unwrap();
    }
}
