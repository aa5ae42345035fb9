//! Renders store query descriptors as parameterized PostgreSQL.

use crate::query::{Column, Predicate, StoreQuery};
use crate::schema::{FieldType, ResourceModel};
use serde_json::Value;

/// Quote identifier for PostgreSQL (safe: only from resource models).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Table name, optionally schema-qualified as `schema.table`.
fn qualified_table(table: &str) -> String {
    match table.split_once('.') {
        Some((schema, name)) => format!("{}.{}", quoted(schema), quoted(name)),
        None => quoted(table),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }

    /// Placeholder cast to the column type so JSON-typed binds land correctly.
    fn placeholder(&mut self, column: &Column, v: Value) -> String {
        let n = self.push_param(v);
        format!("${}::{}", n, column.ty.pg_type())
    }
}

fn column_list(columns: &[Column]) -> String {
    columns.iter().map(|c| quoted(&c.name)).collect::<Vec<_>>().join(", ")
}

fn key_clause(q: &mut QueryBuf, key: &[(Column, Value)]) -> String {
    key.iter()
        .map(|(c, v)| format!("{} = {}", quoted(&c.name), q.placeholder(c, v.clone())))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Escape LIKE metacharacters; backslash is PostgreSQL's default LIKE escape.
fn like_pattern(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{}%", escaped)
}

pub fn render(query: &StoreQuery) -> QueryBuf {
    let mut q = QueryBuf::new();
    match query {
        StoreQuery::Select {
            table,
            columns,
            predicates,
            order,
            window,
        } => {
            let mut where_parts = Vec::new();
            for p in predicates {
                match p {
                    Predicate::Eq { column, value } => {
                        let ph = q.placeholder(column, value.clone());
                        where_parts.push(format!("{} = {}", quoted(&column.name), ph));
                    }
                    Predicate::Contains { columns, term } => {
                        let n = q.push_param(Value::String(like_pattern(term)));
                        let ors: Vec<String> = columns
                            .iter()
                            .map(|c| format!("{} ILIKE ${}", quoted(&c.name), n))
                            .collect();
                        where_parts.push(format!("({})", ors.join(" OR ")));
                    }
                }
            }
            let where_clause = if where_parts.is_empty() {
                String::new()
            } else {
                format!(" WHERE {}", where_parts.join(" AND "))
            };
            let order_clause = format!(" ORDER BY {} {}", quoted(&order.column.name), order.direction.as_sql());
            let window_clause = window
                .map(|w| format!(" LIMIT {} OFFSET {}", w.limit, w.offset))
                .unwrap_or_default();
            q.sql = format!(
                "SELECT {} FROM {}{}{}{}",
                column_list(columns),
                qualified_table(table),
                where_clause,
                order_clause,
                window_clause
            );
        }
        StoreQuery::Fetch { table, columns, key } => {
            let where_clause = key_clause(&mut q, key);
            q.sql = format!(
                "SELECT {} FROM {} WHERE {}",
                column_list(columns),
                qualified_table(table),
                where_clause
            );
        }
        StoreQuery::Insert {
            table, columns, values, ..
        } => {
            if values.is_empty() {
                q.sql = format!(
                    "INSERT INTO {} DEFAULT VALUES RETURNING {}",
                    qualified_table(table),
                    column_list(columns)
                );
            } else {
                let cols: Vec<String> = values.iter().map(|(c, _)| quoted(&c.name)).collect();
                let placeholders: Vec<String> = values.iter().map(|(c, v)| q.placeholder(c, v.clone())).collect();
                q.sql = format!(
                    "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
                    qualified_table(table),
                    cols.join(", "),
                    placeholders.join(", "),
                    column_list(columns)
                );
            }
        }
        StoreQuery::Update {
            table,
            columns,
            key,
            values,
        } => {
            if values.is_empty() {
                let where_clause = key_clause(&mut q, key);
                q.sql = format!(
                    "SELECT {} FROM {} WHERE {}",
                    column_list(columns),
                    qualified_table(table),
                    where_clause
                );
                return q;
            }
            let sets: Vec<String> = values
                .iter()
                .map(|(c, v)| format!("{} = {}", quoted(&c.name), q.placeholder(c, v.clone())))
                .collect();
            let where_clause = key_clause(&mut q, key);
            q.sql = format!(
                "UPDATE {} SET {} WHERE {} RETURNING {}",
                qualified_table(table),
                sets.join(", "),
                where_clause,
                column_list(columns)
            );
        }
        StoreQuery::Delete { table, key } => {
            let where_clause = key_clause(&mut q, key);
            q.sql = format!("DELETE FROM {} WHERE {}", qualified_table(table), where_clause);
        }
    }
    q
}

/// `CREATE TABLE IF NOT EXISTS` for a resource. Integer keys are identity columns and
/// string keys default to a random UUID; other columns follow the schema's nullability.
pub fn create_table(model: &ResourceModel) -> String {
    let mut defs = Vec::new();
    for f in model.schema().fields() {
        let mut def = format!("{} {}", quoted(&f.name), f.ty.pg_type());
        if f.primary_key {
            match f.ty {
                FieldType::Integer => def.push_str(" GENERATED BY DEFAULT AS IDENTITY"),
                FieldType::String => def.push_str(" NOT NULL DEFAULT gen_random_uuid()::text"),
                _ => {}
            }
        } else {
            if f.required && !f.nullable {
                def.push_str(" NOT NULL");
            }
            if f.unique {
                def.push_str(" UNIQUE");
            }
        }
        defs.push(def);
    }
    let pk = model
        .primary_keys()
        .iter()
        .map(|k| quoted(k))
        .collect::<Vec<_>>()
        .join(", ");
    defs.push(format!("PRIMARY KEY ({})", pk));
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        qualified_table(model.table_name()),
        defs.join(", ")
    )
}
