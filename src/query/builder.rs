//! Builds store query descriptors from a resource model and validated input.

use crate::query::{Column, ListQuery, Order, Predicate, StoreQuery};
use crate::schema::{Operation, Record, ResourceModel};
use serde_json::Value;

fn columns(model: &ResourceModel) -> Vec<Column> {
    model.schema().fields().iter().map(Column::from).collect()
}

fn column(model: &ResourceModel, name: &str) -> Option<Column> {
    model.schema().field(name).map(Column::from)
}

fn key_values(model: &ResourceModel, key: &[(String, Value)]) -> Vec<(Column, Value)> {
    key.iter()
        .filter_map(|(name, v)| column(model, name).map(|c| (c, v.clone())))
        .collect()
}

/// SELECT for a list request: OR-ed search across the search fields (only when a term is
/// present), AND-ed exact filters, one order clause, and the request window.
pub fn list(model: &ResourceModel, query: &ListQuery) -> StoreQuery {
    let mut predicates = Vec::new();
    if let Some(term) = &query.search {
        let search_columns: Vec<Column> = model
            .list_options()
            .search_fields
            .iter()
            .filter_map(|f| column(model, f))
            .collect();
        if !search_columns.is_empty() {
            predicates.push(Predicate::Contains {
                columns: search_columns,
                term: term.clone(),
            });
        }
    }
    for (name, value) in &query.filters {
        if let Some(c) = column(model, name) {
            predicates.push(Predicate::Eq {
                column: c,
                value: value.clone(),
            });
        }
    }
    let order_column = column(model, &query.order.field)
        .or_else(|| column(model, &model.list_options().default_order.field))
        .or_else(|| column(model, &model.primary_keys()[0]));
    let order = match order_column {
        Some(column) => Order {
            column,
            direction: query.order.direction,
        },
        // primary keys are validated against the schema when the model is built
        None => unreachable!("resource model without a primary key column"),
    };
    StoreQuery::Select {
        table: model.table_name().to_string(),
        columns: columns(model),
        predicates,
        order,
        window: Some(query.window()),
    }
}

pub fn fetch(model: &ResourceModel, key: &[(String, Value)]) -> StoreQuery {
    StoreQuery::Fetch {
        table: model.table_name().to_string(),
        columns: columns(model),
        key: key_values(model, key),
    }
}

/// INSERT of the validated writable fields; primary keys are left to the store.
pub fn insert(model: &ResourceModel, record: &Record) -> StoreQuery {
    let values = model
        .fields_for(Operation::Create)
        .fields()
        .iter()
        .filter_map(|f| record.get(&f.name).map(|v| (Column::from(f), v.clone())))
        .collect();
    let generated = model
        .primary_keys()
        .iter()
        .filter_map(|k| column(model, k))
        .collect();
    StoreQuery::Insert {
        table: model.table_name().to_string(),
        columns: columns(model),
        values,
        generated,
    }
}

/// UPDATE replacing every writable field; fields absent from `record` are set to null.
pub fn update(model: &ResourceModel, key: &[(String, Value)], record: &Record) -> StoreQuery {
    let values = model
        .fields_for(Operation::Update)
        .fields()
        .iter()
        .map(|f| (Column::from(f), record.get(&f.name).cloned().unwrap_or(Value::Null)))
        .collect();
    StoreQuery::Update {
        table: model.table_name().to_string(),
        columns: columns(model),
        key: key_values(model, key),
        values,
    }
}

pub fn delete(model: &ResourceModel, key: &[(String, Value)]) -> StoreQuery {
    StoreQuery::Delete {
        table: model.table_name().to_string(),
        key: key_values(model, key),
    }
}
