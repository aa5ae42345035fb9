//! Store query descriptors handed to a store driver. Identifiers come from resource
//! models only; values travel separately from structure.

use crate::schema::{Direction, FieldSpec, FieldType, Record};
use serde_json::Value;

/// A column as the store sees it.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub ty: FieldType,
    pub unique: bool,
}

impl From<&FieldSpec> for Column {
    fn from(f: &FieldSpec) -> Self {
        Column {
            name: f.name.clone(),
            ty: f.ty,
            unique: f.unique,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// Exact match.
    Eq { column: Column, value: Value },
    /// Case-insensitive substring match on any of `columns`.
    Contains { columns: Vec<Column>, term: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub limit: u32,
    pub offset: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Order {
    pub column: Column,
    pub direction: Direction,
}

/// Key values that address one row.
pub type KeyValues = Vec<(Column, Value)>;

#[derive(Clone, Debug, PartialEq)]
pub enum StoreQuery {
    /// Rows matching every predicate, ordered, optionally windowed.
    Select {
        table: String,
        columns: Vec<Column>,
        predicates: Vec<Predicate>,
        order: Order,
        window: Option<Window>,
    },
    /// One row by key. Drivers fail with `NotFound` when no row matches.
    Fetch {
        table: String,
        columns: Vec<Column>,
        key: KeyValues,
    },
    /// Insert one row; `generated` columns are assigned by the store. Returns the stored row.
    Insert {
        table: String,
        columns: Vec<Column>,
        values: Vec<(Column, Value)>,
        generated: Vec<Column>,
    },
    /// Replace `values` on the row addressed by `key`. Returns the stored row or `NotFound`.
    Update {
        table: String,
        columns: Vec<Column>,
        key: KeyValues,
        values: Vec<(Column, Value)>,
    },
    /// Delete the row addressed by `key`. Returns the affected count or `NotFound`.
    Delete { table: String, key: KeyValues },
}

impl StoreQuery {
    pub fn table(&self) -> &str {
        match self {
            StoreQuery::Select { table, .. }
            | StoreQuery::Fetch { table, .. }
            | StoreQuery::Insert { table, .. }
            | StoreQuery::Update { table, .. }
            | StoreQuery::Delete { table, .. } => table,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            StoreQuery::Select { .. } => "select",
            StoreQuery::Fetch { .. } => "fetch",
            StoreQuery::Insert { .. } => "insert",
            StoreQuery::Update { .. } => "update",
            StoreQuery::Delete { .. } => "delete",
        }
    }
}

/// What a driver returns for a successful query.
#[derive(Clone, Debug, PartialEq)]
pub enum StoreOutcome {
    Rows(Vec<Record>),
    Affected(u64),
}

impl StoreOutcome {
    pub fn into_rows(self) -> Vec<Record> {
        match self {
            StoreOutcome::Rows(rows) => rows,
            StoreOutcome::Affected(_) => Vec::new(),
        }
    }

    pub fn affected(&self) -> u64 {
        match self {
            StoreOutcome::Rows(rows) => rows.len() as u64,
            StoreOutcome::Affected(n) => *n,
        }
    }
}
