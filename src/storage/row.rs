//! Statement and result types exchanged with callers

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use serde_json::{Map, Number, Value as JsonValue};

/// One SQL statement with positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    /// A statement without parameters
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Replace the positional parameters
    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = params;
        self
    }
}

/// Result of a successful `execute()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExecuteOutcome {
    /// Rows inserted, updated or deleted by the statement
    pub changes: usize,
    /// Rowid of the most recent successful INSERT on the connection
    pub last_insert_rowid: i64,
}

/// A result row: ordered column names and their values
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value of the named column (first match)
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    pub fn get_i64(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_f64(&self, column: &str) -> Option<f64> {
        match self.get(column)? {
            Value::Real(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn get_str(&self, column: &str) -> Option<&str> {
        match self.get(column)? {
            Value::Text(v) => Some(v.as_str()),
            _ => None,
        }
    }

    /// JSON object view of the row; blobs become arrays of bytes
    pub fn to_json(&self) -> JsonValue {
        let mut map = Map::new();
        for (column, value) in self.columns.iter().zip(&self.values) {
            map.insert(column.clone(), value_to_json(value));
        }
        JsonValue::Object(map)
    }
}

fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Integer(v) => JsonValue::from(*v),
        Value::Real(v) => Number::from_f64(*v)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::Text(v) => JsonValue::String(v.clone()),
        Value::Blob(v) => JsonValue::from(v.clone()),
    }
}

/// Rows produced and changes made by one statement
pub(crate) struct StatementOutput {
    pub rows: Vec<Row>,
    pub changes: usize,
}

/// Runs one statement, collecting rows when it produces any
/// (SELECT, PRAGMA, `... RETURNING`).
pub(crate) fn run_statement(
    conn: &Connection,
    sql: &str,
    params: &[Value],
) -> rusqlite::Result<StatementOutput> {
    let mut stmt = conn.prepare(sql)?;

    if stmt.column_count() == 0 {
        let changes = stmt.execute(params_from_iter(params.iter()))?;
        return Ok(StatementOutput {
            rows: Vec::new(),
            changes,
        });
    }

    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();

    let mut out = Vec::new();
    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(columns.len());
        for i in 0..columns.len() {
            values.push(row.get::<_, Value>(i)?);
        }
        out.push(Row::new(columns.clone(), values));
    }

    Ok(StatementOutput {
        rows: out,
        changes: conn.changes() as usize,
    })
}

/// Whether the statement leaves the database unchanged
pub(crate) fn is_read_only(conn: &Connection, sql: &str) -> rusqlite::Result<bool> {
    Ok(conn.prepare(sql)?.readonly())
}
