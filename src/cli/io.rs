//! JSON I/O handling for CLI
//!
//! - Parameters: one JSON array per statement
//! - Output: single JSON object via stdout
//! - UTF-8 only

use std::io::{self, Write};

use serde_json::Value as JsonValue;

use super::errors::{CliError, CliResult};
use crate::storage::Value;

/// Parses `--params` into positional SQL values.
///
/// Integers bind as INTEGER, other numbers as REAL, booleans as 0/1.
/// Arrays and objects are rejected.
pub fn parse_params(raw: Option<&str>) -> CliResult<Vec<Value>> {
    let raw = match raw {
        Some(raw) => raw,
        None => return Ok(Vec::new()),
    };

    let parsed: JsonValue = serde_json::from_str(raw)
        .map_err(|e| CliError::invalid_argument(format!("--params is not JSON: {}", e)))?;
    let items = match parsed {
        JsonValue::Array(items) => items,
        _ => return Err(CliError::invalid_argument("--params must be a JSON array")),
    };

    items.into_iter().map(json_to_value).collect()
}

fn json_to_value(item: JsonValue) -> CliResult<Value> {
    match item {
        JsonValue::Null => Ok(Value::Null),
        JsonValue::Bool(b) => Ok(Value::Integer(i64::from(b))),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Ok(Value::Integer(i)),
            None => n
                .as_f64()
                .map(Value::Real)
                .ok_or_else(|| CliError::invalid_argument(format!("unsupported number {}", n))),
        },
        JsonValue::String(s) => Ok(Value::Text(s)),
        other => Err(CliError::invalid_argument(format!(
            "unsupported parameter {}",
            other
        ))),
    }
}

/// Write a success response to stdout
pub fn write_response(data: JsonValue) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });

    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, &response)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}
