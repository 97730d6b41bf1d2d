//! Bulk Loader
//!
//! Loads a homogeneous list of row objects into a table with one multi-row
//! INSERT. The column list comes strictly from the first row's keys in
//! insertion order; every cell is transmitted as nullable text (no type
//! inference), missing keys become NULL, and extra keys in later rows are
//! ignored. Callers needing typed columns pre-create the table with
//! text-compatible columns.

use serde_json::{Map, Value};

use crate::errors::{BridgeError, BridgeResult};
use crate::executor::params::quote_identifier;
use crate::pool::{PoolManager, DEFAULT_CONNECT_ATTEMPTS};

/// Wire-protocol ceiling on bind parameters in a single statement
const MAX_BIND_PARAMS: usize = 65535;

/// A bulk insert request: target table plus ordered row objects
#[derive(Debug, Clone)]
pub struct BulkSpec {
    pub table: String,
    pub rows: Vec<Map<String, Value>>,
}

/// Insert every row in one bulk write, returning the affected-row count.
pub async fn bulk_insert(manager: &PoolManager, spec: &BulkSpec) -> BridgeResult<u64> {
    if spec.table.trim().is_empty() {
        return Err(BridgeError::validation("table must be a non-empty string"));
    }
    if spec.rows.is_empty() {
        return Err(BridgeError::validation("data must be a non-empty array"));
    }

    let columns: Vec<String> = spec.rows[0].keys().cloned().collect();
    if columns.is_empty() {
        return Err(BridgeError::validation(
            "the first row must have at least one column",
        ));
    }
    if columns.len() * spec.rows.len() > MAX_BIND_PARAMS {
        return Err(BridgeError::validation(format!(
            "bulk insert of {} rows x {} columns exceeds the {} parameter limit",
            spec.rows.len(),
            columns.len(),
            MAX_BIND_PARAMS
        )));
    }

    let sql = build_insert_sql(&spec.table, &columns, spec.rows.len())?;

    let mut query = sqlx::query(&sql);
    for row in &spec.rows {
        for column in &columns {
            query = query.bind(text_value(row.get(column)));
        }
    }

    let pool = manager.ensure_pool(DEFAULT_CONNECT_ATTEMPTS).await?;
    match query.execute(&pool).await {
        Ok(done) => Ok(done.rows_affected()),
        Err(e) => Err(manager.surface_failure(e).await),
    }
}

/// Build the multi-row INSERT statement with `$n` placeholders
fn build_insert_sql(table: &str, columns: &[String], row_count: usize) -> BridgeResult<String> {
    let quoted_table = table
        .split('.')
        .map(quote_identifier)
        .collect::<BridgeResult<Vec<_>>>()?
        .join(".");
    let quoted_columns = columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<BridgeResult<Vec<_>>>()?
        .join(", ");

    let mut tuples = Vec::with_capacity(row_count);
    let mut placeholder = 1;
    for _ in 0..row_count {
        let cells: Vec<String> = (0..columns.len())
            .map(|_| {
                let p = format!("${}", placeholder);
                placeholder += 1;
                p
            })
            .collect();
        tuples.push(format!("({})", cells.join(", ")));
    }

    Ok(format!(
        "INSERT INTO {} ({}) VALUES {}",
        quoted_table,
        quoted_columns,
        tuples.join(", ")
    ))
}

/// Render one cell as nullable text: strings pass through, other scalars
/// are rendered to their JSON text, null or missing becomes NULL
fn text_value(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}
