//! Statement Executor
//!
//! Binds named parameters onto a pool-acquired handle, runs the statement or
//! stored procedure, and normalizes the driver's result into a uniform
//! shape. Validation failures are raised before any database interaction;
//! connection-class failures trigger a single best-effort reconnect before
//! the original error is surfaced.

pub mod params;
pub mod rows;

use futures_util::TryStreamExt;
use serde_json::{Map, Value};
use sqlx::{Either, Executor, Postgres};

use crate::errors::BridgeResult;
use crate::pool::{PoolManager, DEFAULT_CONNECT_ATTEMPTS};

pub use params::ParamValue;

/// Normalized result of a statement, procedure or transaction entry
#[derive(Debug, Clone, Default)]
pub struct ExecutionResult {
    /// Result rows in the database's row and column order
    pub rows: Vec<Value>,
    /// First affected-count the driver reported
    pub rows_affected: u64,
    /// INOUT values returned by a stored procedure
    pub output_parameters: Option<Map<String, Value>>,
}

/// Execute a raw SQL statement with named parameters.
pub async fn execute_query(
    manager: &PoolManager,
    sql: &str,
    params: &Map<String, Value>,
) -> BridgeResult<ExecutionResult> {
    if sql.trim().is_empty() {
        return Err(crate::errors::BridgeError::validation(
            "query must be a non-empty string",
        ));
    }
    let (text, values) = params::bind_named(sql, params)?;

    let pool = manager.ensure_pool(DEFAULT_CONNECT_ATTEMPTS).await?;
    match run_statement(&pool, &text, &values).await {
        Ok(result) => Ok(result),
        Err(e) => Err(manager.surface_failure(e).await),
    }
}

/// Execute a stored procedure by name.
///
/// INOUT values come back as a result row; the first such row is surfaced
/// as `output_parameters` alongside the unmodified row list.
pub async fn execute_procedure(
    manager: &PoolManager,
    name: &str,
    params: &Map<String, Value>,
) -> BridgeResult<ExecutionResult> {
    if name.trim().is_empty() {
        return Err(crate::errors::BridgeError::validation(
            "procedure must be a non-empty string",
        ));
    }
    let (text, values) = params::procedure_call(name, params)?;

    let pool = manager.ensure_pool(DEFAULT_CONNECT_ATTEMPTS).await?;
    match run_statement(&pool, &text, &values).await {
        Ok(mut result) => {
            result.output_parameters = result
                .rows
                .first()
                .and_then(|row| row.as_object().cloned());
            Ok(result)
        }
        Err(e) => Err(manager.surface_failure(e).await),
    }
}

/// Run one bound statement against any executor (pool or open transaction),
/// streaming rows into the result in arrival order.
///
/// Only the first affected-count the driver reports is kept; for
/// multi-statement batches the later counts are dropped.
pub(crate) async fn run_statement<'c, E>(
    executor: E,
    sql: &str,
    values: &[ParamValue],
) -> Result<ExecutionResult, sqlx::Error>
where
    E: Executor<'c, Database = Postgres>,
{
    let mut query = sqlx::query(sql);
    for value in values {
        query = value.bind_to(query);
    }

    let mut stream = executor.fetch_many(query);
    let mut result_rows = Vec::new();
    let mut rows_affected: Option<u64> = None;

    while let Some(item) = stream.try_next().await? {
        match item {
            Either::Left(done) => {
                if rows_affected.is_none() {
                    rows_affected = Some(done.rows_affected());
                }
            }
            Either::Right(row) => result_rows.push(rows::row_to_json(&row)),
        }
    }

    Ok(ExecutionResult {
        rows: result_rows,
        rows_affected: rows_affected.unwrap_or(0),
        output_parameters: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbConfig;
    use crate::errors::BridgeError;

    fn offline_manager() -> PoolManager {
        PoolManager::new(DbConfig {
            host: "192.0.2.1".to_string(),
            ..DbConfig::default()
        })
    }

    #[tokio::test]
    async fn test_empty_query_fails_before_any_database_call() {
        let manager = offline_manager();
        // The manager points at an unreachable host; an immediate
        // validation error proves the database was never contacted.
        let err = execute_query(&manager, "   ", &Map::new()).await.unwrap_err();
        assert!(matches!(err, BridgeError::Validation(_)));
        assert!(manager.current().await.is_none());
    }

    #[tokio::test]
    async fn test_empty_procedure_name_fails_before_any_database_call() {
        let manager = offline_manager();
        let err = execute_procedure(&manager, "", &Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Validation(_)));
        assert!(manager.current().await.is_none());
    }

    #[tokio::test]
    async fn test_missing_parameter_fails_before_any_database_call() {
        let manager = offline_manager();
        let err = execute_query(&manager, "SELECT @nope", &Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Validation(_)));
        assert!(manager.current().await.is_none());
    }
}
