//! Transaction Coordinator
//!
//! Executes an ordered list of statements inside one transaction scope:
//! commit on full success, rollback on any failure. Statements run strictly
//! sequentially because each depends on the shared scope; that ordering is
//! a hard guarantee. Partial results are never returned.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::errors::{BridgeError, BridgeResult};
use crate::executor::{self, params, ExecutionResult};
use crate::observability::Logger;
use crate::pool::{PoolManager, DEFAULT_CONNECT_ATTEMPTS};

/// One entry of a transaction plan. Raw queries only; stored-procedure
/// calls have no representation here.
#[derive(Debug, Clone, Deserialize)]
pub struct PlannedStatement {
    pub query: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

/// Run every statement in order inside a single transaction.
///
/// All statements are parameter-bound before the transaction is opened, so
/// a validation failure never reaches the database. On any execution
/// failure the transaction is rolled back and the triggering error is
/// returned; a rollback failure is logged, never surfaced over it.
pub async fn run_transaction(
    manager: &PoolManager,
    statements: &[PlannedStatement],
) -> BridgeResult<Vec<ExecutionResult>> {
    if statements.is_empty() {
        return Err(BridgeError::validation("queries must be a non-empty array"));
    }

    let mut prepared = Vec::with_capacity(statements.len());
    for statement in statements {
        if statement.query.trim().is_empty() {
            return Err(BridgeError::validation(
                "every transaction entry needs a non-empty query",
            ));
        }
        prepared.push(params::bind_named(&statement.query, &statement.params)?);
    }

    let pool = manager.ensure_pool(DEFAULT_CONNECT_ATTEMPTS).await?;
    let mut tx = match pool.begin().await {
        Ok(tx) => tx,
        Err(e) => return Err(manager.surface_failure(e).await),
    };

    let mut results = Vec::with_capacity(prepared.len());
    for (index, (sql, values)) in prepared.iter().enumerate() {
        match executor::run_statement(&mut *tx, sql, values).await {
            Ok(result) => results.push(result),
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    // The original error always wins over a rollback failure
                    Logger::error(
                        "transaction.rollback_failed",
                        &[
                            ("statement_index", index.to_string()),
                            ("error", BridgeError::Rollback(rollback_err.to_string()).to_string()),
                        ],
                    );
                }
                return Err(manager.surface_failure(e).await);
            }
        }
    }

    match tx.commit().await {
        Ok(()) => Ok(results),
        Err(e) => Err(manager.surface_failure(e).await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DbConfig;
    use serde_json::json;

    fn offline_manager() -> PoolManager {
        PoolManager::new(DbConfig {
            host: "192.0.2.1".to_string(),
            ..DbConfig::default()
        })
    }

    #[tokio::test]
    async fn test_empty_plan_fails_before_opening_a_transaction() {
        let manager = offline_manager();
        let err = run_transaction(&manager, &[]).await.unwrap_err();
        assert!(matches!(err, BridgeError::Validation(_)));
        assert!(manager.current().await.is_none());
    }

    #[tokio::test]
    async fn test_blank_entry_fails_before_opening_a_transaction() {
        let manager = offline_manager();
        let plan = [PlannedStatement {
            query: "  ".to_string(),
            params: Map::new(),
        }];
        let err = run_transaction(&manager, &plan).await.unwrap_err();
        assert!(matches!(err, BridgeError::Validation(_)));
        assert!(manager.current().await.is_none());
    }

    #[tokio::test]
    async fn test_binding_failure_in_any_entry_aborts_the_whole_plan() {
        let manager = offline_manager();
        let plan = [
            PlannedStatement {
                query: "SELECT @a".to_string(),
                params: json!({"a": 1}).as_object().cloned().unwrap(),
            },
            PlannedStatement {
                query: "SELECT @missing".to_string(),
                params: Map::new(),
            },
        ];
        let err = run_transaction(&manager, &plan).await.unwrap_err();
        assert!(matches!(err, BridgeError::Validation(_)));
        assert!(manager.current().await.is_none());
    }

    #[test]
    fn test_planned_statement_params_default_to_empty() {
        let parsed: PlannedStatement =
            serde_json::from_str(r#"{"query": "SELECT 1"}"#).unwrap();
        assert!(parsed.params.is_empty());
    }
}
