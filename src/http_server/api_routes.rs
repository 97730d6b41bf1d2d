//! API HTTP Routes
//!
//! Endpoints for query execution, stored procedures, bulk inserts and
//! transactions.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::bulk::{self, BulkSpec};
use crate::executor;
use crate::transaction::{self, PlannedStatement};

use super::errors::ApiError;
use super::server::AppState;

// ==================
// Request/Response Types
// ==================

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: Option<String>,
    #[serde(default)]
    pub params: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub success: bool,
    pub data: Vec<Value>,
    #[serde(rename = "rowsAffected")]
    pub rows_affected: u64,
}

#[derive(Debug, Deserialize)]
pub struct ProcedureRequest {
    pub procedure: Option<String>,
    #[serde(default)]
    pub params: Map<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct ProcedureResponse {
    pub success: bool,
    pub data: Vec<Value>,
    #[serde(rename = "outputParameters")]
    pub output_parameters: Map<String, Value>,
    #[serde(rename = "rowsAffected")]
    pub rows_affected: u64,
}

#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub table: Option<String>,
    #[serde(default)]
    pub data: Vec<Map<String, Value>>,
}

#[derive(Debug, Serialize)]
pub struct BulkResponse {
    pub success: bool,
    #[serde(rename = "rowsAffected")]
    pub rows_affected: u64,
}

#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    #[serde(default)]
    pub queries: Vec<PlannedStatement>,
}

#[derive(Debug, Serialize)]
pub struct StatementResult {
    pub data: Vec<Value>,
    #[serde(rename = "rowsAffected")]
    pub rows_affected: u64,
}

#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub success: bool,
    pub results: Vec<StatementResult>,
}

// ==================
// API Routes
// ==================

/// Create API routes (nested under /api)
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/query", post(query_handler))
        .route("/procedure", post(procedure_handler))
        .route("/bulk", post(bulk_handler))
        .route("/transaction", post(transaction_handler))
        .with_state(state)
}

// ==================
// Handlers
// ==================

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let sql = request.query.as_deref().unwrap_or_default();
    let result = executor::execute_query(&state.manager, sql, &request.params)
        .await
        .map_err(|e| state.api_error("query", e))?;

    Ok(Json(QueryResponse {
        success: true,
        data: result.rows,
        rows_affected: result.rows_affected,
    }))
}

async fn procedure_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProcedureRequest>,
) -> Result<Json<ProcedureResponse>, ApiError> {
    let name = request.procedure.as_deref().unwrap_or_default();
    let result = executor::execute_procedure(&state.manager, name, &request.params)
        .await
        .map_err(|e| state.api_error("procedure", e))?;

    Ok(Json(ProcedureResponse {
        success: true,
        output_parameters: result.output_parameters.clone().unwrap_or_default(),
        data: result.rows,
        rows_affected: result.rows_affected,
    }))
}

async fn bulk_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BulkRequest>,
) -> Result<Json<BulkResponse>, ApiError> {
    let spec = BulkSpec {
        table: request.table.unwrap_or_default(),
        rows: request.data,
    };
    let rows_affected = bulk::bulk_insert(&state.manager, &spec)
        .await
        .map_err(|e| state.api_error("bulk", e))?;

    Ok(Json(BulkResponse {
        success: true,
        rows_affected,
    }))
}

async fn transaction_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TransactionRequest>,
) -> Result<Json<TransactionResponse>, ApiError> {
    let results = transaction::run_transaction(&state.manager, &request.queries)
        .await
        .map_err(|e| state.api_error("transaction", e))?;

    Ok(Json(TransactionResponse {
        success: true,
        results: results
            .into_iter()
            .map(|r| StatementResult {
                data: r.rows,
                rows_affected: r.rows_affected,
            })
            .collect(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_response_field_names() {
        let response = QueryResponse {
            success: true,
            data: vec![],
            rows_affected: 3,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"rowsAffected\":3"));
    }

    #[test]
    fn test_procedure_response_field_names() {
        let response = ProcedureResponse {
            success: true,
            data: vec![],
            output_parameters: Map::new(),
            rows_affected: 0,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("outputParameters"));
    }

    #[test]
    fn test_query_request_params_default_to_empty() {
        let parsed: QueryRequest = serde_json::from_str(r#"{"query": "SELECT 1"}"#).unwrap();
        assert!(parsed.params.is_empty());
        assert_eq!(parsed.query.as_deref(), Some("SELECT 1"));
    }
}
