//! API Handlers
use crate::error::ApiError;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use oracle_core::{HostContext, OracleError, ProgramRunner, Reveal, StageRecord, VmResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    /// Request payload handed to the execution stage, e.g. "WBTC/USDC"
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub node_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TallyRequest {
    /// Tally side payload; not used by the median tally
    #[serde(default)]
    pub input: String,
    #[serde(default)]
    pub reveals: Vec<Reveal>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResponse {
    #[serde(flatten)]
    pub result: VmResult,
    /// Decoded report when the payload is an 8-byte value
    pub result_value: Option<u64>,
    pub record: StageRecord,
}

impl StageResponse {
    fn new(result: VmResult, record: StageRecord) -> Self {
        Self {
            result_value: result.report(),
            result,
            record,
        }
    }
}

fn runner<'a>(state: &'a AppState, id: &str) -> Result<&'a ProgramRunner, ApiError> {
    state
        .runners
        .get(id)
        .ok_or_else(|| OracleError::UnknownProgram(id.to_string()).into())
}

pub async fn execute(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<ExecuteRequest>,
) -> Result<Json<StageResponse>, ApiError> {
    let runner = runner(&state, &id)?;
    let mut ctx = HostContext::new(id.as_str());
    if let Some(node) = req.node_id {
        ctx = ctx.with_node(node);
    }

    let (result, record) = runner
        .execute(req.input.as_bytes(), &ctx, state.http.as_ref())
        .await;
    state.metrics.observe_execution(&id, result.exit_code);

    Ok(Json(StageResponse::new(result, record)))
}

pub async fn tally(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<TallyRequest>,
) -> Result<Json<StageResponse>, ApiError> {
    let runner = runner(&state, &id)?;
    let ctx = HostContext::new(id.as_str());

    let (result, record) = runner.tally(req.input.as_bytes(), &ctx, &req.reveals);
    state.metrics.observe_tally(&id, result.exit_code);

    Ok(Json(StageResponse::new(result, record)))
}

pub async fn list_programs(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let mut programs: Vec<Value> = state
        .runners
        .values()
        .map(|r| {
            let program = r.program();
            json!({
                "id": program.id,
                "execution": program.execution.id(),
                "tally": program.tally.id(),
            })
        })
        .collect();
    programs.sort_by(|a, b| a["id"].as_str().cmp(&b["id"].as_str()));

    (StatusCode::OK, Json(json!({ "programs": programs })))
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<String, ApiError> {
    state
        .metrics
        .encode()
        .map_err(|e| ApiError::Internal(e.to_string()))
}

pub async fn health() -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "version": oracle_core::ORACLE_VERSION })),
    )
}
