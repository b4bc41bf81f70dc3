use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tq_ledger::{ChainVerification, LedgerError, NewActivity};
use tq_types::{ActivitySubmission, Block, Campaign, Receipt};

use crate::error::ApiError;
use crate::router::{AppState, Ledger};

/// Run a ledger call on the blocking pool.
async fn blocking<T, F>(state: &AppState, call: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Ledger) -> Result<T, LedgerError> + Send + 'static,
{
    let ledger = state.ledger.clone();
    let result = tokio::task::spawn_blocking(move || call(&ledger))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(result?)
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    let Json(value) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    if !value.is_object() {
        return Err(ApiError::bad_request("expected a JSON object"));
    }
    Ok(value)
}

/// Health check handler.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Info handler.
pub async fn info_handler(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let (tip, blocks) =
        blocking(&state, |ledger| Ok((ledger.tip()?, ledger.block_count()?))).await?;
    Ok(Json(json!({
        "name": "tq-server",
        "version": env!("CARGO_PKG_VERSION"),
        "blocks": blocks,
        "tip": tip.map(|t| json!({ "height": t.height, "hash": t.hash })),
    })))
}

/// `POST /activities`: validate and append one activity submission.
pub async fn add_activity_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Receipt>, ApiError> {
    let body = json_body(body)?;
    let new = NewActivity::from_json(&body)?;
    let receipt = blocking(&state, move |ledger| ledger.add_activity(new)).await?;
    Ok(Json(receipt))
}

/// `GET /activities`: every submission, oldest first.
pub async fn list_activities_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<ActivitySubmission>>, ApiError> {
    let events = blocking(&state, |ledger| ledger.get_activity_events()).await?;
    Ok(Json(events))
}

/// `GET /chain/verify`
pub async fn verify_chain_handler(
    State(state): State<AppState>,
) -> Result<Json<ChainVerification>, ApiError> {
    let result = blocking(&state, |ledger| Ok(ledger.verify_chain())).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct ChainQuery {
    pub limit: Option<u64>,
}

/// One block as shown by the chain viewer, payload decoded.
#[derive(Debug, Serialize)]
pub struct ChainEntry {
    pub height: u64,
    pub ts: i64,
    pub prev_hash: String,
    pub hash: String,
    pub event_type: String,
    pub payload: Value,
}

impl From<Block> for ChainEntry {
    fn from(block: Block) -> Self {
        let payload = block
            .payload_value()
            .unwrap_or_else(|_| Value::String(block.payload_json.clone()));
        Self {
            height: block.height,
            ts: block.timestamp,
            prev_hash: block.prev_hash,
            hash: block.hash,
            event_type: block.event_type,
            payload,
        }
    }
}

/// `GET /chain?limit=N`: the newest blocks, oldest first.
pub async fn chain_handler(
    State(state): State<AppState>,
    Query(query): Query<ChainQuery>,
) -> Result<Json<Vec<ChainEntry>>, ApiError> {
    let limit = query.limit.unwrap_or(state.chain_limit);
    let blocks = blocking(&state, move |ledger| ledger.blocks(Some(limit))).await?;
    Ok(Json(blocks.into_iter().map(ChainEntry::from).collect()))
}

/// `POST /campaigns`: append one generated campaign.
pub async fn add_campaign_handler(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Receipt>, ApiError> {
    let body = json_body(body)?;
    let campaign: Campaign = serde_json::from_value(body).map_err(|e| ApiError::BadRequest {
        detail: e.to_string(),
        field: None,
    })?;
    let receipt = blocking(&state, move |ledger| ledger.record_campaign(campaign)).await?;
    Ok(Json(receipt))
}
