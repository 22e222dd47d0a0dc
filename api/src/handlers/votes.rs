use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use hotmap_core::model::{VoteDetail, VoteReceipt, VoteRequest};
use hotmap_core::policy::PolicySnapshot;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteBody {
    pub wallet_address: String,
    pub word_id: i64,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub payment_reference: Option<String>,
}

pub async fn submit(
    State(state): State<AppState>,
    Json(body): Json<VoteBody>,
) -> Result<(StatusCode, Json<VoteReceipt>), ApiError> {
    let request = VoteRequest {
        wallet_address: body.wallet_address,
        word_id: body.word_id,
        is_paid: body.is_paid,
        payment_reference: body.payment_reference,
    };
    let receipt = state.engine.submit_vote(&request).await?;
    let kind = if receipt.vote.is_paid { "paid" } else { "free" };
    metrics::counter!("votes_recorded_total", "kind" => kind).increment(1);
    tracing::info!(
        user_id = receipt.user.id,
        word_id = receipt.word.id,
        paid = receipt.vote.is_paid,
        "vote recorded"
    );
    Ok((StatusCode::CREATED, Json(receipt)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayResponse {
    pub today_stats: TodayStatsBody,
    pub today_votes: Vec<VoteDetail>,
    pub config: PolicySnapshot,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayStatsBody {
    pub total_votes: i64,
    pub free_votes: i64,
    pub paid_votes: i64,
    pub remaining_free_votes: i64,
    pub remaining_total_votes: i64,
}

pub async fn today(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> Result<Json<TodayResponse>, ApiError> {
    let (status, policy) = state.engine.today_status(&wallet).await?;
    Ok(Json(TodayResponse {
        today_stats: TodayStatsBody {
            total_votes: status.today_stats.total_votes,
            free_votes: status.today_stats.free_votes,
            paid_votes: status.today_stats.paid_votes,
            remaining_free_votes: status.remaining_free_votes,
            remaining_total_votes: status.remaining_total_votes,
        },
        today_votes: status.today_votes,
        config: policy.snapshot(),
    }))
}
