use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use hotmap_core::model::PaymentView;
use hotmap_core::payment::PaymentClaim;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PaymentListQuery {
    pub wallet: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<PaymentListQuery>,
) -> Result<Json<Vec<PaymentView>>, ApiError> {
    let params = crate::handlers::PageQuery {
        page: query.page,
        limit: query.limit,
    }
    .params();
    let wallet = query.wallet.as_deref().map(str::trim).filter(|w| !w.is_empty());
    Ok(Json(state.engine.list_payments(wallet, params).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyBody {
    pub reference: String,
    pub from_address: String,
    pub to_address: String,
    pub amount: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub valid: bool,
    pub reference: String,
}

/// Pre-flight check: does this claim match policy and is the reference
/// still unused. Nothing is recorded.
pub async fn verify(
    State(state): State<AppState>,
    Json(body): Json<VerifyBody>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let claim = PaymentClaim {
        reference: body.reference,
        from_address: body.from_address,
        to_address: body.to_address,
        amount: body.amount,
    };
    state.engine.verify_payment(&claim).await?;
    Ok(Json(VerifyResponse {
        valid: true,
        reference: claim.reference,
    }))
}
