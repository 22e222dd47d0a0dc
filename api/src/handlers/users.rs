use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use hotmap_core::model::{DailyStats, User};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginBody {
    pub wallet_address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: User,
    pub created: bool,
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<(StatusCode, Json<LoginResponse>), ApiError> {
    let (user, created) = state.engine.login(&body.wallet_address).await?;
    if created {
        metrics::counter!("users_created_total").increment(1);
        tracing::info!(user_id = user.id, "new wallet resolved");
    }
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(LoginResponse { user, created })))
}

pub async fn get(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> Result<Json<User>, ApiError> {
    let (user, _) = state.engine.user_stats(&wallet).await?;
    Ok(Json(user))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatsResponse {
    pub user: User,
    pub daily_stats: Vec<DailyStats>,
}

pub async fn stats(
    State(state): State<AppState>,
    Path(wallet): Path<String>,
) -> Result<Json<UserStatsResponse>, ApiError> {
    let (user, daily_stats) = state.engine.user_stats(&wallet).await?;
    Ok(Json(UserStatsResponse { user, daily_stats }))
}
