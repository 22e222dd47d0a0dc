use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use hotmap_core::model::{DailyStats, Overview, TopUser, TopWord};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub limit: Option<i64>,
    pub days: Option<i64>,
}

pub async fn overview(State(state): State<AppState>) -> Result<Json<Overview>, ApiError> {
    Ok(Json(state.engine.overview().await?))
}

pub async fn daily(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<Vec<DailyStats>>, ApiError> {
    Ok(Json(state.engine.daily_stats(query.days).await?))
}

pub async fn top_words(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<Vec<TopWord>>, ApiError> {
    Ok(Json(state.engine.top_words(query.limit, query.days).await?))
}

pub async fn top_users(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> Result<Json<Vec<TopUser>>, ApiError> {
    Ok(Json(state.engine.top_users(query.limit, query.days).await?))
}
