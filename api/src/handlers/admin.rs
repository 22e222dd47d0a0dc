//! Token-guarded administrative surface.
//!
//! A static bearer token from configuration gates every route here; when
//! no token is configured the whole surface answers 401.

use axum::extract::{Path, Query, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use hotmap_core::model::{ConfigEntry, NewWord, Page, User, VoteLedgerEntry, Word};

use crate::error::ApiError;
use crate::handlers::PageQuery;
use crate::state::AppState;

pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err(ApiError::Unauthorized);
    };
    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    if presented != Some(expected) {
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(request).await)
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<User>>, ApiError> {
    Ok(Json(state.engine.list_users(query.params()).await?))
}

pub async fn list_votes(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<VoteLedgerEntry>>, ApiError> {
    Ok(Json(state.engine.list_votes(query.params()).await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.engine.delete_user(id).await?;
    tracing::info!(user_id = id, "user deleted");
    Ok(Json(serde_json::json!({ "deleted": id })))
}

pub async fn update_word(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<NewWord>,
) -> Result<Json<Word>, ApiError> {
    Ok(Json(state.engine.update_word(id, &body).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveBody {
    pub is_active: bool,
}

pub async fn set_word_active(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<ActiveBody>,
) -> Result<Json<Word>, ApiError> {
    Ok(Json(state.engine.set_word_active(id, body.is_active).await?))
}

pub async fn delete_word(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.engine.delete_word(id).await?;
    tracing::info!(word_id = id, "word deleted");
    Ok(Json(serde_json::json!({ "deleted": id })))
}

pub async fn list_config(
    State(state): State<AppState>,
) -> Result<Json<Vec<ConfigEntry>>, ApiError> {
    Ok(Json(state.engine.list_config().await?))
}

#[derive(Debug, Deserialize)]
pub struct ConfigBody {
    pub value: String,
}

pub async fn set_config(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<ConfigBody>,
) -> Result<Json<ConfigEntry>, ApiError> {
    let entry = state.engine.set_config(&key, &body.value).await?;
    tracing::info!(key = %entry.key, value = %entry.value, "config updated");
    Ok(Json(entry))
}
