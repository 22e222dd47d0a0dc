use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use hotmap_core::model::{
    CategoryStats, DailyStats, NewWord, Page, SortOrder, Word, WordQuery, WordSort,
};

use crate::error::ApiError;
use crate::handlers::PageQuery;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct WordListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

/// A word plus its share of all votes across active words.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordWithShare {
    #[serde(flatten)]
    pub word: Word,
    pub percentage: f64,
}

fn share(votes: i64, total: i64) -> f64 {
    if total > 0 {
        votes as f64 / total as f64 * 100.0
    } else {
        0.0
    }
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<WordListQuery>,
) -> Result<Json<Page<WordWithShare>>, ApiError> {
    let word_query = WordQuery {
        page: PageQuery {
            page: query.page,
            limit: query.limit,
        }
        .params(),
        search: query.search.filter(|s| !s.trim().is_empty()),
        category: query.category.filter(|c| !c.trim().is_empty()),
        sort: query.sort.as_deref().map(WordSort::parse).transpose()?.unwrap_or_default(),
        order: query
            .order
            .as_deref()
            .map(SortOrder::parse)
            .transpose()?
            .unwrap_or_default(),
    };
    let page = state.engine.list_words(&word_query).await?;

    let all_votes: i64 = state
        .engine
        .word_categories()
        .await?
        .iter()
        .map(|c| c.total_votes)
        .sum();
    let items = page
        .items
        .into_iter()
        .map(|word| WordWithShare {
            percentage: share(word.total_votes, all_votes),
            word,
        })
        .collect();
    Ok(Json(Page {
        items,
        page: page.page,
        limit: page.limit,
        total: page.total,
        total_pages: page.total_pages,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordDetail {
    pub word: Word,
    pub history: Vec<DailyStats>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DaysQuery {
    pub days: Option<i64>,
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<WordDetail>, ApiError> {
    let word = state.engine.get_word(id).await?;
    let history = state.engine.word_history(id, query.days).await?;
    Ok(Json(WordDetail { word, history }))
}

pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<NewWord>,
) -> Result<(StatusCode, Json<Word>), ApiError> {
    let word = state.engine.add_word(&body).await?;
    tracing::info!(word_id = word.id, word = %word.word, "word added");
    Ok((StatusCode::CREATED, Json(word)))
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

/// Heatmap entry: vote share across the slice plus a 0..1 intensity
/// relative to the hottest word.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeatmapEntry {
    #[serde(flatten)]
    pub word: Word,
    pub percentage: f64,
    pub heat_value: f64,
}

pub async fn heatmap(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<HeatmapEntry>>, ApiError> {
    let words = state.engine.heatmap(query.limit).await?;
    let slice_votes: i64 = words.iter().map(|w| w.total_votes).sum();
    let max_votes = words.iter().map(|w| w.total_votes).max().unwrap_or(0);
    let entries = words
        .into_iter()
        .map(|word| HeatmapEntry {
            percentage: share(word.total_votes, slice_votes),
            heat_value: if max_votes > 0 {
                word.total_votes as f64 / max_votes as f64
            } else {
                0.0
            },
            word,
        })
        .collect();
    Ok(Json(entries))
}

pub async fn categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryStats>>, ApiError> {
    Ok(Json(state.engine.word_categories().await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankResult {
    pub ranked_words: u64,
}

pub async fn recalculate_ranks(
    State(state): State<AppState>,
) -> Result<Json<RankResult>, ApiError> {
    let ranked_words = state.engine.recalculate_ranks().await?;
    Ok(Json(RankResult { ranked_words }))
}
