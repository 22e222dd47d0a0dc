//! Domain model of the vote ledger.
//!
//! Row types mirror the storage schema one-to-one; snapshot and view types
//! are the shapes the engine hands back to the HTTP surface. Everything
//! serializes in camelCase to match the public JSON contracts.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Identity record keyed by the external wallet address.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub wallet_address: String,
    pub nickname: Option<String>,
    pub total_votes: i64,
    pub total_paid_votes: i64,
    pub total_spent: f64,
    pub first_vote_at: Option<DateTime<Utc>>,
    pub last_vote_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Votable entity. `total_votes == free_votes + paid_votes` at all times.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Word {
    pub id: i64,
    pub word: String,
    pub category: String,
    pub description: Option<String>,
    pub total_votes: i64,
    pub free_votes: i64,
    pub paid_votes: i64,
    pub current_rank: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ledger entry. Immutable once written; unique per (user, word, day).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: i64,
    pub user_id: i64,
    pub word_id: i64,
    pub is_paid: bool,
    pub amount: f64,
    pub payment_reference: Option<String>,
    pub payment_status: String,
    pub vote_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// One row per externally presented payment reference (globally unique).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: i64,
    pub user_id: i64,
    pub vote_id: Option<i64>,
    pub reference: String,
    pub from_address: String,
    pub to_address: String,
    pub amount: f64,
    pub block_ref: Option<i64>,
    pub status: String,
    pub kind: String,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
}

/// Payment listing row joined with the wallet and (if linked) the word.
#[derive(Clone, Debug, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    pub id: i64,
    pub reference: String,
    pub wallet_address: String,
    pub from_address: String,
    pub to_address: String,
    pub amount: f64,
    pub status: String,
    pub kind: String,
    pub word: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Vote submission input, already shape-validated by the HTTP layer.
#[derive(Clone, Debug)]
pub struct VoteRequest {
    pub wallet_address: String,
    pub word_id: i64,
    pub is_paid: bool,
    pub payment_reference: Option<String>,
}

/// Administrative word creation/edit input.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWord {
    pub word: String,
    pub category: String,
    pub description: Option<String>,
}

/// One user's vote usage for a single calendar day, read inside the
/// transaction that decides admission.
#[derive(Clone, Copy, Debug, Default)]
pub struct DayUsage {
    pub total: i64,
    pub free: i64,
    /// A vote for the target word already exists today.
    pub duplicate: bool,
}

/// Per-day vote counts for one user, returned with every accepted vote.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayStats {
    pub total_votes: i64,
    pub free_votes: i64,
    pub paid_votes: i64,
}

/// Everything a successful vote submission reports back.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteReceipt {
    pub vote: Vote,
    pub user: User,
    pub word: Word,
    pub today_stats: DayStats,
}

/// One of the user's votes today, joined with its word.
#[derive(Clone, Debug, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct VoteDetail {
    pub id: i64,
    pub word_id: i64,
    pub word: String,
    pub category: String,
    pub is_paid: bool,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
}

/// One ledger row joined with its voter and word, for the admin listing.
#[derive(Clone, Debug, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct VoteLedgerEntry {
    pub id: i64,
    pub wallet_address: String,
    pub word_id: i64,
    pub word: String,
    pub is_paid: bool,
    pub amount: f64,
    pub payment_reference: Option<String>,
    pub payment_status: String,
    pub vote_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Today-status snapshot for one wallet.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayStatus {
    pub today_stats: DayStats,
    pub remaining_free_votes: i64,
    pub remaining_total_votes: i64,
    pub today_votes: Vec<VoteDetail>,
}

/// Aggregated per-day ledger slice (global, per word or per user).
#[derive(Clone, Debug, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub vote_date: NaiveDate,
    pub total_votes: i64,
    pub free_votes: i64,
    pub paid_votes: i64,
    pub active_users: i64,
    pub revenue: f64,
}

#[derive(Clone, Debug, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct UserTotals {
    pub total_users: i64,
    pub new_users_7d: i64,
    pub new_users_30d: i64,
}

#[derive(Clone, Debug, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct WordTotals {
    pub total_words: i64,
    pub total_votes: i64,
    pub total_free_votes: i64,
    pub total_paid_votes: i64,
}

#[derive(Clone, Debug, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct TodayTotals {
    pub total_votes: i64,
    pub free_votes: i64,
    pub paid_votes: i64,
    pub active_users: i64,
    pub revenue: f64,
}

#[derive(Clone, Debug, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct RevenueTotals {
    pub total_revenue: f64,
    pub total_payments: i64,
}

/// Read-only overview for the stats surface.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub users: UserTotals,
    pub words: WordTotals,
    pub today: TodayTotals,
    pub revenue: RevenueTotals,
}

/// Leaderboard row: word activity inside the query window.
#[derive(Clone, Debug, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct TopWord {
    pub id: i64,
    pub word: String,
    pub category: String,
    pub total_votes: i64,
    pub current_rank: i64,
    pub recent_votes: i64,
}

/// Leaderboard row: user activity inside the query window.
#[derive(Clone, Debug, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct TopUser {
    pub wallet_address: String,
    pub total_votes: i64,
    pub total_paid_votes: i64,
    pub total_spent: f64,
    pub recent_votes: i64,
    pub recent_paid_votes: i64,
}

/// Per-category rollup over active words.
#[derive(Clone, Debug, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub category: String,
    pub word_count: i64,
    pub total_votes: i64,
}

/// One system_config row.
#[derive(Clone, Debug, Serialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct ConfigEntry {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Bounded pagination input. `page` is 1-based.
#[derive(Clone, Copy, Debug)]
pub struct PageParams {
    pub page: i64,
    pub limit: i64,
}

impl PageParams {
    pub const MAX_LIMIT: i64 = 100;

    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}

/// One page of results plus totals.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, params: PageParams, total: i64) -> Self {
        Self {
            items,
            page: params.page,
            limit: params.limit,
            total,
            total_pages: (total + params.limit - 1) / params.limit,
        }
    }
}

/// Sort allow-list for word listings. Anything outside this enum is a
/// validation error before any query is built.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WordSort {
    #[default]
    TotalVotes,
    CurrentRank,
    CreatedAt,
    Word,
}

impl WordSort {
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "total_votes" => Ok(Self::TotalVotes),
            "current_rank" => Ok(Self::CurrentRank),
            "created_at" => Ok(Self::CreatedAt),
            "word" => Ok(Self::Word),
            other => Err(CoreError::Validation(format!(
                "sort must be one of total_votes, current_rank, created_at, word; got {other:?}"
            ))),
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Self::TotalVotes => "total_votes",
            Self::CurrentRank => "current_rank",
            Self::CreatedAt => "created_at",
            Self::Word => "word",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(CoreError::Validation(format!(
                "order must be asc or desc; got {other:?}"
            ))),
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Word listing query (pagination, text search, category filter, sort).
#[derive(Clone, Debug, Default)]
pub struct WordQuery {
    pub page: PageParams,
    pub search: Option<String>,
    pub category: Option<String>,
    pub sort: WordSort,
    pub order: SortOrder,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn wire_contract_is_camel_case() {
        let vote = Vote {
            id: 1,
            user_id: 2,
            word_id: 3,
            is_paid: true,
            amount: 0.02,
            payment_reference: Some("sig".to_string()),
            payment_status: "confirmed".to_string(),
            vote_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            created_at: Utc.timestamp_opt(0, 0).single().unwrap(),
        };
        let json = serde_json::to_value(&vote).unwrap();
        assert_eq!(json["isPaid"], serde_json::json!(true));
        assert_eq!(json["paymentReference"], serde_json::json!("sig"));
        assert_eq!(json["voteDate"], serde_json::json!("2026-03-01"));
        assert!(json.get("is_paid").is_none());
    }

    #[test]
    fn pagination_is_clamped_and_totalled() {
        let params = PageParams::new(0, 10_000);
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, PageParams::MAX_LIMIT);

        let page = Page::new(vec![1, 2, 3], PageParams::new(1, 2), 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(PageParams::new(3, 2).offset(), 4);
    }

    #[test]
    fn sort_inputs_are_allow_listed() {
        assert_eq!(WordSort::parse("current_rank").unwrap(), WordSort::CurrentRank);
        assert!(WordSort::parse("id; DROP TABLE words").is_err());
        assert_eq!(SortOrder::parse("asc").unwrap(), SortOrder::Asc);
        assert!(SortOrder::parse("sideways").is_err());
    }
}
