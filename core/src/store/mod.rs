//! Storage abstraction for the vote ledger.
//!
//! Every trait method is one atomic unit of work; in particular
//! [`Store::record_vote`] performs the whole quota-evaluate-then-write
//! sequence in a single transaction so two concurrent attempts can never
//! both pass the duplicate or free-quota checks. [`MemoryStore`] is the
//! test double (one lock == one transaction); [`PgStore`] is the durable
//! production path.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::CoreError;
use crate::model::{
    CategoryStats, ConfigEntry, DailyStats, DayStats, NewWord, Overview, Page, PageParams,
    PaymentView, TopUser, TopWord, TodayStatus, User, VoteLedgerEntry, VoteReceipt, VoteRequest,
    Word, WordQuery,
};
use crate::policy::QuotaPolicy;

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync + 'static {
    /// Cheap connectivity probe for readiness checks.
    async fn ping(&self) -> Result<(), CoreError>;

    // Identity -----------------------------------------------------------

    /// Returns the user for a wallet address, creating one on first
    /// contact. Idempotent under concurrency: a racing duplicate insert
    /// resolves to the existing row. The bool reports whether the row was
    /// created by this call.
    async fn resolve_user(&self, wallet: &str) -> Result<(User, bool), CoreError>;

    async fn get_user(&self, wallet: &str) -> Result<Option<User>, CoreError>;

    async fn list_users(&self, page: PageParams) -> Result<Page<User>, CoreError>;

    /// Administrative purge; cascades to the user's votes and payments.
    async fn delete_user(&self, id: i64) -> Result<(), CoreError>;

    // Words --------------------------------------------------------------

    /// Rejects duplicates by exact text match with [`CoreError::WordExists`].
    async fn add_word(&self, new: &NewWord) -> Result<Word, CoreError>;

    async fn update_word(&self, id: i64, new: &NewWord) -> Result<Word, CoreError>;

    async fn set_word_active(&self, id: i64, active: bool) -> Result<Word, CoreError>;

    /// Hard delete; cascades to the word's votes.
    async fn delete_word(&self, id: i64) -> Result<(), CoreError>;

    async fn get_word(&self, id: i64) -> Result<Option<Word>, CoreError>;

    async fn list_words(&self, query: &WordQuery) -> Result<Page<Word>, CoreError>;

    /// Top words by lifetime votes (heatmap surface).
    async fn top_words(&self, limit: i64) -> Result<Vec<Word>, CoreError>;

    async fn word_categories(&self) -> Result<Vec<CategoryStats>, CoreError>;

    /// Per-day vote history of one word, newest first.
    async fn word_history(
        &self,
        word_id: i64,
        today: NaiveDate,
        days: i64,
    ) -> Result<Vec<DailyStats>, CoreError>;

    // Configuration ------------------------------------------------------

    async fn load_policy(&self) -> Result<QuotaPolicy, CoreError>;

    async fn list_config(&self) -> Result<Vec<ConfigEntry>, CoreError>;

    async fn set_config(&self, key: &str, value: &str) -> Result<ConfigEntry, CoreError>;

    // Ledger -------------------------------------------------------------

    /// The vote ledger writer. Atomically: admit via the quota evaluator
    /// (against usage read in the same transaction), verify the payment
    /// reference is unused, insert the vote, bump word and user counters,
    /// and insert the payment row for paid votes. All effects commit
    /// together or not at all.
    async fn record_vote(
        &self,
        user_id: i64,
        request: &VoteRequest,
        policy: &QuotaPolicy,
        day: NaiveDate,
    ) -> Result<VoteReceipt, CoreError>;

    /// Today-status snapshot (counts, remaining quota, today's votes).
    async fn today_status(
        &self,
        user_id: i64,
        day: NaiveDate,
        policy: &QuotaPolicy,
    ) -> Result<TodayStatus, CoreError>;

    async fn day_stats(&self, user_id: i64, day: NaiveDate) -> Result<DayStats, CoreError>;

    /// Per-day history of one user's votes, newest first.
    async fn user_history(
        &self,
        user_id: i64,
        days_limit: i64,
    ) -> Result<Vec<DailyStats>, CoreError>;

    /// Full paginated ledger, newest first (administrative surface).
    async fn list_votes(&self, page: PageParams) -> Result<Page<VoteLedgerEntry>, CoreError>;

    // Payments -----------------------------------------------------------

    async fn payment_seen(&self, reference: &str) -> Result<bool, CoreError>;

    async fn list_payments(
        &self,
        wallet: Option<&str>,
        page: PageParams,
    ) -> Result<Vec<PaymentView>, CoreError>;

    // Ranking ------------------------------------------------------------

    /// Reassigns ordinal ranks 1..N over active words by total votes
    /// descending, ties broken by earliest creation. Idempotent; returns
    /// the number of words ranked.
    async fn recalculate_ranks(&self) -> Result<u64, CoreError>;

    // Stats --------------------------------------------------------------

    async fn overview(&self, today: NaiveDate) -> Result<Overview, CoreError>;

    async fn daily_stats(&self, today: NaiveDate, days: i64) -> Result<Vec<DailyStats>, CoreError>;

    async fn top_words_windowed(
        &self,
        today: NaiveDate,
        limit: i64,
        days: i64,
    ) -> Result<Vec<TopWord>, CoreError>;

    async fn top_users(
        &self,
        today: NaiveDate,
        limit: i64,
        days: i64,
    ) -> Result<Vec<TopUser>, CoreError>;
}
