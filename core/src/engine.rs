//! The vote engine: validation and orchestration in front of the store.
//!
//! The engine owns everything that does not need the database to decide:
//! wallet shape, payload lengths, day selection, clamping of query windows.
//! The store owns everything that does. Days are always computed here, in
//! UTC, and passed down explicitly so one vote attempt sees one date.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::error::CoreError;
use crate::model::{
    CategoryStats, ConfigEntry, DailyStats, NewWord, Overview, Page, PageParams, PaymentView,
    TodayStatus, TopUser, TopWord, User, VoteLedgerEntry, VoteReceipt, VoteRequest, Word,
    WordQuery,
};
use crate::payment::{self, PaymentClaim};
use crate::policy::{self, QuotaPolicy};
use crate::store::Store;
use crate::wallet;

const MAX_WORD_LEN: usize = 100;
const MAX_CATEGORY_LEN: usize = 50;
const MAX_DESCRIPTION_LEN: usize = 500;
const MAX_WINDOW_DAYS: i64 = 365;

pub struct VoteEngine<S: Store + ?Sized> {
    store: Arc<S>,
}

impl<S: Store + ?Sized> Clone for VoteEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Store + ?Sized> VoteEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn clamp_days(days: Option<i64>, default: i64) -> i64 {
        days.unwrap_or(default).clamp(1, MAX_WINDOW_DAYS)
    }

    fn clamp_limit(limit: Option<i64>, default: i64) -> i64 {
        limit.unwrap_or(default).clamp(1, 100)
    }

    pub async fn ping(&self) -> Result<(), CoreError> {
        self.store.ping().await
    }

    /// Resolves a wallet to its account, creating one on first contact.
    pub async fn login(&self, wallet: &str) -> Result<(User, bool), CoreError> {
        wallet::validate(wallet)?;
        self.store.resolve_user(wallet).await
    }

    /// Submits a vote for today, UTC.
    pub async fn submit_vote(&self, request: &VoteRequest) -> Result<VoteReceipt, CoreError> {
        wallet::validate(&request.wallet_address)?;
        if request.is_paid
            && request
                .payment_reference
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .is_none()
        {
            return Err(CoreError::PaymentMissing);
        }
        let policy = self.store.load_policy().await?;
        let (user, _) = self.store.resolve_user(&request.wallet_address).await?;
        self.store
            .record_vote(user.id, request, &policy, Self::today())
            .await
    }

    /// Today's usage, remaining quota and vote details for a wallet.
    pub async fn today_status(&self, wallet: &str) -> Result<(TodayStatus, QuotaPolicy), CoreError> {
        wallet::validate(wallet)?;
        let user = self
            .store
            .get_user(wallet)
            .await?
            .ok_or(CoreError::NotFound("user"))?;
        let policy = self.store.load_policy().await?;
        let status = self
            .store
            .today_status(user.id, Self::today(), &policy)
            .await?;
        Ok((status, policy))
    }

    pub async fn user_stats(&self, wallet: &str) -> Result<(User, Vec<DailyStats>), CoreError> {
        wallet::validate(wallet)?;
        let user = self
            .store
            .get_user(wallet)
            .await?
            .ok_or(CoreError::NotFound("user"))?;
        let history = self.store.user_history(user.id, 30).await?;
        Ok((user, history))
    }

    /// Checks a payment claim against policy without recording anything.
    pub async fn verify_payment(&self, claim: &PaymentClaim) -> Result<(), CoreError> {
        let policy = self.store.load_policy().await?;
        payment::verify_claim(&policy, claim)?;
        if self.store.payment_seen(&claim.reference).await? {
            return Err(CoreError::PaymentAlreadyUsed);
        }
        Ok(())
    }

    pub async fn list_payments(
        &self,
        wallet: Option<&str>,
        page: PageParams,
    ) -> Result<Vec<PaymentView>, CoreError> {
        if let Some(w) = wallet {
            wallet::validate(w)?;
        }
        self.store.list_payments(wallet, page).await
    }

    fn validate_word(new: &NewWord) -> Result<NewWord, CoreError> {
        let word = new.word.trim();
        if word.is_empty() || word.chars().count() > MAX_WORD_LEN {
            return Err(CoreError::Validation(format!(
                "word must be 1..={MAX_WORD_LEN} characters"
            )));
        }
        let category = new.category.trim();
        if category.is_empty() || category.chars().count() > MAX_CATEGORY_LEN {
            return Err(CoreError::Validation(format!(
                "category must be 1..={MAX_CATEGORY_LEN} characters"
            )));
        }
        let description = new
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        if description.map(|d| d.chars().count() > MAX_DESCRIPTION_LEN) == Some(true) {
            return Err(CoreError::Validation(format!(
                "description must be at most {MAX_DESCRIPTION_LEN} characters"
            )));
        }
        Ok(NewWord {
            word: word.to_string(),
            category: category.to_string(),
            description: description.map(str::to_string),
        })
    }

    pub async fn add_word(&self, new: &NewWord) -> Result<Word, CoreError> {
        let new = Self::validate_word(new)?;
        self.store.add_word(&new).await
    }

    pub async fn update_word(&self, id: i64, new: &NewWord) -> Result<Word, CoreError> {
        let new = Self::validate_word(new)?;
        self.store.update_word(id, &new).await
    }

    pub async fn set_word_active(&self, id: i64, active: bool) -> Result<Word, CoreError> {
        self.store.set_word_active(id, active).await
    }

    pub async fn delete_word(&self, id: i64) -> Result<(), CoreError> {
        self.store.delete_word(id).await
    }

    pub async fn get_word(&self, id: i64) -> Result<Word, CoreError> {
        self.store
            .get_word(id)
            .await?
            .ok_or(CoreError::NotFound("word"))
    }

    pub async fn list_words(&self, query: &WordQuery) -> Result<Page<Word>, CoreError> {
        self.store.list_words(query).await
    }

    /// The heatmap slice: top words by all-time votes, policy-sized by default.
    pub async fn heatmap(&self, limit: Option<i64>) -> Result<Vec<Word>, CoreError> {
        let policy = self.store.load_policy().await?;
        let limit = Self::clamp_limit(limit, policy.leaderboard_size);
        self.store.top_words(limit).await
    }

    pub async fn word_categories(&self) -> Result<Vec<CategoryStats>, CoreError> {
        self.store.word_categories().await
    }

    pub async fn word_history(
        &self,
        word_id: i64,
        days: Option<i64>,
    ) -> Result<Vec<DailyStats>, CoreError> {
        self.get_word(word_id).await?;
        self.store
            .word_history(word_id, Self::today(), Self::clamp_days(days, 30))
            .await
    }

    pub async fn recalculate_ranks(&self) -> Result<u64, CoreError> {
        let ranked = self.store.recalculate_ranks().await?;
        tracing::info!(ranked, "leaderboard ranks recalculated");
        Ok(ranked)
    }

    pub async fn overview(&self) -> Result<Overview, CoreError> {
        self.store.overview(Self::today()).await
    }

    pub async fn daily_stats(&self, days: Option<i64>) -> Result<Vec<DailyStats>, CoreError> {
        self.store
            .daily_stats(Self::today(), Self::clamp_days(days, 30))
            .await
    }

    pub async fn top_words(
        &self,
        limit: Option<i64>,
        days: Option<i64>,
    ) -> Result<Vec<TopWord>, CoreError> {
        self.store
            .top_words_windowed(
                Self::today(),
                Self::clamp_limit(limit, 10),
                Self::clamp_days(days, 7),
            )
            .await
    }

    pub async fn top_users(
        &self,
        limit: Option<i64>,
        days: Option<i64>,
    ) -> Result<Vec<TopUser>, CoreError> {
        self.store
            .top_users(
                Self::today(),
                Self::clamp_limit(limit, 10),
                Self::clamp_days(days, 7),
            )
            .await
    }

    pub async fn list_users(&self, page: PageParams) -> Result<Page<User>, CoreError> {
        self.store.list_users(page).await
    }

    pub async fn delete_user(&self, id: i64) -> Result<(), CoreError> {
        self.store.delete_user(id).await
    }

    pub async fn list_votes(&self, page: PageParams) -> Result<Page<VoteLedgerEntry>, CoreError> {
        self.store.list_votes(page).await
    }

    pub async fn list_config(&self) -> Result<Vec<ConfigEntry>, CoreError> {
        self.store.list_config().await
    }

    pub async fn set_config(&self, key: &str, value: &str) -> Result<ConfigEntry, CoreError> {
        policy::validate_value(key, value)?;
        self.store.set_config(key, value).await
    }

    pub async fn load_policy(&self) -> Result<QuotaPolicy, CoreError> {
        self.store.load_policy().await
    }
}
