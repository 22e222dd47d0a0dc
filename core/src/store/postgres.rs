//! Postgres-backed store.
//!
//! `record_vote` runs the whole check-then-write sequence inside one
//! SERIALIZABLE transaction and retries on serialization failures with a
//! capped doubling backoff. Unique constraints remain the final arbiter:
//! whatever races past the in-transaction checks dies on
//! `votes_user_word_day_key` or `payments_reference_key` and maps to the
//! same domain error the checks would have produced.
//!
//! All queries go through the runtime API with explicit binds, so the
//! crate builds without a live database.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::error::CoreError;
use crate::model::{
    CategoryStats, ConfigEntry, DailyStats, DayStats, DayUsage, NewWord, Overview, Page,
    PageParams, PaymentView, RevenueTotals, TodayStatus, TodayTotals, TopUser, TopWord, User,
    UserTotals, Vote, VoteDetail, VoteLedgerEntry, VoteReceipt, VoteRequest, Word, WordQuery,
    WordTotals,
};
use crate::policy::QuotaPolicy;
use crate::quota;
use crate::store::Store;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id               BIGSERIAL PRIMARY KEY,
    wallet_address   TEXT NOT NULL,
    nickname         TEXT,
    total_votes      BIGINT NOT NULL DEFAULT 0,
    total_paid_votes BIGINT NOT NULL DEFAULT 0,
    total_spent      DOUBLE PRECISION NOT NULL DEFAULT 0,
    first_vote_at    TIMESTAMPTZ,
    last_vote_at     TIMESTAMPTZ,
    created_at       TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at       TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT users_wallet_key UNIQUE (wallet_address)
);

CREATE TABLE IF NOT EXISTS words (
    id           BIGSERIAL PRIMARY KEY,
    word         TEXT NOT NULL,
    category     TEXT NOT NULL DEFAULT 'general',
    description  TEXT,
    total_votes  BIGINT NOT NULL DEFAULT 0,
    free_votes   BIGINT NOT NULL DEFAULT 0,
    paid_votes   BIGINT NOT NULL DEFAULT 0,
    current_rank BIGINT NOT NULL DEFAULT 0,
    is_active    BOOLEAN NOT NULL DEFAULT TRUE,
    created_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT words_word_key UNIQUE (word)
);

CREATE TABLE IF NOT EXISTS votes (
    id                BIGSERIAL PRIMARY KEY,
    user_id           BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    word_id           BIGINT NOT NULL REFERENCES words(id) ON DELETE CASCADE,
    is_paid           BOOLEAN NOT NULL DEFAULT FALSE,
    amount            DOUBLE PRECISION NOT NULL DEFAULT 0,
    payment_reference TEXT,
    payment_status    TEXT NOT NULL DEFAULT 'none',
    vote_date         DATE NOT NULL,
    created_at        TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT votes_user_word_day_key UNIQUE (user_id, word_id, vote_date)
);

CREATE INDEX IF NOT EXISTS votes_user_day_idx ON votes (user_id, vote_date);
CREATE INDEX IF NOT EXISTS votes_word_day_idx ON votes (word_id, vote_date);
CREATE INDEX IF NOT EXISTS votes_day_idx ON votes (vote_date);

CREATE TABLE IF NOT EXISTS payments (
    id           BIGSERIAL PRIMARY KEY,
    user_id      BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    vote_id      BIGINT REFERENCES votes(id) ON DELETE SET NULL,
    reference    TEXT NOT NULL,
    from_address TEXT NOT NULL,
    to_address   TEXT NOT NULL,
    amount       DOUBLE PRECISION NOT NULL,
    block_ref    BIGINT,
    status       TEXT NOT NULL DEFAULT 'pending',
    kind         TEXT NOT NULL DEFAULT 'vote_payment',
    created_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
    confirmed_at TIMESTAMPTZ,
    CONSTRAINT payments_reference_key UNIQUE (reference)
);

CREATE TABLE IF NOT EXISTS system_config (
    key         TEXT PRIMARY KEY,
    value       TEXT NOT NULL,
    description TEXT,
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
);

INSERT INTO system_config (key, value, description) VALUES
    ('free_votes_per_day', '3',    'free votes per user per day'),
    ('paid_vote_cost',     '0.02', 'cost of one paid vote'),
    ('max_votes_per_day',  '50',   'max votes per user per day'),
    ('leaderboard_size',   '100',  'words exposed on leaderboards'),
    ('project_wallet',     '',     'payee address for paid votes')
ON CONFLICT (key) DO NOTHING;
"#;

const RETRY_ATTEMPTS: u32 = 8;
const RETRY_BASE: Duration = Duration::from_millis(100);
const RETRY_CAP: Duration = Duration::from_secs(5);

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects, then creates any missing tables and seeds config defaults.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, CoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await
            .map_err(map_db_err)?;
        let store = Self { pool };
        store.bootstrap().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn bootstrap(&self) -> Result<(), CoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn try_record_vote(
        &self,
        user_id: i64,
        request: &VoteRequest,
        policy: &QuotaPolicy,
        day: NaiveDate,
    ) -> Result<VoteReceipt, CoreError> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;

        sqlx::query_as::<_, Word>("SELECT * FROM words WHERE id = $1 AND is_active")
            .bind(request.word_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_err)?
            .ok_or(CoreError::NotFound("word"))?;

        let (total, free, duplicate) = sqlx::query_as::<_, (i64, i64, bool)>(
            "SELECT COUNT(*),
                    COUNT(*) FILTER (WHERE NOT is_paid),
                    COALESCE(BOOL_OR(word_id = $3), FALSE)
             FROM votes WHERE user_id = $1 AND vote_date = $2",
        )
        .bind(user_id)
        .bind(day)
        .bind(request.word_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_err)?;
        let usage = DayUsage {
            total,
            free,
            duplicate,
        };
        let admission = quota::evaluate(usage, policy, request.is_paid)?;

        let reference = if admission.paid {
            let r = request
                .payment_reference
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .ok_or(CoreError::PaymentMissing)?;
            let seen: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM payments WHERE reference = $1)")
                    .bind(r)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(map_db_err)?;
            if seen {
                return Err(CoreError::PaymentAlreadyUsed);
            }
            Some(r)
        } else {
            None
        };

        let vote = sqlx::query_as::<_, Vote>(
            "INSERT INTO votes (user_id, word_id, is_paid, amount, payment_reference,
                                payment_status, vote_date)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(user_id)
        .bind(request.word_id)
        .bind(admission.paid)
        .bind(admission.amount)
        .bind(reference)
        .bind(if admission.paid { "confirmed" } else { "none" })
        .bind(day)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_err)?;

        let word = sqlx::query_as::<_, Word>(
            "UPDATE words
             SET total_votes = total_votes + 1,
                 free_votes  = free_votes + $2,
                 paid_votes  = paid_votes + $3,
                 updated_at  = now()
             WHERE id = $1
             RETURNING *",
        )
        .bind(request.word_id)
        .bind(if admission.paid { 0i64 } else { 1 })
        .bind(if admission.paid { 1i64 } else { 0 })
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_err)?;

        let user = sqlx::query_as::<_, User>(
            "UPDATE users
             SET total_votes      = total_votes + 1,
                 total_paid_votes = total_paid_votes + $2,
                 total_spent      = total_spent + $3,
                 first_vote_at    = COALESCE(first_vote_at, now()),
                 last_vote_at     = now(),
                 updated_at       = now()
             WHERE id = $1
             RETURNING *",
        )
        .bind(user_id)
        .bind(if admission.paid { 1i64 } else { 0 })
        .bind(if admission.paid { admission.amount } else { 0.0 })
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_err)?;

        if let Some(reference) = reference {
            sqlx::query(
                "INSERT INTO payments (user_id, vote_id, reference, from_address, to_address,
                                       amount, status, kind, confirmed_at)
                 VALUES ($1, $2, $3, $4, $5, $6, 'confirmed', 'vote_payment', now())",
            )
            .bind(user_id)
            .bind(vote.id)
            .bind(reference)
            .bind(&request.wallet_address)
            .bind(&policy.project_wallet)
            .bind(admission.amount)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;
        }

        tx.commit().await.map_err(map_db_err)?;

        Ok(VoteReceipt {
            vote,
            user,
            word,
            today_stats: DayStats {
                total_votes: usage.total + 1,
                free_votes: usage.free + if admission.paid { 0 } else { 1 },
                paid_votes: usage.total - usage.free + if admission.paid { 1 } else { 0 },
            },
        })
    }
}

fn day_start(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

fn window_start(today: NaiveDate, days: i64) -> NaiveDate {
    today
        .checked_sub_days(Days::new(days.max(0) as u64))
        .unwrap_or(today)
}

/// Escapes LIKE metacharacters so user search input matches literally
/// inside the `'%' || $1 || '%'` wildcard wrapper.
fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn map_db_err(err: sqlx::Error) -> CoreError {
    match &err {
        sqlx::Error::Database(db) => match db.code().as_deref() {
            Some("23505") => match db.constraint() {
                Some("votes_user_word_day_key") => CoreError::DuplicateVote,
                Some("payments_reference_key") => CoreError::PaymentAlreadyUsed,
                Some("words_word_key") => CoreError::WordExists,
                _ => CoreError::Storage(db.to_string()),
            },
            Some("40001") | Some("40P01") => CoreError::Conflict,
            _ => CoreError::Storage(db.to_string()),
        },
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => CoreError::Unavailable(err.to_string()),
        _ => CoreError::Storage(err.to_string()),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), CoreError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn resolve_user(&self, wallet: &str) -> Result<(User, bool), CoreError> {
        let inserted = sqlx::query_as::<_, User>(
            "INSERT INTO users (wallet_address) VALUES ($1)
             ON CONFLICT (wallet_address) DO NOTHING
             RETURNING *",
        )
        .bind(wallet)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        if let Some(user) = inserted {
            return Ok((user, true));
        }
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE wallet_address = $1")
            .bind(wallet)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?
            .ok_or(CoreError::NotFound("user"))?;
        Ok((user, false))
    }

    async fn get_user(&self, wallet: &str) -> Result<Option<User>, CoreError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE wallet_address = $1")
            .bind(wallet)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)
    }

    async fn list_users(&self, page: PageParams) -> Result<Page<User>, CoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_err)?;
        let items = sqlx::query_as::<_, User>(
            "SELECT * FROM users ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2",
        )
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(Page::new(items, page, total))
    }

    async fn delete_user(&self, id: i64) -> Result<(), CoreError> {
        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        if deleted.rows_affected() == 0 {
            return Err(CoreError::NotFound("user"));
        }
        Ok(())
    }

    async fn add_word(&self, new: &NewWord) -> Result<Word, CoreError> {
        sqlx::query_as::<_, Word>(
            "INSERT INTO words (word, category, description) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&new.word)
        .bind(&new.category)
        .bind(&new.description)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)
    }

    async fn update_word(&self, id: i64, new: &NewWord) -> Result<Word, CoreError> {
        sqlx::query_as::<_, Word>(
            "UPDATE words SET word = $2, category = $3, description = $4, updated_at = now()
             WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&new.word)
        .bind(&new.category)
        .bind(&new.description)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?
        .ok_or(CoreError::NotFound("word"))
    }

    async fn set_word_active(&self, id: i64, active: bool) -> Result<Word, CoreError> {
        sqlx::query_as::<_, Word>(
            "UPDATE words SET is_active = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(active)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?
        .ok_or(CoreError::NotFound("word"))
    }

    async fn delete_word(&self, id: i64) -> Result<(), CoreError> {
        let deleted = sqlx::query("DELETE FROM words WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        if deleted.rows_affected() == 0 {
            return Err(CoreError::NotFound("word"));
        }
        Ok(())
    }

    async fn get_word(&self, id: i64) -> Result<Option<Word>, CoreError> {
        sqlx::query_as::<_, Word>("SELECT * FROM words WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)
    }

    async fn list_words(&self, query: &WordQuery) -> Result<Page<Word>, CoreError> {
        const FILTER: &str = r"is_active
            AND ($1::text IS NULL OR word ILIKE '%' || $1 || '%' ESCAPE '\'
                 OR description ILIKE '%' || $1 || '%' ESCAPE '\')
            AND ($2::text IS NULL OR category = $2)";
        let search = query.search.as_deref().map(escape_like);
        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM words WHERE {FILTER}"))
                .bind(search.as_deref())
                .bind(query.category.as_deref())
                .fetch_one(&self.pool)
                .await
                .map_err(map_db_err)?;
        // Sort column and direction come from fixed allow-lists, never from input.
        let sql = format!(
            "SELECT * FROM words WHERE {FILTER}
             ORDER BY {} {}, id DESC LIMIT $3 OFFSET $4",
            query.sort.column(),
            query.order.keyword(),
        );
        let items = sqlx::query_as::<_, Word>(&sql)
            .bind(search.as_deref())
            .bind(query.category.as_deref())
            .bind(query.page.limit)
            .bind(query.page.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(Page::new(items, query.page, total))
    }

    async fn top_words(&self, limit: i64) -> Result<Vec<Word>, CoreError> {
        sqlx::query_as::<_, Word>(
            "SELECT * FROM words WHERE is_active
             ORDER BY total_votes DESC, current_rank ASC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)
    }

    async fn word_categories(&self) -> Result<Vec<CategoryStats>, CoreError> {
        sqlx::query_as::<_, CategoryStats>(
            "SELECT category,
                    COUNT(*) AS word_count,
                    COALESCE(SUM(total_votes), 0)::BIGINT AS total_votes
             FROM words WHERE is_active
             GROUP BY category
             ORDER BY total_votes DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)
    }

    async fn word_history(
        &self,
        word_id: i64,
        today: NaiveDate,
        days: i64,
    ) -> Result<Vec<DailyStats>, CoreError> {
        sqlx::query_as::<_, DailyStats>(
            "SELECT vote_date,
                    COUNT(*) AS total_votes,
                    COUNT(*) FILTER (WHERE NOT is_paid) AS free_votes,
                    COUNT(*) FILTER (WHERE is_paid) AS paid_votes,
                    COUNT(DISTINCT user_id) AS active_users,
                    COALESCE(SUM(amount) FILTER (WHERE is_paid), 0) AS revenue
             FROM votes
             WHERE word_id = $1 AND vote_date >= $2
             GROUP BY vote_date
             ORDER BY vote_date DESC",
        )
        .bind(word_id)
        .bind(window_start(today, days))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)
    }

    async fn load_policy(&self) -> Result<QuotaPolicy, CoreError> {
        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM system_config")
                .fetch_all(&self.pool)
                .await
                .map_err(map_db_err)?;
        Ok(QuotaPolicy::from_entries(
            rows.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        ))
    }

    async fn list_config(&self) -> Result<Vec<ConfigEntry>, CoreError> {
        sqlx::query_as::<_, ConfigEntry>("SELECT * FROM system_config ORDER BY key")
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)
    }

    async fn set_config(&self, key: &str, value: &str) -> Result<ConfigEntry, CoreError> {
        sqlx::query_as::<_, ConfigEntry>(
            "UPDATE system_config SET value = $2, updated_at = now()
             WHERE key = $1 RETURNING *",
        )
        .bind(key)
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?
        .ok_or(CoreError::NotFound("config key"))
    }

    async fn record_vote(
        &self,
        user_id: i64,
        request: &VoteRequest,
        policy: &QuotaPolicy,
        day: NaiveDate,
    ) -> Result<VoteReceipt, CoreError> {
        let mut attempt = 0u32;
        let mut delay = RETRY_BASE;
        loop {
            match self.try_record_vote(user_id, request, policy, day).await {
                Err(err) if err.is_serialization_conflict() && attempt < RETRY_ATTEMPTS => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %err, "vote transaction conflicted, retrying");
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(RETRY_CAP);
                }
                other => return other,
            }
        }
    }

    async fn today_status(
        &self,
        user_id: i64,
        day: NaiveDate,
        policy: &QuotaPolicy,
    ) -> Result<TodayStatus, CoreError> {
        let stats = self.day_stats(user_id, day).await?;
        let today_votes = sqlx::query_as::<_, VoteDetail>(
            "SELECT v.id, v.word_id, w.word, w.category, v.is_paid, v.amount, v.created_at
             FROM votes v
             JOIN words w ON w.id = v.word_id
             WHERE v.user_id = $1 AND v.vote_date = $2
             ORDER BY v.created_at DESC",
        )
        .bind(user_id)
        .bind(day)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(TodayStatus {
            today_stats: stats,
            remaining_free_votes: (policy.free_votes_per_day - stats.free_votes).max(0),
            remaining_total_votes: (policy.max_votes_per_day - stats.total_votes).max(0),
            today_votes,
        })
    }

    async fn day_stats(&self, user_id: i64, day: NaiveDate) -> Result<DayStats, CoreError> {
        let (total, free, paid) = sqlx::query_as::<_, (i64, i64, i64)>(
            "SELECT COUNT(*),
                    COUNT(*) FILTER (WHERE NOT is_paid),
                    COUNT(*) FILTER (WHERE is_paid)
             FROM votes WHERE user_id = $1 AND vote_date = $2",
        )
        .bind(user_id)
        .bind(day)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(DayStats {
            total_votes: total,
            free_votes: free,
            paid_votes: paid,
        })
    }

    async fn user_history(
        &self,
        user_id: i64,
        days_limit: i64,
    ) -> Result<Vec<DailyStats>, CoreError> {
        sqlx::query_as::<_, DailyStats>(
            "SELECT vote_date,
                    COUNT(*) AS total_votes,
                    COUNT(*) FILTER (WHERE NOT is_paid) AS free_votes,
                    COUNT(*) FILTER (WHERE is_paid) AS paid_votes,
                    COUNT(DISTINCT user_id) AS active_users,
                    COALESCE(SUM(amount) FILTER (WHERE is_paid), 0) AS revenue
             FROM votes
             WHERE user_id = $1
             GROUP BY vote_date
             ORDER BY vote_date DESC
             LIMIT $2",
        )
        .bind(user_id)
        .bind(days_limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)
    }

    async fn list_votes(&self, page: PageParams) -> Result<Page<VoteLedgerEntry>, CoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes")
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_err)?;
        let items = sqlx::query_as::<_, VoteLedgerEntry>(
            "SELECT v.id, u.wallet_address, v.word_id, w.word, v.is_paid, v.amount,
                    v.payment_reference, v.payment_status, v.vote_date, v.created_at
             FROM votes v
             JOIN users u ON u.id = v.user_id
             JOIN words w ON w.id = v.word_id
             ORDER BY v.created_at DESC, v.id DESC
             LIMIT $1 OFFSET $2",
        )
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(Page::new(items, page, total))
    }

    async fn payment_seen(&self, reference: &str) -> Result<bool, CoreError> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM payments WHERE reference = $1)")
            .bind(reference)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_err)
    }

    async fn list_payments(
        &self,
        wallet: Option<&str>,
        page: PageParams,
    ) -> Result<Vec<PaymentView>, CoreError> {
        sqlx::query_as::<_, PaymentView>(
            "SELECT p.id, p.reference, u.wallet_address, p.from_address, p.to_address,
                    p.amount, p.status, p.kind, w.word AS word, p.created_at
             FROM payments p
             JOIN users u ON u.id = p.user_id
             LEFT JOIN votes v ON v.id = p.vote_id
             LEFT JOIN words w ON w.id = v.word_id
             WHERE ($1::text IS NULL OR u.wallet_address = $1)
             ORDER BY p.created_at DESC, p.id DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(wallet)
        .bind(page.limit)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)
    }

    async fn recalculate_ranks(&self) -> Result<u64, CoreError> {
        let updated = sqlx::query(
            "WITH ranked AS (
                 SELECT id,
                        ROW_NUMBER() OVER (
                            ORDER BY total_votes DESC, created_at ASC, id ASC
                        ) AS new_rank
                 FROM words WHERE is_active
             )
             UPDATE words w
             SET current_rank = r.new_rank, updated_at = now()
             FROM ranked r
             WHERE w.id = r.id",
        )
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(updated.rows_affected())
    }

    async fn overview(&self, today: NaiveDate) -> Result<Overview, CoreError> {
        let users = sqlx::query_as::<_, UserTotals>(
            "SELECT COUNT(*) AS total_users,
                    COUNT(*) FILTER (WHERE created_at >= $1) AS new_users_7d,
                    COUNT(*) FILTER (WHERE created_at >= $2) AS new_users_30d
             FROM users",
        )
        .bind(day_start(window_start(today, 7)))
        .bind(day_start(window_start(today, 30)))
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;

        let words = sqlx::query_as::<_, WordTotals>(
            "SELECT COUNT(*) AS total_words,
                    COALESCE(SUM(total_votes), 0)::BIGINT AS total_votes,
                    COALESCE(SUM(free_votes), 0)::BIGINT AS total_free_votes,
                    COALESCE(SUM(paid_votes), 0)::BIGINT AS total_paid_votes
             FROM words WHERE is_active",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;

        let today_totals = sqlx::query_as::<_, TodayTotals>(
            "SELECT COUNT(*) AS total_votes,
                    COUNT(*) FILTER (WHERE NOT is_paid) AS free_votes,
                    COUNT(*) FILTER (WHERE is_paid) AS paid_votes,
                    COUNT(DISTINCT user_id) AS active_users,
                    COALESCE(SUM(amount) FILTER (WHERE is_paid), 0) AS revenue
             FROM votes WHERE vote_date = $1",
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;

        let revenue = sqlx::query_as::<_, RevenueTotals>(
            "SELECT COALESCE(SUM(amount), 0) AS total_revenue,
                    COUNT(*) AS total_payments
             FROM payments WHERE status = 'confirmed'",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(Overview {
            users,
            words,
            today: today_totals,
            revenue,
        })
    }

    async fn daily_stats(&self, today: NaiveDate, days: i64) -> Result<Vec<DailyStats>, CoreError> {
        sqlx::query_as::<_, DailyStats>(
            "SELECT vote_date,
                    COUNT(*) AS total_votes,
                    COUNT(*) FILTER (WHERE NOT is_paid) AS free_votes,
                    COUNT(*) FILTER (WHERE is_paid) AS paid_votes,
                    COUNT(DISTINCT user_id) AS active_users,
                    COALESCE(SUM(amount) FILTER (WHERE is_paid), 0) AS revenue
             FROM votes
             WHERE vote_date >= $1
             GROUP BY vote_date
             ORDER BY vote_date DESC",
        )
        .bind(window_start(today, days))
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)
    }

    async fn top_words_windowed(
        &self,
        today: NaiveDate,
        limit: i64,
        days: i64,
    ) -> Result<Vec<TopWord>, CoreError> {
        sqlx::query_as::<_, TopWord>(
            "SELECT w.id, w.word, w.category, w.total_votes, w.current_rank,
                    COUNT(v.id) AS recent_votes
             FROM words w
             LEFT JOIN votes v ON v.word_id = w.id AND v.vote_date >= $1
             WHERE w.is_active
             GROUP BY w.id
             ORDER BY recent_votes DESC, w.total_votes DESC
             LIMIT $2",
        )
        .bind(window_start(today, days))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)
    }

    async fn top_users(
        &self,
        today: NaiveDate,
        limit: i64,
        days: i64,
    ) -> Result<Vec<TopUser>, CoreError> {
        sqlx::query_as::<_, TopUser>(
            "SELECT u.wallet_address, u.total_votes, u.total_paid_votes, u.total_spent,
                    COUNT(v.id) AS recent_votes,
                    COUNT(v.id) FILTER (WHERE v.is_paid) AS recent_paid_votes
             FROM users u
             LEFT JOIN votes v ON v.user_id = u.id AND v.vote_date >= $1
             GROUP BY u.id
             ORDER BY recent_votes DESC, u.total_votes DESC
             LIMIT $2",
        )
        .bind(window_start(today, days))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn search_input_matches_literally() {
        assert_eq!(escape_like("50%"), "50\\%");
        assert_eq!(escape_like("snake_case"), "snake\\_case");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
        assert_eq!(escape_like("plain"), "plain");
    }
}
