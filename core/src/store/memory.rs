//! In-memory store: the test double for the vote ledger.
//!
//! A single `Mutex` guards the whole state, so each trait method is one
//! atomic unit of work, matching the transaction boundary the Postgres
//! store gets from SERIALIZABLE transactions. Not a production path.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use chrono::{Days, NaiveDate, Utc};
use tokio::sync::Mutex;

use crate::error::CoreError;
use crate::model::{
    CategoryStats, ConfigEntry, DailyStats, DayStats, DayUsage, NewWord, Overview, Page,
    PageParams, Payment, PaymentView, RevenueTotals, SortOrder, TodayStatus, TodayTotals, TopUser,
    TopWord, User, UserTotals, Vote, VoteDetail, VoteLedgerEntry, VoteReceipt, VoteRequest, Word,
    WordQuery, WordSort, WordTotals,
};
use crate::policy::{self, QuotaPolicy};
use crate::store::Store;
use crate::{quota, rank};

#[derive(Default)]
struct Inner {
    users: BTreeMap<i64, User>,
    words: BTreeMap<i64, Word>,
    votes: BTreeMap<i64, Vote>,
    payments: BTreeMap<i64, Payment>,
    config: BTreeMap<String, ConfigEntry>,
    next_user_id: i64,
    next_word_id: i64,
    next_vote_id: i64,
    next_payment_id: i64,
}

impl Inner {
    fn day_usage(&self, user_id: i64, word_id: i64, day: NaiveDate) -> DayUsage {
        let mut usage = DayUsage::default();
        for v in self.votes.values() {
            if v.user_id == user_id && v.vote_date == day {
                usage.total += 1;
                if !v.is_paid {
                    usage.free += 1;
                }
                if v.word_id == word_id {
                    usage.duplicate = true;
                }
            }
        }
        usage
    }

    fn day_stats(&self, user_id: i64, day: NaiveDate) -> DayStats {
        let mut stats = DayStats::default();
        for v in self.votes.values() {
            if v.user_id == user_id && v.vote_date == day {
                stats.total_votes += 1;
                if v.is_paid {
                    stats.paid_votes += 1;
                } else {
                    stats.free_votes += 1;
                }
            }
        }
        stats
    }

    fn daily_rollup<'a, I>(votes: I) -> BTreeMap<NaiveDate, DailyStats>
    where
        I: Iterator<Item = &'a Vote>,
    {
        let mut days: BTreeMap<NaiveDate, (DailyStats, HashSet<i64>)> = BTreeMap::new();
        for v in votes {
            let entry = days.entry(v.vote_date).or_insert_with(|| {
                (
                    DailyStats {
                        vote_date: v.vote_date,
                        total_votes: 0,
                        free_votes: 0,
                        paid_votes: 0,
                        active_users: 0,
                        revenue: 0.0,
                    },
                    HashSet::new(),
                )
            });
            entry.0.total_votes += 1;
            if v.is_paid {
                entry.0.paid_votes += 1;
                entry.0.revenue += v.amount;
            } else {
                entry.0.free_votes += 1;
            }
            entry.1.insert(v.user_id);
        }
        days.into_iter()
            .map(|(date, (mut stats, users))| {
                stats.active_users = users.len() as i64;
                (date, stats)
            })
            .collect()
    }
}

pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let mut inner = Inner::default();
        let now = Utc::now();
        for (key, value, description) in [
            (policy::keys::FREE_VOTES_PER_DAY, "3", "free votes per user per day"),
            (policy::keys::PAID_VOTE_COST, "0.02", "cost of one paid vote"),
            (policy::keys::MAX_VOTES_PER_DAY, "50", "max votes per user per day"),
            (policy::keys::LEADERBOARD_SIZE, "100", "words exposed on leaderboards"),
            (policy::keys::PROJECT_WALLET, "", "payee address for paid votes"),
        ] {
            inner.config.insert(
                key.to_string(),
                ConfigEntry {
                    key: key.to_string(),
                    value: value.to_string(),
                    description: Some(description.to_string()),
                    updated_at: now,
                },
            );
        }
        Self {
            inner: Mutex::new(inner),
        }
    }
}

fn window_start(today: NaiveDate, days: i64) -> NaiveDate {
    today
        .checked_sub_days(Days::new(days.max(0) as u64))
        .unwrap_or(today)
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), CoreError> {
        Ok(())
    }

    async fn resolve_user(&self, wallet: &str) -> Result<(User, bool), CoreError> {
        let mut g = self.inner.lock().await;
        if let Some(user) = g.users.values().find(|u| u.wallet_address == wallet) {
            return Ok((user.clone(), false));
        }
        g.next_user_id += 1;
        let now = Utc::now();
        let user = User {
            id: g.next_user_id,
            wallet_address: wallet.to_string(),
            nickname: None,
            total_votes: 0,
            total_paid_votes: 0,
            total_spent: 0.0,
            first_vote_at: None,
            last_vote_at: None,
            created_at: now,
            updated_at: now,
        };
        g.users.insert(user.id, user.clone());
        Ok((user, true))
    }

    async fn get_user(&self, wallet: &str) -> Result<Option<User>, CoreError> {
        let g = self.inner.lock().await;
        Ok(g.users
            .values()
            .find(|u| u.wallet_address == wallet)
            .cloned())
    }

    async fn list_users(&self, page: PageParams) -> Result<Page<User>, CoreError> {
        let g = self.inner.lock().await;
        let mut users: Vec<User> = g.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = users.len() as i64;
        let items = users
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        Ok(Page::new(items, page, total))
    }

    async fn delete_user(&self, id: i64) -> Result<(), CoreError> {
        let mut g = self.inner.lock().await;
        if g.users.remove(&id).is_none() {
            return Err(CoreError::NotFound("user"));
        }
        g.votes.retain(|_, v| v.user_id != id);
        g.payments.retain(|_, p| p.user_id != id);
        Ok(())
    }

    async fn add_word(&self, new: &NewWord) -> Result<Word, CoreError> {
        let mut g = self.inner.lock().await;
        if g.words.values().any(|w| w.word == new.word) {
            return Err(CoreError::WordExists);
        }
        g.next_word_id += 1;
        let now = Utc::now();
        let word = Word {
            id: g.next_word_id,
            word: new.word.clone(),
            category: new.category.clone(),
            description: new.description.clone(),
            total_votes: 0,
            free_votes: 0,
            paid_votes: 0,
            current_rank: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        g.words.insert(word.id, word.clone());
        Ok(word)
    }

    async fn update_word(&self, id: i64, new: &NewWord) -> Result<Word, CoreError> {
        let mut g = self.inner.lock().await;
        if g.words.values().any(|w| w.word == new.word && w.id != id) {
            return Err(CoreError::WordExists);
        }
        let word = g.words.get_mut(&id).ok_or(CoreError::NotFound("word"))?;
        word.word = new.word.clone();
        word.category = new.category.clone();
        word.description = new.description.clone();
        word.updated_at = Utc::now();
        Ok(word.clone())
    }

    async fn set_word_active(&self, id: i64, active: bool) -> Result<Word, CoreError> {
        let mut g = self.inner.lock().await;
        let word = g.words.get_mut(&id).ok_or(CoreError::NotFound("word"))?;
        word.is_active = active;
        word.updated_at = Utc::now();
        Ok(word.clone())
    }

    async fn delete_word(&self, id: i64) -> Result<(), CoreError> {
        let mut g = self.inner.lock().await;
        if g.words.remove(&id).is_none() {
            return Err(CoreError::NotFound("word"));
        }
        let dead: HashSet<i64> = g
            .votes
            .iter()
            .filter(|(_, v)| v.word_id == id)
            .map(|(vid, _)| *vid)
            .collect();
        g.votes.retain(|vid, _| !dead.contains(vid));
        for p in g.payments.values_mut() {
            if let Some(vid) = p.vote_id {
                if dead.contains(&vid) {
                    p.vote_id = None;
                }
            }
        }
        Ok(())
    }

    async fn get_word(&self, id: i64) -> Result<Option<Word>, CoreError> {
        let g = self.inner.lock().await;
        Ok(g.words.get(&id).cloned())
    }

    async fn list_words(&self, query: &WordQuery) -> Result<Page<Word>, CoreError> {
        let g = self.inner.lock().await;
        let needle = query.search.as_deref().map(str::to_lowercase);
        let mut words: Vec<Word> = g
            .words
            .values()
            .filter(|w| w.is_active)
            .filter(|w| match &needle {
                Some(n) => {
                    w.word.to_lowercase().contains(n)
                        || w.description
                            .as_deref()
                            .map(|d| d.to_lowercase().contains(n))
                            .unwrap_or(false)
                }
                None => true,
            })
            .filter(|w| match &query.category {
                Some(c) => &w.category == c,
                None => true,
            })
            .cloned()
            .collect();
        words.sort_by(|a, b| {
            let ord = match query.sort {
                WordSort::TotalVotes => a.total_votes.cmp(&b.total_votes),
                WordSort::CurrentRank => a.current_rank.cmp(&b.current_rank),
                WordSort::CreatedAt => a.created_at.cmp(&b.created_at),
                WordSort::Word => a.word.cmp(&b.word),
            };
            match query.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
        let total = words.len() as i64;
        let items = words
            .into_iter()
            .skip(query.page.offset() as usize)
            .take(query.page.limit as usize)
            .collect();
        Ok(Page::new(items, query.page, total))
    }

    async fn top_words(&self, limit: i64) -> Result<Vec<Word>, CoreError> {
        let g = self.inner.lock().await;
        let mut words: Vec<Word> = g.words.values().filter(|w| w.is_active).cloned().collect();
        words.sort_by(|a, b| {
            b.total_votes
                .cmp(&a.total_votes)
                .then(a.current_rank.cmp(&b.current_rank))
        });
        words.truncate(limit.max(0) as usize);
        Ok(words)
    }

    async fn word_categories(&self) -> Result<Vec<CategoryStats>, CoreError> {
        let g = self.inner.lock().await;
        let mut by_category: BTreeMap<String, CategoryStats> = BTreeMap::new();
        for w in g.words.values().filter(|w| w.is_active) {
            let entry = by_category
                .entry(w.category.clone())
                .or_insert_with(|| CategoryStats {
                    category: w.category.clone(),
                    word_count: 0,
                    total_votes: 0,
                });
            entry.word_count += 1;
            entry.total_votes += w.total_votes;
        }
        let mut categories: Vec<CategoryStats> = by_category.into_values().collect();
        categories.sort_by(|a, b| b.total_votes.cmp(&a.total_votes));
        Ok(categories)
    }

    async fn word_history(
        &self,
        word_id: i64,
        today: NaiveDate,
        days: i64,
    ) -> Result<Vec<DailyStats>, CoreError> {
        let g = self.inner.lock().await;
        let start = window_start(today, days);
        let rollup = Inner::daily_rollup(
            g.votes
                .values()
                .filter(|v| v.word_id == word_id && v.vote_date >= start),
        );
        Ok(rollup.into_values().rev().collect())
    }

    async fn load_policy(&self) -> Result<QuotaPolicy, CoreError> {
        let g = self.inner.lock().await;
        Ok(QuotaPolicy::from_entries(
            g.config.values().map(|e| (e.key.as_str(), e.value.as_str())),
        ))
    }

    async fn list_config(&self) -> Result<Vec<ConfigEntry>, CoreError> {
        let g = self.inner.lock().await;
        Ok(g.config.values().cloned().collect())
    }

    async fn set_config(&self, key: &str, value: &str) -> Result<ConfigEntry, CoreError> {
        let mut g = self.inner.lock().await;
        let entry = g
            .config
            .get_mut(key)
            .ok_or(CoreError::NotFound("config key"))?;
        entry.value = value.to_string();
        entry.updated_at = Utc::now();
        Ok(entry.clone())
    }

    async fn record_vote(
        &self,
        user_id: i64,
        request: &VoteRequest,
        policy: &QuotaPolicy,
        day: NaiveDate,
    ) -> Result<VoteReceipt, CoreError> {
        let mut g = self.inner.lock().await;

        if g.words
            .get(&request.word_id)
            .filter(|w| w.is_active)
            .is_none()
        {
            return Err(CoreError::NotFound("word"));
        }
        if !g.users.contains_key(&user_id) {
            return Err(CoreError::NotFound("user"));
        }

        let usage = g.day_usage(user_id, request.word_id, day);
        let admission = quota::evaluate(usage, policy, request.is_paid)?;

        let reference = if admission.paid {
            let r = request
                .payment_reference
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .ok_or(CoreError::PaymentMissing)?;
            if g.payments.values().any(|p| p.reference == r) {
                return Err(CoreError::PaymentAlreadyUsed);
            }
            Some(r.to_string())
        } else {
            None
        };

        let now = Utc::now();
        g.next_vote_id += 1;
        let vote = Vote {
            id: g.next_vote_id,
            user_id,
            word_id: request.word_id,
            is_paid: admission.paid,
            amount: admission.amount,
            payment_reference: reference.clone(),
            payment_status: if admission.paid { "confirmed" } else { "none" }.to_string(),
            vote_date: day,
            created_at: now,
        };
        g.votes.insert(vote.id, vote.clone());

        let word = {
            let w = g
                .words
                .get_mut(&request.word_id)
                .ok_or(CoreError::NotFound("word"))?;
            w.total_votes += 1;
            if admission.paid {
                w.paid_votes += 1;
            } else {
                w.free_votes += 1;
            }
            w.updated_at = now;
            debug_assert_eq!(w.total_votes, w.free_votes + w.paid_votes);
            w.clone()
        };

        let user = {
            let u = g.users.get_mut(&user_id).ok_or(CoreError::NotFound("user"))?;
            u.total_votes += 1;
            if admission.paid {
                u.total_paid_votes += 1;
                u.total_spent += admission.amount;
            }
            u.last_vote_at = Some(now);
            if u.first_vote_at.is_none() {
                u.first_vote_at = Some(now);
            }
            u.updated_at = now;
            u.clone()
        };

        if let Some(reference) = reference {
            g.next_payment_id += 1;
            let payment = Payment {
                id: g.next_payment_id,
                user_id,
                vote_id: Some(vote.id),
                reference,
                from_address: request.wallet_address.clone(),
                to_address: policy.project_wallet.clone(),
                amount: admission.amount,
                block_ref: None,
                status: "confirmed".to_string(),
                kind: "vote_payment".to_string(),
                created_at: now,
                confirmed_at: Some(now),
            };
            g.payments.insert(payment.id, payment);
        }

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

    async fn today_status(
        &self,
        user_id: i64,
        day: NaiveDate,
        policy: &QuotaPolicy,
    ) -> Result<TodayStatus, CoreError> {
        let g = self.inner.lock().await;
        let stats = g.day_stats(user_id, day);
        let mut today_votes: Vec<VoteDetail> = g
            .votes
            .values()
            .filter(|v| v.user_id == user_id && v.vote_date == day)
            .filter_map(|v| {
                g.words.get(&v.word_id).map(|w| VoteDetail {
                    id: v.id,
                    word_id: w.id,
                    word: w.word.clone(),
                    category: w.category.clone(),
                    is_paid: v.is_paid,
                    amount: v.amount,
                    created_at: v.created_at,
                })
            })
            .collect();
        today_votes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(TodayStatus {
            today_stats: stats,
            remaining_free_votes: (policy.free_votes_per_day - stats.free_votes).max(0),
            remaining_total_votes: (policy.max_votes_per_day - stats.total_votes).max(0),
            today_votes,
        })
    }

    async fn day_stats(&self, user_id: i64, day: NaiveDate) -> Result<DayStats, CoreError> {
        let g = self.inner.lock().await;
        Ok(g.day_stats(user_id, day))
    }

    async fn user_history(
        &self,
        user_id: i64,
        days_limit: i64,
    ) -> Result<Vec<DailyStats>, CoreError> {
        let g = self.inner.lock().await;
        let rollup = Inner::daily_rollup(g.votes.values().filter(|v| v.user_id == user_id));
        Ok(rollup
            .into_values()
            .rev()
            .take(days_limit.max(0) as usize)
            .collect())
    }

    async fn list_votes(&self, page: PageParams) -> Result<Page<VoteLedgerEntry>, CoreError> {
        let g = self.inner.lock().await;
        let mut entries: Vec<VoteLedgerEntry> = g
            .votes
            .values()
            .filter_map(|v| {
                let user = g.users.get(&v.user_id)?;
                let word = g.words.get(&v.word_id)?;
                Some(VoteLedgerEntry {
                    id: v.id,
                    wallet_address: user.wallet_address.clone(),
                    word_id: v.word_id,
                    word: word.word.clone(),
                    is_paid: v.is_paid,
                    amount: v.amount,
                    payment_reference: v.payment_reference.clone(),
                    payment_status: v.payment_status.clone(),
                    vote_date: v.vote_date,
                    created_at: v.created_at,
                })
            })
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let total = entries.len() as i64;
        let items = entries
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect();
        Ok(Page::new(items, page, total))
    }

    async fn payment_seen(&self, reference: &str) -> Result<bool, CoreError> {
        let g = self.inner.lock().await;
        Ok(g.payments.values().any(|p| p.reference == reference))
    }

    async fn list_payments(
        &self,
        wallet: Option<&str>,
        page: PageParams,
    ) -> Result<Vec<PaymentView>, CoreError> {
        let g = self.inner.lock().await;
        let mut views: Vec<PaymentView> = g
            .payments
            .values()
            .filter_map(|p| {
                let user = g.users.get(&p.user_id)?;
                if let Some(w) = wallet {
                    if user.wallet_address != w {
                        return None;
                    }
                }
                let word = p
                    .vote_id
                    .and_then(|vid| g.votes.get(&vid))
                    .and_then(|v| g.words.get(&v.word_id))
                    .map(|w| w.word.clone());
                Some(PaymentView {
                    id: p.id,
                    reference: p.reference.clone(),
                    wallet_address: user.wallet_address.clone(),
                    from_address: p.from_address.clone(),
                    to_address: p.to_address.clone(),
                    amount: p.amount,
                    status: p.status.clone(),
                    kind: p.kind.clone(),
                    word,
                    created_at: p.created_at,
                })
            })
            .collect();
        views.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(views
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .collect())
    }

    async fn recalculate_ranks(&self) -> Result<u64, CoreError> {
        let mut g = self.inner.lock().await;
        let order = {
            let active: Vec<&Word> = g.words.values().filter(|w| w.is_active).collect();
            rank::ordered_ids(active)
        };
        let ranked = order.len() as u64;
        let now = Utc::now();
        for (position, id) in order.into_iter().enumerate() {
            if let Some(w) = g.words.get_mut(&id) {
                w.current_rank = position as i64 + 1;
                w.updated_at = now;
            }
        }
        Ok(ranked)
    }

    async fn overview(&self, today: NaiveDate) -> Result<Overview, CoreError> {
        let g = self.inner.lock().await;
        let cutoff_7d = window_start(today, 7);
        let cutoff_30d = window_start(today, 30);

        let users = UserTotals {
            total_users: g.users.len() as i64,
            new_users_7d: g
                .users
                .values()
                .filter(|u| u.created_at.date_naive() >= cutoff_7d)
                .count() as i64,
            new_users_30d: g
                .users
                .values()
                .filter(|u| u.created_at.date_naive() >= cutoff_30d)
                .count() as i64,
        };

        let mut words = WordTotals {
            total_words: 0,
            total_votes: 0,
            total_free_votes: 0,
            total_paid_votes: 0,
        };
        for w in g.words.values().filter(|w| w.is_active) {
            words.total_words += 1;
            words.total_votes += w.total_votes;
            words.total_free_votes += w.free_votes;
            words.total_paid_votes += w.paid_votes;
        }

        let mut today_totals = TodayTotals {
            total_votes: 0,
            free_votes: 0,
            paid_votes: 0,
            active_users: 0,
            revenue: 0.0,
        };
        let mut today_users = HashSet::new();
        for v in g.votes.values().filter(|v| v.vote_date == today) {
            today_totals.total_votes += 1;
            if v.is_paid {
                today_totals.paid_votes += 1;
                today_totals.revenue += v.amount;
            } else {
                today_totals.free_votes += 1;
            }
            today_users.insert(v.user_id);
        }
        today_totals.active_users = today_users.len() as i64;

        let mut revenue = RevenueTotals {
            total_revenue: 0.0,
            total_payments: 0,
        };
        for p in g.payments.values().filter(|p| p.status == "confirmed") {
            revenue.total_revenue += p.amount;
            revenue.total_payments += 1;
        }

        Ok(Overview {
            users,
            words,
            today: today_totals,
            revenue,
        })
    }

    async fn daily_stats(&self, today: NaiveDate, days: i64) -> Result<Vec<DailyStats>, CoreError> {
        let g = self.inner.lock().await;
        let start = window_start(today, days);
        let rollup = Inner::daily_rollup(g.votes.values().filter(|v| v.vote_date >= start));
        Ok(rollup.into_values().rev().collect())
    }

    async fn top_words_windowed(
        &self,
        today: NaiveDate,
        limit: i64,
        days: i64,
    ) -> Result<Vec<TopWord>, CoreError> {
        let g = self.inner.lock().await;
        let start = window_start(today, days);
        let mut rows: Vec<TopWord> = g
            .words
            .values()
            .filter(|w| w.is_active)
            .map(|w| {
                let recent = g
                    .votes
                    .values()
                    .filter(|v| v.word_id == w.id && v.vote_date >= start)
                    .count() as i64;
                TopWord {
                    id: w.id,
                    word: w.word.clone(),
                    category: w.category.clone(),
                    total_votes: w.total_votes,
                    current_rank: w.current_rank,
                    recent_votes: recent,
                }
            })
            .collect();
        rows.sort_by(|a, b| {
            b.recent_votes
                .cmp(&a.recent_votes)
                .then(b.total_votes.cmp(&a.total_votes))
        });
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn top_users(
        &self,
        today: NaiveDate,
        limit: i64,
        days: i64,
    ) -> Result<Vec<TopUser>, CoreError> {
        let g = self.inner.lock().await;
        let start = window_start(today, days);
        let mut rows: Vec<TopUser> = g
            .users
            .values()
            .map(|u| {
                let mut recent = 0;
                let mut recent_paid = 0;
                for v in g.votes.values() {
                    if v.user_id == u.id && v.vote_date >= start {
                        recent += 1;
                        if v.is_paid {
                            recent_paid += 1;
                        }
                    }
                }
                TopUser {
                    wallet_address: u.wallet_address.clone(),
                    total_votes: u.total_votes,
                    total_paid_votes: u.total_paid_votes,
                    total_spent: u.total_spent,
                    recent_votes: recent,
                    recent_paid_votes: recent_paid,
                }
            })
            .collect();
        rows.sort_by(|a, b| {
            b.recent_votes
                .cmp(&a.recent_votes)
                .then(b.total_votes.cmp(&a.total_votes))
        });
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }
}
