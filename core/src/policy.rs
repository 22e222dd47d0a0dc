//! Quota policy: the typed view over the system_config key→value store.
//!
//! Every vote attempt reads the policy; administrative updates go through
//! [`validate_value`] so a bad value can never be persisted.

use serde::Serialize;

use crate::error::CoreError;

pub mod keys {
    pub const FREE_VOTES_PER_DAY: &str = "free_votes_per_day";
    pub const PAID_VOTE_COST: &str = "paid_vote_cost";
    pub const MAX_VOTES_PER_DAY: &str = "max_votes_per_day";
    pub const LEADERBOARD_SIZE: &str = "leaderboard_size";
    pub const PROJECT_WALLET: &str = "project_wallet";
}

/// Tunables governing vote admission and leaderboard size.
#[derive(Clone, Debug, PartialEq)]
pub struct QuotaPolicy {
    pub free_votes_per_day: i64,
    pub max_votes_per_day: i64,
    pub paid_vote_cost: f64,
    pub leaderboard_size: i64,
    /// Payee address paid votes must settle to.
    pub project_wallet: String,
}

impl Default for QuotaPolicy {
    fn default() -> Self {
        Self {
            free_votes_per_day: 3,
            max_votes_per_day: 50,
            paid_vote_cost: 0.02,
            leaderboard_size: 100,
            project_wallet: String::new(),
        }
    }
}

impl QuotaPolicy {
    /// Builds a policy from config rows, falling back to the default for any
    /// missing or unparsable key.
    pub fn from_entries<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut policy = Self::default();
        for (key, value) in entries {
            match key {
                keys::FREE_VOTES_PER_DAY => {
                    if let Ok(v) = value.parse() {
                        policy.free_votes_per_day = v;
                    }
                }
                keys::MAX_VOTES_PER_DAY => {
                    if let Ok(v) = value.parse() {
                        policy.max_votes_per_day = v;
                    }
                }
                keys::PAID_VOTE_COST => {
                    if let Ok(v) = value.parse() {
                        policy.paid_vote_cost = v;
                    }
                }
                keys::LEADERBOARD_SIZE => {
                    if let Ok(v) = value.parse() {
                        policy.leaderboard_size = v;
                    }
                }
                keys::PROJECT_WALLET => policy.project_wallet = value.to_string(),
                _ => {}
            }
        }
        policy
    }

    /// Snapshot exposed alongside today-status responses.
    pub fn snapshot(&self) -> PolicySnapshot {
        PolicySnapshot {
            free_votes_per_day: self.free_votes_per_day,
            max_votes_per_day: self.max_votes_per_day,
            paid_vote_cost: self.paid_vote_cost,
        }
    }
}

/// The `config` object of the today-status contract.
#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySnapshot {
    pub free_votes_per_day: i64,
    pub max_votes_per_day: i64,
    pub paid_vote_cost: f64,
}

/// Rejects administrative config values that would corrupt the policy.
pub fn validate_value(key: &str, value: &str) -> Result<(), CoreError> {
    match key {
        keys::FREE_VOTES_PER_DAY | keys::MAX_VOTES_PER_DAY | keys::LEADERBOARD_SIZE => value
            .parse::<i64>()
            .ok()
            .filter(|v| *v >= 0)
            .map(|_| ())
            .ok_or_else(|| {
                CoreError::Validation(format!("{key} must be a non-negative integer"))
            }),
        keys::PAID_VOTE_COST => value
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0)
            .map(|_| ())
            .ok_or_else(|| CoreError::Validation(format!("{key} must be a non-negative number"))),
        _ => Ok(()),
    }
}
