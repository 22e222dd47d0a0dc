//! Quota evaluator: the pure admission decision for one vote attempt.
//!
//! The decision is evaluated against a [`DayUsage`] snapshot that every
//! store implementation reads inside the same transaction that performs the
//! write, so the check-then-write sequence cannot race (the unique index on
//! (user, word, day) remains the final arbiter either way).
//!
//! Ordering rule: paid votes are only admitted once the day's free
//! allotment is exhausted.

use crate::error::CoreError;
use crate::model::DayUsage;
use crate::policy::QuotaPolicy;

/// Outcome of a successful admission: the tier the vote was admitted at
/// and the amount to charge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Admission {
    pub paid: bool,
    pub amount: f64,
}

pub fn evaluate(
    usage: DayUsage,
    policy: &QuotaPolicy,
    requested_paid: bool,
) -> Result<Admission, CoreError> {
    if usage.duplicate {
        return Err(CoreError::DuplicateVote);
    }
    if usage.total >= policy.max_votes_per_day {
        return Err(CoreError::DailyLimitReached);
    }
    if !requested_paid && usage.free >= policy.free_votes_per_day {
        return Err(CoreError::FreeQuotaExhausted);
    }
    if requested_paid && usage.free < policy.free_votes_per_day {
        return Err(CoreError::FreeQuotaNotYetUsed);
    }
    Ok(Admission {
        paid: requested_paid,
        amount: if requested_paid {
            policy.paid_vote_cost
        } else {
            0.0
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage(total: i64, free: i64) -> DayUsage {
        DayUsage {
            total,
            free,
            duplicate: false,
        }
    }

    fn policy() -> QuotaPolicy {
        QuotaPolicy::default() // 3 free, 50 max, 0.02 per paid vote
    }

    #[test]
    fn first_free_votes_are_admitted() {
        for free in 0..3 {
            let adm = evaluate(usage(free, free), &policy(), false).unwrap();
            assert!(!adm.paid);
            assert_eq!(adm.amount, 0.0);
        }
    }

    #[test]
    fn duplicate_wins_over_everything() {
        let u = DayUsage {
            total: 0,
            free: 0,
            duplicate: true,
        };
        assert!(matches!(
            evaluate(u, &policy(), false),
            Err(CoreError::DuplicateVote)
        ));
        assert!(matches!(
            evaluate(u, &policy(), true),
            Err(CoreError::DuplicateVote)
        ));
    }

    #[test]
    fn fourth_free_attempt_is_rejected() {
        assert!(matches!(
            evaluate(usage(3, 3), &policy(), false),
            Err(CoreError::FreeQuotaExhausted)
        ));
    }

    #[test]
    fn paid_before_free_allotment_is_rejected() {
        assert!(matches!(
            evaluate(usage(2, 2), &policy(), true),
            Err(CoreError::FreeQuotaNotYetUsed)
        ));
    }

    #[test]
    fn paid_after_free_allotment_is_admitted_and_charged() {
        let adm = evaluate(usage(3, 3), &policy(), true).unwrap();
        assert!(adm.paid);
        assert!((adm.amount - 0.02).abs() < 1e-12);
    }

    #[test]
    fn daily_cap_applies_to_both_tiers() {
        assert!(matches!(
            evaluate(usage(50, 3), &policy(), true),
            Err(CoreError::DailyLimitReached)
        ));
        assert!(matches!(
            evaluate(usage(50, 2), &policy(), false),
            Err(CoreError::DailyLimitReached)
        ));
    }

    #[test]
    fn cap_check_precedes_quota_checks() {
        // At the cap the rejection is DailyLimitReached even though the free
        // allotment is also exhausted.
        assert!(matches!(
            evaluate(usage(50, 50), &policy(), false),
            Err(CoreError::DailyLimitReached)
        ));
    }
}
