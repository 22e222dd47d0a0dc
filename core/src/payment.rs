//! Payment claim verification for paid votes.
//!
//! The wallet layer signs and submits the chain transaction; the core only
//! sees the resulting reference plus the client's claim of payer, payee and
//! amount. Verified here: the claim is well-formed and matches the
//! configured payee and cost. Reference uniqueness is enforced by the store
//! inside the vote transaction. Chain-state verification is the wallet
//! layer's job.

use crate::error::CoreError;
use crate::policy::QuotaPolicy;
use crate::wallet;

const AMOUNT_TOLERANCE: f64 = 1e-9;

/// Client-supplied description of an on-chain payment.
#[derive(Clone, Debug)]
pub struct PaymentClaim {
    pub reference: String,
    pub from_address: String,
    pub to_address: String,
    pub amount: f64,
}

pub fn verify_claim(policy: &QuotaPolicy, claim: &PaymentClaim) -> Result<(), CoreError> {
    if claim.reference.trim().is_empty() {
        return Err(CoreError::PaymentMissing);
    }
    wallet::validate(&claim.from_address)?;
    wallet::validate(&claim.to_address)?;
    if !policy.project_wallet.is_empty() && claim.to_address != policy.project_wallet {
        return Err(CoreError::Validation(
            "payment destination does not match the project wallet".to_string(),
        ));
    }
    if (claim.amount - policy.paid_vote_cost).abs() > AMOUNT_TOLERANCE {
        return Err(CoreError::Validation(format!(
            "payment amount must equal the paid vote cost of {}",
            policy.paid_vote_cost
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYER: &str = "7YGnX3BLazy4mvPzTm4jWxV8Kc1t3asjHTq2fFCSnbpj";
    const PAYEE: &str = "5Q544fKrFoe6tsEbD7S8EmxGTJYAKtTVhAW5Q5pge4j1";

    fn policy() -> QuotaPolicy {
        QuotaPolicy {
            project_wallet: PAYEE.to_string(),
            ..QuotaPolicy::default()
        }
    }

    fn claim() -> PaymentClaim {
        PaymentClaim {
            reference: "sig-1".to_string(),
            from_address: PAYER.to_string(),
            to_address: PAYEE.to_string(),
            amount: 0.02,
        }
    }

    #[test]
    fn valid_claim_passes() {
        verify_claim(&policy(), &claim()).unwrap();
    }

    #[test]
    fn empty_reference_is_payment_missing() {
        let mut c = claim();
        c.reference = "  ".to_string();
        assert!(matches!(
            verify_claim(&policy(), &c),
            Err(CoreError::PaymentMissing)
        ));
    }

    #[test]
    fn wrong_payee_is_rejected() {
        let mut c = claim();
        c.to_address = PAYER.to_string();
        assert!(matches!(
            verify_claim(&policy(), &c),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn wrong_amount_is_rejected() {
        let mut c = claim();
        c.amount = 0.01;
        assert!(matches!(
            verify_claim(&policy(), &c),
            Err(CoreError::Validation(_))
        ));
    }
}
