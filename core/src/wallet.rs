//! Wallet address grammar check.
//!
//! Addresses are base58-encoded 32-byte keys: 32 to 44 characters from the
//! Bitcoin base58 alphabet (no 0, O, I, l).

use crate::error::CoreError;

pub const MIN_LEN: usize = 32;
pub const MAX_LEN: usize = 44;

fn is_base58(c: char) -> bool {
    matches!(c,
        '1'..='9' | 'A'..='H' | 'J'..='N' | 'P'..='Z' | 'a'..='k' | 'm'..='z')
}

pub fn validate(address: &str) -> Result<(), CoreError> {
    if !(MIN_LEN..=MAX_LEN).contains(&address.len()) || !address.chars().all(is_base58) {
        return Err(CoreError::Validation(
            "wallet address must be 32-44 base58 characters".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_wellformed_addresses() {
        validate("5Q544fKrFoe6tsEbD7S8EmxGTJYAKtTVhAW5Q5pge4j1").unwrap();
        validate("So11111111111111111111111111111111111111112").unwrap();
    }

    #[test]
    fn rejects_bad_length() {
        assert!(validate("short").is_err());
        assert!(validate(&"1".repeat(45)).is_err());
    }

    #[test]
    fn rejects_non_base58_characters() {
        // 0, O, I and l are not in the alphabet.
        assert!(validate(&"O".repeat(40)).is_err());
        assert!(validate(&"0".repeat(40)).is_err());
        assert!(validate(&"l".repeat(40)).is_err());
    }
}
