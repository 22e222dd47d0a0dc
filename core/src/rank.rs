//! Deterministic leaderboard ordering.
//!
//! Ranks are dense positions 1..=n over active words, ordered by vote
//! count descending with creation time and then id breaking ties. Older
//! words win ties so a rank never flips without a vote landing.

use crate::model::Word;

/// Word ids in rank order. Position 0 is rank 1.
pub fn ordered_ids<'a, I>(words: I) -> Vec<i64>
where
    I: IntoIterator<Item = &'a Word>,
{
    let mut order: Vec<(&'a Word, i64)> = words.into_iter().map(|w| (w, w.id)).collect();
    order.sort_by(|(a, _), (b, _)| {
        b.total_votes
            .cmp(&a.total_votes)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });
    order.into_iter().map(|(_, id)| id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn word(id: i64, total_votes: i64, created_secs: i64) -> Word {
        let at = Utc.timestamp_opt(created_secs, 0).single().unwrap();
        Word {
            id,
            word: format!("word-{id}"),
            category: "general".into(),
            description: None,
            total_votes,
            free_votes: total_votes,
            paid_votes: 0,
            current_rank: 0,
            is_active: true,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn orders_by_votes_then_age_then_id() {
        let a = word(1, 10, 100);
        let b = word(2, 10, 200);
        let c = word(3, 5, 50);
        assert_eq!(ordered_ids([&b, &c, &a]), vec![1, 2, 3]);
    }

    #[test]
    fn equal_votes_and_age_fall_back_to_id() {
        let a = word(7, 3, 100);
        let b = word(4, 3, 100);
        assert_eq!(ordered_ids([&a, &b]), vec![4, 7]);
    }
}
