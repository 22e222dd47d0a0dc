//! End-to-end flows over the in-memory store: quota admission, payment
//! accounting, duplicate handling and rank recalculation.

use std::sync::Arc;

use chrono::NaiveDate;
use hotmap_core::error::CoreError;
use hotmap_core::model::{NewWord, VoteRequest};
use hotmap_core::payment::PaymentClaim;
use hotmap_core::{MemoryStore, Store, VoteEngine};

fn wallet(i: u8) -> String {
    // 40 of the same base58 character, distinct per caller.
    char::from(b'm' + i).to_string().repeat(40)
}

fn new_word(word: &str) -> NewWord {
    NewWord {
        word: word.to_string(),
        category: "general".to_string(),
        description: None,
    }
}

fn free_vote(wallet: &str, word_id: i64) -> VoteRequest {
    VoteRequest {
        wallet_address: wallet.to_string(),
        word_id,
        is_paid: false,
        payment_reference: None,
    }
}

fn paid_vote(wallet: &str, word_id: i64, reference: &str) -> VoteRequest {
    VoteRequest {
        wallet_address: wallet.to_string(),
        word_id,
        is_paid: true,
        payment_reference: Some(reference.to_string()),
    }
}

fn engine() -> VoteEngine<MemoryStore> {
    VoteEngine::new(Arc::new(MemoryStore::new()))
}

async fn seed_words(engine: &VoteEngine<MemoryStore>, words: &[&str]) -> Vec<i64> {
    let mut ids = Vec::with_capacity(words.len());
    for w in words {
        ids.push(engine.add_word(&new_word(w)).await.unwrap().id);
    }
    ids
}

#[tokio::test]
async fn free_allotment_then_exhaustion() {
    let engine = engine();
    let ids = seed_words(&engine, &["hodl", "wagmi", "ngmi", "fomo"]).await;
    let voter = wallet(0);

    for id in &ids[..3] {
        let receipt = engine.submit_vote(&free_vote(&voter, *id)).await.unwrap();
        assert!(!receipt.vote.is_paid);
        assert_eq!(receipt.vote.amount, 0.0);
    }
    let err = engine.submit_vote(&free_vote(&voter, ids[3])).await.unwrap_err();
    assert!(matches!(err, CoreError::FreeQuotaExhausted));

    let (status, policy) = engine.today_status(&voter).await.unwrap();
    assert_eq!(status.today_stats.total_votes, 3);
    assert_eq!(status.today_stats.free_votes, 3);
    assert_eq!(status.remaining_free_votes, 0);
    assert_eq!(
        status.remaining_total_votes,
        policy.max_votes_per_day - 3
    );
    assert_eq!(status.today_votes.len(), 3);
}

#[tokio::test]
async fn paid_vote_rejected_until_free_quota_used() {
    let engine = engine();
    let ids = seed_words(&engine, &["hodl"]).await;
    let err = engine
        .submit_vote(&paid_vote(&wallet(0), ids[0], "tx-early"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::FreeQuotaNotYetUsed));
}

#[tokio::test]
async fn paid_vote_after_free_quota_charges_policy_cost() {
    let engine = engine();
    let ids = seed_words(&engine, &["hodl", "wagmi", "ngmi", "fomo", "gm"]).await;
    let voter = wallet(0);
    for id in &ids[..3] {
        engine.submit_vote(&free_vote(&voter, *id)).await.unwrap();
    }

    let receipt = engine
        .submit_vote(&paid_vote(&voter, ids[3], "tx-1"))
        .await
        .unwrap();
    assert!(receipt.vote.is_paid);
    assert!((receipt.vote.amount - 0.02).abs() < 1e-9);
    assert_eq!(receipt.user.total_paid_votes, 1);
    assert!((receipt.user.total_spent - 0.02).abs() < 1e-9);

    let receipt = engine
        .submit_vote(&paid_vote(&voter, ids[4], "tx-2"))
        .await
        .unwrap();
    assert!((receipt.user.total_spent - 0.04).abs() < 1e-9);
    assert_eq!(receipt.today_stats.total_votes, 5);
    assert_eq!(receipt.today_stats.free_votes, 3);
    assert_eq!(receipt.today_stats.paid_votes, 2);
}

#[tokio::test]
async fn paid_vote_without_reference_is_rejected() {
    let engine = engine();
    let ids = seed_words(&engine, &["hodl"]).await;
    let mut request = paid_vote(&wallet(0), ids[0], "  ");
    let err = engine.submit_vote(&request).await.unwrap_err();
    assert!(matches!(err, CoreError::PaymentMissing));
    request.payment_reference = None;
    let err = engine.submit_vote(&request).await.unwrap_err();
    assert!(matches!(err, CoreError::PaymentMissing));
}

#[tokio::test]
async fn payment_reference_cannot_be_replayed() {
    let engine = engine();
    // No free allotment, so paid votes are admitted straight away.
    engine.set_config("free_votes_per_day", "0").await.unwrap();
    let ids = seed_words(&engine, &["hodl", "wagmi"]).await;

    engine
        .submit_vote(&paid_vote(&wallet(0), ids[0], "tx-shared"))
        .await
        .unwrap();
    let err = engine
        .submit_vote(&paid_vote(&wallet(1), ids[1], "tx-shared"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::PaymentAlreadyUsed));

    // The failed attempt must leave no trace.
    let (status, _) = engine.today_status(&wallet(1)).await.unwrap();
    assert_eq!(status.today_stats.total_votes, 0);
}

#[tokio::test]
async fn duplicate_word_same_day_rejected() {
    let engine = engine();
    let ids = seed_words(&engine, &["hodl"]).await;
    let voter = wallet(0);
    engine.submit_vote(&free_vote(&voter, ids[0])).await.unwrap();
    let err = engine.submit_vote(&free_vote(&voter, ids[0])).await.unwrap_err();
    assert!(matches!(err, CoreError::DuplicateVote));
}

#[tokio::test]
async fn same_word_allowed_on_different_days() {
    let engine = engine();
    let ids = seed_words(&engine, &["hodl"]).await;
    let (user, _) = engine.login(&wallet(0)).await.unwrap();
    let policy = engine.load_policy().await.unwrap();
    let store = engine.store();

    let day1 = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
    let day2 = day1.succ_opt().unwrap();
    let request = free_vote(&wallet(0), ids[0]);
    store.record_vote(user.id, &request, &policy, day1).await.unwrap();
    store.record_vote(user.id, &request, &policy, day2).await.unwrap();
    let err = store
        .record_vote(user.id, &request, &policy, day2)
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::DuplicateVote));
}

#[tokio::test]
async fn daily_cap_closes_the_day() {
    let engine = engine();
    engine.set_config("free_votes_per_day", "1").await.unwrap();
    engine.set_config("max_votes_per_day", "2").await.unwrap();
    let ids = seed_words(&engine, &["hodl", "wagmi", "ngmi"]).await;
    let voter = wallet(0);

    engine.submit_vote(&free_vote(&voter, ids[0])).await.unwrap();
    engine
        .submit_vote(&paid_vote(&voter, ids[1], "tx-cap-1"))
        .await
        .unwrap();
    let err = engine
        .submit_vote(&paid_vote(&voter, ids[2], "tx-cap-2"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::DailyLimitReached));

    let (status, _) = engine.today_status(&voter).await.unwrap();
    assert_eq!(status.remaining_total_votes, 0);
}

#[tokio::test]
async fn concurrent_free_votes_admit_exactly_the_allotment() {
    let engine = engine();
    let ids = seed_words(
        &engine,
        &["w1", "w2", "w3", "w4", "w5", "w6", "w7", "w8"],
    )
    .await;
    let voter = wallet(0);
    engine.login(&voter).await.unwrap();

    let mut handles = Vec::new();
    for id in ids {
        let engine = engine.clone();
        let request = free_vote(&voter, id);
        handles.push(tokio::spawn(async move { engine.submit_vote(&request).await }));
    }
    let mut admitted = 0;
    let mut exhausted = 0;
    for h in handles {
        match h.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(CoreError::FreeQuotaExhausted) => exhausted += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(admitted, 3);
    assert_eq!(exhausted, 5);

    let (status, _) = engine.today_status(&voter).await.unwrap();
    assert_eq!(status.today_stats.total_votes, 3);
    assert_eq!(status.today_stats.free_votes, 3);
}

#[tokio::test]
async fn counters_stay_consistent_across_mixed_votes() {
    let engine = engine();
    engine.set_config("free_votes_per_day", "1").await.unwrap();
    let ids = seed_words(&engine, &["hodl", "wagmi", "ngmi"]).await;

    for (i, reference) in [(0u8, "tx-a"), (1, "tx-b")] {
        let voter = wallet(i);
        engine.submit_vote(&free_vote(&voter, ids[0])).await.unwrap();
        engine
            .submit_vote(&paid_vote(&voter, ids[1], reference))
            .await
            .unwrap();
    }

    for id in ids {
        let word = engine.get_word(id).await.unwrap();
        assert_eq!(word.total_votes, word.free_votes + word.paid_votes);
    }
    let word = engine.get_word(2).await.unwrap();
    assert_eq!(word.total_votes, 2);
    assert_eq!(word.paid_votes, 2);

    // user counters equal their vote rows
    for i in [0u8, 1] {
        let (user, _) = engine.user_stats(&wallet(i)).await.unwrap();
        let (status, _) = engine.today_status(&wallet(i)).await.unwrap();
        assert_eq!(user.total_votes, status.today_stats.total_votes);
        assert_eq!(user.total_paid_votes, status.today_stats.paid_votes);
    }
}

#[tokio::test]
async fn fifty_vote_day_closes_at_the_cap() {
    let engine = engine();
    let voter = wallet(0);
    let mut ids = Vec::new();
    for i in 0..51 {
        ids.push(
            engine
                .add_word(&new_word(&format!("word{i}")))
                .await
                .unwrap()
                .id,
        );
    }

    for id in &ids[..3] {
        engine.submit_vote(&free_vote(&voter, *id)).await.unwrap();
    }
    for (n, id) in ids[3..50].iter().enumerate() {
        engine
            .submit_vote(&paid_vote(&voter, *id, &format!("tx-cap-{n}")))
            .await
            .unwrap();
    }
    let err = engine
        .submit_vote(&paid_vote(&voter, ids[50], "tx-cap-last"))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::DailyLimitReached));

    let (user, _) = engine.user_stats(&voter).await.unwrap();
    assert_eq!(user.total_votes, 50);
    assert_eq!(user.total_paid_votes, 47);
    assert!((user.total_spent - 47.0 * 0.02).abs() < 1e-9);
}

#[tokio::test]
async fn rank_recalculation_breaks_ties_by_age() {
    let engine = engine();
    let ids = seed_words(&engine, &["alpha", "beta", "gamma"]).await;
    let (user, _) = engine.login(&wallet(0)).await.unwrap();
    let policy = engine.load_policy().await.unwrap();
    let store = engine.store();

    let base = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
    let vote_days = |word_id: i64, days: u64| {
        let store = &store;
        let policy = &policy;
        let voter = wallet(0);
        async move {
            for d in 0..days {
                let day = base + chrono::Days::new(d);
                store
                    .record_vote(user.id, &free_vote(&voter, word_id), policy, day)
                    .await
                    .unwrap();
            }
        }
    };
    vote_days(ids[0], 10).await;
    vote_days(ids[1], 10).await;
    vote_days(ids[2], 5).await;

    let ranked = engine.recalculate_ranks().await.unwrap();
    assert_eq!(ranked, 3);
    assert_eq!(engine.get_word(ids[0]).await.unwrap().current_rank, 1);
    assert_eq!(engine.get_word(ids[1]).await.unwrap().current_rank, 2);
    assert_eq!(engine.get_word(ids[2]).await.unwrap().current_rank, 3);
}

#[tokio::test]
async fn inactive_words_cannot_be_voted_and_leave_rankings() {
    let engine = engine();
    let ids = seed_words(&engine, &["hodl", "wagmi"]).await;
    engine.set_word_active(ids[0], false).await.unwrap();

    let err = engine
        .submit_vote(&free_vote(&wallet(0), ids[0]))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound("word")));

    engine.recalculate_ranks().await.unwrap();
    assert_eq!(engine.get_word(ids[0]).await.unwrap().current_rank, 0);
    assert_eq!(engine.get_word(ids[1]).await.unwrap().current_rank, 1);
}

#[tokio::test]
async fn malformed_wallets_are_rejected_before_any_write() {
    let engine = engine();
    let ids = seed_words(&engine, &["hodl"]).await;
    for bad in ["", "short", &"l".repeat(40), &"O0".repeat(20)] {
        let err = engine.submit_vote(&free_vote(bad, ids[0])).await.unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)), "wallet {bad:?}");
    }
    assert!(engine.store().get_user(&wallet(0)).await.unwrap().is_none());
}

#[tokio::test]
async fn login_is_idempotent() {
    let engine = engine();
    let (first, created) = engine.login(&wallet(0)).await.unwrap();
    assert!(created);
    let (second, created) = engine.login(&wallet(0)).await.unwrap();
    assert!(!created);
    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn duplicate_word_text_is_rejected() {
    let engine = engine();
    engine.add_word(&new_word("hodl")).await.unwrap();
    let err = engine.add_word(&new_word("hodl")).await.unwrap_err();
    assert!(matches!(err, CoreError::WordExists));

    let err = engine.add_word(&new_word("   ")).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    let err = engine.add_word(&new_word(&"x".repeat(101))).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
}

#[tokio::test]
async fn payment_verification_checks_payee_and_amount() {
    let engine = engine();
    let payee = wallet(5);
    engine.set_config("project_wallet", &payee).await.unwrap();

    let ok = PaymentClaim {
        reference: "tx-verify".to_string(),
        from_address: wallet(0),
        to_address: payee,
        amount: 0.02,
    };
    engine.verify_payment(&ok).await.unwrap();

    let wrong_amount = PaymentClaim {
        amount: 0.01,
        ..ok.clone()
    };
    assert!(matches!(
        engine.verify_payment(&wrong_amount).await.unwrap_err(),
        CoreError::Validation(_)
    ));

    let wrong_payee = PaymentClaim {
        to_address: wallet(6),
        ..ok
    };
    assert!(matches!(
        engine.verify_payment(&wrong_payee).await.unwrap_err(),
        CoreError::Validation(_)
    ));
}

#[tokio::test]
async fn used_reference_fails_verification() {
    let engine = engine();
    engine.set_config("free_votes_per_day", "0").await.unwrap();
    let ids = seed_words(&engine, &["hodl"]).await;
    engine
        .submit_vote(&paid_vote(&wallet(0), ids[0], "tx-used"))
        .await
        .unwrap();

    let claim = PaymentClaim {
        reference: "tx-used".to_string(),
        from_address: wallet(0),
        to_address: wallet(5),
        amount: 0.02,
    };
    assert!(matches!(
        engine.verify_payment(&claim).await.unwrap_err(),
        CoreError::PaymentAlreadyUsed
    ));
}

#[tokio::test]
async fn config_updates_take_effect_and_validate() {
    let engine = engine();
    assert!(engine.set_config("free_votes_per_day", "-1").await.is_err());
    assert!(engine.set_config("paid_vote_cost", "NaN").await.is_err());
    assert!(matches!(
        engine.set_config("nonexistent", "1").await.unwrap_err(),
        CoreError::NotFound(_)
    ));

    engine.set_config("paid_vote_cost", "0.05").await.unwrap();
    let policy = engine.load_policy().await.unwrap();
    assert!((policy.paid_vote_cost - 0.05).abs() < 1e-12);
}

#[tokio::test]
async fn overview_and_stats_reflect_the_ledger() {
    let engine = engine();
    engine.set_config("free_votes_per_day", "1").await.unwrap();
    let ids = seed_words(&engine, &["hodl", "wagmi"]).await;
    engine.submit_vote(&free_vote(&wallet(0), ids[0])).await.unwrap();
    engine
        .submit_vote(&paid_vote(&wallet(0), ids[1], "tx-ov"))
        .await
        .unwrap();
    engine.submit_vote(&free_vote(&wallet(1), ids[0])).await.unwrap();

    let overview = engine.overview().await.unwrap();
    assert_eq!(overview.users.total_users, 2);
    assert_eq!(overview.words.total_votes, 3);
    assert_eq!(overview.today.total_votes, 3);
    assert_eq!(overview.today.paid_votes, 1);
    assert_eq!(overview.today.active_users, 2);
    assert!((overview.revenue.total_revenue - 0.02).abs() < 1e-9);
    assert_eq!(overview.revenue.total_payments, 1);

    let daily = engine.daily_stats(Some(7)).await.unwrap();
    assert_eq!(daily.len(), 1);
    assert_eq!(daily[0].total_votes, 3);
    assert_eq!(daily[0].active_users, 2);

    let top = engine.top_words(Some(10), Some(7)).await.unwrap();
    assert_eq!(top[0].word, "hodl");
    assert_eq!(top[0].recent_votes, 2);

    let users = engine.top_users(Some(10), Some(7)).await.unwrap();
    assert_eq!(users[0].wallet_address, wallet(0));
    assert_eq!(users[0].recent_votes, 2);
}
