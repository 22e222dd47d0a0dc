//! Vote accounting for the meme-word heatmap.
//!
//! Wallets get a small free allotment of votes each day and may buy more
//! once it is spent; every admission decision and ledger write happens
//! atomically against the backing store. The crate splits into a pure
//! policy layer ([`quota`], [`payment`], [`wallet`], [`rank`]), the
//! [`store::Store`] trait with in-memory and Postgres implementations,
//! and the [`engine::VoteEngine`] facade HTTP handlers call into.

pub mod engine;
pub mod error;
pub mod model;
pub mod payment;
pub mod policy;
pub mod quota;
pub mod rank;
pub mod store;
pub mod wallet;

pub use engine::VoteEngine;
pub use error::CoreError;
pub use store::{MemoryStore, Store};

#[cfg(feature = "postgres")]
pub use store::PgStore;
