//! # Payout engine public API
//!
//! [`PayoutApi`] is the single entry point a transport (a chat bot, an HTTP service, a test harness) uses to drive the
//! payout workflow. It owns the session store and both guided flows, and exposes the read-only queries and the
//! roster plumbing around them.
//!
//! ```rust,ignore
//! use payout_engine::{EngineConfig, PayoutApi, SqliteDatabase};
//! let config = EngineConfig::from_env_or_default();
//! let db = SqliteDatabase::new(&config).await?;
//! db.migrate().await?;
//! let api = PayoutApi::new(db, config, producers);
//! api.ensure_founder_admin().await?;
//! let outcome = api.start_submission(actor).await?;
//! ```
mod api;

pub use api::PayoutApi;
