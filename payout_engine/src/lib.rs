//! Payout Engine
//!
//! The payout engine runs the lifecycle of payout requests filed by workers. A worker files a request against one of
//! their wallets, an admin prices it (which splits the amount between the worker and the operator), and finally an
//! admin either rejects it or settles it with a payment proof. This library contains the core logic. It is
//! transport-agnostic: a chat bot or any other front end drives it through [`PayoutApi`].
//!
//! The library is divided into these main sections:
//! 1. Storage ([`mod@traits`] and the SQLite backend). The pipelines and the API are generic over the traits, and
//!    [`SqliteDatabase`] implements all of them. Every status change is a compare-and-set, so racing admins produce
//!    exactly one winner. The data types used in storage are defined in [`mod@db_types`] and are public.
//! 2. The guided flows ([`mod@pipelines`]) and the per-actor [`mod@sessions`] they keep their state in.
//! 3. The public API ([`PayoutApi`]).
//!
//! The engine also publishes [`mod@events`] whenever a request or wallet changes. Hooks can be attached to these
//! events; the [`mod@notifications`] module provides the hooks that tell submitters and admins what happened.
pub mod config;
pub mod db_types;
pub mod events;
pub mod notifications;
pub mod pipelines;
pub mod sessions;
pub mod traits;

mod payout_api;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use config::EngineConfig;
pub use payout_api::PayoutApi;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{
    ActorManagement,
    AdminRoster,
    PayoutDatabase,
    PreconditionFailed,
    RepositoryError,
    RequestManagement,
    RequestQueryFilter,
    WalletManagement,
};
