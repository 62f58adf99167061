//! # Backend contracts
//!
//! This module defines the behaviour that a storage backend needs to expose in order to drive the payout workflow.
//! The engine itself never talks to a database directly; the pipelines and the public API are generic over these
//! traits.
//!
//! * [`PayoutDatabase`] ties all the contracts together and is what the API requires.
//! * [`ActorManagement`] registers actors and tracks their earnings.
//! * [`WalletManagement`] stores wallets and maintains the "one active wallet per actor" rule.
//! * [`RequestManagement`] files requests and applies compare-and-set status transitions to them.
//! * [`AdminRoster`] maintains the set of admins, including the protected founder.
mod actor_management;
mod admin_roster;
mod data_objects;
mod errors;
mod payout_database;
mod request_management;
mod wallet_management;

pub use actor_management::ActorManagement;
pub use admin_roster::AdminRoster;
pub use data_objects::RequestQueryFilter;
pub use errors::{PreconditionFailed, RepositoryError, Resolution};
pub use payout_database::PayoutDatabase;
pub use request_management::RequestManagement;
pub use wallet_management::WalletManagement;
