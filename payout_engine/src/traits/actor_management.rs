use payout_common::Amount;

use crate::{
    db_types::{Actor, ActorId, NewActor},
    traits::RepositoryError,
};

/// The `ActorManagement` trait defines behaviour for managing the participants in the payout workflow, along with their
/// earnings.
#[allow(async_fn_in_trait)]
pub trait ActorManagement {
    /// Creates the actor if it does not exist yet, using `default_percent` as its worker percentage. Otherwise, the
    /// username and display name are refreshed and the last-active time is bumped. The stored percentage, earnings and
    /// blocked flag of an existing actor are never touched by this call.
    async fn upsert_actor(&self, actor: NewActor, default_percent: i64) -> Result<Actor, RepositoryError>;

    /// Fetches the actor with the given id. If no such actor exists, `None` is returned.
    async fn fetch_actor(&self, id: ActorId) -> Result<Option<Actor>, RepositoryError>;

    /// Sets the worker percentage for the actor. The percentage must be in the range `0..=100`.
    ///
    /// Requests that have already been filed keep the percentage they were filed with.
    async fn set_worker_percent(&self, id: ActorId, percent: i64) -> Result<Actor, RepositoryError>;

    async fn set_blocked(&self, id: ActorId, blocked: bool) -> Result<Actor, RepositoryError>;

    /// Atomically adds `amount` to the actor's lifetime earnings and increments its profit counter.
    async fn credit_earnings(&self, id: ActorId, amount: Amount) -> Result<Actor, RepositoryError>;
}
