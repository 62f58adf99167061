use crate::{
    db_types::{ActorId, NewRequest, PayoutRequest, Proof, TeamStats, Valuation},
    traits::{data_objects::RequestQueryFilter, RepositoryError},
};

/// Storage and status transitions for payout requests.
///
/// Every status-changing method is a compare-and-set: the change is applied only if the request is still in the state
/// the transition requires, and otherwise nothing is written. When the guard fails, the implementation re-reads the
/// request in the same transaction and reports why, as one of the [`crate::traits::PreconditionFailed`] variants
/// `AlreadyFinal`, `AlreadyValued`, `NotYetValued` or `RequestNotFound`.
///
/// Returned requests always have their proofs attached.
#[allow(async_fn_in_trait)]
pub trait RequestManagement {
    /// Stores the request, in `AwaitingValuation` status with a zero valuation, together with its proofs in a single
    /// transaction.
    async fn insert_request(&self, request: NewRequest) -> Result<PayoutRequest, RepositoryError>;

    async fn fetch_request(&self, id: i64) -> Result<Option<PayoutRequest>, RepositoryError>;

    /// Fetches requests according to criteria specified in the `RequestQueryFilter`, ordered by creation time.
    async fn search_requests(&self, query: RequestQueryFilter) -> Result<Vec<PayoutRequest>, RepositoryError>;

    /// Writes the valuation, provided the request is still `AwaitingValuation` with a zero amount. The valuation must
    /// have been split with the worker percentage stored on the request (see [`Valuation::split`]).
    async fn set_valuation(
        &self,
        id: i64,
        admin: ActorId,
        valuation: Valuation,
    ) -> Result<PayoutRequest, RepositoryError>;

    /// Moves the request from `AwaitingValuation` to `Rejected`, storing the reason.
    async fn reject_request(&self, id: i64, admin: ActorId, reason: &str) -> Result<PayoutRequest, RepositoryError>;

    /// Settles a valued request. In a single transaction:
    /// * the request moves to `Paid` and stores the payment proof,
    /// * the owner's lifetime earnings are credited with the worker share and the profit counter is incremented,
    /// * the team statistics are incremented.
    async fn mark_paid(&self, id: i64, admin: ActorId, proof: Proof) -> Result<PayoutRequest, RepositoryError>;

    /// Returns the rolling team statistics record, which is updated by [`Self::mark_paid`].
    async fn fetch_team_stats(&self) -> Result<TeamStats, RepositoryError>;
}
