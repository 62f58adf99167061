use async_trait::async_trait;

use crate::{
    db_types::{ActorId, AdminEntry},
    traits::RepositoryError,
};

/// The set of actors with admin rights.
///
/// The roster is consulted from event hooks running on their own tasks, so unlike the other backend traits it is
/// object-safe and its futures are `Send`.
#[async_trait]
pub trait AdminRoster: Send + Sync {
    async fn is_admin(&self, id: ActorId) -> Result<bool, RepositoryError>;

    /// Fetches every admin, founder first.
    async fn fetch_admins(&self) -> Result<Vec<AdminEntry>, RepositoryError>;

    /// Adds `id` to the roster. Returns `false` if it was already an admin.
    async fn add_admin(&self, id: ActorId, added_by: ActorId) -> Result<bool, RepositoryError>;

    /// Removes `id` from the roster. The founding admin can never be removed (`FounderProtected`). Returns `false` if
    /// `id` was not an admin.
    async fn remove_admin(&self, id: ActorId) -> Result<bool, RepositoryError>;

    /// Ensures `id` is in the roster and flagged as the founder.
    async fn ensure_founder(&self, id: ActorId) -> Result<AdminEntry, RepositoryError>;
}
