use crate::{
    db_types::{ActorId, Wallet},
    traits::RepositoryError,
};

/// Wallet bookkeeping for actors. Every actor has at most one active wallet at any time; the implementation must
/// guarantee this with a single atomic transaction whenever the active wallet changes.
#[allow(async_fn_in_trait)]
pub trait WalletManagement {
    /// Stores a new wallet for `owner`. The new wallet becomes the active one, and all the owner's other wallets are
    /// deactivated in the same transaction.
    async fn add_wallet(&self, owner: ActorId, address: &str, wallet_type: &str) -> Result<Wallet, RepositoryError>;

    /// Makes `wallet_id` the active wallet for `owner`, deactivating the rest.
    ///
    /// Fails with `WalletNotFound` if the wallet does not exist or belongs to someone else.
    async fn activate_wallet(&self, owner: ActorId, wallet_id: i64) -> Result<Wallet, RepositoryError>;

    /// Fetches all wallets for `owner`, oldest first.
    async fn fetch_wallets(&self, owner: ActorId) -> Result<Vec<Wallet>, RepositoryError>;

    /// Fetches a wallet by id, provided it belongs to `owner`.
    async fn fetch_wallet(&self, owner: ActorId, wallet_id: i64) -> Result<Option<Wallet>, RepositoryError>;

    async fn fetch_active_wallet(&self, owner: ActorId) -> Result<Option<Wallet>, RepositoryError>;
}
