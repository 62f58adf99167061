use crate::traits::{ActorManagement, AdminRoster, RequestManagement, WalletManagement};

/// This trait defines the complete set of behaviour a backend must provide to drive the payout workflow.
///
/// This behaviour includes:
/// * Registering actors and tracking their earnings ([`ActorManagement`])
/// * Storing wallets and switching the active one ([`WalletManagement`])
/// * Filing requests and applying guarded status transitions to them ([`RequestManagement`])
/// * Maintaining the admin roster ([`AdminRoster`])
pub trait PayoutDatabase: Clone + ActorManagement + WalletManagement + RequestManagement + AdminRoster {
    /// The URL of the database
    fn url(&self) -> &str;
}
