use std::fmt::Display;

use payout_common::Amount;
use thiserror::Error;

use crate::db_types::{ActorId, RequestStatus};

/// Who resolved a request, and how. Carried by the "already handled" failures so that a losing admin can be told
/// what happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub request_id: i64,
    pub status: RequestStatus,
    pub total_amount: Amount,
    pub handled_by: Option<ActorId>,
}

impl Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Request #{} is {} (amount {})", self.request_id, self.status, self.total_amount)?;
        match self.handled_by {
            Some(admin) => write!(f, ", handled by admin {admin}"),
            None => Ok(()),
        }
    }
}

/// A business rule prevented the operation. No state was changed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionFailed {
    #[error("{0}. It can no longer be changed.")]
    AlreadyFinal(Resolution),
    #[error("{0}. It has already been valued.")]
    AlreadyValued(Resolution),
    #[error("Request #{0} has not been valued yet.")]
    NotYetValued(i64),
    #[error("Request #{0} does not exist.")]
    RequestNotFound(i64),
    #[error("Wallet #{0} does not exist or does not belong to you.")]
    WalletNotFound(i64),
    #[error("Actor {0} is not registered.")]
    ActorNotFound(ActorId),
    #[error("Actor {0} is blocked.")]
    ActorBlocked(ActorId),
    #[error("Actor {0} is not an admin.")]
    NotAnAdmin(ActorId),
    #[error("Actor {0} is the founding admin and cannot be removed.")]
    FounderProtected(ActorId),
    #[error("{0} is not a valid worker percentage. It must be between 0 and 100.")]
    InvalidPercent(i64),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("The database could not complete the operation. {0}")]
    DatabaseError(String),
    #[error("{0}")]
    Precondition(#[from] PreconditionFailed),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(e: sqlx::Error) -> Self {
        RepositoryError::DatabaseError(e.to_string())
    }
}
