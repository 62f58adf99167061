use serde::Serialize;

use crate::db_types::{ActorId, PayoutRequest, Proof, Wallet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestCreatedEvent {
    pub request: PayoutRequest,
}

impl RequestCreatedEvent {
    pub fn new(request: PayoutRequest) -> Self {
        Self { request }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestValuedEvent {
    pub request: PayoutRequest,
    pub valued_by: ActorId,
}

impl RequestValuedEvent {
    pub fn new(request: PayoutRequest, valued_by: ActorId) -> Self {
        Self { request, valued_by }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestRejectedEvent {
    pub request: PayoutRequest,
    pub rejected_by: ActorId,
    pub reason: String,
}

impl RequestRejectedEvent {
    pub fn new(request: PayoutRequest, rejected_by: ActorId) -> Self {
        let reason = request.rejection_reason.clone().unwrap_or_default();
        Self { request, rejected_by, reason }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestPaidEvent {
    pub request: PayoutRequest,
    pub paid_by: ActorId,
    /// The settlement receipt, to be forwarded to the submitter.
    pub proof: Proof,
}

impl RequestPaidEvent {
    pub fn new(request: PayoutRequest, paid_by: ActorId, proof: Proof) -> Self {
        Self { request, paid_by, proof }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletAddedEvent {
    pub wallet: Wallet,
}

impl WalletAddedEvent {
    pub fn new(wallet: Wallet) -> Self {
        Self { wallet }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletActivatedEvent {
    pub wallet: Wallet,
}

impl WalletActivatedEvent {
    pub fn new(wallet: Wallet) -> Self {
        Self { wallet }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EventType {
    RequestCreated(RequestCreatedEvent),
    RequestValued(RequestValuedEvent),
    RequestRejected(RequestRejectedEvent),
    RequestPaid(RequestPaidEvent),
    WalletAdded(WalletAddedEvent),
    WalletActivated(WalletActivatedEvent),
}

impl EventType {
    /// The actor the event is primarily about: the request or wallet owner.
    pub fn subject(&self) -> ActorId {
        match self {
            EventType::RequestCreated(e) => e.request.owner_id,
            EventType::RequestValued(e) => e.request.owner_id,
            EventType::RequestRejected(e) => e.request.owner_id,
            EventType::RequestPaid(e) => e.request.owner_id,
            EventType::WalletAdded(e) => e.wallet.owner_id,
            EventType::WalletActivated(e) => e.wallet.owner_id,
        }
    }
}
