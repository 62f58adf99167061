use thiserror::Error;

use crate::{
    db_types::{Direction, PayoutRequest, ProofKind, Wallet},
    sessions::Step,
    traits::{PreconditionFailed, RepositoryError},
};

/// The result of handling one input in a guided flow.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The flow moved on (or stayed put after accepting the input); ask for the next input.
    Prompt(Prompt),
    /// The input was rejected. The session stays on `step`.
    Reprompt { step: Step, error: ValidationError },
    /// The flow finished and the session has ended.
    Completed(Completion),
    Cancelled,
    ReturnedToMain,
    /// There is no guided flow in progress for this actor and role.
    NoActiveFlow,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    EnterWallet,
    SelectWallet(Vec<Wallet>),
    SelectDirection(Vec<Direction>),
    EnterReferenceLink,
    AttachProofs { attached: usize },
    EnterAmount(PayoutRequest),
    EnterRejectionReason(PayoutRequest),
    SendPaymentProof(PayoutRequest),
}

impl Prompt {
    pub fn step(&self) -> Step {
        match self {
            Prompt::EnterWallet => Step::CollectingWallet,
            Prompt::SelectWallet(_) => Step::SelectingWallet,
            Prompt::SelectDirection(_) => Step::SelectingDirection,
            Prompt::EnterReferenceLink => Step::CollectingReferenceLink,
            Prompt::AttachProofs { .. } => Step::CollectingProofs,
            Prompt::EnterAmount(_) => Step::Pricing,
            Prompt::EnterRejectionReason(_) => Step::Rejecting,
            Prompt::SendPaymentProof(_) => Step::ConfirmingPayment,
        }
    }

    pub fn select_direction() -> Self {
        Prompt::SelectDirection(Direction::ALL.to_vec())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    WalletRegistered(Wallet),
    RequestCreated(PayoutRequest),
    RequestValued(PayoutRequest),
    RequestRejected(PayoutRequest),
    RequestPaid(PayoutRequest),
}

/// Bad input. Reported back to the actor, who may try again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("'{0}' is not a valid wallet address.")]
    InvalidWalletAddress(String),
    #[error("'{0}' is not a valid link. It must start with http://, https://, t.me/ or @.")]
    InvalidReferenceLink(String),
    #[error("Invalid amount. {0}")]
    InvalidAmount(String),
    #[error("Attach at least one proof before finishing.")]
    NoProofs,
    #[error("A reason for the rejection is required.")]
    EmptyReason,
    #[error("A {0} cannot be used here. Send a photo or document.")]
    WrongAttachment(ProofKind),
    #[error("Unexpected input at {step}. Expected {expected}.")]
    UnexpectedInput { step: Step, expected: &'static str },
}

impl ValidationError {
    pub fn unexpected(step: Step) -> Self {
        ValidationError::UnexpectedInput { step, expected: step.expects() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
    /// A business rule prevented the action. The session for the action has ended.
    #[error("{0}")]
    Precondition(#[from] PreconditionFailed),
    /// Storage is unavailable. The session is left as it was, so the same input can be retried.
    #[error("Storage error. {0}")]
    Storage(String),
}

impl From<RepositoryError> for FlowError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::DatabaseError(s) => FlowError::Storage(s),
            RepositoryError::Precondition(p) => FlowError::Precondition(p),
        }
    }
}
