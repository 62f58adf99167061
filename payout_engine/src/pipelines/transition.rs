//! The `(Step, InputCategory) → Action` table that drives both guided flows.
//!
//! This is a pure function. The pipelines classify an input, look up the action here, and then carry it out against
//! the repository. Keeping the table in one place means every step/input combination is accounted for explicitly.
use crate::{
    db_types::{Direction, Proof},
    sessions::Step,
};

/// Everything an actor can send into a guided flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Attachment(Proof),
    SelectWallet(i64),
    AddNewWallet,
    SelectDirection(Direction),
    Done,
    Cancel,
    ReturnToMain,
}

impl Payload {
    pub fn text<S: Into<String>>(s: S) -> Self {
        Payload::Text(s.into())
    }

    pub fn category(&self) -> InputCategory {
        match self {
            Payload::Text(_) => InputCategory::Text,
            Payload::Attachment(_) => InputCategory::Attachment,
            Payload::SelectWallet(_) => InputCategory::WalletChoice,
            Payload::AddNewWallet => InputCategory::NewWallet,
            Payload::SelectDirection(_) => InputCategory::DirectionChoice,
            Payload::Done => InputCategory::Done,
            Payload::Cancel | Payload::ReturnToMain => InputCategory::Interrupt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputCategory {
    Text,
    Attachment,
    WalletChoice,
    NewWallet,
    DirectionChoice,
    Done,
    Interrupt,
}

impl InputCategory {
    pub const ALL: [InputCategory; 7] = [
        InputCategory::Text,
        InputCategory::Attachment,
        InputCategory::WalletChoice,
        InputCategory::NewWallet,
        InputCategory::DirectionChoice,
        InputCategory::Done,
        InputCategory::Interrupt,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Validate the text as a wallet address and store the wallet.
    RegisterWallet,
    /// Snapshot one of the actor's existing wallets.
    UseExistingWallet,
    /// Switch to collecting a brand-new wallet address, then carry on with the request.
    CollectNewWallet,
    ChooseDirection,
    /// Validate the text as a reference link.
    RecordReferenceLink,
    AppendProof,
    /// File the request with the proofs collected so far.
    CommitRequest,
    /// Validate the text as an amount and price the request.
    PriceRequest,
    /// Use the text as the rejection reason.
    RejectRequest,
    /// Validate the attachment as a payment receipt and settle the request.
    SettleRequest,
    /// Leave the flow. The session is discarded; anything already stored stays.
    Abandon,
    /// The input does not fit the step. Re-prompt with what the step expects.
    Unexpected,
}

pub fn transition(step: Step, input: InputCategory) -> Action {
    use InputCategory as I;
    use Step as S;
    match (step, input) {
        (_, I::Interrupt) => Action::Abandon,
        (S::CollectingWallet, I::Text) => Action::RegisterWallet,
        (S::SelectingWallet, I::WalletChoice) => Action::UseExistingWallet,
        (S::SelectingWallet, I::NewWallet) => Action::CollectNewWallet,
        (S::SelectingDirection, I::DirectionChoice) => Action::ChooseDirection,
        (S::CollectingReferenceLink, I::Text) => Action::RecordReferenceLink,
        (S::CollectingProofs, I::Text | I::Attachment) => Action::AppendProof,
        (S::CollectingProofs, I::Done) => Action::CommitRequest,
        (S::Pricing, I::Text) => Action::PriceRequest,
        (S::Rejecting, I::Text) => Action::RejectRequest,
        (S::ConfirmingPayment, I::Attachment) => Action::SettleRequest,
        _ => Action::Unexpected,
    }
}
