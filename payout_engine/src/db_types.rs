use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use payout_common::Amount;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

use crate::traits::{PreconditionFailed, Resolution};

//--------------------------------------       ActorId       ---------------------------------------------------------
/// The opaque numeric identity of a participant, as assigned by the chat transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct ActorId(pub i64);

impl ActorId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl From<i64> for ActorId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------        Actor        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Actor {
    pub id: ActorId,
    pub username: Option<String>,
    pub display_name: String,
    /// The percentage of every valuation that is paid out to this actor. Between 0 and 100.
    pub worker_percent: i64,
    /// Lifetime total of worker shares paid out to this actor.
    pub total_earned: Amount,
    /// The number of settled (paid) requests for this actor.
    pub profits_count: i64,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActor {
    pub id: ActorId,
    pub username: Option<String>,
    pub display_name: String,
}

impl NewActor {
    pub fn new<S: Into<String>>(id: ActorId, display_name: S) -> Self {
        Self { id, username: None, display_name: display_name.into() }
    }

    pub fn with_username<S: Into<String>>(mut self, username: S) -> Self {
        self.username = Some(username.into());
        self
    }
}

//--------------------------------------        Wallet       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Wallet {
    pub id: i64,
    pub owner_id: ActorId,
    pub address: String,
    pub wallet_type: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Wallet {
    pub fn snapshot(&self) -> WalletSnapshot {
        WalletSnapshot { address: self.address.clone(), wallet_type: self.wallet_type.clone() }
    }
}

/// The wallet details copied into a request at the time it was filed. Later changes to the wallet do not affect
/// requests that have already been submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub address: String,
    pub wallet_type: String,
}

//--------------------------------------      Direction      ---------------------------------------------------------
/// The line of work a payout request is filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum Direction {
    #[sqlx(rename = "Dr@iner")]
    #[serde(rename = "Dr@iner")]
    Drainer,
    #[sqlx(rename = "OTC Bot")]
    #[serde(rename = "OTC Bot")]
    OtcBot,
    Nicegram,
}

impl Direction {
    pub const ALL: [Direction; 3] = [Direction::Drainer, Direction::OtcBot, Direction::Nicegram];

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Drainer => "Dr@iner",
            Direction::OtcBot => "OTC Bot",
            Direction::Nicegram => "Nicegram",
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid direction: {0}")]
pub struct DirectionParseError(String);

impl FromStr for Direction {
    type Err = DirectionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Direction::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| DirectionParseError(s.to_string()))
    }
}

//--------------------------------------        Proofs       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum ProofKind {
    Photo,
    Video,
    Document,
    Text,
}

impl Display for ProofKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProofKind::Photo => write!(f, "photo"),
            ProofKind::Video => write!(f, "video"),
            ProofKind::Document => write!(f, "document"),
            ProofKind::Text => write!(f, "text"),
        }
    }
}

/// A typed attachment. For media kinds, `content` is the transport's file reference; for text proofs it is the text
/// itself.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Proof {
    pub kind: ProofKind,
    pub content: String,
}

impl Proof {
    pub fn new<S: Into<String>>(kind: ProofKind, content: S) -> Self {
        Self { kind, content: content.into() }
    }

    pub fn photo<S: Into<String>>(file_ref: S) -> Self {
        Self::new(ProofKind::Photo, file_ref)
    }

    pub fn document<S: Into<String>>(file_ref: S) -> Self {
        Self::new(ProofKind::Document, file_ref)
    }

    pub fn text<S: Into<String>>(text: S) -> Self {
        Self::new(ProofKind::Text, text)
    }
}

//--------------------------------------    RequestStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
pub enum RequestStatus {
    /// The request has been filed and has not been settled. It may or may not have been priced yet.
    AwaitingValuation,
    /// The request was turned down by an admin. Terminal.
    Rejected,
    /// The worker share has been paid out. Terminal.
    Paid,
}

impl RequestStatus {
    pub fn is_final(&self) -> bool {
        matches!(self, RequestStatus::Rejected | RequestStatus::Paid)
    }
}

impl Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStatus::AwaitingValuation => write!(f, "AwaitingValuation"),
            RequestStatus::Rejected => write!(f, "Rejected"),
            RequestStatus::Paid => write!(f, "Paid"),
        }
    }
}

//--------------------------------------      Transition     ---------------------------------------------------------
/// The status-changing operations an admin can perform on a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Valuation,
    Rejection,
    Payment,
}

//--------------------------------------    PayoutRequest    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct PayoutRequest {
    pub id: i64,
    pub owner_id: ActorId,
    pub wallet_address: String,
    pub wallet_type: String,
    pub direction: Direction,
    pub reference_link: String,
    pub total_amount: Amount,
    pub worker_share: Amount,
    pub operator_share: Amount,
    /// The owner's worker percent at the time the request was filed.
    pub worker_percent: i64,
    pub status: RequestStatus,
    pub rejection_reason: Option<String>,
    pub payment_proof_kind: Option<ProofKind>,
    pub payment_proof: Option<String>,
    /// The admin who performed the last successful transition on this request.
    pub handled_by: Option<ActorId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub proofs: Vec<Proof>,
}

impl PayoutRequest {
    /// A request is valued once it has been priced but not yet settled.
    pub fn is_valued(&self) -> bool {
        self.status == RequestStatus::AwaitingValuation && self.total_amount.is_positive()
    }

    pub fn wallet(&self) -> WalletSnapshot {
        WalletSnapshot { address: self.wallet_address.clone(), wallet_type: self.wallet_type.clone() }
    }

    pub fn payment_receipt(&self) -> Option<Proof> {
        match (self.payment_proof_kind, &self.payment_proof) {
            (Some(kind), Some(content)) => Some(Proof::new(kind, content.clone())),
            _ => None,
        }
    }

    pub fn resolution(&self) -> Resolution {
        Resolution {
            request_id: self.id,
            status: self.status,
            total_amount: self.total_amount,
            handled_by: self.handled_by,
        }
    }

    /// Checks whether `transition` is currently permitted on this request.
    ///
    /// * Terminal requests permit nothing (`AlreadyFinal`).
    /// * Valuation requires an unpriced request (`AlreadyValued`).
    /// * Payment requires a priced request (`NotYetValued`).
    /// * Rejection is permitted whether or not the request has been priced.
    pub fn check_transition(&self, transition: Transition) -> Result<(), PreconditionFailed> {
        if self.status.is_final() {
            return Err(PreconditionFailed::AlreadyFinal(self.resolution()));
        }
        match transition {
            Transition::Valuation if self.total_amount.is_positive() => {
                Err(PreconditionFailed::AlreadyValued(self.resolution()))
            },
            Transition::Payment if !self.total_amount.is_positive() => Err(PreconditionFailed::NotYetValued(self.id)),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRequest {
    pub owner_id: ActorId,
    pub wallet: WalletSnapshot,
    pub direction: Direction,
    pub reference_link: String,
    pub worker_percent: i64,
    pub proofs: Vec<Proof>,
}

//--------------------------------------      Valuation      ---------------------------------------------------------
/// The split of a priced request between the worker and the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Valuation {
    pub total: Amount,
    pub worker_share: Amount,
    pub operator_share: Amount,
}

impl Valuation {
    /// Splits `total` so that the worker receives `worker_percent`% (truncated to the micro-unit) and the operator
    /// receives the remainder. The two shares always sum to `total`.
    pub fn split(total: Amount, worker_percent: i64) -> Self {
        let worker_share = total.percent(worker_percent);
        let operator_share = total - worker_share;
        Self { total, worker_share, operator_share }
    }
}

//--------------------------------------     Admin roster    ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct AdminEntry {
    pub actor_id: ActorId,
    pub is_founder: bool,
    pub added_by: Option<ActorId>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------      TeamStats      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct TeamStats {
    pub total_amount: Amount,
    pub total_profits: i64,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    fn request(status: RequestStatus, total: Amount) -> PayoutRequest {
        let now = Utc::now();
        PayoutRequest {
            id: 7,
            owner_id: ActorId(1),
            wallet_address: "abc123XYZ".into(),
            wallet_type: "TON Wallet".into(),
            direction: Direction::OtcBot,
            reference_link: "https://t.me/proof1".into(),
            total_amount: total,
            worker_share: Amount::ZERO,
            operator_share: Amount::ZERO,
            worker_percent: 60,
            status,
            rejection_reason: None,
            payment_proof_kind: None,
            payment_proof: None,
            handled_by: Some(ActorId(99)),
            created_at: now,
            updated_at: now,
            proofs: vec![],
        }
    }

    #[test]
    fn split_always_sums_to_total() {
        for total in [0, 1, 99, 100, 333_333, 100_000_000, 10_000_000_000] {
            for percent in 0..=100 {
                let v = Valuation::split(Amount::from(total), percent);
                assert_eq!(v.worker_share + v.operator_share, v.total, "total={total} percent={percent}");
                assert!(v.worker_share.value() >= 0 && v.operator_share.value() >= 0);
            }
        }
    }

    #[test]
    fn split_sixty_forty() {
        let v = Valuation::split(Amount::from_units(100), 60);
        assert_eq!(v.worker_share, Amount::from_units(60));
        assert_eq!(v.operator_share, Amount::from_units(40));
    }

    #[test]
    fn direction_names() {
        assert_eq!("OTC Bot".parse::<Direction>().unwrap(), Direction::OtcBot);
        assert_eq!("dr@iner".parse::<Direction>().unwrap(), Direction::Drainer);
        assert_eq!(Direction::Nicegram.to_string(), "Nicegram");
        assert!("Telegram".parse::<Direction>().is_err());
        assert_eq!(serde_json::to_string(&Direction::OtcBot).unwrap(), "\"OTC Bot\"");
    }

    #[test]
    fn transition_guards() {
        let fresh = request(RequestStatus::AwaitingValuation, Amount::ZERO);
        assert!(fresh.check_transition(Transition::Valuation).is_ok());
        assert!(fresh.check_transition(Transition::Rejection).is_ok());
        assert_eq!(fresh.check_transition(Transition::Payment), Err(PreconditionFailed::NotYetValued(7)));

        let valued = request(RequestStatus::AwaitingValuation, Amount::from_units(100));
        assert!(valued.is_valued());
        assert!(matches!(valued.check_transition(Transition::Valuation), Err(PreconditionFailed::AlreadyValued(_))));
        assert!(valued.check_transition(Transition::Payment).is_ok());
        assert!(valued.check_transition(Transition::Rejection).is_ok());

        for status in [RequestStatus::Paid, RequestStatus::Rejected] {
            let done = request(status, Amount::from_units(100));
            for t in [Transition::Valuation, Transition::Rejection, Transition::Payment] {
                match done.check_transition(t) {
                    Err(PreconditionFailed::AlreadyFinal(r)) => {
                        assert_eq!(r.status, status);
                        assert_eq!(r.handled_by, Some(ActorId(99)));
                    },
                    other => panic!("Expected AlreadyFinal, got {other:?}"),
                }
            }
        }
    }
}
