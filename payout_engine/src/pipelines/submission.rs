//! The submitter's guided flow: pick or create a wallet, choose a direction, give a reference link, attach proofs and
//! file the request.
use std::{fmt::Debug, sync::Arc};

use log::*;

use crate::{
    config::EngineConfig,
    db_types::{Actor, ActorId, Direction, NewRequest, Proof, Wallet, WalletSnapshot},
    events::{EventProducers, RequestCreatedEvent, WalletActivatedEvent, WalletAddedEvent},
    pipelines::{
        abandon,
        end_on_precondition,
        transition,
        Action,
        Completion,
        FlowError,
        Outcome,
        Payload,
        Prompt,
        ValidationError,
        ValidationRules,
    },
    sessions::{Role, SessionGuard, SessionStore, Step},
    traits::{ActorManagement, PreconditionFailed, RequestManagement, WalletManagement},
};

const CREATING_REQUEST: &str = "creating_request";
const WALLET: &str = "wallet";
const DIRECTION: &str = "direction";
const REFERENCE_LINK: &str = "reference_link";
const PROOFS: &str = "proofs";

pub struct SubmissionFlow<B> {
    db: B,
    sessions: Arc<SessionStore>,
    producers: EventProducers,
    rules: ValidationRules,
    wallet_type: String,
}

impl<B> Debug for SubmissionFlow<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SubmissionFlow")
    }
}

impl<B> SubmissionFlow<B> {
    pub fn new(db: B, sessions: Arc<SessionStore>, producers: EventProducers, config: &EngineConfig) -> Self {
        Self {
            db,
            sessions,
            producers,
            rules: ValidationRules::from(config),
            wallet_type: config.default_wallet_type.clone(),
        }
    }
}

impl<B> SubmissionFlow<B>
where B: ActorManagement + WalletManagement + RequestManagement
{
    /// Starts a new payout request for `actor`, abandoning any submission that was in progress.
    ///
    /// Actors without wallets are asked for a wallet address first; everyone else picks one of their wallets.
    pub async fn start_submission(&self, actor: ActorId) -> Result<Outcome, FlowError> {
        let mut slot = self.sessions.lock(actor, Role::Submitter).await;
        let result = self.begin_submission(&mut slot, actor).await;
        end_on_precondition(&mut slot, result)
    }

    async fn begin_submission(&self, slot: &mut SessionGuard, actor: ActorId) -> Result<Outcome, FlowError> {
        self.require_active_actor(actor).await?;
        let wallets = self.db.fetch_wallets(actor).await?;
        let prompt = if wallets.is_empty() {
            slot.begin(Step::CollectingWallet);
            Prompt::EnterWallet
        } else {
            slot.begin(Step::SelectingWallet);
            Prompt::SelectWallet(wallets)
        };
        slot.put(CREATING_REQUEST, true);
        debug!("🧾️ Actor {actor} started a new request at {}", prompt.step());
        Ok(Outcome::Prompt(prompt))
    }

    /// Starts the standalone "add a wallet" flow. A valid address creates the wallet and ends the session.
    pub async fn start_wallet_registration(&self, actor: ActorId) -> Result<Outcome, FlowError> {
        let mut slot = self.sessions.lock(actor, Role::Submitter).await;
        let result = match self.require_active_actor(actor).await {
            Ok(_) => {
                slot.begin(Step::CollectingWallet);
                Ok(Outcome::Prompt(Prompt::EnterWallet))
            },
            Err(e) => Err(e),
        };
        end_on_precondition(&mut slot, result)
    }

    /// Makes one of the actor's wallets the active one. This does not touch any session.
    pub async fn activate_wallet(&self, actor: ActorId, wallet_id: i64) -> Result<Wallet, FlowError> {
        let wallet = self.db.activate_wallet(actor, wallet_id).await?;
        info!("🧾️ Actor {actor} switched to wallet #{wallet_id}");
        self.producers.publish_wallet_activated(WalletActivatedEvent::new(wallet.clone())).await;
        Ok(wallet)
    }

    /// Feeds one input into the actor's submission session.
    pub async fn handle_input(&self, actor: ActorId, payload: Payload) -> Result<Outcome, FlowError> {
        let mut slot = self.sessions.lock(actor, Role::Submitter).await;
        let step = match slot.step() {
            Some(step) => step,
            None => return Ok(Outcome::NoActiveFlow),
        };
        trace!("🧾️ Actor {actor} sent {:?} at {step}", payload.category());
        let result = match (transition(step, payload.category()), payload) {
            (Action::Abandon, payload) => Ok(abandon(&mut slot, &payload)),
            (Action::RegisterWallet, Payload::Text(text)) => self.register_wallet(&mut slot, actor, &text).await,
            (Action::UseExistingWallet, Payload::SelectWallet(id)) => {
                self.use_existing_wallet(&mut slot, actor, id).await
            },
            (Action::CollectNewWallet, _) => {
                slot.set_step(Step::CollectingWallet);
                Ok(Outcome::Prompt(Prompt::EnterWallet))
            },
            (Action::ChooseDirection, Payload::SelectDirection(direction)) => {
                Ok(self.choose_direction(&mut slot, direction))
            },
            (Action::RecordReferenceLink, Payload::Text(text)) => Ok(self.record_reference_link(&mut slot, &text)),
            (Action::AppendProof, Payload::Text(text)) => Ok(append_proof(&mut slot, Proof::text(text.trim()))),
            (Action::AppendProof, Payload::Attachment(proof)) => Ok(append_proof(&mut slot, proof)),
            (Action::CommitRequest, _) => self.commit_request(&mut slot, actor).await,
            _ => Ok(Outcome::Reprompt { step, error: ValidationError::unexpected(step) }),
        };
        end_on_precondition(&mut slot, result)
    }

    async fn require_active_actor(&self, actor: ActorId) -> Result<Actor, FlowError> {
        let record = self.db.fetch_actor(actor).await?.ok_or(PreconditionFailed::ActorNotFound(actor))?;
        if record.is_blocked {
            info!("🧾️ Blocked actor {actor} tried to start a flow");
            return Err(PreconditionFailed::ActorBlocked(actor).into());
        }
        Ok(record)
    }

    async fn register_wallet(
        &self,
        slot: &mut SessionGuard,
        actor: ActorId,
        text: &str,
    ) -> Result<Outcome, FlowError> {
        let address = match self.rules.wallet_address(text) {
            Ok(address) => address,
            Err(error) => return Ok(Outcome::Reprompt { step: Step::CollectingWallet, error }),
        };
        let wallet = self.db.add_wallet(actor, &address, &self.wallet_type).await?;
        info!("🧾️ Actor {actor} added wallet #{} ({address})", wallet.id);
        self.producers.publish_wallet_added(WalletAddedEvent::new(wallet.clone())).await;
        let creating_request = slot.session().map(|s| s.flag(CREATING_REQUEST)).unwrap_or(false);
        if creating_request {
            slot.put(WALLET, wallet.snapshot());
            slot.set_step(Step::SelectingDirection);
            Ok(Outcome::Prompt(Prompt::select_direction()))
        } else {
            slot.end();
            Ok(Outcome::Completed(Completion::WalletRegistered(wallet)))
        }
    }

    async fn use_existing_wallet(
        &self,
        slot: &mut SessionGuard,
        actor: ActorId,
        wallet_id: i64,
    ) -> Result<Outcome, FlowError> {
        let wallet =
            self.db.fetch_wallet(actor, wallet_id).await?.ok_or(PreconditionFailed::WalletNotFound(wallet_id))?;
        slot.put(WALLET, wallet.snapshot());
        slot.set_step(Step::SelectingDirection);
        Ok(Outcome::Prompt(Prompt::select_direction()))
    }

    fn choose_direction(&self, slot: &mut SessionGuard, direction: Direction) -> Outcome {
        slot.put(DIRECTION, direction);
        slot.set_step(Step::CollectingReferenceLink);
        Outcome::Prompt(Prompt::EnterReferenceLink)
    }

    fn record_reference_link(&self, slot: &mut SessionGuard, text: &str) -> Outcome {
        match self.rules.reference_link(text) {
            Ok(link) => {
                slot.put(REFERENCE_LINK, link);
                slot.put(PROOFS, Vec::<Proof>::new());
                slot.set_step(Step::CollectingProofs);
                Outcome::Prompt(Prompt::AttachProofs { attached: 0 })
            },
            Err(error) => Outcome::Reprompt { step: Step::CollectingReferenceLink, error },
        }
    }

    async fn commit_request(&self, slot: &mut SessionGuard, actor: ActorId) -> Result<Outcome, FlowError> {
        let collected = slot.session().map(|s| {
            (
                s.get::<WalletSnapshot>(WALLET),
                s.get::<Direction>(DIRECTION),
                s.get::<String>(REFERENCE_LINK),
                s.get::<Vec<Proof>>(PROOFS).unwrap_or_default(),
            )
        });
        let (wallet, direction, reference_link, proofs) = match collected {
            Some((Some(wallet), Some(direction), Some(link), proofs)) => (wallet, direction, link, proofs),
            _ => {
                error!("🧾️ The submission session for {actor} is missing collected fields. Cancelling it.");
                slot.end();
                return Ok(Outcome::Cancelled);
            },
        };
        if proofs.is_empty() {
            return Ok(Outcome::Reprompt { step: Step::CollectingProofs, error: ValidationError::NoProofs });
        }
        let owner = self.db.fetch_actor(actor).await?.ok_or(PreconditionFailed::ActorNotFound(actor))?;
        let request = NewRequest {
            owner_id: actor,
            wallet,
            direction,
            reference_link,
            worker_percent: owner.worker_percent,
            proofs,
        };
        let request = self.db.insert_request(request).await?;
        info!(
            "🧾️ Request #{} filed by {actor} with {} proofs at {}%",
            request.id,
            request.proofs.len(),
            request.worker_percent
        );
        self.producers.publish_request_created(RequestCreatedEvent::new(request.clone())).await;
        slot.end();
        Ok(Outcome::Completed(Completion::RequestCreated(request)))
    }
}

fn append_proof(slot: &mut SessionGuard, proof: Proof) -> Outcome {
    if proof.content.is_empty() {
        return Outcome::Reprompt {
            step: Step::CollectingProofs,
            error: ValidationError::unexpected(Step::CollectingProofs),
        };
    }
    let mut proofs = slot.session().and_then(|s| s.get::<Vec<Proof>>(PROOFS)).unwrap_or_default();
    proofs.push(proof);
    let attached = proofs.len();
    slot.put(PROOFS, proofs);
    Outcome::Prompt(Prompt::AttachProofs { attached })
}
