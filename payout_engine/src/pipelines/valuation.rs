//! The reviewer's guided flow. An admin opens one request at a time to price it, reject it, or confirm that it has
//! been paid.
//!
//! Entry points check the request up front so the admin gets an immediate answer, but the decisive check is the
//! compare-and-set the repository performs when the final input arrives. When two admins race, the loser gets the
//! same `AlreadyFinal`/`AlreadyValued` error, naming who resolved the request.
use std::{fmt::Debug, sync::Arc};

use log::*;

use crate::{
    config::EngineConfig,
    db_types::{ActorId, PayoutRequest, Proof, Transition, Valuation},
    events::{EventProducers, RequestPaidEvent, RequestRejectedEvent, RequestValuedEvent},
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
    traits::{AdminRoster, PreconditionFailed, RequestManagement},
};

const REQUEST_ID: &str = "request_id";

pub struct ValuationFlow<B> {
    db: B,
    sessions: Arc<SessionStore>,
    producers: EventProducers,
    rules: ValidationRules,
}

impl<B> Debug for ValuationFlow<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ValuationFlow")
    }
}

impl<B> ValuationFlow<B> {
    pub fn new(db: B, sessions: Arc<SessionStore>, producers: EventProducers, config: &EngineConfig) -> Self {
        Self { db, sessions, producers, rules: ValidationRules::from(config) }
    }
}

impl<B> ValuationFlow<B>
where B: RequestManagement + AdminRoster
{
    /// Opens request `id` for pricing. It must be unsettled and not yet valued.
    pub async fn begin_pricing(&self, admin: ActorId, id: i64) -> Result<Outcome, FlowError> {
        self.begin(admin, id, Transition::Valuation, Step::Pricing, Prompt::EnterAmount).await
    }

    /// Opens request `id` for rejection. It must not be settled already.
    pub async fn begin_rejection(&self, admin: ActorId, id: i64) -> Result<Outcome, FlowError> {
        self.begin(admin, id, Transition::Rejection, Step::Rejecting, Prompt::EnterRejectionReason).await
    }

    /// Opens request `id` for payment confirmation. It must be valued and unsettled.
    pub async fn begin_payment_confirmation(&self, admin: ActorId, id: i64) -> Result<Outcome, FlowError> {
        self.begin(admin, id, Transition::Payment, Step::ConfirmingPayment, Prompt::SendPaymentProof).await
    }

    async fn begin(
        &self,
        admin: ActorId,
        id: i64,
        transition: Transition,
        step: Step,
        prompt: fn(PayoutRequest) -> Prompt,
    ) -> Result<Outcome, FlowError> {
        let mut slot = self.sessions.lock(admin, Role::Reviewer).await;
        let result = self.open_request(admin, id, transition).await.map(|request| {
            slot.begin(step);
            slot.put(REQUEST_ID, id);
            debug!("⚖️ Admin {admin} opened request #{id} at {step}");
            Outcome::Prompt(prompt(request))
        });
        end_on_precondition(&mut slot, result)
    }

    async fn open_request(&self, admin: ActorId, id: i64, transition: Transition) -> Result<PayoutRequest, FlowError> {
        self.require_admin(admin).await?;
        let request = self.db.fetch_request(id).await?.ok_or(PreconditionFailed::RequestNotFound(id))?;
        request.check_transition(transition)?;
        Ok(request)
    }

    /// Feeds one input into the admin's review session.
    pub async fn handle_input(&self, admin: ActorId, payload: Payload) -> Result<Outcome, FlowError> {
        let mut slot = self.sessions.lock(admin, Role::Reviewer).await;
        let step = match slot.step() {
            Some(step) => step,
            None => return Ok(Outcome::NoActiveFlow),
        };
        trace!("⚖️ Admin {admin} sent {:?} at {step}", payload.category());
        let action = transition(step, payload.category());
        if action == Action::Abandon {
            return Ok(abandon(&mut slot, &payload));
        }
        let id = match slot.session().and_then(|s| s.get::<i64>(REQUEST_ID)) {
            Some(id) => id,
            None => {
                error!("⚖️ The review session for {admin} is at {step} but has no request attached");
                slot.end();
                return Ok(Outcome::Cancelled);
            },
        };
        let result = match (action, payload) {
            (Action::PriceRequest, Payload::Text(text)) => self.price(&mut slot, admin, id, &text).await,
            (Action::RejectRequest, Payload::Text(text)) => self.reject(&mut slot, admin, id, &text).await,
            (Action::SettleRequest, Payload::Attachment(proof)) => self.settle(&mut slot, admin, id, proof).await,
            _ => Ok(Outcome::Reprompt { step, error: ValidationError::unexpected(step) }),
        };
        end_on_precondition(&mut slot, result)
    }

    async fn require_admin(&self, admin: ActorId) -> Result<(), FlowError> {
        if self.db.is_admin(admin).await? {
            Ok(())
        } else {
            warn!("⚖️ Actor {admin} tried to review a request without admin rights");
            Err(PreconditionFailed::NotAnAdmin(admin).into())
        }
    }

    async fn price(
        &self,
        slot: &mut SessionGuard,
        admin: ActorId,
        id: i64,
        text: &str,
    ) -> Result<Outcome, FlowError> {
        let amount = match self.rules.amount(text) {
            Ok(amount) => amount,
            Err(error) => return Ok(Outcome::Reprompt { step: Step::Pricing, error }),
        };
        // Admin rights may have been revoked while the session was open
        let request = self.open_request(admin, id, Transition::Valuation).await?;
        let valuation = Valuation::split(amount, request.worker_percent);
        let request = self.db.set_valuation(id, admin, valuation).await?;
        info!(
            "⚖️ Request #{id} valued at {amount} by {admin}: {} to the worker, {} to the operator",
            request.worker_share, request.operator_share
        );
        self.producers.publish_request_valued(RequestValuedEvent::new(request.clone(), admin)).await;
        slot.end();
        Ok(Outcome::Completed(Completion::RequestValued(request)))
    }

    async fn reject(
        &self,
        slot: &mut SessionGuard,
        admin: ActorId,
        id: i64,
        text: &str,
    ) -> Result<Outcome, FlowError> {
        let reason = match self.rules.rejection_reason(text) {
            Ok(reason) => reason,
            Err(error) => return Ok(Outcome::Reprompt { step: Step::Rejecting, error }),
        };
        self.require_admin(admin).await?;
        let request = self.db.reject_request(id, admin, &reason).await?;
        info!("⚖️ Request #{id} rejected by {admin}: {reason}");
        self.producers.publish_request_rejected(RequestRejectedEvent::new(request.clone(), admin)).await;
        slot.end();
        Ok(Outcome::Completed(Completion::RequestRejected(request)))
    }

    async fn settle(
        &self,
        slot: &mut SessionGuard,
        admin: ActorId,
        id: i64,
        proof: Proof,
    ) -> Result<Outcome, FlowError> {
        let proof = match self.rules.payment_proof(proof) {
            Ok(proof) => proof,
            Err(error) => return Ok(Outcome::Reprompt { step: Step::ConfirmingPayment, error }),
        };
        self.require_admin(admin).await?;
        let request = self.db.mark_paid(id, admin, proof.clone()).await?;
        info!("⚖️ Request #{id} paid by {admin}. {} credited to {}", request.worker_share, request.owner_id);
        self.producers.publish_request_paid(RequestPaidEvent::new(request.clone(), admin, proof)).await;
        slot.end();
        Ok(Outcome::Completed(Completion::RequestPaid(request)))
    }
}
