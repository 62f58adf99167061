use std::{fmt::Debug, sync::Arc};

use log::*;

use crate::{
    config::EngineConfig,
    db_types::{Actor, ActorId, AdminEntry, NewActor, PayoutRequest, RequestStatus, TeamStats, Wallet},
    events::EventProducers,
    pipelines::{FlowError, Outcome, Payload, SubmissionFlow, ValuationFlow},
    sessions::{Role, SessionStore, Step},
    traits::{PayoutDatabase, PreconditionFailed, RequestQueryFilter},
};

/// The programmatic surface of the payout engine.
///
/// Flow drivers return an [`Outcome`] describing what the actor should be shown next. Business-rule failures come
/// back as [`FlowError::Precondition`] and storage failures as [`FlowError::Storage`].
pub struct PayoutApi<B> {
    db: B,
    config: EngineConfig,
    sessions: Arc<SessionStore>,
    submission: SubmissionFlow<B>,
    valuation: ValuationFlow<B>,
}

impl<B> Debug for PayoutApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PayoutApi")
    }
}

impl<B> PayoutApi<B>
where B: PayoutDatabase
{
    pub fn new(db: B, config: EngineConfig, producers: EventProducers) -> Self {
        let sessions = Arc::new(SessionStore::new());
        let submission = SubmissionFlow::new(db.clone(), Arc::clone(&sessions), producers.clone(), &config);
        let valuation = ValuationFlow::new(db.clone(), Arc::clone(&sessions), producers, &config);
        Self { db, config, sessions, submission, valuation }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    //--------------------------------------     Flow drivers    -----------------------------------------------------
    pub async fn start_submission(&self, actor: ActorId) -> Result<Outcome, FlowError> {
        self.submission.start_submission(actor).await
    }

    pub async fn start_wallet_registration(&self, actor: ActorId) -> Result<Outcome, FlowError> {
        self.submission.start_wallet_registration(actor).await
    }

    pub async fn begin_pricing(&self, admin: ActorId, id: i64) -> Result<Outcome, FlowError> {
        self.valuation.begin_pricing(admin, id).await
    }

    pub async fn begin_rejection(&self, admin: ActorId, id: i64) -> Result<Outcome, FlowError> {
        self.valuation.begin_rejection(admin, id).await
    }

    pub async fn begin_payment_confirmation(&self, admin: ActorId, id: i64) -> Result<Outcome, FlowError> {
        self.valuation.begin_payment_confirmation(admin, id).await
    }

    /// Routes an input to the actor's session for `role`. Returns [`Outcome::NoActiveFlow`] if there is none.
    pub async fn submit_input(&self, actor: ActorId, role: Role, payload: Payload) -> Result<Outcome, FlowError> {
        match role {
            Role::Submitter => self.submission.handle_input(actor, payload).await,
            Role::Reviewer => self.valuation.handle_input(actor, payload).await,
        }
    }

    /// Discards the actor's session for `role`. Anything already stored (a new wallet, say) is kept.
    pub async fn cancel(&self, actor: ActorId, role: Role) -> Outcome {
        match self.sessions.end(actor, role).await {
            Some(session) => {
                debug!("💬️ {role} session for {actor} cancelled at {}", session.step);
                Outcome::Cancelled
            },
            None => Outcome::NoActiveFlow,
        }
    }

    /// Like [`Self::cancel`], but the transport should show the main menu rather than a cancellation notice.
    pub async fn return_to_main(&self, actor: ActorId, role: Role) -> Outcome {
        match self.sessions.end(actor, role).await {
            Some(_) => Outcome::ReturnedToMain,
            None => Outcome::NoActiveFlow,
        }
    }

    pub async fn current_step(&self, actor: ActorId, role: Role) -> Option<Step> {
        self.sessions.get(actor, role).await.map(|s| s.step)
    }

    pub async fn activate_wallet(&self, actor: ActorId, wallet_id: i64) -> Result<Wallet, FlowError> {
        self.submission.activate_wallet(actor, wallet_id).await
    }

    //--------------------------------------       Queries       -----------------------------------------------------
    pub async fn list_requests(&self, filter: RequestQueryFilter) -> Result<Vec<PayoutRequest>, FlowError> {
        trace!("🧾️ Searching requests. {filter}");
        Ok(self.db.search_requests(filter).await?)
    }

    /// Fetches a request together with its proofs.
    pub async fn get_request(&self, id: i64) -> Result<Option<PayoutRequest>, FlowError> {
        Ok(self.db.fetch_request(id).await?)
    }

    pub async fn list_wallets(&self, actor: ActorId) -> Result<Vec<Wallet>, FlowError> {
        Ok(self.db.fetch_wallets(actor).await?)
    }

    /// The admin queue: every unsettled request, oldest first.
    pub async fn pending_requests(&self) -> Result<Vec<PayoutRequest>, FlowError> {
        let filter = RequestQueryFilter::default().with_status(RequestStatus::AwaitingValuation);
        Ok(self.db.search_requests(filter).await?)
    }

    pub async fn team_stats(&self) -> Result<TeamStats, FlowError> {
        Ok(self.db.fetch_team_stats().await?)
    }

    pub async fn fetch_actor(&self, id: ActorId) -> Result<Option<Actor>, FlowError> {
        Ok(self.db.fetch_actor(id).await?)
    }

    pub async fn fetch_admins(&self) -> Result<Vec<AdminEntry>, FlowError> {
        Ok(self.db.fetch_admins().await?)
    }

    //--------------------------------------  Actors and roster  -----------------------------------------------------
    /// Registers a new actor with the configured default worker percent, or refreshes an existing actor's profile.
    pub async fn register_actor(&self, actor: NewActor) -> Result<Actor, FlowError> {
        Ok(self.db.upsert_actor(actor, self.config.default_worker_percent).await?)
    }

    pub async fn set_worker_percent(&self, admin: ActorId, actor: ActorId, percent: i64) -> Result<Actor, FlowError> {
        self.require_admin(admin).await?;
        let actor = self.db.set_worker_percent(actor, percent).await?;
        info!("🗃️ Admin {admin} set the worker percent of {} to {percent}%", actor.id);
        Ok(actor)
    }

    pub async fn set_blocked(&self, admin: ActorId, actor: ActorId, blocked: bool) -> Result<Actor, FlowError> {
        self.require_admin(admin).await?;
        Ok(self.db.set_blocked(actor, blocked).await?)
    }

    /// Adds `id` to the admin roster. Returns `false` if it was already an admin.
    pub async fn add_admin(&self, admin: ActorId, id: ActorId) -> Result<bool, FlowError> {
        self.require_admin(admin).await?;
        let added = self.db.add_admin(id, admin).await?;
        if added {
            info!("🗃️ Admin {admin} added {id} to the admin roster");
        }
        Ok(added)
    }

    /// Removes `id` from the admin roster. The founding admin cannot be removed.
    pub async fn remove_admin(&self, admin: ActorId, id: ActorId) -> Result<bool, FlowError> {
        self.require_admin(admin).await?;
        let removed = self.db.remove_admin(id).await?;
        if removed {
            info!("🗃️ Admin {admin} removed {id} from the admin roster");
        }
        Ok(removed)
    }

    /// Puts the configured founder on the admin roster. Returns `None` if no founder is configured.
    pub async fn ensure_founder_admin(&self) -> Result<Option<AdminEntry>, FlowError> {
        match self.config.founder_admin_id {
            Some(id) => {
                let entry = self.db.ensure_founder(id).await?;
                debug!("🗃️ Founding admin {id} is on the roster");
                Ok(Some(entry))
            },
            None => Ok(None),
        }
    }

    async fn require_admin(&self, admin: ActorId) -> Result<(), FlowError> {
        if self.db.is_admin(admin).await? {
            Ok(())
        } else {
            warn!("🗃️ Actor {admin} attempted an admin-only operation");
            Err(PreconditionFailed::NotAnAdmin(admin).into())
        }
    }
}
