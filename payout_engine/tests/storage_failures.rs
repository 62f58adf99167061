//! A storage failure mid-flow leaves the session where it was, so the actor can send the same input again.
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use log::*;
use payout_common::Amount;
use payout_engine::{
    db_types::{
        Actor,
        ActorId,
        AdminEntry,
        Direction,
        NewActor,
        NewRequest,
        PayoutRequest,
        Proof,
        TeamStats,
        Valuation,
        Wallet,
    },
    events::EventProducers,
    pipelines::{Completion, FlowError, Outcome, Payload, Prompt},
    sessions::{Role, Step},
    test_utils::prepare_env::{prepare_test_env, random_db_path},
    ActorManagement,
    AdminRoster,
    EngineConfig,
    PayoutApi,
    PayoutDatabase,
    RepositoryError,
    RequestManagement,
    RequestQueryFilter,
    SqliteDatabase,
    WalletManagement,
};
use sqlx::{migrate::MigrateDatabase, Sqlite};

const FOUNDER: ActorId = ActorId(1);
const WORKER: ActorId = ActorId(100);

/// Wraps the SQLite backend and fails the next call to one named operation.
#[derive(Clone)]
struct FlakyDatabase {
    inner: SqliteDatabase,
    fail_next: Arc<Mutex<Option<&'static str>>>,
}

impl FlakyDatabase {
    fn fail_next(&self, op: &'static str) {
        *self.fail_next.lock().unwrap() = Some(op);
    }

    fn trip(&self, op: &'static str) -> Result<(), RepositoryError> {
        let mut fail_next = self.fail_next.lock().unwrap();
        if *fail_next == Some(op) {
            *fail_next = None;
            return Err(RepositoryError::DatabaseError(format!("{op}: disk I/O error")));
        }
        Ok(())
    }
}

impl PayoutDatabase for FlakyDatabase {
    fn url(&self) -> &str {
        self.inner.url()
    }
}

impl ActorManagement for FlakyDatabase {
    async fn upsert_actor(&self, actor: NewActor, default_percent: i64) -> Result<Actor, RepositoryError> {
        self.inner.upsert_actor(actor, default_percent).await
    }

    async fn fetch_actor(&self, id: ActorId) -> Result<Option<Actor>, RepositoryError> {
        self.inner.fetch_actor(id).await
    }

    async fn set_worker_percent(&self, id: ActorId, percent: i64) -> Result<Actor, RepositoryError> {
        self.inner.set_worker_percent(id, percent).await
    }

    async fn set_blocked(&self, id: ActorId, blocked: bool) -> Result<Actor, RepositoryError> {
        self.inner.set_blocked(id, blocked).await
    }

    async fn credit_earnings(&self, id: ActorId, amount: Amount) -> Result<Actor, RepositoryError> {
        self.inner.credit_earnings(id, amount).await
    }
}

impl WalletManagement for FlakyDatabase {
    async fn add_wallet(&self, owner: ActorId, address: &str, wallet_type: &str) -> Result<Wallet, RepositoryError> {
        self.trip("add_wallet")?;
        self.inner.add_wallet(owner, address, wallet_type).await
    }

    async fn activate_wallet(&self, owner: ActorId, wallet_id: i64) -> Result<Wallet, RepositoryError> {
        self.inner.activate_wallet(owner, wallet_id).await
    }

    async fn fetch_wallets(&self, owner: ActorId) -> Result<Vec<Wallet>, RepositoryError> {
        self.inner.fetch_wallets(owner).await
    }

    async fn fetch_wallet(&self, owner: ActorId, wallet_id: i64) -> Result<Option<Wallet>, RepositoryError> {
        self.inner.fetch_wallet(owner, wallet_id).await
    }

    async fn fetch_active_wallet(&self, owner: ActorId) -> Result<Option<Wallet>, RepositoryError> {
        self.inner.fetch_active_wallet(owner).await
    }
}

impl RequestManagement for FlakyDatabase {
    async fn insert_request(&self, request: NewRequest) -> Result<PayoutRequest, RepositoryError> {
        self.trip("insert_request")?;
        self.inner.insert_request(request).await
    }

    async fn fetch_request(&self, id: i64) -> Result<Option<PayoutRequest>, RepositoryError> {
        self.inner.fetch_request(id).await
    }

    async fn search_requests(&self, query: RequestQueryFilter) -> Result<Vec<PayoutRequest>, RepositoryError> {
        self.inner.search_requests(query).await
    }

    async fn set_valuation(
        &self,
        id: i64,
        admin: ActorId,
        valuation: Valuation,
    ) -> Result<PayoutRequest, RepositoryError> {
        self.trip("set_valuation")?;
        self.inner.set_valuation(id, admin, valuation).await
    }

    async fn reject_request(&self, id: i64, admin: ActorId, reason: &str) -> Result<PayoutRequest, RepositoryError> {
        self.inner.reject_request(id, admin, reason).await
    }

    async fn mark_paid(&self, id: i64, admin: ActorId, proof: Proof) -> Result<PayoutRequest, RepositoryError> {
        self.trip("mark_paid")?;
        self.inner.mark_paid(id, admin, proof).await
    }

    async fn fetch_team_stats(&self) -> Result<TeamStats, RepositoryError> {
        self.inner.fetch_team_stats().await
    }
}

#[async_trait]
impl AdminRoster for FlakyDatabase {
    async fn is_admin(&self, id: ActorId) -> Result<bool, RepositoryError> {
        self.inner.is_admin(id).await
    }

    async fn fetch_admins(&self) -> Result<Vec<AdminEntry>, RepositoryError> {
        self.inner.fetch_admins().await
    }

    async fn add_admin(&self, id: ActorId, added_by: ActorId) -> Result<bool, RepositoryError> {
        self.inner.add_admin(id, added_by).await
    }

    async fn remove_admin(&self, id: ActorId) -> Result<bool, RepositoryError> {
        self.inner.remove_admin(id).await
    }

    async fn ensure_founder(&self, id: ActorId) -> Result<AdminEntry, RepositoryError> {
        self.inner.ensure_founder(id).await
    }
}

async fn setup() -> PayoutApi<FlakyDatabase> {
    let url = random_db_path();
    prepare_test_env(&url).await;
    let config = EngineConfig { founder_admin_id: Some(FOUNDER), ..EngineConfig::new(&url) };
    let inner = SqliteDatabase::new(&config).await.expect("Error creating database");
    let db = FlakyDatabase { inner, fail_next: Arc::default() };
    let api = PayoutApi::new(db, config, EventProducers::default());
    api.ensure_founder_admin().await.expect("Error adding founder");
    api.register_actor(NewActor::new(FOUNDER, "Founder")).await.expect("Error registering founder");
    api.register_actor(NewActor::new(WORKER, "Worker")).await.expect("Error registering worker");
    api
}

async fn tear_down(api: PayoutApi<FlakyDatabase>) {
    api.db().inner.pool().close().await;
    if let Err(e) = Sqlite::drop_database(api.db().url()).await {
        error!("🚀️ Failed to drop database: {e}");
    }
}

async fn input(api: &PayoutApi<FlakyDatabase>, actor: ActorId, role: Role, payload: Payload) -> Outcome {
    api.submit_input(actor, role, payload).await.expect("Error handling input")
}

#[tokio::test]
async fn failed_wallet_write_can_be_retried() {
    let api = setup().await;
    api.start_submission(WORKER).await.unwrap();
    api.db().fail_next("add_wallet");
    let err = api.submit_input(WORKER, Role::Submitter, Payload::text("abc123XYZ")).await.unwrap_err();
    assert!(matches!(err, FlowError::Storage(_)), "{err:?}");
    assert_eq!(api.current_step(WORKER, Role::Submitter).await, Some(Step::CollectingWallet));
    assert!(api.list_wallets(WORKER).await.unwrap().is_empty());

    let outcome = input(&api, WORKER, Role::Submitter, Payload::text("abc123XYZ")).await;
    assert_eq!(outcome, Outcome::Prompt(Prompt::select_direction()));
    assert_eq!(api.list_wallets(WORKER).await.unwrap().len(), 1);
    tear_down(api).await;
}

#[tokio::test]
async fn failed_filing_keeps_collected_fields() {
    let api = setup().await;
    api.start_submission(WORKER).await.unwrap();
    input(&api, WORKER, Role::Submitter, Payload::text("abc123XYZ")).await;
    input(&api, WORKER, Role::Submitter, Payload::SelectDirection(Direction::OtcBot)).await;
    input(&api, WORKER, Role::Submitter, Payload::text("https://t.me/proof1")).await;
    input(&api, WORKER, Role::Submitter, Payload::Attachment(Proof::photo("photo-1"))).await;

    api.db().fail_next("insert_request");
    let err = api.submit_input(WORKER, Role::Submitter, Payload::Done).await.unwrap_err();
    assert!(matches!(err, FlowError::Storage(_)), "{err:?}");
    assert_eq!(api.current_step(WORKER, Role::Submitter).await, Some(Step::CollectingProofs));
    assert!(api.list_requests(RequestQueryFilter::default()).await.unwrap().is_empty());

    let request = match input(&api, WORKER, Role::Submitter, Payload::Done).await {
        Outcome::Completed(Completion::RequestCreated(request)) => request,
        other => panic!("Expected a new request, got {other:?}"),
    };
    assert_eq!(request.reference_link, "https://t.me/proof1");
    assert_eq!(request.proofs, vec![Proof::photo("photo-1")]);
    assert_eq!(api.current_step(WORKER, Role::Submitter).await, None);
    tear_down(api).await;
}

#[tokio::test]
async fn failed_review_writes_can_be_retried() {
    let api = setup().await;
    api.start_submission(WORKER).await.unwrap();
    input(&api, WORKER, Role::Submitter, Payload::text("abc123XYZ")).await;
    input(&api, WORKER, Role::Submitter, Payload::SelectDirection(Direction::OtcBot)).await;
    input(&api, WORKER, Role::Submitter, Payload::text("t.me/proofs")).await;
    input(&api, WORKER, Role::Submitter, Payload::Attachment(Proof::photo("photo-1"))).await;
    let id = match input(&api, WORKER, Role::Submitter, Payload::Done).await {
        Outcome::Completed(Completion::RequestCreated(request)) => request.id,
        other => panic!("Expected a new request, got {other:?}"),
    };

    api.begin_pricing(FOUNDER, id).await.unwrap();
    api.db().fail_next("set_valuation");
    let err = api.submit_input(FOUNDER, Role::Reviewer, Payload::text("100")).await.unwrap_err();
    assert!(matches!(err, FlowError::Storage(_)), "{err:?}");
    assert_eq!(api.current_step(FOUNDER, Role::Reviewer).await, Some(Step::Pricing));
    assert!(matches!(
        input(&api, FOUNDER, Role::Reviewer, Payload::text("100")).await,
        Outcome::Completed(Completion::RequestValued(_))
    ));

    api.begin_payment_confirmation(FOUNDER, id).await.unwrap();
    api.db().fail_next("mark_paid");
    let receipt = Payload::Attachment(Proof::photo("receipt"));
    let err = api.submit_input(FOUNDER, Role::Reviewer, receipt).await.unwrap_err();
    assert!(matches!(err, FlowError::Storage(_)), "{err:?}");
    assert_eq!(api.current_step(FOUNDER, Role::Reviewer).await, Some(Step::ConfirmingPayment));
    assert_eq!(api.fetch_actor(WORKER).await.unwrap().unwrap().profits_count, 0);
    assert!(matches!(
        input(&api, FOUNDER, Role::Reviewer, Payload::Attachment(Proof::photo("receipt"))).await,
        Outcome::Completed(Completion::RequestPaid(_))
    ));
    let worker = api.fetch_actor(WORKER).await.unwrap().unwrap();
    assert_eq!(worker.profits_count, 1);
    assert_eq!(worker.total_earned, Amount::from_units(60));
    tear_down(api).await;
}
