//! `SqliteDatabase` is a concrete implementation of a payout engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
//!
//! Guarded transitions always issue their conditional `UPDATE` as the first statement of the transaction. That
//! statement takes the write lock, so two admins racing on the same request are serialized by SQLite and the loser's
//! guard simply matches no row.
//!
//! Every write, including single-statement ones, runs in an explicit transaction that is committed before the call
//! returns. A `RETURNING` statement read with `fetch_one` on a bare pooled connection is not stepped to completion, so
//! its implicit transaction can stay open and the write stays invisible to the rest of the pool.
use std::fmt::Debug;

use async_trait::async_trait;
use log::*;
use payout_common::Amount;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{actors, admins, new_pool, requests, stats, wallets};
use crate::{
    config::EngineConfig,
    db_types::{
        Actor,
        ActorId,
        AdminEntry,
        NewActor,
        NewRequest,
        PayoutRequest,
        Proof,
        TeamStats,
        Transition,
        Valuation,
        Wallet,
    },
    traits::{
        ActorManagement,
        AdminRoster,
        PayoutDatabase,
        PreconditionFailed,
        RepositoryError,
        RequestManagement,
        RequestQueryFilter,
        WalletManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new(config: &EngineConfig) -> Result<Self, sqlx::Error> {
        SqliteDatabase::new_with_url(config.database_url.as_str(), config.max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Applies any outstanding schema migrations.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        debug!("🗃️ Database migrations are up to date");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl PayoutDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }
}

impl ActorManagement for SqliteDatabase {
    async fn upsert_actor(&self, actor: NewActor, default_percent: i64) -> Result<Actor, RepositoryError> {
        if !(0..=100).contains(&default_percent) {
            return Err(PreconditionFailed::InvalidPercent(default_percent).into());
        }
        let mut tx = self.pool.begin().await?;
        let actor = actors::upsert_actor(actor, default_percent, &mut tx).await?;
        tx.commit().await?;
        Ok(actor)
    }

    async fn fetch_actor(&self, id: ActorId) -> Result<Option<Actor>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let actor = actors::fetch_actor(id, &mut conn).await?;
        Ok(actor)
    }

    async fn set_worker_percent(&self, id: ActorId, percent: i64) -> Result<Actor, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let actor = actors::set_worker_percent(id, percent, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Worker percent for actor {id} set to {percent}%");
        Ok(actor)
    }

    async fn set_blocked(&self, id: ActorId, blocked: bool) -> Result<Actor, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let actor = actors::set_blocked(id, blocked, &mut tx).await?;
        tx.commit().await?;
        info!("🗃️ Actor {id} is {}", if blocked { "blocked" } else { "unblocked" });
        Ok(actor)
    }

    async fn credit_earnings(&self, id: ActorId, amount: Amount) -> Result<Actor, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let actor = actors::credit_earnings(id, amount, &mut tx).await?;
        tx.commit().await?;
        Ok(actor)
    }
}

impl WalletManagement for SqliteDatabase {
    async fn add_wallet(&self, owner: ActorId, address: &str, wallet_type: &str) -> Result<Wallet, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let deactivated = wallets::deactivate_all(owner, &mut tx).await?;
        trace!("🗃️ {deactivated} wallets deactivated for actor {owner}");
        let wallet = wallets::insert_active_wallet(owner, address, wallet_type, &mut tx).await?;
        tx.commit().await?;
        Ok(wallet)
    }

    async fn activate_wallet(&self, owner: ActorId, wallet_id: i64) -> Result<Wallet, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        wallets::deactivate_all(owner, &mut tx).await?;
        // Dropping the transaction on a missing wallet rolls back the deactivation
        let wallet = wallets::mark_active(owner, wallet_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Wallet #{wallet_id} is now the active wallet for actor {owner}");
        Ok(wallet)
    }

    async fn fetch_wallets(&self, owner: ActorId) -> Result<Vec<Wallet>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let wallets = wallets::fetch_wallets(owner, &mut conn).await?;
        Ok(wallets)
    }

    async fn fetch_wallet(&self, owner: ActorId, wallet_id: i64) -> Result<Option<Wallet>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let wallet = wallets::fetch_wallet(owner, wallet_id, &mut conn).await?;
        Ok(wallet)
    }

    async fn fetch_active_wallet(&self, owner: ActorId) -> Result<Option<Wallet>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let wallet = wallets::fetch_active_wallet(owner, &mut conn).await?;
        Ok(wallet)
    }
}

impl RequestManagement for SqliteDatabase {
    async fn insert_request(&self, request: NewRequest) -> Result<PayoutRequest, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let request = requests::insert_request(request, &mut tx).await?;
        tx.commit().await?;
        Ok(request)
    }

    async fn fetch_request(&self, id: i64) -> Result<Option<PayoutRequest>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let request = requests::fetch_request(id, &mut conn).await?;
        Ok(request)
    }

    async fn search_requests(&self, query: RequestQueryFilter) -> Result<Vec<PayoutRequest>, RepositoryError> {
        trace!("🗃️ Searching requests. {query}");
        let mut conn = self.pool.acquire().await?;
        let requests = requests::search_requests(query, &mut conn).await?;
        Ok(requests)
    }

    async fn set_valuation(
        &self,
        id: i64,
        admin: ActorId,
        valuation: Valuation,
    ) -> Result<PayoutRequest, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        match requests::set_valuation(id, admin, valuation, &mut tx).await? {
            Some(request) => {
                let request = requests::with_proofs(request, &mut tx).await?;
                tx.commit().await?;
                info!("🗃️ Request #{id} valued at {} by admin {admin}", valuation.total);
                Ok(request)
            },
            None => Err(requests::explain_failed_transition(id, Transition::Valuation, &mut tx).await?),
        }
    }

    async fn reject_request(&self, id: i64, admin: ActorId, reason: &str) -> Result<PayoutRequest, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        match requests::reject(id, admin, reason, &mut tx).await? {
            Some(request) => {
                let request = requests::with_proofs(request, &mut tx).await?;
                tx.commit().await?;
                info!("🗃️ Request #{id} rejected by admin {admin}");
                Ok(request)
            },
            None => Err(requests::explain_failed_transition(id, Transition::Rejection, &mut tx).await?),
        }
    }

    async fn mark_paid(&self, id: i64, admin: ActorId, proof: Proof) -> Result<PayoutRequest, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let request = match requests::mark_paid(id, admin, &proof, &mut tx).await? {
            Some(request) => request,
            None => return Err(requests::explain_failed_transition(id, Transition::Payment, &mut tx).await?),
        };
        let owner = actors::credit_earnings(request.owner_id, request.worker_share, &mut tx).await?;
        stats::record_settlement(request.total_amount, &mut tx).await?;
        let request = requests::with_proofs(request, &mut tx).await?;
        tx.commit().await?;
        info!(
            "🗃️ Request #{id} paid by admin {admin}. Actor {} credited with {}; lifetime total is now {}",
            owner.id, request.worker_share, owner.total_earned
        );
        Ok(request)
    }

    async fn fetch_team_stats(&self) -> Result<TeamStats, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let stats = stats::fetch_team_stats(&mut conn).await?;
        Ok(stats)
    }
}

#[async_trait]
impl AdminRoster for SqliteDatabase {
    async fn is_admin(&self, id: ActorId) -> Result<bool, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let result = admins::is_admin(id, &mut conn).await?;
        Ok(result)
    }

    async fn fetch_admins(&self) -> Result<Vec<AdminEntry>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let admins = admins::fetch_admins(&mut conn).await?;
        Ok(admins)
    }

    async fn add_admin(&self, id: ActorId, added_by: ActorId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let added = admins::insert_admin(id, added_by, &mut tx).await?;
        tx.commit().await?;
        if added {
            info!("🗃️ Actor {id} was added to the admin roster by {added_by}");
        }
        Ok(added)
    }

    async fn remove_admin(&self, id: ActorId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let removed = admins::delete_admin(id, &mut tx).await?;
        tx.commit().await?;
        if removed {
            info!("🗃️ Actor {id} was removed from the admin roster");
        }
        Ok(removed)
    }

    async fn ensure_founder(&self, id: ActorId) -> Result<AdminEntry, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let entry = admins::upsert_founder(id, &mut tx).await?;
        tx.commit().await?;
        Ok(entry)
    }
}
