use chrono::Utc;
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{ActorId, Wallet},
    traits::{PreconditionFailed, RepositoryError},
};

/// Clears the active flag on every wallet belonging to `owner`.
///
/// This is not atomic on its own. Call it inside a transaction, together with the statement that sets the new active
/// wallet.
pub async fn deactivate_all(owner: ActorId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE wallets SET is_active = 0 WHERE owner_id = $1 AND is_active = 1")
        .bind(owner)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Inserts a new, active wallet. The caller must have deactivated the owner's other wallets in the same transaction.
pub async fn insert_active_wallet(
    owner: ActorId,
    address: &str,
    wallet_type: &str,
    conn: &mut SqliteConnection,
) -> Result<Wallet, RepositoryError> {
    let wallet: Wallet = sqlx::query_as(
        r#"
            INSERT INTO wallets (owner_id, address, wallet_type, is_active, created_at)
            VALUES ($1, $2, $3, 1, $4)
            RETURNING *;
        "#,
    )
    .bind(owner)
    .bind(address)
    .bind(wallet_type)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Wallet #{} ({}) added for actor {owner}", wallet.id, wallet.address);
    Ok(wallet)
}

/// Sets the active flag on the wallet. The caller must have deactivated the owner's other wallets in the same
/// transaction.
pub async fn mark_active(
    owner: ActorId,
    wallet_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Wallet, RepositoryError> {
    let wallet: Option<Wallet> =
        sqlx::query_as("UPDATE wallets SET is_active = 1 WHERE id = $1 AND owner_id = $2 RETURNING *")
            .bind(wallet_id)
            .bind(owner)
            .fetch_optional(conn)
            .await?;
    wallet.ok_or_else(|| PreconditionFailed::WalletNotFound(wallet_id).into())
}

pub async fn fetch_wallets(owner: ActorId, conn: &mut SqliteConnection) -> Result<Vec<Wallet>, sqlx::Error> {
    let wallets = sqlx::query_as("SELECT * FROM wallets WHERE owner_id = $1 ORDER BY created_at ASC, id ASC")
        .bind(owner)
        .fetch_all(conn)
        .await?;
    Ok(wallets)
}

pub async fn fetch_wallet(
    owner: ActorId,
    wallet_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Wallet>, sqlx::Error> {
    let wallet = sqlx::query_as("SELECT * FROM wallets WHERE id = $1 AND owner_id = $2")
        .bind(wallet_id)
        .bind(owner)
        .fetch_optional(conn)
        .await?;
    Ok(wallet)
}

pub async fn fetch_active_wallet(owner: ActorId, conn: &mut SqliteConnection) -> Result<Option<Wallet>, sqlx::Error> {
    let wallet = sqlx::query_as("SELECT * FROM wallets WHERE owner_id = $1 AND is_active = 1")
        .bind(owner)
        .fetch_optional(conn)
        .await?;
    Ok(wallet)
}
