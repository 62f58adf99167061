use chrono::Utc;
use log::trace;
use payout_common::Amount;
use sqlx::SqliteConnection;

use crate::{
    db_types::{Actor, ActorId, NewActor},
    traits::{PreconditionFailed, RepositoryError},
};

/// Inserts the actor, or refreshes the profile fields and last-active time of an existing one.
pub async fn upsert_actor(
    actor: NewActor,
    default_percent: i64,
    conn: &mut SqliteConnection,
) -> Result<Actor, RepositoryError> {
    let now = Utc::now();
    let actor = sqlx::query_as(
        r#"
            INSERT INTO actors (id, username, display_name, worker_percent, created_at, last_active)
            VALUES ($1, $2, $3, $4, $5, $5)
            ON CONFLICT (id) DO UPDATE SET
                username = excluded.username,
                display_name = excluded.display_name,
                last_active = excluded.last_active
            RETURNING *;
        "#,
    )
    .bind(actor.id)
    .bind(actor.username)
    .bind(actor.display_name)
    .bind(default_percent)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(actor)
}

pub async fn fetch_actor(id: ActorId, conn: &mut SqliteConnection) -> Result<Option<Actor>, sqlx::Error> {
    let actor = sqlx::query_as("SELECT * FROM actors WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(actor)
}

pub async fn set_worker_percent(
    id: ActorId,
    percent: i64,
    conn: &mut SqliteConnection,
) -> Result<Actor, RepositoryError> {
    if !(0..=100).contains(&percent) {
        return Err(PreconditionFailed::InvalidPercent(percent).into());
    }
    let actor: Option<Actor> = sqlx::query_as("UPDATE actors SET worker_percent = $1 WHERE id = $2 RETURNING *")
        .bind(percent)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    actor.ok_or_else(|| PreconditionFailed::ActorNotFound(id).into())
}

pub async fn set_blocked(id: ActorId, blocked: bool, conn: &mut SqliteConnection) -> Result<Actor, RepositoryError> {
    let actor: Option<Actor> = sqlx::query_as("UPDATE actors SET is_blocked = $1 WHERE id = $2 RETURNING *")
        .bind(blocked)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    actor.ok_or_else(|| PreconditionFailed::ActorNotFound(id).into())
}

/// Adds `amount` to the actor's lifetime earnings and bumps the profit counter, in a single statement.
pub async fn credit_earnings(
    id: ActorId,
    amount: Amount,
    conn: &mut SqliteConnection,
) -> Result<Actor, RepositoryError> {
    trace!("🗃️ Crediting {amount} to actor {id}");
    let actor: Option<Actor> = sqlx::query_as(
        r#"
            UPDATE actors SET
                total_earned = total_earned + $1,
                profits_count = profits_count + 1
            WHERE id = $2
            RETURNING *;
        "#,
    )
    .bind(amount)
    .bind(id)
    .fetch_optional(conn)
    .await?;
    actor.ok_or_else(|| PreconditionFailed::ActorNotFound(id).into())
}
