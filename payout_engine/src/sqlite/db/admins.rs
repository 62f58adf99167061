use chrono::Utc;
use log::info;
use sqlx::SqliteConnection;

use crate::{
    db_types::{ActorId, AdminEntry},
    traits::{PreconditionFailed, RepositoryError},
};

pub async fn is_admin(id: ActorId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let found: Option<(i64,)> =
        sqlx::query_as("SELECT actor_id FROM admins WHERE actor_id = $1").bind(id).fetch_optional(conn).await?;
    Ok(found.is_some())
}

pub async fn fetch_admins(conn: &mut SqliteConnection) -> Result<Vec<AdminEntry>, sqlx::Error> {
    let admins = sqlx::query_as("SELECT * FROM admins ORDER BY is_founder DESC, created_at ASC, actor_id ASC")
        .fetch_all(conn)
        .await?;
    Ok(admins)
}

/// Adds an admin. This function is idempotent; it returns `false` if the actor was already on the roster.
pub async fn insert_admin(id: ActorId, added_by: ActorId, conn: &mut SqliteConnection) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO admins (actor_id, is_founder, added_by, created_at) VALUES ($1, 0, $2, $3) ON CONFLICT DO NOTHING",
    )
    .bind(id)
    .bind(added_by)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Removes a non-founder admin. The founder row is never deleted.
pub async fn delete_admin(id: ActorId, conn: &mut SqliteConnection) -> Result<bool, RepositoryError> {
    let result =
        sqlx::query("DELETE FROM admins WHERE actor_id = $1 AND is_founder = 0").bind(id).execute(&mut *conn).await?;
    if result.rows_affected() > 0 {
        return Ok(true);
    }
    let founder: Option<(i64,)> = sqlx::query_as("SELECT actor_id FROM admins WHERE actor_id = $1 AND is_founder = 1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    match founder {
        Some(_) => Err(PreconditionFailed::FounderProtected(id).into()),
        None => Ok(false),
    }
}

pub async fn upsert_founder(id: ActorId, conn: &mut SqliteConnection) -> Result<AdminEntry, sqlx::Error> {
    let entry: AdminEntry = sqlx::query_as(
        r#"
            INSERT INTO admins (actor_id, is_founder, created_at) VALUES ($1, 1, $2)
            ON CONFLICT (actor_id) DO UPDATE SET is_founder = 1
            RETURNING *;
        "#,
    )
    .bind(id)
    .bind(Utc::now())
    .fetch_one(conn)
    .await?;
    info!("🗃️ Actor {id} is registered as the founding admin");
    Ok(entry)
}
