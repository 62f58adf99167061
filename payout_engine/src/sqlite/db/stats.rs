use chrono::Utc;
use payout_common::Amount;
use sqlx::SqliteConnection;

use crate::db_types::TeamStats;

pub async fn fetch_team_stats(conn: &mut SqliteConnection) -> Result<TeamStats, sqlx::Error> {
    let stats = sqlx::query_as("SELECT total_amount, total_profits, updated_at FROM team_stats WHERE id = 1")
        .fetch_one(conn)
        .await?;
    Ok(stats)
}

/// Adds one settled request of `amount` to the team totals, in a single statement.
pub async fn record_settlement(amount: Amount, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            UPDATE team_stats SET
                total_amount = total_amount + $1,
                total_profits = total_profits + 1,
                updated_at = $2
            WHERE id = 1;
        "#,
    )
    .bind(amount)
    .bind(Utc::now())
    .execute(conn)
    .await?;
    Ok(())
}
