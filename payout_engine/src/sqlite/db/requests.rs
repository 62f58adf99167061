use chrono::Utc;
use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{ActorId, NewRequest, PayoutRequest, Proof, Transition, Valuation},
    traits::{PreconditionFailed, RepositoryError, RequestQueryFilter},
};

/// Inserts a new request and its proofs using the given connection. This is not atomic. You can embed this call
/// inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as the connection argument.
pub async fn insert_request(request: NewRequest, conn: &mut SqliteConnection) -> Result<PayoutRequest, sqlx::Error> {
    let now = Utc::now();
    let mut inserted: PayoutRequest = sqlx::query_as(
        r#"
            INSERT INTO requests (
                owner_id,
                wallet_address,
                wallet_type,
                direction,
                reference_link,
                worker_percent,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *;
        "#,
    )
    .bind(request.owner_id)
    .bind(request.wallet.address)
    .bind(request.wallet.wallet_type)
    .bind(request.direction)
    .bind(request.reference_link)
    .bind(request.worker_percent)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;
    for (position, proof) in request.proofs.iter().enumerate() {
        insert_proof(inserted.id, position, proof, &mut *conn).await?;
    }
    debug!("🗃️ Request #{} inserted with {} proofs", inserted.id, request.proofs.len());
    inserted.proofs = request.proofs;
    Ok(inserted)
}

async fn insert_proof(
    request_id: i64,
    position: usize,
    proof: &Proof,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    #[allow(clippy::cast_possible_wrap)]
    let position = position as i64;
    sqlx::query("INSERT INTO request_proofs (request_id, position, kind, content) VALUES ($1, $2, $3, $4)")
        .bind(request_id)
        .bind(position)
        .bind(proof.kind)
        .bind(proof.content.as_str())
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn fetch_proofs(request_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Proof>, sqlx::Error> {
    let proofs = sqlx::query_as("SELECT kind, content FROM request_proofs WHERE request_id = $1 ORDER BY position")
        .bind(request_id)
        .fetch_all(conn)
        .await?;
    Ok(proofs)
}

/// Fetches the request row, without its proofs.
pub async fn fetch_request_row(id: i64, conn: &mut SqliteConnection) -> Result<Option<PayoutRequest>, sqlx::Error> {
    let request = sqlx::query_as("SELECT * FROM requests WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(request)
}

pub async fn fetch_request(id: i64, conn: &mut SqliteConnection) -> Result<Option<PayoutRequest>, sqlx::Error> {
    match fetch_request_row(id, &mut *conn).await? {
        Some(request) => Ok(Some(with_proofs(request, conn).await?)),
        None => Ok(None),
    }
}

pub async fn with_proofs(
    mut request: PayoutRequest,
    conn: &mut SqliteConnection,
) -> Result<PayoutRequest, sqlx::Error> {
    request.proofs = fetch_proofs(request.id, conn).await?;
    Ok(request)
}

/// Fetches requests according to criteria specified in the `RequestQueryFilter`.
///
/// Resulting requests are ordered by `created_at` in ascending order, and have their proofs attached.
pub async fn search_requests(
    query: RequestQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<PayoutRequest>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM requests ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(owner_id) = query.owner_id {
        where_clause.push("owner_id = ");
        where_clause.push_bind_unseparated(owner_id);
    }
    if let Some(statuses) = query.statuses.filter(|s| !s.is_empty()) {
        where_clause.push("status IN (");
        for (i, status) in statuses.into_iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status);
        }
        where_clause.push_unseparated(")");
    }
    if let Some(direction) = query.direction {
        where_clause.push("direction = ");
        where_clause.push_bind_unseparated(direction);
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at ASC, id ASC");

    trace!("🗃️ Executing query: {}", builder.sql());
    let rows = builder.build_query_as::<PayoutRequest>().fetch_all(&mut *conn).await?;
    trace!("🗃️ Result of search_requests: {}", rows.len());
    let mut requests = Vec::with_capacity(rows.len());
    for request in rows {
        requests.push(with_proofs(request, &mut *conn).await?);
    }
    Ok(requests)
}

/// Writes the valuation, but only if the request is still unpriced and the worker share matches the percentage the
/// request was filed with. Returns `None` if the guard did not match.
pub async fn set_valuation(
    id: i64,
    admin: ActorId,
    valuation: Valuation,
    conn: &mut SqliteConnection,
) -> Result<Option<PayoutRequest>, sqlx::Error> {
    let request = sqlx::query_as(
        r#"
            UPDATE requests SET
                total_amount = $1,
                worker_share = $2,
                operator_share = $3,
                handled_by = $4,
                updated_at = $5
            WHERE id = $6 AND status = 'AwaitingValuation' AND total_amount = 0
              AND $2 = ($1 * worker_percent) / 100
            RETURNING *;
        "#,
    )
    .bind(valuation.total)
    .bind(valuation.worker_share)
    .bind(valuation.operator_share)
    .bind(admin)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(request)
}

/// Moves a non-terminal request to `Rejected`. Returns `None` if the request is missing or already terminal.
pub async fn reject(
    id: i64,
    admin: ActorId,
    reason: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PayoutRequest>, sqlx::Error> {
    let request = sqlx::query_as(
        r#"
            UPDATE requests SET
                status = 'Rejected',
                rejection_reason = $1,
                handled_by = $2,
                updated_at = $3
            WHERE id = $4 AND status = 'AwaitingValuation'
            RETURNING *;
        "#,
    )
    .bind(reason)
    .bind(admin)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(request)
}

/// Moves a valued request to `Paid` and stores the payment proof. Returns `None` if the request is missing, terminal
/// or not yet valued.
pub async fn mark_paid(
    id: i64,
    admin: ActorId,
    proof: &Proof,
    conn: &mut SqliteConnection,
) -> Result<Option<PayoutRequest>, sqlx::Error> {
    let request = sqlx::query_as(
        r#"
            UPDATE requests SET
                status = 'Paid',
                payment_proof_kind = $1,
                payment_proof = $2,
                handled_by = $3,
                updated_at = $4
            WHERE id = $5 AND status = 'AwaitingValuation' AND total_amount > 0
            RETURNING *;
        "#,
    )
    .bind(proof.kind)
    .bind(proof.content.as_str())
    .bind(admin)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(request)
}

/// Works out why a compare-and-set on request `id` matched no row, by re-reading it on the same connection.
pub async fn explain_failed_transition(
    id: i64,
    transition: Transition,
    conn: &mut SqliteConnection,
) -> Result<RepositoryError, sqlx::Error> {
    let current = fetch_request_row(id, conn).await?;
    let err = match current {
        None => PreconditionFailed::RequestNotFound(id).into(),
        Some(request) => match request.check_transition(transition) {
            Err(e) => e.into(),
            Ok(()) => RepositoryError::DatabaseError(format!(
                "The {transition:?} of request #{id} was rejected by the database although the request permits it. \
                 Check that the valuation was split using the request's worker percentage ({}%).",
                request.worker_percent
            )),
        },
    };
    debug!("🗃️ {transition:?} of request #{id} did not apply. {err}");
    Ok(err)
}
