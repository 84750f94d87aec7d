//! Database layer: migrations and the sponsorship journal.

use std::str::FromStr;

use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::errors::Result;

/// A faucet mint paid for by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Sponsorship {
    pub id: i64,
    pub user_address: String,
    /// `pending`, `confirmed` or `failed`.
    pub status: String,
    /// Known once the mint is signed.
    pub tx_hash: Option<String>,
    pub ledger: Option<i64>,
    /// Unix seconds.
    pub created_at: i64,
}

/// Establish a SQLite connection pool and run pending migrations.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool> {
    let url = if database_url.starts_with("sqlite:") {
        database_url.to_string()
    } else {
        format!("sqlite:{database_url}")
    };
    let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);

    // Every connection to `:memory:` is a separate database.
    let max_connections = if url.contains(":memory:") { 1 } else { 5 };
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations applied successfully");
    Ok(pool)
}

/// Claim the cooldown slot for `user_address` at `now`.
///
/// Returns the new journal row, or `None` when a pending or confirmed
/// sponsorship from the last `cooldown_secs` already holds the slot. The
/// check and the insert are a single statement.
pub async fn claim_sponsorship(
    pool: &SqlitePool,
    user_address: &str,
    now: i64,
    cooldown_secs: i64,
) -> Result<Option<i64>> {
    let result = sqlx::query(
        r#"
        INSERT INTO sponsorships (user_address, status, created_at)
        SELECT ?1, 'pending', ?2
        WHERE NOT EXISTS (
            SELECT 1 FROM sponsorships
            WHERE  user_address = ?1
              AND  status != 'failed'
              AND  created_at > ?2 - ?3
        )
        "#,
    )
    .bind(user_address)
    .bind(now)
    .bind(cooldown_secs)
    .execute(pool)
    .await?;

    Ok((result.rows_affected() == 1).then(|| result.last_insert_rowid()))
}

/// Record the hash of the signed mint before it is sent.
pub async fn attach_transaction(pool: &SqlitePool, id: i64, tx_hash: &str) -> Result<()> {
    sqlx::query("UPDATE sponsorships SET tx_hash = ?2 WHERE id = ?1")
        .bind(id)
        .bind(tx_hash)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn confirm_sponsorship(pool: &SqlitePool, id: i64, ledger: u32) -> Result<()> {
    sqlx::query("UPDATE sponsorships SET status = 'confirmed', ledger = ?2 WHERE id = ?1")
        .bind(id)
        .bind(i64::from(ledger))
        .execute(pool)
        .await?;
    Ok(())
}

/// Mark a claim whose mint never landed, freeing the slot.
pub async fn release_sponsorship(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("UPDATE sponsorships SET status = 'failed' WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Time of the most recent slot-holding sponsorship for `user_address`.
pub async fn last_sponsorship(pool: &SqlitePool, user_address: &str) -> Result<Option<i64>> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        SELECT created_at FROM sponsorships
        WHERE  user_address = ?1 AND status != 'failed'
        ORDER  BY created_at DESC LIMIT 1
        "#,
    )
    .bind(user_address)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(v,)| v))
}

/// Every sponsorship for `user_address`, newest first.
pub async fn sponsorships_for(pool: &SqlitePool, user_address: &str) -> Result<Vec<Sponsorship>> {
    let rows = sqlx::query_as::<_, Sponsorship>(
        r#"
        SELECT id, user_address, status, tx_hash, ledger, created_at
        FROM   sponsorships
        WHERE  user_address = ?1
        ORDER  BY created_at DESC, id DESC
        "#,
    )
    .bind(user_address)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
