use chrono::{DateTime, NaiveDate, Utc};
use faturai_core::{DateRange, Money, Transaction};
use serde::Serialize;
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite};
use std::path::Path;
use tracing::debug;

use crate::error::StorageError;

pub type DbPool = Pool<Sqlite>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: String,
}

/// Opens (creating if needed) the database file and runs migrations.
pub async fn create_db(path: &Path) -> Result<DbPool, StorageError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(&format!("sqlite:{}?mode=rwc", path.display()))
        .await?;

    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    configure(&pool).await?;
    Ok(pool)
}

/// Private in-memory database, kept alive by its single connection.
pub async fn create_memory_db() -> Result<DbPool, StorageError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await?;
    configure(&pool).await?;
    Ok(pool)
}

async fn configure(pool: &DbPool) -> Result<(), StorageError> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(pool)
        .await?;

    run_migrations(pool).await
}

async fn run_migrations(pool: &DbPool) -> Result<(), StorageError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token_hash TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL,
            expires_at INTEGER NOT NULL,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            description TEXT NOT NULL,
            amount_cents INTEGER NOT NULL,
            category TEXT NOT NULL,
            source TEXT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_transactions_user_date ON transactions(user_id, date)")
        .execute(pool)
        .await?;

    Ok(())
}

// ── users ─────────────────────────────────────────────────────────────────────

type UserRow = (i64, String, String, String);

fn user_from_row(r: UserRow) -> User {
    User {
        id: r.0,
        username: r.1,
        password_hash: r.2,
        created_at: r.3,
    }
}

pub async fn create_user(
    pool: &DbPool,
    username: &str,
    password_hash: &str,
) -> Result<User, StorageError> {
    let result = sqlx::query("INSERT INTO users (username, password_hash) VALUES (?, ?)")
        .bind(username)
        .bind(password_hash)
        .execute(pool)
        .await;

    let id = match result {
        Ok(done) => done.last_insert_rowid(),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(StorageError::UsernameTaken(username.to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    get_user_by_id(pool, id)
        .await?
        .ok_or(StorageError::Database(sqlx::Error::RowNotFound))
}

pub async fn get_user_by_username(pool: &DbPool, username: &str) -> Result<Option<User>, StorageError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, password_hash, created_at FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(user_from_row))
}

pub async fn get_user_by_id(pool: &DbPool, id: i64) -> Result<Option<User>, StorageError> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, password_hash, created_at FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(user_from_row))
}

// ── sessions ──────────────────────────────────────────────────────────────────

/// Stores a session keyed by the hash of its token; the raw token never
/// reaches the database.
pub async fn create_session(
    pool: &DbPool,
    token_hash: &str,
    user_id: i64,
    expires_at: DateTime<Utc>,
) -> Result<(), StorageError> {
    sqlx::query("INSERT INTO sessions (token_hash, user_id, expires_at) VALUES (?, ?, ?)")
        .bind(token_hash)
        .bind(user_id)
        .bind(expires_at.timestamp())
        .execute(pool)
        .await?;
    Ok(())
}

/// The user owning an unexpired session, if any.
pub async fn get_session_user(
    pool: &DbPool,
    token_hash: &str,
    now: DateTime<Utc>,
) -> Result<Option<User>, StorageError> {
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT u.id, u.username, u.password_hash, u.created_at
        FROM sessions s JOIN users u ON u.id = s.user_id
        WHERE s.token_hash = ? AND s.expires_at > ?
        "#,
    )
    .bind(token_hash)
    .bind(now.timestamp())
    .fetch_optional(pool)
    .await?;

    Ok(row.map(user_from_row))
}

pub async fn delete_session(pool: &DbPool, token_hash: &str) -> Result<bool, StorageError> {
    let done = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
        .bind(token_hash)
        .execute(pool)
        .await?;
    Ok(done.rows_affected() > 0)
}

pub async fn purge_expired_sessions(pool: &DbPool, now: DateTime<Utc>) -> Result<u64, StorageError> {
    let done = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
        .bind(now.timestamp())
        .execute(pool)
        .await?;
    if done.rows_affected() > 0 {
        debug!(purged = done.rows_affected(), "expired sessions removed");
    }
    Ok(done.rows_affected())
}

// ── transactions ──────────────────────────────────────────────────────────────

/// Inserts all rows in one SQL transaction and returns their new ids in
/// input order. Nothing is written if any insert fails.
pub async fn insert_transactions(
    pool: &DbPool,
    user_id: i64,
    transactions: &[Transaction],
) -> Result<Vec<i64>, StorageError> {
    let mut db_tx = pool.begin().await?;
    let mut ids = Vec::with_capacity(transactions.len());

    for tx in transactions {
        let done = sqlx::query(
            "INSERT INTO transactions (user_id, date, description, amount_cents, category, source) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(user_id)
        .bind(tx.date)
        .bind(&tx.description)
        .bind(tx.amount.to_cents())
        .bind(&tx.category)
        .bind(&tx.source)
        .execute(&mut *db_tx)
        .await?;
        ids.push(done.last_insert_rowid());
    }

    db_tx.commit().await?;
    Ok(ids)
}

type TransactionRow = (i64, NaiveDate, String, i64, String, Option<String>);

/// A user's transactions in date order, optionally limited to a range.
pub async fn get_transactions(
    pool: &DbPool,
    user_id: i64,
    range: Option<DateRange>,
) -> Result<Vec<Transaction>, StorageError> {
    let rows = match range {
        Some(range) => {
            sqlx::query_as::<_, TransactionRow>(
                "SELECT id, date, description, amount_cents, category, source FROM transactions WHERE user_id = ? AND date BETWEEN ? AND ? ORDER BY date, id",
            )
            .bind(user_id)
            .bind(range.start)
            .bind(range.end)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, TransactionRow>(
                "SELECT id, date, description, amount_cents, category, source FROM transactions WHERE user_id = ? ORDER BY date, id",
            )
            .bind(user_id)
            .fetch_all(pool)
            .await?
        }
    };

    Ok(rows
        .into_iter()
        .map(|r| Transaction {
            id: Some(r.0),
            date: r.1,
            description: r.2,
            amount: Money::from_cents(r.3),
            category: r.4,
            source: r.5,
        })
        .collect())
}

/// Returns `false` when the row does not exist or belongs to another user.
pub async fn update_transaction_category(
    pool: &DbPool,
    user_id: i64,
    id: i64,
    category: &str,
) -> Result<bool, StorageError> {
    let done = sqlx::query("UPDATE transactions SET category = ? WHERE id = ? AND user_id = ?")
        .bind(category)
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(done.rows_affected() > 0)
}

pub async fn delete_transactions_by_source(
    pool: &DbPool,
    user_id: i64,
    source: &str,
) -> Result<u64, StorageError> {
    let done = sqlx::query("DELETE FROM transactions WHERE user_id = ? AND source = ?")
        .bind(user_id)
        .bind(source)
        .execute(pool)
        .await?;
    Ok(done.rows_affected())
}

pub async fn clear_transactions(pool: &DbPool, user_id: i64) -> Result<u64, StorageError> {
    let done = sqlx::query("DELETE FROM transactions WHERE user_id = ?")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(done.rows_affected())
}
