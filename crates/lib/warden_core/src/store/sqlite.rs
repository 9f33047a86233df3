//! SQLite-backed account store (embedded file engine).

use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use super::{AccountStore, insert_error, storage_error};
use crate::auth::AuthError;
use crate::models::auth::{AccountRecord, NewAccount};

const CREATE_USERS_TABLE: &str = "\
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT UNIQUE NOT NULL,
        password_hash TEXT NOT NULL,
        display_name TEXT,
        trust_level INTEGER NOT NULL DEFAULT 0,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )";

const SELECT_BY_ID: &str =
    "SELECT id, username, password_hash, display_name, trust_level, created_at \
     FROM users WHERE id = ?";

const SELECT_BY_USERNAME: &str =
    "SELECT id, username, password_hash, display_name, trust_level, created_at \
     FROM users WHERE username = ?";

type AccountRow = (i64, String, String, Option<String>, i64, NaiveDateTime);

fn into_record(row: AccountRow) -> AccountRecord {
    let (id, username, password_hash, display_name, trust_level, created_at) = row;
    AccountRecord {
        id,
        username,
        password_hash,
        display_name,
        trust_level,
        created_at: created_at.and_utc(),
    }
}

/// Account store over an SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteAccountStore {
    pool: SqlitePool,
}

impl SqliteAccountStore {
    /// Open (creating if missing) the database at `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self, AuthError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(storage_error)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(storage_error)?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for SqliteAccountStore {
    async fn initialize_schema(&self) -> Result<(), AuthError> {
        let mut conn = self.pool.acquire().await.map_err(storage_error)?;
        sqlx::query(CREATE_USERS_TABLE)
            .execute(&mut *conn)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn create(&self, account: NewAccount) -> Result<AccountRecord, AuthError> {
        let mut conn = self.pool.acquire().await.map_err(storage_error)?;

        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, display_name, trust_level) \
             VALUES (?, ?, ?, ?)",
        )
        .bind(&account.username)
        .bind(&account.password_hash)
        .bind(&account.display_name)
        .bind(account.trust_level)
        .execute(&mut *conn)
        .await
        .map_err(|e| insert_error(e, &account.username))?;

        let row = sqlx::query_as::<_, AccountRow>(SELECT_BY_ID)
            .bind(result.last_insert_rowid())
            .fetch_one(&mut *conn)
            .await
            .map_err(storage_error)?;
        Ok(into_record(row))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<AccountRecord>, AuthError> {
        let mut conn = self.pool.acquire().await.map_err(storage_error)?;
        let row = sqlx::query_as::<_, AccountRow>(SELECT_BY_USERNAME)
            .bind(username)
            .fetch_optional(&mut *conn)
            .await
            .map_err(storage_error)?;
        Ok(row.map(into_record))
    }
}
