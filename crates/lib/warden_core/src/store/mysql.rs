//! MySQL/MariaDB-backed account store (networked engine).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;

use super::{AccountStore, insert_error, storage_error};
use crate::auth::AuthError;
use crate::models::auth::{AccountRecord, NewAccount};

// 191 chars keeps the unique index within InnoDB's key limit under utf8mb4.
const CREATE_USERS_TABLE: &str = "\
    CREATE TABLE IF NOT EXISTS users (
        id BIGINT AUTO_INCREMENT PRIMARY KEY,
        username VARCHAR(191) UNIQUE NOT NULL,
        password_hash TEXT NOT NULL,
        display_name VARCHAR(191),
        trust_level BIGINT NOT NULL DEFAULT 0,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    ) CHARACTER SET utf8mb4";

const SELECT_BY_ID: &str =
    "SELECT id, username, password_hash, display_name, trust_level, created_at \
     FROM users WHERE id = ?";

const SELECT_BY_USERNAME: &str =
    "SELECT id, username, password_hash, display_name, trust_level, created_at \
     FROM users WHERE username = ?";

type AccountRow = (i64, String, String, Option<String>, i64, DateTime<Utc>);

fn into_record(row: AccountRow) -> AccountRecord {
    let (id, username, password_hash, display_name, trust_level, created_at) = row;
    AccountRecord {
        id,
        username,
        password_hash,
        display_name,
        trust_level,
        created_at,
    }
}

/// Account store over a MySQL-compatible server.
#[derive(Debug, Clone)]
pub struct MySqlAccountStore {
    pool: MySqlPool,
}

impl MySqlAccountStore {
    pub async fn connect(database_url: &str) -> Result<Self, AuthError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(storage_error)?;
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for MySqlAccountStore {
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

        let id = i64::try_from(result.last_insert_id())
            .map_err(|e| AuthError::Internal(format!("account id out of range: {e}")))?;

        let row = sqlx::query_as::<_, AccountRow>(SELECT_BY_ID)
            .bind(id)
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
