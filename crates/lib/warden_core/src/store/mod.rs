//! Account storage.
//!
//! One [`AccountStore`] implementation per relational backend, picked once at
//! startup from the database URL. Username uniqueness is enforced by the
//! engine's constraint; callers never pre-check.

pub mod mysql;
pub mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::auth::AuthError;
use crate::models::auth::{AccountRecord, NewAccount};

pub use mysql::MySqlAccountStore;
pub use sqlite::SqliteAccountStore;

/// Persistence contract for local accounts.
///
/// Every call acquires its own pooled connection and releases it on every
/// exit path.
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Create the `users` table if it does not exist. Idempotent.
    async fn initialize_schema(&self) -> Result<(), AuthError>;

    /// Insert an account, returning the stored row.
    ///
    /// Fails with `DuplicateUsername` when the username is taken.
    async fn create(&self, account: NewAccount) -> Result<AccountRecord, AuthError>;

    /// Look up an account by username. Absence is `Ok(None)`.
    async fn find_by_username(&self, username: &str) -> Result<Option<AccountRecord>, AuthError>;
}

/// Supported storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    MySql,
}

impl Backend {
    /// Pick a backend from a connection URL scheme.
    pub fn from_url(database_url: &str) -> Result<Self, AuthError> {
        let scheme = database_url
            .split_once(':')
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .unwrap_or_default();
        match scheme.as_str() {
            "sqlite" => Ok(Backend::Sqlite),
            "mysql" | "mariadb" => Ok(Backend::MySql),
            _ => Err(AuthError::StorageUnavailable(format!(
                "unsupported database url scheme '{scheme}'"
            ))),
        }
    }
}

/// Connect to the store described by `database_url`.
pub async fn connect_store(database_url: &str) -> Result<Arc<dyn AccountStore>, AuthError> {
    let backend = Backend::from_url(database_url)?;
    info!(?backend, "connecting account store");
    let store: Arc<dyn AccountStore> = match backend {
        Backend::Sqlite => Arc::new(SqliteAccountStore::connect(database_url).await?),
        Backend::MySql => Arc::new(MySqlAccountStore::connect(database_url).await?),
    };
    Ok(store)
}

/// Translate an engine error from an insert into the auth taxonomy.
pub(crate) fn insert_error(err: sqlx::Error, username: &str) -> AuthError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.is_unique_violation()
    {
        info!(username, "username already exists");
        return AuthError::DuplicateUsername(username.to_string());
    }
    storage_error(err)
}

/// Any other engine failure is reported as storage unavailability.
pub(crate) fn storage_error(err: sqlx::Error) -> AuthError {
    warn!(error = %err, "account store failure");
    AuthError::StorageUnavailable(err.to_string())
}
