use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{}", .0)]
    Auth(#[from] warden_core::auth::AuthError),

    #[error("{}", .0)]
    Config(#[from] warden_core::config::ConfigError),

    #[error("Json: {}", .0)]
    Json(#[from] serde_json::Error),
}
