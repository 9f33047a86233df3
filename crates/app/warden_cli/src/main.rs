//! Warden operator CLI.
//!
//! Logs go to stderr; command output (JSON) goes to stdout.

pub use self::error::{Error, Result};
mod error;

use clap::Parser;
use cli::{Cli, Commands};
use serde_json::json;
use tracing::{error, info};
use warden_core::auth::identity::IdentityResolver;
use warden_core::auth::jwt::TokenCodec;
use warden_core::auth::oauth;
use warden_core::auth::service::AuthService;
use warden_core::config::AuthConfig;
use warden_core::store::connect_store;

mod cli;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,warden_core=debug")),
        )
        .init();

    if let Err(e) = run(Cli::parse()).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Cli) -> Result<()> {
    let mut config = AuthConfig::from_env()?;
    if let Some(url) = args.database_url {
        config.database_url = url;
    }

    match args.command {
        Commands::InitDb => {
            open_service(config).await?;
            info!("users table is ready");
        }
        Commands::Register {
            username,
            password,
            display_name,
        } => {
            let service = open_service(config).await?;
            let account = service
                .register(&username, &password, display_name.as_deref())
                .await?;
            print_json(&json!({
                "id": account.id,
                "username": account.username,
                "display_name": account.display_name,
                "trust_level": account.trust_level,
                "created_at": account.created_at,
            }))?;
        }
        Commands::Login { username, password } => {
            let service = open_service(config).await?;
            let issued = service.login(&username, &password).await?;
            print_json(&issued)?;
        }
        Commands::Whoami { token } => {
            let resolver = IdentityResolver::new(TokenCodec::from_config(&config));
            let identity = resolver.resolve_active(Some(&token))?;
            print_json(&identity)?;
        }
        Commands::OauthUrl { redirect_uri } => {
            let client = oauth::get_client(&config.oauth)?;
            let session = client.begin(&redirect_uri)?;
            print_json(&json!({
                "authorize_url": session.authorize_url.as_str(),
                "state": session.state,
            }))?;
        }
    }

    Ok(())
}

/// Connect the configured store, make sure the schema exists, and wrap it in a service.
async fn open_service(config: AuthConfig) -> Result<AuthService> {
    let store = connect_store(&config.database_url).await?;
    store.initialize_schema().await?;
    Ok(AuthService::new(config, store))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
