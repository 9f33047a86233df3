use clap::{Parser, Subcommand};

/// Warden operator CLI.
#[derive(Parser, Debug)]
#[command(name = "warden", version, about = "Manage Warden accounts and session tokens")]
pub struct Cli {
    /// Account store URL (`sqlite://…` or `mysql://…`). Overrides `DATABASE_URL`.
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the users table if it does not exist.
    InitDb,

    /// Register a local account.
    Register {
        #[arg(long)]
        username: String,
        /// Prefer `WARDEN_PASSWORD` to keep the password out of argv.
        #[arg(long, env = "WARDEN_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        display_name: Option<String>,
    },

    /// Log in with a local account and print the issued token as JSON.
    Login {
        #[arg(long)]
        username: String,
        /// Prefer `WARDEN_PASSWORD` to keep the password out of argv.
        #[arg(long, env = "WARDEN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Resolve a session token and print the caller identity as JSON.
    Whoami {
        #[arg(long)]
        token: String,
    },

    /// Print a Linux.do authorize URL and its state parameter.
    OauthUrl {
        #[arg(long)]
        redirect_uri: String,
    },
}
