//! Register an account straight into the credential store file.
//!
//! The write lock that serializes registrations lives inside one process.
//! Run this while the server is stopped, or accept that a registration made
//! by the server at the same moment may be overwritten.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;

use auth_server::auth::{AuthConfig, AuthError, AuthService};

#[derive(Parser, Debug)]
#[command(
    name = "create_account",
    about = "Register an account directly in the credential store"
)]
struct Args {
    /// Display name for the account.
    #[arg(long)]
    name: String,

    /// Email address identifying the account (case sensitive).
    #[arg(long)]
    email: String,

    /// Plaintext password to hash and store for this account.
    #[arg(long)]
    password: String,

    /// Override `AUTH_USERS_FILE`.
    #[arg(long)]
    users_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = Args::parse();

    let mut config = AuthConfig::from_env()?;
    if let Some(users_file) = args.users_file {
        config = config.with_users_file(users_file);
    }

    let service = AuthService::new(&config)?;
    match service.register(&args.name, &args.email, &args.password).await {
        Ok(session) => {
            println!(
                "Created account '{}' in {}",
                session.email,
                config.users_file.display()
            );
            Ok(())
        }
        Err(AuthError::Conflict) => {
            writeln!(
                io::stderr(),
                "error: an account for '{}' already exists.",
                args.email
            )?;
            std::process::exit(1);
        }
        Err(err) => {
            writeln!(io::stderr(), "error: {err}")?;
            std::process::exit(1);
        }
    }
}
