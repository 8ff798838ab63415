//! authgate - terminal front end for the single-sign-on login flow.
//!
//! Logs users in against the identity backend, keeps the session in the
//! configured credential store, and prints the partner redirect
//! (`<url>?token=<value|null>`) as JSON.

mod prompt;

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use authgate_core::{
    Clock, Config, HttpIdentityClient, LoginRequest, Outcome, RegistrationRequest, SessionManager,
    SessionState, SystemClock,
};
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const USAGE: &str = "\
Usage: authgate <command> [options]

Commands:
  login [--remember] [--redirect <url>]   Sign in and print the partner redirect
  register                                Create a new account
  logout                                  End the session
  token [--redirect <url>]                Print the partner redirect for the current session
  status                                  Show the session state";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Login { remember: bool, redirect: Option<String> },
    Register,
    Logout,
    Token { redirect: Option<String> },
    Status,
}

fn parse_args(args: &[String]) -> Result<Command> {
    let (name, rest) = args
        .split_first()
        .ok_or_else(|| anyhow::anyhow!("Missing command"))?;

    let mut remember = false;
    let mut redirect = None;
    let mut iter = rest.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--remember" => remember = true,
            "--redirect" => {
                let url = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--redirect needs a URL"))?;
                redirect = Some(url.clone());
            }
            other => return Err(anyhow::anyhow!("Unknown option: {}", other)),
        }
    }

    let command = match (name.as_str(), remember, redirect) {
        ("login", remember, redirect) => Command::Login { remember, redirect },
        ("token", false, redirect) => Command::Token { redirect },
        ("register", false, None) => Command::Register,
        ("logout", false, None) => Command::Logout,
        ("status", false, None) => Command::Status,
        ("register" | "logout" | "status" | "token", ..) => {
            return Err(anyhow::anyhow!("Option not supported by {}", name))
        }
        (other, ..) => return Err(anyhow::anyhow!("Unknown command: {}", other)),
    };
    Ok(command)
}

fn print_outcome(outcome: &Outcome) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    let config = Config::load().context("Failed to load configuration")?;
    debug!(api = %config.api_base_url, store = ?config.store, "Configuration loaded");

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = config.credential_store(clock.clone())?;
    let backend = HttpIdentityClient::from_config(&config, store.clone(), clock.clone())
        .context("Failed to create identity client")?;
    let manager = SessionManager::new(backend, store)
        .with_clock(clock)
        .with_session_grace(config.session_grace());

    let outcome = match command {
        Command::Login { remember, redirect } => {
            let email = prompt::line("Email: ")?;
            let password = prompt::password("Password: ")?;
            let request = LoginRequest {
                email,
                password,
                remember,
                redirect_url: redirect.unwrap_or_else(|| config.default_redirect_url.clone()),
            };
            manager.login(&request).await
        }
        Command::Register => {
            let request = RegistrationRequest {
                first_name: prompt::line("First name: ")?,
                last_name: prompt::line("Last name: ")?,
                email: prompt::line("Email: ")?,
                phone: prompt::optional_line("Phone (optional): ")?,
                password: prompt::confirmed_password()?,
            };
            manager.register(&request).await
        }
        Command::Logout => manager.logout().await,
        Command::Token { redirect } => {
            let redirect = redirect.unwrap_or_else(|| config.default_redirect_url.clone());
            manager.get_token(&redirect).await
        }
        Command::Status => {
            let state = manager.state();
            println!("{}", serde_json::to_string_pretty(&state)?);
            let active = matches!(state, SessionState::Active(_));
            std::process::exit(if active { 0 } else { 1 });
        }
    };

    info!(success = outcome.success, "Command finished");
    print_outcome(&outcome)?;
    if !outcome.success {
        std::process::exit(1);
    }
    Ok(())
}
