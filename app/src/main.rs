//! MathTutor CLI
//!
//! Drives one tab of the client session from the terminal. Tabs started in
//! separate shells share the same credential database.

mod terminal;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use mathtutor_core::{
    Config, Portal, RequestOptions, SessionConfig, SessionManager, SessionSignal, SignUpRequest,
};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::broadcast::Receiver;
use terminal::{TerminalNavigator, TerminalNotifier};

#[derive(Parser, Debug)]
#[command(name = "mathtutor", version, about = "MathTutor client session shell")]
struct Args {
    /// Config file (JSON); defaults apply when absent
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the backend API root
    #[arg(long, global = true)]
    api: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and store the session
    Signin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        /// Keep the session for 30 days instead of 1
        #[arg(long)]
        remember: bool,
    },

    /// Create an account and store the session
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        remember: bool,
    },

    /// Show the signed-in identity
    Whoami,

    /// Check the session with the backend
    Validate,

    /// Sign out here and on the backend
    Logout,

    /// Authenticated GET against an API path
    Get {
        /// Path under the API root, e.g. /courses
        path: String,
    },

    /// Print session signals and validate periodically until Ctrl-C
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    mathtutor_core::init_logging();

    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(&config_path)
        .with_context(|| format!("loading config from {}", config_path.display()))?;
    if let Some(api) = args.api {
        config.api_base_url = api;
    }

    let portal = Portal::new(config)?;
    let tab = portal.open_tab_with(Arc::new(TerminalNotifier), Arc::new(TerminalNavigator))?;
    let mut signals = tab.subscribe();

    match args.command {
        Command::Signin {
            email,
            password,
            remember,
        } => {
            let response = tab.sign_in(&email, &password, remember).await?;
            if response.was_logged_out_from_other_device {
                println!("Note: your session on another device was signed out.");
            }
            println!("Signed in as {}", response.user.name);
        }
        Command::Signup {
            name,
            email,
            password,
            remember,
        } => {
            let request = SignUpRequest::new(name, email, password);
            let response = tab.sign_up(&request, remember).await?;
            println!("Welcome, {}", response.user.name);
        }
        Command::Whoami => whoami(&tab)?,
        Command::Validate => {
            if !tab.is_authenticated() {
                println!("Not signed in");
            } else if tab.validate_session().await {
                println!("Session is valid");
            } else {
                println!("Session is no longer valid");
            }
        }
        Command::Logout => {
            tab.logout().await?;
            println!("Signed out");
        }
        Command::Get { path } => get(&tab, &path).await?,
        Command::Watch => watch(&portal, &tab).await?,
    }

    if forced_sign_out(&mut signals) {
        // The redirect is a spawned task; keep the runtime alive for it
        tokio::time::sleep(redirect_wait(tab.config())).await;
    }

    Ok(())
}

/// Whether this run saw the server end the session.
fn forced_sign_out(signals: &mut Receiver<SessionSignal>) -> bool {
    let mut forced = false;
    loop {
        match signals.try_recv() {
            Ok(SessionSignal::SessionInvalidated { .. } | SessionSignal::UserBanned { .. }) => {
                forced = true;
            }
            Ok(_) | Err(TryRecvError::Lagged(_)) => {}
            Err(_) => break,
        }
    }
    forced
}

fn redirect_wait(config: &SessionConfig) -> Duration {
    config
        .invalidation_redirect_delay
        .max(config.ban_redirect_delay)
        + Duration::from_millis(100)
}

fn whoami(tab: &SessionManager) -> Result<()> {
    match tab.get_user_data() {
        Some(identity) => {
            println!("{}", serde_json::to_string_pretty(&identity)?);
            if let Some(expires_at) = tab.expires_at() {
                println!("Session expires {}", expires_at.to_rfc3339());
            }
        }
        None => println!("Not signed in"),
    }
    Ok(())
}

async fn get(tab: &SessionManager, path: &str) -> Result<()> {
    match tab
        .make_authenticated_request(path, RequestOptions::get())
        .await
    {
        Ok(response) => {
            println!("{}", response.status);
            println!("{}", response.text());
            Ok(())
        }
        // Already reported by the session manager
        Err(e) if e.is_handled() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

async fn watch(portal: &Portal, tab: &SessionManager) -> Result<()> {
    let mut signals = portal.signals();
    let validation = portal.spawn_validation(tab);

    tracing::info!(
        interval_secs = portal.config().validation_interval_secs,
        "Watching session"
    );

    loop {
        tokio::select! {
            signal = signals.recv() => match signal {
                Ok(SessionSignal::AuthStateChanged { authenticated, .. }) => {
                    println!("auth state changed: authenticated={}", authenticated);
                }
                Ok(other) => println!("{}", serde_json::to_string(&other)?),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Missed session signals");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    validation.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mathtutor_core::SignalBus;

    #[test]
    fn test_forced_sign_out_detects_server_termination() {
        let bus = SignalBus::new();
        let mut rx = bus.subscribe();

        bus.publish(SessionSignal::StorageChanged {
            source: "tab".to_string(),
        });
        bus.publish(SessionSignal::AuthStateChanged {
            source: "tab".to_string(),
            authenticated: false,
        });
        assert!(!forced_sign_out(&mut rx));

        bus.publish(SessionSignal::UserBanned {
            source: "tab".to_string(),
            message: "banned".to_string(),
        });
        assert!(forced_sign_out(&mut rx));
        assert!(!forced_sign_out(&mut rx));
    }

    #[test]
    fn test_redirect_wait_outlasts_both_delays() {
        let config = SessionConfig::new("http://localhost:5000/api").unwrap();
        let wait = redirect_wait(&config);

        assert!(wait > config.invalidation_redirect_delay);
        assert!(wait > config.ban_redirect_delay);
    }
}
