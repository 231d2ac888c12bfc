// SPDX-FileCopyrightText: 2026 Palaver Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Palaver - operator console for a multi-channel bot platform.
//!
//! This is the binary entry point for the console CLI.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use palaver_api::ApiClient;
use palaver_config::PalaverConfig;
use palaver_core::{DialogStatus, PalaverError};
use palaver_session::CredentialStore;

mod auth;
mod dialogs;
mod watch;

/// Palaver - operator console for a multi-channel bot platform.
#[derive(Parser, Debug)]
#[command(name = "palaver", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Sign in and store the credential pair.
    Login {
        /// Operator account email.
        email: String,
    },
    /// Forget the stored credential pair.
    Logout,
    /// Show the authenticated operator profile.
    Me,
    /// List dialogs for a bot, optionally filtered.
    Dialogs {
        bot_id: i64,
        /// Filter by handling status (auto, wait_operator, wait_user).
        #[arg(long)]
        status: Option<DialogStatus>,
        /// Filter by channel type (e.g. telegram, whatsapp).
        #[arg(long)]
        channel: Option<String>,
        /// Filter by closed flag.
        #[arg(long)]
        closed: Option<bool>,
        /// Full-text search query; switches to the search endpoint.
        #[arg(long)]
        query: Option<String>,
        /// Page number, 1-based.
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Output structured JSON for scripting.
        #[arg(long)]
        json: bool,
    },
    /// Show a single dialog with its message history.
    Show {
        bot_id: i64,
        dialog_id: i64,
        /// Output structured JSON for scripting.
        #[arg(long)]
        json: bool,
    },
    /// Send an operator message into a dialog.
    Send {
        bot_id: i64,
        dialog_id: i64,
        text: String,
    },
    /// Take a dialog for this operator.
    Lock { bot_id: i64, dialog_id: i64 },
    /// Release a dialog back to the bot.
    Unlock { bot_id: i64, dialog_id: i64 },
    /// Close a dialog.
    Close { bot_id: i64, dialog_id: i64 },
    /// Follow the live event stream, keeping a reconciled dialog list.
    Watch {
        bot_id: i64,
        /// Print each event as a JSON line instead of a summary.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => {
            palaver_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.console.log_level);

    if let Err(err) = run(cli.command, &config).await {
        eprintln!("error: {err}");
        if err.is_unauthorized() {
            eprintln!("hint: run `palaver login <email>` to sign in again");
        }
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: &PalaverConfig) -> Result<(), PalaverError> {
    let client = api_client(config)?;

    match command {
        Commands::Login { email } => auth::run_login(&client, &email).await,
        Commands::Logout => auth::run_logout(&client),
        Commands::Me => auth::run_me(&client).await,
        Commands::Dialogs {
            bot_id,
            status,
            channel,
            closed,
            query,
            page,
            json,
        } => {
            let filters = palaver_api::DialogFilters {
                status,
                channel_type: channel,
                closed,
                query,
            };
            dialogs::run_list(&client, bot_id, &filters, page, config.console.page_size, json)
                .await
        }
        Commands::Show {
            bot_id,
            dialog_id,
            json,
        } => dialogs::run_show(&client, bot_id, dialog_id, json).await,
        Commands::Send {
            bot_id,
            dialog_id,
            text,
        } => dialogs::run_send(&client, bot_id, dialog_id, &text).await,
        Commands::Lock { bot_id, dialog_id } => {
            dialogs::run_action(&client, bot_id, dialog_id, dialogs::DialogAction::Lock).await
        }
        Commands::Unlock { bot_id, dialog_id } => {
            dialogs::run_action(&client, bot_id, dialog_id, dialogs::DialogAction::Unlock).await
        }
        Commands::Close { bot_id, dialog_id } => {
            dialogs::run_action(&client, bot_id, dialog_id, dialogs::DialogAction::Close).await
        }
        Commands::Watch { bot_id, json } => watch::run_watch(&client, config, bot_id, json).await,
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<PalaverConfig, Vec<palaver_config::ConfigError>> {
    match path {
        Some(path) => palaver_config::load_and_validate_path(path),
        None => palaver_config::load_and_validate(),
    }
}

fn api_client(config: &PalaverConfig) -> Result<ApiClient, PalaverError> {
    ApiClient::with_timeout(
        &config.api.base_url,
        credential_store(config),
        Duration::from_secs(config.api.request_timeout_secs),
    )
}

fn credential_store(config: &PalaverConfig) -> CredentialStore {
    match &config.session.credentials_path {
        Some(path) => CredentialStore::new(PathBuf::from(path)),
        None => CredentialStore::at_default_path(),
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("palaver={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_dialog_filters() {
        let cli = Cli::parse_from([
            "palaver", "dialogs", "7", "--status", "wait_operator", "--closed", "false",
            "--page", "2",
        ]);
        match cli.command {
            Commands::Dialogs {
                bot_id,
                status,
                closed,
                page,
                ..
            } => {
                assert_eq!(bot_id, 7);
                assert_eq!(status, Some(DialogStatus::WaitOperator));
                assert_eq!(closed, Some(false));
                assert_eq!(page, 2);
            }
            other => panic!("wrong command: {other:?}"),
        }
    }

    #[test]
    fn cli_rejects_unknown_status() {
        assert!(Cli::try_parse_from(["palaver", "dialogs", "7", "--status", "paused"]).is_err());
    }
}
