//! Command-line client for the peer transfer backend.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use peer_transfer_client::app::{ActiveSession, ClientState, DirectoryView, TransferPhase};
use peer_transfer_client::domain::{AccountId, ContactId, UserId};
use peer_transfer_client::infra::{
    DEFAULT_BACKEND_URL, DEFAULT_SESSION_FILE, FileSessionStore, HttpBankingApi, HttpClientConfig,
};

/// Peer transfer client
#[derive(Parser, Debug)]
#[command(name = "peer-transfer")]
#[command(version)]
struct Cli {
    /// Banking backend base URL.
    #[arg(long, env = "BACKEND_URL", default_value = DEFAULT_BACKEND_URL)]
    backend_url: String,

    /// HTTP request timeout in seconds.
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value = "30")]
    timeout_secs: u64,

    /// File holding the selected user.
    #[arg(long, env = "SESSION_FILE", default_value = DEFAULT_SESSION_FILE)]
    session_file: String,

    /// Enable JSON log output.
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List selectable users
    Users,
    /// Select the active user
    Select { user_id: UserId },
    /// Forget the active user
    Logout,
    /// Show the active user
    Whoami,
    /// List the active user's accounts
    Accounts,
    /// List contacts, optionally filtered by name
    Contacts {
        #[arg(long)]
        query: Option<String>,
        /// Show the full account number of this contact (repeatable)
        #[arg(long = "reveal")]
        reveal: Vec<ContactId>,
    },
    /// Show the merged history of one of your accounts
    History { account_id: AccountId },
    /// Send money from one of your accounts to a contact's account
    Transfer {
        #[arg(long)]
        from: AccountId,
        #[arg(long)]
        to: AccountId,
        #[arg(long)]
        amount: String,
    },
}

fn init_tracing(json: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,reqwest=warn"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

async fn require_session(state: &ClientState) -> Result<ActiveSession> {
    let context = state.session_context();
    context.initialize().await;
    context
        .active()
        .context("No user selected; run `peer-transfer select <user-id>` first")
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    debug!(backend_url = %cli.backend_url, session_file = %cli.session_file, "Starting");

    let api = HttpBankingApi::new(HttpClientConfig::new(
        cli.backend_url.clone(),
        Duration::from_secs(cli.timeout_secs),
    ))
    .context("Failed to create backend client")?;
    let state = ClientState::new(
        Arc::new(api),
        Arc::new(FileSessionStore::new(&cli.session_file)),
    );

    match cli.command {
        Command::Users => {
            let users = state
                .user_selection()
                .list_users()
                .await
                .context("Failed to list users")?;
            for user in users {
                println!("{}\t{}\t{}", user.id, user.name, user.email);
            }
        }
        Command::Select { user_id } => {
            state
                .user_selection()
                .select(user_id)
                .context("Failed to persist selection")?;
            let session = require_session(&state)
                .await
                .with_context(|| format!("User {} could not be resolved", user_id))?;
            println!("Active user: {}", session.user().name);
        }
        Command::Logout => {
            state.session_context().logout();
            println!("Logged out");
        }
        Command::Whoami => {
            let session = require_session(&state).await?;
            let user = session.user();
            println!("{}\t{}\t{}", user.id, user.name, user.email);
        }
        Command::Accounts => {
            let session = require_session(&state).await?;
            let overview = state.account_overview(&session);
            overview.load().await.context("Failed to load accounts")?;
            for account in overview.accounts() {
                println!(
                    "{}\t{}\t{:.2}",
                    account.id, account.account_number, account.balance
                );
            }
        }
        Command::Contacts { query, reveal } => {
            let session = require_session(&state).await?;
            let directory = state.contact_directory(&session);
            directory.load().await.context("Failed to load contacts")?;
            if let Some(query) = query {
                directory.set_query(&query);
            }
            for contact_id in reveal {
                if directory.toggle_disclosure(contact_id).is_none() {
                    bail!("No contact with id {}", contact_id);
                }
            }
            match directory.view() {
                DirectoryView::Populated(entries) => {
                    for entry in entries {
                        println!(
                            "{}\t{}\t{}",
                            entry.contact().id,
                            entry.name(),
                            entry.display_account_number()
                        );
                    }
                }
                DirectoryView::NoMatches => println!("No contacts match"),
                DirectoryView::Loading => println!("Loading"),
                DirectoryView::Unavailable(message) => bail!("Contacts unavailable: {}", message),
            }
        }
        Command::History { account_id } => {
            let session = require_session(&state).await?;
            let overview = state.account_overview(&session);
            overview.load().await.context("Failed to load accounts")?;
            let account = overview
                .find(account_id)
                .with_context(|| format!("Account {} is not one of yours", account_id))?;

            let history = state.history(account.id);
            history
                .load()
                .await
                .context("Failed to load transaction history")?;
            let entries = history.entries();
            if entries.is_empty() {
                println!("No transactions");
            }
            for entry in entries {
                let commission = entry
                    .commission
                    .map(|c| format!("\tcommission {:.2}", c))
                    .unwrap_or_default();
                println!(
                    "{}\t{}\t{}\t{}{}",
                    entry.display_timestamp(),
                    entry.direction,
                    entry.counterpart_label(),
                    entry.signed_amount(),
                    commission
                );
            }
        }
        Command::Transfer { from, to, amount } => {
            let session = require_session(&state).await?;
            let overview = state.account_overview(&session);
            overview.load().await.context("Failed to load accounts")?;
            let source = overview
                .find(from)
                .with_context(|| format!("Account {} is not one of yours", from))?;

            let orchestrator = state.transfer_orchestrator();
            orchestrator
                .open(source, &session)
                .await
                .context("Failed to open transfer form")?;
            if orchestrator.phase() != TransferPhase::OpenReady {
                bail!("Transfer form did not become ready");
            }
            if !orchestrator.edit_amount(&amount) {
                bail!(
                    "Invalid amount '{}': use digits with at most two decimals",
                    amount
                );
            }
            orchestrator
                .select_destination(Some(to))
                .with_context(|| format!("Account {} is not linked to any of your contacts", to))?;

            let readiness = orchestrator.readiness();
            if let Some(warning) = readiness.warning() {
                bail!("{}", warning);
            }
            if !readiness.can_submit {
                bail!("Enter an amount greater than zero");
            }

            let destination_label = orchestrator
                .candidates()
                .into_iter()
                .find(|c| c.account_id == to)
                .map(|c| c.label)
                .unwrap_or_else(|| to.to_string());
            orchestrator.submit().await.map_err(|e| {
                let context = if e.is_transient() {
                    "Transfer failed; the backend may be unavailable, try again"
                } else {
                    "Transfer failed"
                };
                anyhow::Error::new(e).context(context)
            })?;
            info!(from, to, "Transfer submitted");
            println!("Sent {} to {}", amount, destination_label);

            if overview.refresh().await.is_ok() {
                if let Some(account) = overview.find(from) {
                    println!("New balance: {:.2}", account.balance);
                }
            }
        }
    }

    Ok(())
}
