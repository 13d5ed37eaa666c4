//! Vigil CLI — enqueue requests, run the worker, inspect approvals.
//!
//! The binary is a thin frontend: `enqueue` writes a command envelope to
//! the file-backed queue, `run` drains the queue through one orchestrator
//! pass with real local executors, and `pending` lists approval tokens
//! awaiting a decision.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use vigil_approval::{GrantStore, TokenStore};
use vigil_audit::AuditLog;
use vigil_capability::{CapabilityRegistry, ConnectorCapability, Exec, FileControl, Mail};
use vigil_config::PolicyConfig;
use vigil_core::TokenId;
use vigil_queue::{CommandEnvelope, CommandQueue};
use vigil_worker::{LogNotifier, Orchestrator};

mod local;

use local::{LocalFileExecutor, LocalShellRunner, OfflineConnector};

/// Vigil — approval-gated execution for agent side effects.
#[derive(Parser)]
#[command(name = "vigil")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the queue, token, grant, and audit state.
    #[arg(long, global = true, env = "VIGIL_STATE_DIR", default_value = ".vigil")]
    state_dir: PathBuf,

    /// Path to a policy config overriding the built-in defaults.
    #[arg(long, global = true, env = "VIGIL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a request envelope to the command queue.
    Enqueue {
        /// Capability to invoke (file_control, exec, mail, photo,
        /// schedule, browser, bot_dispatch).
        capability: String,

        /// Action within the capability.
        action: String,

        /// Requesting principal.
        #[arg(long)]
        requester: String,

        /// Request payload as a JSON object.
        #[arg(long, default_value = "{}")]
        payload: String,

        /// Acting bot identity, when the request is relayed.
        #[arg(long)]
        actor_bot: Option<String>,

        /// Approval token to act on; switches the envelope to the
        /// execute phase.
        #[arg(long)]
        token: Option<String>,

        /// Deny the token instead of approving it.
        #[arg(long, requires = "token")]
        deny: bool,

        /// Reason recorded with a denial.
        #[arg(long, requires = "deny")]
        reason: Option<String>,

        /// Confirmation flag to present with an approval; repeatable.
        #[arg(long = "flag")]
        flags: Vec<String>,
    },

    /// Drain the queue through one worker pass.
    Run,

    /// List approval tokens still awaiting a decision.
    Pending,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,vigil=info")),
        )
        .init();
}

/// Parse a token id as printed by the preview message, with or without
/// the `token:` prefix.
fn parse_token_id(raw: &str) -> Result<TokenId> {
    let bare = raw.strip_prefix("token:").unwrap_or(raw);
    let uuid = Uuid::parse_str(bare).with_context(|| format!("invalid token id: {raw}"))?;
    Ok(TokenId(uuid))
}

/// All capabilities the CLI serves. File and exec run against the local
/// machine; the connector-backed capabilities are registered offline so
/// plans for them surface an availability blocker.
fn build_registry() -> CapabilityRegistry {
    let files = Arc::new(LocalFileExecutor);
    let shell = Arc::new(LocalShellRunner);
    CapabilityRegistry::new()
        .with(Arc::new(FileControl::new(files)))
        .with(Arc::new(Exec::new(shell)))
        .with(Arc::new(Mail::new(Arc::new(OfflineConnector::named("mail")))))
        .with(Arc::new(ConnectorCapability::photo(Arc::new(
            OfflineConnector::named("photo"),
        ))))
        .with(Arc::new(ConnectorCapability::schedule(Arc::new(
            OfflineConnector::named("schedule"),
        ))))
        .with(Arc::new(ConnectorCapability::browser(Arc::new(
            OfflineConnector::named("browser"),
        ))))
        .with(Arc::new(ConnectorCapability::bot_dispatch(Arc::new(
            OfflineConnector::named("bot_dispatch"),
        ))))
}

fn open_tokens(state_dir: &Path, config: &PolicyConfig) -> Result<TokenStore> {
    TokenStore::open(state_dir.join("tokens"), config.tokens).context("opening token store")
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = PolicyConfig::load(cli.config.as_deref()).context("loading policy config")?;

    match cli.command {
        Commands::Enqueue {
            capability,
            action,
            requester,
            payload,
            actor_bot,
            token,
            deny,
            reason,
            flags,
        } => {
            let payload: serde_json::Value =
                serde_json::from_str(&payload).context("payload is not valid JSON")?;
            if !payload.is_object() {
                bail!("payload must be a JSON object");
            }

            let mut envelope = match token {
                Some(raw) => {
                    let token_id = parse_token_id(&raw)?;
                    if deny {
                        let why = reason.as_deref().unwrap_or("denied by operator");
                        CommandEnvelope::deny(&capability, &action, &requester, token_id, why)
                    } else {
                        CommandEnvelope::approve(
                            &capability,
                            &action,
                            &requester,
                            payload,
                            token_id,
                            flags,
                        )
                    }
                },
                None => CommandEnvelope::plan(&capability, &action, &requester, payload),
            };
            if let Some(bot) = actor_bot.as_deref() {
                envelope = envelope.with_actor_bot(bot);
            }

            let queue =
                CommandQueue::open(cli.state_dir.join("queue")).context("opening command queue")?;
            let request_id = queue.enqueue(&envelope).context("writing envelope")?;
            println!("enqueued {request_id}");
        },

        Commands::Run => {
            let queue =
                CommandQueue::open(cli.state_dir.join("queue")).context("opening command queue")?;
            let tokens = open_tokens(&cli.state_dir, &config)?;
            let grants = GrantStore::open(cli.state_dir.join("grants"), config.grants.clone())
                .context("opening grant store")?;
            let audit =
                AuditLog::open(cli.state_dir.join("audit")).context("opening audit log")?;

            let orchestrator = Orchestrator::new(
                config,
                queue,
                build_registry(),
                tokens,
                grants,
                audit,
                Arc::new(LogNotifier),
            );
            let processed = orchestrator.run_once().await;
            println!("processed {processed} request(s)");
        },

        Commands::Pending => {
            let tokens = open_tokens(&cli.state_dir, &config)?;
            let pending = tokens.list_pending().context("listing pending tokens")?;
            if pending.is_empty() {
                println!("no pending approvals");
            }
            for token in pending {
                println!(
                    "{}  {}  {}  {:?}  flags={}  expires {}",
                    token.token_id,
                    token.action_type,
                    token.requester,
                    token.risk_level,
                    token.required_flags.join(","),
                    token.expires_at,
                );
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_token_id_accepts_prefixed_and_bare() {
        let bare = "f47ac10b-58cc-4372-a567-0e02b2c3d479";
        let from_bare = parse_token_id(bare).unwrap();
        let from_prefixed = parse_token_id(&format!("token:{bare}")).unwrap();
        assert_eq!(from_bare, from_prefixed);
    }

    #[test]
    fn test_parse_token_id_rejects_garbage() {
        assert!(parse_token_id("not-a-uuid").is_err());
    }

    #[test]
    fn test_cli_parses_enqueue() {
        let cli = Cli::try_parse_from([
            "vigil",
            "enqueue",
            "file",
            "delete",
            "--requester",
            "alice",
            "--payload",
            r#"{"target":"/tmp/x"}"#,
        ])
        .unwrap();
        match cli.command {
            Commands::Enqueue {
                capability, action, ..
            } => {
                assert_eq!(capability, "file");
                assert_eq!(action, "delete");
            },
            _ => panic!("expected enqueue"),
        }
    }
}
