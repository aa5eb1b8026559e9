//! Council member node.
//!
//! Loads the cluster configuration, starts the TCP listener, wires the
//! proposer/acceptor/learner roles, and accepts candidate proposals either
//! interactively on stdin or automatically via `--propose`/`--delay`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::io::AsyncBufReadExt;
use tracing::error;

use council_core::{ClusterConfig, MemberId};
use council_member::TcpTransport;
use council_paxos::{Node, drive};

/// Run one council member: proposer, acceptor and learner in a single process
#[derive(Parser, Debug)]
#[command(name = "council-member")]
#[command(about = "Run one council member node")]
struct Args {
    /// Member id of this node (must appear in the configuration)
    member_id: String,

    /// Path to the cluster configuration file
    #[arg(long, default_value = "network.config")]
    config: PathBuf,

    /// Candidate to propose automatically after --delay
    #[arg(long)]
    propose: Option<String>,

    /// Delay in milliseconds before the automatic proposal
    #[arg(long, default_value_t = 1000)]
    delay: u64,

    /// Unrecognized trailing arguments are accepted and ignored
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, hide = true)]
    ignored: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(error) => {
            let _ = error.print();
            return if error.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if !args.ignored.is_empty() {
        tracing::debug!(ignored = ?args.ignored, "ignoring unrecognized arguments");
    }

    let self_id = MemberId(args.member_id.clone());

    let config = match ClusterConfig::load(&args.config) {
        Ok(config) => Arc::new(config),
        Err(error) => {
            error!(path = %args.config.display(), %error, "cannot load cluster configuration");
            return ExitCode::from(1);
        }
    };

    let transport = match TcpTransport::new(self_id.clone(), Arc::clone(&config)) {
        Ok(transport) => Arc::new(transport),
        Err(error) => {
            error!(%error, "self id not present in configuration");
            return ExitCode::from(2);
        }
    };

    let mut inbound = match transport.start().await {
        Ok(inbound) => inbound,
        Err(error) => {
            error!(%error, "cannot start transport");
            return ExitCode::from(1);
        }
    };

    let node = Arc::new(Node::new(self_id.clone(), Arc::clone(&config)));

    // Dispatch loop: every inbound message gets its own worker task.
    {
        let node = Arc::clone(&node);
        let transport = Arc::clone(&transport);
        tokio::spawn(async move {
            while let Some(message) = inbound.recv().await {
                let node = Arc::clone(&node);
                let transport = Arc::clone(&transport);
                tokio::spawn(async move {
                    let step = node.handle(&message);
                    drive(transport.as_ref(), step).await;
                });
            }
        });
    }

    // Scheduled automatic proposal.
    if let Some(candidate) = args.propose.clone() {
        let node = Arc::clone(&node);
        let transport = Arc::clone(&transport);
        let delay = Duration::from_millis(args.delay);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            propose_candidate(&node, transport.as_ref(), &candidate).await;
        });
    }

    println!("[{self_id}] ready. Type a candidate id to propose (e.g., M5).");

    // Interactive proposals until stdin closes; the node keeps serving
    // inbound messages afterwards.
    {
        let node = Arc::clone(&node);
        let transport = Arc::clone(&transport);
        tokio::spawn(async move {
            let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let candidate = line.trim();
                if candidate.is_empty() {
                    continue;
                }
                propose_candidate(&node, transport.as_ref(), candidate).await;
            }
        });
    }

    let _ = tokio::signal::ctrl_c().await;
    transport.close();
    ExitCode::SUCCESS
}

/// Validates and proposes one candidate, with a diagnostic on rejection.
async fn propose_candidate(node: &Node, transport: &TcpTransport, candidate: &str) {
    match node.propose(candidate) {
        Ok(step) => drive(transport, step).await,
        Err(_) => {
            let known = node
                .config()
                .member_ids()
                .map(MemberId::as_str)
                .collect::<Vec<_>>()
                .join(", ");
            println!(
                "[{}] Unknown candidate '{candidate}'. Must be one of [{known}]",
                node.self_id()
            );
        }
    }
}
