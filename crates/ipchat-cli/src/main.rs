mod chat;
mod common;
mod events;
mod listen;
mod output;
mod send;
mod transcript;

use anyhow::Context;
use clap::{Parser, Subcommand};
use events::{emit, EventGroup, EventProbe};
use ipchat_protocol::{ChatRuntime, GroupRoster, JsonFileRoster, RuntimeConfig};
use ipchat_transport::{OutboundMessage, PeerAddress, TransportConfig, ANONYMOUS};
use output::Output;
use std::path::PathBuf;
use std::sync::Arc;
use transcript::Transcript;

#[derive(Parser)]
#[command(name = "ipchat", version, about = "Serverless LAN chat over plain TCP")]
struct Cli {
    /// Display name prefixed to every message.
    #[arg(short, long, default_value = ANONYMOUS)]
    name: String,

    /// Port to listen on and to assume for peers given without one.
    #[arg(short, long)]
    port: Option<u16>,

    /// Listen address, overrides --port for the listener (e.g. 127.0.0.1:12345).
    #[arg(long)]
    listen: Option<String>,

    /// Group roster file.
    #[arg(long, default_value = "groups.json")]
    groups: PathBuf,

    /// Directory for chat.log and chat_history.json.
    #[arg(long, default_value = ".")]
    transcript_dir: PathBuf,

    /// Do not write chat.log / chat_history.json.
    #[arg(long)]
    no_transcript: bool,

    /// Debug logging (RUST_LOG takes precedence).
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Receive messages until Ctrl+C.
    Listen,

    /// Send one message.
    Send {
        /// Peer address or group:<name>.
        #[arg(long)]
        to: String,
        /// Message text (joined with spaces).
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Send a UTF-8 text file.
    SendFile {
        /// Peer address or group:<name>.
        #[arg(long)]
        to: String,
        path: PathBuf,
    },

    /// Check whether a peer accepts connections.
    Probe {
        /// Peer address.
        host: String,
    },

    /// Interactive chat: listen in the background, send what you type.
    Chat {
        /// Initial target (address or group:<name>).
        #[arg(long)]
        to: Option<String>,
    },

    /// List groups from the roster file.
    Groups,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = transport_config(&cli);
    let roster: Arc<dyn GroupRoster> = Arc::new(JsonFileRoster::new(&cli.groups, config.port()));
    let transcript = if cli.no_transcript {
        None
    } else {
        Some(Transcript::open(&cli.transcript_dir).with_context(|| {
            format!("cannot open transcript in {}", cli.transcript_dir.display())
        })?)
    };
    let output = Output::new(transcript);

    match cli.command {
        Command::Listen => {
            let channels = start_runtime(config, roster).await?;
            listen::run(channels, &cli.name, Arc::new(output)).await?;
        }

        Command::Send { to, text } => {
            let body = text.join(" ");
            if body.trim().is_empty() {
                anyhow::bail!("message is empty");
            }
            let message = OutboundMessage::text(&cli.name, body);
            send::run(config, roster, &output, &to, message).await?;
        }

        Command::SendFile { to, path } => {
            let message = match OutboundMessage::from_text_file(&cli.name, &path) {
                Ok(message) => message,
                Err(e) => {
                    output.note(format!("[FILE ERROR] {}: {e}", path.display()));
                    anyhow::bail!("cannot read {}: {e}", path.display());
                }
            };
            send::run(config, roster, &output, &to, message).await?;
        }

        Command::Probe { host } => {
            let peer = PeerAddress::parse(&host, config.port())?;
            let online = ipchat_transport::probe(&peer, config.probe_deadline()).await;
            eprintln!("{peer} is {}", if online { "online" } else { "offline" });
            emit(&EventProbe {
                event: "probe",
                peer: peer.to_string(),
                online,
            });
        }

        Command::Chat { to } => {
            let channels = start_runtime(config, roster).await?;
            chat::run(channels, &cli.name, Arc::new(output), to).await?;
        }

        Command::Groups => {
            let names = roster.group_names()?;
            if names.is_empty() {
                eprintln!("No groups in {}", cli.groups.display());
            }
            for name in names {
                let members: Vec<String> = roster
                    .lookup_group(&name)?
                    .unwrap_or_default()
                    .iter()
                    .map(|p| p.to_string())
                    .collect();
                eprintln!("{name}: {}", members.join(", "));
                emit(&EventGroup {
                    event: "group",
                    name,
                    members,
                });
            }
        }
    }

    Ok(())
}

fn transport_config(cli: &Cli) -> TransportConfig {
    let mut config = TransportConfig::new();
    if let Some(port) = cli.port {
        config = config.default_port(port).listen_addr(format!("0.0.0.0:{port}"));
    }
    if let Some(listen) = &cli.listen {
        config = config.listen_addr(listen.clone());
    }
    config
}

async fn start_runtime(
    config: TransportConfig,
    roster: Arc<dyn GroupRoster>,
) -> anyhow::Result<ipchat_protocol::RuntimeChannels> {
    let runtime_config = RuntimeConfig {
        transport: config,
        ..RuntimeConfig::default()
    };
    ChatRuntime::start(runtime_config, roster)
        .await
        .context("cannot start delivery server")
}
