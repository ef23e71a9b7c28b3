use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use ari_client::constants::{
    DEFAULT_ARI_HOST, DEFAULT_ARI_PORT, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_ROOT_URI,
};
use ari_client::dispatch::TRANSPORT_MESSAGE_TYPE;
use ari_client::model::InfoSection;
use ari_client::rest::{BridgeParams, SoundListOptions};
use ari_client::{
    AriClient, AriError, AriSettings, DisconnectReason, Event, HandlerResult, StasisApplication,
    WsSession,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Ari(#[from] AriError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("event stream ended: {0}")]
    Session(String),
}

#[derive(Parser, Debug)]
#[command(name = "ari-cli", about = "Asterisk REST Interface CLI")]
struct Cli {
    #[arg(long, env = "ARI_HOST", default_value = DEFAULT_ARI_HOST)]
    host: String,

    #[arg(long, env = "ARI_PORT", default_value_t = DEFAULT_ARI_PORT)]
    port: u16,

    #[arg(long, env = "ARI_ROOT_URI", default_value = DEFAULT_ROOT_URI)]
    root_uri: String,

    #[arg(long, env = "ARI_USER")]
    user: String,

    #[arg(long, env = "ARI_PASSWORD", hide_env_values = true)]
    password: String,

    #[arg(long, env = "ARI_APP", default_value = "ari-cli")]
    app: String,

    /// Use https/wss.
    #[arg(long, env = "ARI_TLS", default_value_t = false)]
    tls: bool,

    #[arg(long, env = "ARI_REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    request_timeout_secs: u64,

    #[arg(long, env = "ARI_CONNECT_TIMEOUT_SECS", default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS)]
    connect_timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn settings(&self) -> AriSettings {
        AriSettings::new(&self.user, &self.password, &self.app)
            .with_host(&self.host)
            .with_port(self.port)
            .with_root_uri(&self.root_uri)
            .with_tls(self.tls)
            .with_timeouts(
                Duration::from_secs(self.request_timeout_secs),
                Duration::from_secs(self.connect_timeout_secs),
            )
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    Ping,
    Info {
        /// Comma-separated sections to return.
        #[arg(long, value_delimiter = ',')]
        only: Vec<SectionArg>,
    },
    Sounds(SoundsCommand),
    Apps(AppsCommand),
    Channels(ChannelsCommand),
    Bridges(BridgesCommand),
    /// Print every event for the application as one JSON line until Ctrl-C.
    Events {
        #[arg(long, env = "ARI_SUBSCRIBE_ALL", default_value_t = false)]
        subscribe_all: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SectionArg {
    Build,
    System,
    Config,
    Status,
}

impl From<SectionArg> for InfoSection {
    fn from(section: SectionArg) -> Self {
        match section {
            SectionArg::Build => Self::Build,
            SectionArg::System => Self::System,
            SectionArg::Config => Self::Config,
            SectionArg::Status => Self::Status,
        }
    }
}

#[derive(Args, Debug)]
struct SoundsCommand {
    #[command(subcommand)]
    command: SoundsSubcommand,
}

#[derive(Subcommand, Debug)]
enum SoundsSubcommand {
    List {
        #[arg(long)]
        lang: Option<String>,
        #[arg(long)]
        format: Option<String>,
    },
    Get {
        sound_id: String,
    },
}

#[derive(Args, Debug)]
struct AppsCommand {
    #[command(subcommand)]
    command: AppsSubcommand,
}

#[derive(Subcommand, Debug)]
enum AppsSubcommand {
    List,
    Get { name: String },
}

#[derive(Args, Debug)]
struct ChannelsCommand {
    #[command(subcommand)]
    command: ChannelsSubcommand,
}

#[derive(Subcommand, Debug)]
enum ChannelsSubcommand {
    List,
    Get {
        channel_id: String,
    },
    Hangup {
        channel_id: String,
        /// Hangup cause such as `normal`, `busy` or `congestion`.
        #[arg(long)]
        reason: Option<String>,
    },
}

#[derive(Args, Debug)]
struct BridgesCommand {
    #[command(subcommand)]
    command: BridgesSubcommand,
}

#[derive(Subcommand, Debug)]
enum BridgesSubcommand {
    List,
    Get {
        bridge_id: String,
    },
    Create {
        #[arg(long = "type", default_value = "mixing", value_delimiter = ',')]
        bridge_type: Vec<String>,
        #[arg(long)]
        name: Option<String>,
    },
    Destroy {
        bridge_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = cli.settings();
    let client = AriClient::new(&settings)?;

    match cli.command {
        Command::Ping => print_json(&client.asterisk().ping().await?),
        Command::Info { only } => {
            let sections: Vec<InfoSection> = only.into_iter().map(InfoSection::from).collect();
            print_json(&client.asterisk().info(&sections).await?)
        }
        Command::Sounds(sounds) => run_sounds(&client, sounds).await,
        Command::Apps(apps) => run_apps(&client, apps).await,
        Command::Channels(channels) => run_channels(&client, channels).await,
        Command::Bridges(bridges) => run_bridges(&client, bridges).await,
        Command::Events { subscribe_all } => {
            run_events(settings.with_subscribe_all(subscribe_all), client).await
        }
    }
}

async fn run_sounds(client: &AriClient, sounds: SoundsCommand) -> Result<(), CliError> {
    match sounds.command {
        SoundsSubcommand::List { lang, format } => {
            let options = SoundListOptions { lang, format };
            print_json(&client.sounds().list(&options).await?)
        }
        SoundsSubcommand::Get { sound_id } => print_json(&client.sounds().get(&sound_id).await?),
    }
}

async fn run_apps(client: &AriClient, apps: AppsCommand) -> Result<(), CliError> {
    match apps.command {
        AppsSubcommand::List => print_json(&client.applications().list().await?),
        AppsSubcommand::Get { name } => print_json(&client.applications().get(&name).await?),
    }
}

async fn run_channels(client: &AriClient, channels: ChannelsCommand) -> Result<(), CliError> {
    match channels.command {
        ChannelsSubcommand::List => print_json(&client.channels().list().await?),
        ChannelsSubcommand::Get { channel_id } => {
            print_json(&client.channels().get(&channel_id).await?)
        }
        ChannelsSubcommand::Hangup { channel_id, reason } => {
            client.channels().hangup(&channel_id, reason.as_deref()).await?;
            println!("ok");
            Ok(())
        }
    }
}

async fn run_bridges(client: &AriClient, bridges: BridgesCommand) -> Result<(), CliError> {
    match bridges.command {
        BridgesSubcommand::List => print_json(&client.bridges().list().await?),
        BridgesSubcommand::Get { bridge_id } => print_json(&client.bridges().get(&bridge_id).await?),
        BridgesSubcommand::Create { bridge_type, name } => {
            let params = BridgeParams { bridge_type, bridge_id: None, name };
            print_json(&client.bridges().create(&params).await?)
        }
        BridgesSubcommand::Destroy { bridge_id } => {
            client.bridges().destroy(&bridge_id).await?;
            println!("ok");
            Ok(())
        }
    }
}

/// Writes each recognized event to stdout as one JSON line.
struct PrintingApp;

#[async_trait::async_trait]
impl StasisApplication for PrintingApp {
    async fn on_event(&mut self, event: &Event) -> HandlerResult {
        println!("{}", serde_json::to_string(event)?);
        Ok(())
    }
}

/// Counts frames dropped during an `events` run. Each drop is already logged
/// by the dispatcher; the total goes into the exit line.
#[derive(Clone, Default)]
struct DropCounter(Arc<AtomicUsize>);

impl DropCounter {
    fn record(&self, message_type: &str) {
        if message_type != TRANSPORT_MESSAGE_TYPE {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn total(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

async fn run_events(settings: AriSettings, client: AriClient) -> Result<(), CliError> {
    let dropped = DropCounter::default();
    let counter = dropped.clone();
    let mut session = WsSession::new(settings, PrintingApp)
        .with_rest_client(client)
        .with_error_handler(move |message_type, _| counter.record(message_type));

    let handle = session.handle();
    let ctrl_c = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => handle.stop(),
            Err(e) => warn!(error = %e, "ctrl-c handler unavailable"),
        }
    });

    let reason = session.run().await;
    ctrl_c.abort();

    match reason {
        DisconnectReason::Stopped => {
            info!(dropped = dropped.total(), "stopped");
            Ok(())
        }
        DisconnectReason::ClosedByServer(reason) => {
            info!(
                reason = reason.as_deref().unwrap_or(""),
                dropped = dropped.total(),
                "server closed the event stream"
            );
            Ok(())
        }
        DisconnectReason::TransportError(message) => Err(CliError::Session(message)),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
