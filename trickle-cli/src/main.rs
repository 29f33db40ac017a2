use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use trickle_server::{
    Connection, ConnectionEvent, ConnectionRole, ConnectionSetup, HttpSignalingClient,
    IceServerConfig, MessageProducer, PeerIdentity, Scheme, SignalingConfig, SignalingService,
    TlsMaterial, TransportConfig, WebRtcTransportFactory, parse_socket_addr, serve, serve_tls,
};

#[derive(Parser)]
#[command(name = "trickle")]
#[command(about = "Trickle-ICE WebRTC data channels negotiated over plain HTTP")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open one connection per `--peer` and send each of them an offer.
    Offer {
        #[arg(long, default_value = "0.0.0.0:8082")]
        listen: String,

        /// Answerer to connect to, as `ID=ADDR`. Repeatable.
        #[arg(long = "peer", value_name = "ID=ADDR", required = true)]
        peers: Vec<String>,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Wait for an offer and answer it.
    Answer {
        #[arg(long, default_value = "0.0.0.0:8080")]
        listen: String,

        #[arg(long, default_value = "webrtc-client:8082")]
        offerer_address: String,

        /// Identity the offerer knows this answerer by.
        #[arg(long, default_value = "1")]
        peer_id: String,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(clap::Args)]
struct CommonArgs {
    /// Text sent on the data channel every interval.
    #[arg(long)]
    message: Option<String>,

    #[arg(long, default_value_t = 500)]
    interval_ms: u64,

    #[arg(long, default_value_t = 10)]
    request_timeout_secs: u64,

    /// Scheme for remote addresses given without one.
    #[arg(long, default_value = "http")]
    scheme: String,

    #[arg(long)]
    ca_cert: Option<PathBuf>,

    #[arg(long)]
    client_cert: Option<PathBuf>,

    #[arg(long)]
    client_key: Option<PathBuf>,

    /// Certificate the listener serves HTTPS with.
    #[arg(long)]
    server_cert: Option<PathBuf>,

    #[arg(long)]
    server_key: Option<PathBuf>,

    /// Refuse inbound requests without a client certificate signed by `--ca-cert`.
    #[arg(long)]
    require_client_cert: bool,

    /// STUN/TURN URL. Repeatable; all URLs share the TURN credentials.
    #[arg(long = "ice-server", value_name = "URL")]
    ice_servers: Vec<String>,

    #[arg(long)]
    turn_username: Option<String>,

    #[arg(long)]
    turn_credential: Option<String>,

    /// Gather relay candidates only.
    #[arg(long)]
    relay_only: bool,
}

impl CommonArgs {
    fn signaling_config(&self, listen: &str) -> Result<SignalingConfig> {
        let listen_addr = parse_socket_addr(listen).context("Invalid --listen address")?;
        let scheme: Scheme = self.scheme.parse().context("Invalid --scheme")?;

        let tls = TlsMaterial {
            ca_cert: self.ca_cert.clone(),
            client_cert: self.client_cert.clone(),
            client_key: self.client_key.clone(),
            server_cert: self.server_cert.clone(),
            server_key: self.server_key.clone(),
            require_client_cert: self.require_client_cert,
        };

        if self.interval_ms == 0 {
            bail!("--interval-ms must be positive");
        }

        Ok(SignalingConfig {
            listen_addr,
            scheme,
            send_interval: Duration::from_millis(self.interval_ms),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            tls: Some(tls),
            transport: self.transport_config(),
        })
    }

    fn transport_config(&self) -> TransportConfig {
        let mut transport = TransportConfig::default();
        if !self.ice_servers.is_empty() {
            transport.ice_servers = vec![IceServerConfig {
                urls: self.ice_servers.clone(),
                username: self.turn_username.clone(),
                credential: self.turn_credential.clone(),
            }];
        }
        transport.relay_only = self.relay_only;
        transport
    }

    fn producer(&self, role: ConnectionRole) -> MessageProducer {
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| format!("Hi! I am the {role}!"));
        Arc::new(move || message.clone())
    }
}

fn parse_peer(spec: &str) -> Result<(PeerIdentity, String)> {
    let Some((id, addr)) = spec.split_once('=') else {
        bail!("Expected ID=ADDR, got {spec:?}");
    };
    let id: PeerIdentity = id
        .parse()
        .with_context(|| format!("Invalid peer identity in {spec:?}"))?;
    if addr.is_empty() {
        bail!("Missing address in {spec:?}");
    }
    Ok((id, addr.to_owned()))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received, shutting down");
            }
            shutdown.cancel();
        }
    });

    match cli.command {
        Commands::Offer {
            listen,
            peers,
            common,
        } => run_offerer(&listen, &peers, &common, shutdown).await,
        Commands::Answer {
            listen,
            offerer_address,
            peer_id,
            common,
        } => run_answerer(&listen, &offerer_address, &peer_id, &common, shutdown).await,
    }
}

async fn run_offerer(
    listen: &str,
    peers: &[String],
    common: &CommonArgs,
    shutdown: CancellationToken,
) -> Result<()> {
    let config = common.signaling_config(listen)?;
    let peers = peers
        .iter()
        .map(|p| parse_peer(p))
        .collect::<Result<Vec<_>>>()?;
    let client = config.http_client().context("Failed to build HTTP client")?;

    println!("{}", "🚀 Starting trickle offerer...".green().bold());
    println!("   📡 Listening on {}", config.listen_addr);
    for (id, addr) in &peers {
        println!("   🔗 Peer {} at {}", id, config.base_url(addr));
    }

    let service = SignalingService::new(ConnectionRole::Offerer);
    let server = start_listener(&config, &service, &shutdown).await?;

    let transports = Arc::new(WebRtcTransportFactory::new(config.transport.clone()));
    let producer = common.producer(ConnectionRole::Offerer);

    for (peer, addr) in peers {
        let signaling = Arc::new(HttpSignalingClient::for_offerer(
            client.clone(),
            config.base_url(&addr),
        ));
        let setup = ConnectionSetup::new(transports.clone(), signaling, producer.clone())
            .with_send_interval(config.send_interval);

        match service.open_offerer(peer.clone(), setup).await {
            Ok(connection) => spawn_event_logger(&connection),
            Err(e) => error!("Could not open connection to peer {}: {}", peer, e),
        }
    }

    finish(service, server, shutdown).await
}

async fn run_answerer(
    listen: &str,
    offerer_address: &str,
    peer_id: &str,
    common: &CommonArgs,
    shutdown: CancellationToken,
) -> Result<()> {
    let config = common.signaling_config(listen)?;
    let identity: PeerIdentity = peer_id.parse().context("Invalid --peer-id")?;
    let client = config.http_client().context("Failed to build HTTP client")?;
    let base_url = config.base_url(offerer_address);

    println!("{}", "🚀 Starting trickle answerer...".green().bold());
    println!("   📡 Listening on {}", config.listen_addr);
    println!("   🔗 Offerer at {} as peer {}", base_url, identity);

    let service = SignalingService::new(ConnectionRole::Answerer);
    let server = start_listener(&config, &service, &shutdown).await?;

    let signaling = Arc::new(HttpSignalingClient::for_answerer(client, base_url, identity));
    let transports = Arc::new(WebRtcTransportFactory::new(config.transport.clone()));
    let setup = ConnectionSetup::new(transports, signaling, common.producer(ConnectionRole::Answerer))
        .with_send_interval(config.send_interval);

    match service.open_answerer(setup).await {
        Ok(connection) => spawn_event_logger(&connection),
        Err(e) => error!("Could not create answering connection: {}", e),
    }

    finish(service, server, shutdown).await
}

async fn start_listener(
    config: &SignalingConfig,
    service: &SignalingService,
    shutdown: &CancellationToken,
) -> Result<tokio::task::JoinHandle<std::io::Result<()>>> {
    let tls = config
        .listener_tls()
        .context("Failed to load listener TLS settings")?;
    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;

    Ok(match tls {
        Some(tls) => tokio::spawn(serve_tls(listener, service.clone(), tls, shutdown.clone())),
        None => {
            if config.scheme == Scheme::Https {
                warn!("Remote peers are reached over HTTPS but this listener serves plain HTTP");
            }
            tokio::spawn(serve(listener, service.clone(), shutdown.clone()))
        }
    })
}

async fn finish(
    service: SignalingService,
    server: tokio::task::JoinHandle<std::io::Result<()>>,
    shutdown: CancellationToken,
) -> Result<()> {
    shutdown.cancelled().await;
    service.close_all().await;

    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Listener stopped with error: {}", e),
        Err(e) => warn!("Listener task failed: {}", e),
    }

    println!("{}", "✨ Shut down cleanly".green().bold());
    Ok(())
}

fn spawn_event_logger(connection: &Connection) {
    let mut events = connection.subscribe();
    let label = match connection.peer() {
        Some(peer) => format!("{} {} (peer {})", connection.role(), connection.id(), peer),
        None => format!("{} {}", connection.role(), connection.id()),
    };

    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ConnectionEvent::Failed { reason }) => {
                    error!("[{}] failed: {}", label, reason);
                }
                Ok(ConnectionEvent::MessageLoopStopped { error: Some(e) }) => {
                    warn!("[{}] message loop stopped: {}", label, e);
                }
                Ok(event) => info!("[{}] {:?}", label, event),
                Err(RecvError::Lagged(n)) => warn!("[{}] skipped {} events", label, n),
                Err(RecvError::Closed) => break,
            }
        }
    });
}
