//! triprotocol - session client for the String, JSON and Binary servers
//!
//! Authenticates, runs one operation, logs out and prints the response.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use triprotocol_core::operation::{
    EchoRequest, EchoResponse, HistoryRequest, HistoryResponse, StatusRequest, StatusResponse,
    SumRequest, SumResponse, TimestampRequest, TimestampResponse,
};
use triprotocol_core::{OperationRequest, OperationResponse};
use triprotocol_fabric::{AnyCodec, AppLayerClient, Protocol, TcpTransport};

mod config;

use config::ClientConfig;

/// triprotocol - session client for the String, JSON and Binary servers
#[derive(Parser, Debug)]
#[command(name = "triprotocol")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); falls back to RUST_LOG
    #[arg(long)]
    log_level: Option<String>,

    /// Wire protocol (string, json, proto)
    #[arg(short, long, default_value = "json")]
    protocol: Protocol,

    /// Student id used to authenticate
    #[arg(short, long)]
    student: String,

    /// Server address, overriding the configured one for the protocol
    #[arg(short, long)]
    address: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Echo a message back
    Echo {
        /// Message to echo
        message: String,
    },

    /// Sum a list of integers
    Sum {
        /// Numbers to add
        #[arg(required = true, num_args = 1.., allow_negative_numbers = true)]
        numbers: Vec<i64>,
    },

    /// Fetch the server clock
    Timestamp,

    /// Query server status
    Status {
        /// Include database statistics and active sessions
        #[arg(long)]
        detailed: bool,
    },

    /// List the student's recent operations
    History {
        /// Maximum number of entries
        #[arg(default_value_t = 10)]
        limit: i64,
    },
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<ClientConfig> {
    let config = match path {
        Some(path) => ClientConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => ClientConfig::default(),
    };
    let config = config
        .with_env_overrides()
        .context("invalid environment override")?;
    config.validate()?;
    Ok(config)
}

struct Runner<'a> {
    client: AppLayerClient<AnyCodec, TcpTransport>,
    address: &'a str,
    student: &'a str,
}

impl Runner<'_> {
    async fn run<Q, R>(&self, request: Q) -> Result<String>
    where
        Q: OperationRequest + Clone,
        R: OperationResponse + Serialize,
    {
        let response: R = self
            .client
            .session(self.address, self.student, &request)
            .await
            .with_context(|| format!("{} failed against {}", Q::COMMAND, self.address))?;
        serde_json::to_string_pretty(&response).context("failed to render response")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let config = load_config(cli.config.as_ref())?;
    let address = cli
        .address
        .clone()
        .unwrap_or_else(|| config.address_for(cli.protocol).to_string());
    debug!(name = %config.name, version = %config.version, "Configuration loaded");

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling");
            interrupt.cancel();
        }
    });

    let transport = TcpTransport::builder()
        .timeout(config.tcp_timeout())
        .cancellation_token(cancel)
        .build();
    let runner = Runner {
        client: AppLayerClient::new(cli.protocol.codec(), transport),
        address: &address,
        student: &cli.student,
    };
    info!(protocol = %cli.protocol, address = %address, "Starting session");

    let output = match cli.command {
        Commands::Echo { message } => {
            runner
                .run::<_, EchoResponse>(EchoRequest::new(message))
                .await?
        }
        Commands::Sum { numbers } => runner.run::<_, SumResponse>(SumRequest::new(numbers)).await?,
        Commands::Timestamp => runner.run::<_, TimestampResponse>(TimestampRequest).await?,
        Commands::Status { detailed } => {
            runner
                .run::<_, StatusResponse>(StatusRequest::new(detailed))
                .await?
        }
        Commands::History { limit } => {
            runner
                .run::<_, HistoryResponse>(HistoryRequest::new(limit))
                .await?
        }
    };

    println!("{output}");
    Ok(())
}
