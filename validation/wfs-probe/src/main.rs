//! WFS probe CLI.
//!
//! Negotiates a protocol version with a WFS endpoint and prints the feature
//! types it advertises.

mod report;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use wfs_client::{ClientConfig, ProtocolVersion, WfsClient};

use report::ProbeReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "wfs-probe")]
#[command(about = "Negotiate with a WFS service and list its feature types", long_about = None)]
struct Args {
    /// Service endpoint (e.g. https://example.com/geoserver/wfs)
    #[arg(env = "WFS_URL")]
    url: Option<String>,

    /// Use this protocol version instead of negotiating
    #[arg(long)]
    version: Option<ProtocolVersion>,

    /// User-Agent header value
    #[arg(long)]
    user_agent: Option<String>,

    /// Retries after connection errors, timeouts and 5xx responses
    #[arg(long)]
    retries: Option<u32>,

    /// Maximum concurrent connections
    #[arg(long)]
    max_connections: Option<usize>,

    /// Disable connection reuse
    #[arg(long)]
    no_keep_alive: bool,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// YAML client configuration; flags override its values
    #[arg(short, long, env = "WFS_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Log level
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Args {
    /// Merge the config file (if any) with command line overrides.
    fn client_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load(path)?,
            None => ClientConfig::new(""),
        };

        if let Some(url) = &self.url {
            config.url = url.clone();
        }
        if self.version.is_some() {
            config.version = self.version;
        }
        if let Some(user_agent) = &self.user_agent {
            config.transport.user_agent = Some(user_agent.clone());
        }
        if let Some(retries) = self.retries {
            config.transport.retry_count = retries;
        }
        if let Some(max) = self.max_connections {
            config.transport.max_connections = Some(max);
        }
        if self.no_keep_alive {
            config.transport.keep_alive = false;
        }
        if let Some(secs) = self.timeout {
            config.transport.timeout_secs = Some(secs);
        }

        Ok(config)
    }
}

fn init_tracing(level: &str, json: bool) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    // Logs go to stderr so JSON output on stdout stays parseable
    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json)?;

    let config = args.client_config()?;
    let url = config.url.clone();
    let client = WfsClient::new(config).context("invalid client configuration")?;

    info!(url = %url, "Probing WFS service");

    let negotiation = client
        .capabilities()
        .await
        .with_context(|| format!("failed to read capabilities from {}", url))?;

    let report = ProbeReport {
        url,
        version: negotiation.version,
        attempts: negotiation.attempts,
        feature_types: negotiation.feature_types(),
    };

    match args.output {
        OutputFormat::Json => println!("{}", report.format_json()?),
        OutputFormat::Table => println!("{}", report.format_table()),
    }

    Ok(())
}
