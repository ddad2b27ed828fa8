//! rider — relay stdin to a syslog or QUIC log collector.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rider_core::{RiderConfig, SyslogTransport};

#[derive(Debug, Parser)]
#[command(name = "rider", version, about = "Relay stdin to a remote log collector")]
struct Cli {
    /// Bytes per read from stdin
    #[arg(long)]
    size: Option<usize>,

    /// Collector address (host:port)
    #[arg(long)]
    url: Option<String>,

    /// Syslog transport: udp, tcp or local
    #[arg(long)]
    proto: Option<SyslogTransport>,

    /// Tag stamped on syslog messages
    #[arg(long)]
    id: Option<String>,

    /// Print the byte count of each syslog message and log at debug level
    #[arg(long)]
    verbose: bool,

    /// Use the local syslog socket
    #[arg(long)]
    local: bool,

    /// Use the experimental QUIC transport
    #[arg(short = 'x', long)]
    experimental: bool,
}

impl Cli {
    fn apply(self, config: &mut RiderConfig) {
        if let Some(size) = self.size {
            config.input.chunk_size = Some(size);
        }
        if self.experimental {
            config.experimental = true;
        }
        if let Some(url) = self.url {
            if config.experimental {
                config.quic.address = url;
            } else {
                config.syslog.address = url;
            }
        }
        if let Some(proto) = self.proto {
            config.syslog.transport = proto;
        }
        if self.local {
            config.syslog.transport = SyslogTransport::Local;
        }
        if let Some(id) = self.id {
            config.syslog.tag = id;
        }
        if self.verbose {
            config.syslog.verbose = true;
        }
    }
}

fn load_config(cli: Cli) -> anyhow::Result<RiderConfig> {
    let mut config = RiderConfig::load().context("failed to load config")?;
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match load_config(cli) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(stage = "config", error = %format!("{e:#}"), "rider failed");
            return ExitCode::FAILURE;
        }
    };

    tracing::debug!(
        experimental = config.experimental,
        chunk_size = config.effective_chunk_size(),
        "rider starting"
    );

    match rider::run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(stage = e.stage(), error = %e, "rider failed");
            ExitCode::FAILURE
        }
    }
}
