use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ispdb_sanity_core::{
    Config, ConfigBuilder, ConfigSnapshot, NetworkProber, Protocol, SanityChecker, Transport,
};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(version, about, long_about = None)]
#[clap(name = "ispdb-sanity")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[clap(short, long, global = true, env = "ISPDB_SANITY_CONFIG")]
    config: Option<PathBuf>,

    /// Per-operation probe timeout in seconds
    #[clap(short, long, global = true)]
    timeout: Option<u64>,

    /// Log probe and DNS details to stderr
    #[clap(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the domain checks, then the server checks
    Check {
        /// Configuration snapshot (JSON), or '-' for stdin
        snapshot: PathBuf,
    },
    /// Compare DNS records of the bound domains with the server hostnames
    Domains {
        /// Configuration snapshot (JSON), or '-' for stdin
        snapshot: PathBuf,
    },
    /// Probe the declared incoming and outgoing servers
    Config {
        /// Configuration snapshot (JSON), or '-' for stdin
        snapshot: PathBuf,
    },
    /// Probe a single server and print its authentication capabilities
    Probe {
        #[clap(long, value_enum)]
        protocol: ProtocolArg,

        #[clap(long, value_enum, default_value = "plain")]
        transport: TransportArg,

        /// Port, defaults per protocol and transport
        #[clap(long)]
        port: Option<u16>,

        host: String,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ProtocolArg {
    Smtp,
    Imap,
    Pop3,
}

impl From<ProtocolArg> for Protocol {
    fn from(arg: ProtocolArg) -> Self {
        match arg {
            ProtocolArg::Smtp => Protocol::Smtp,
            ProtocolArg::Imap => Protocol::Imap,
            ProtocolArg::Pop3 => Protocol::Pop3,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum TransportArg {
    Plain,
    Ssl,
    Starttls,
}

impl From<TransportArg> for Transport {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Plain => Transport::Plain,
            TransportArg::Ssl => Transport::Ssl,
            TransportArg::Starttls => Transport::StartTls,
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut builder = ConfigBuilder::new();
    if let Some(path) = &cli.config {
        builder = builder.with_file(path)?;
    }
    if let Some(secs) = cli.timeout {
        builder = builder.probe_timeout(Duration::from_secs(secs));
    }
    let config = builder.build()?;
    if let Some(path) = &config.loaded_config_path {
        tracing::debug!("Using configuration from {}", path);
    }
    Ok(config)
}

fn read_snapshot(path: &Path) -> Result<ConfigSnapshot> {
    let json = if path == Path::new("-") {
        let mut json = String::new();
        std::io::stdin()
            .read_to_string(&mut json)
            .context("Failed to read snapshot from stdin")?;
        json
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot '{}'", path.display()))?
    };
    ConfigSnapshot::from_json(&json)
        .with_context(|| format!("Invalid snapshot '{}'", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(&cli)?;

    match &cli.command {
        Commands::Check { snapshot } => {
            let snapshot = read_snapshot(snapshot)?;
            let checker = SanityChecker::from_config(&config)?;
            print_json(&checker.check(&snapshot).await)
        }
        Commands::Domains { snapshot } => {
            let snapshot = read_snapshot(snapshot)?;
            let checker = SanityChecker::from_config(&config)?;
            print_json(&checker.check_domains(&snapshot).await)
        }
        Commands::Config { snapshot } => {
            let snapshot = read_snapshot(snapshot)?;
            let checker = SanityChecker::from_config(&config)?;
            print_json(&checker.check_config(&snapshot).await)
        }
        Commands::Probe {
            protocol,
            transport,
            port,
            host,
        } => {
            let prober = NetworkProber::from_config(&config);
            let capabilities = prober
                .probe_server(host, (*protocol).into(), (*transport).into(), *port)
                .await;
            print_json(&capabilities)
        }
    }
}
