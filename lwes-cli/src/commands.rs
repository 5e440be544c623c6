use std::ops::ControlFlow;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use lwes_config::LwesConfig;
use lwes_listener::{Listener, ListenerError};
use lwes_protocol::{DecodeMode, Decoder, Event};
use lwes_telemetry::{logging, MetricsRecorder};
use tracing::{debug, error, info, instrument, warn};

use crate::error::CliError;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// Configuration file (defaults to config/lwes.yaml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Listen for events on a unicast address or multicast group
    Listen(ListenArgs),
    /// Decode a single datagram given as hex or read from a file
    Decode(DecodeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ListenArgs {
    #[arg(short, long)]
    pub address: Option<String>,
    #[arg(short, long)]
    pub port: Option<u16>,
    /// Local interface address for multicast group membership
    #[arg(short, long)]
    pub interface: Option<String>,
    /// Reject malformed datagrams instead of keeping partial events
    #[arg(long)]
    pub strict: bool,
    /// Stop after this many events
    #[arg(short = 'n', long, value_parser = clap::value_parser!(u64).range(1..))]
    pub count: Option<u64>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Print Prometheus metrics when the listener stops
    #[arg(long)]
    pub metrics: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DecodeArgs {
    /// Datagram as a hex string
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub hex: Option<String>,
    /// File holding one raw datagram
    #[arg(long)]
    pub file: Option<PathBuf>,
    #[arg(long)]
    pub strict: bool,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

pub async fn run_command(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => LwesConfig::load_from_path(path)?,
        None => LwesConfig::load()?,
    };
    logging::init(&config.telemetry);
    debug!(?config, "Configuration loaded");

    match cli.command {
        Commands::Listen(args) => run_listen(config, args).await,
        Commands::Decode(args) => run_decode(args),
    }
}

fn apply_overrides(config: &mut LwesConfig, args: &ListenArgs) {
    let listener = &mut config.listener;
    if let Some(address) = &args.address {
        listener.address = address.clone();
    }
    if let Some(port) = args.port {
        listener.port = port;
    }
    if let Some(interface) = &args.interface {
        listener.interface = Some(interface.clone());
    }
    if args.strict {
        listener.decode_mode = DecodeMode::Strict;
    }
}

#[instrument(skip_all)]
async fn run_listen(mut config: LwesConfig, args: ListenArgs) -> Result<(), CliError> {
    apply_overrides(&mut config, &args);
    let metrics = MetricsRecorder::new()?;
    let listener = Listener::from_config(&config.listener)?;
    let closer = listener.closer();
    info!(
        address = %config.listener.address,
        port = config.listener.port,
        mode = %config.listener.decode_mode,
        "Listening for events"
    );

    // The receive loop blocks, so it runs off the async runtime.
    let mut task = tokio::task::spawn_blocking({
        let metrics = metrics.clone();
        let format = args.format;
        let limit = args.count;
        move || {
            let mut delivered = 0u64;
            listener.for_each(|result| {
                match result {
                    Ok(event) => {
                        metrics.record_event(&event);
                        if let Err(e) = print_event(&event, format) {
                            warn!("Failed to print event: {e}");
                        }
                        delivered += 1;
                    }
                    Err(err @ ListenerError::Decode(_)) => {
                        metrics.inc_decode_errors();
                        warn!("{err}");
                    }
                    Err(ListenerError::Transport(err)) => {
                        metrics.inc_transport_errors();
                        error!("Receive failed: {err}");
                    }
                    Err(err) => debug!("{err}"),
                }
                match limit {
                    Some(limit) if delivered >= limit => ControlFlow::Break(()),
                    _ => ControlFlow::Continue(()),
                }
            });
            delivered
        }
    });

    let delivered = tokio::select! {
        delivered = &mut task => delivered?,
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!("Failed to listen for Ctrl-C: {e}");
            }
            info!("Shutting down listener");
            closer.close();
            task.await?
        }
    };

    info!(delivered, "Listener stopped");
    if args.metrics {
        print!("{}", metrics.gather_metrics()?);
    }
    Ok(())
}

fn run_decode(args: DecodeArgs) -> Result<(), CliError> {
    let data = match (&args.hex, &args.file) {
        (Some(hex), _) => hex::decode(hex.trim())?,
        (None, Some(path)) => std::fs::read(path)?,
        (None, None) => Vec::new(),
    };
    let mode = if args.strict {
        DecodeMode::Strict
    } else {
        DecodeMode::Lenient
    };

    let event = Decoder::with_mode(mode).decode(&data)?;
    print_event(&event, args.format)
}

fn format_event(event: &Event, format: OutputFormat) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Text => event.to_string(),
        OutputFormat::Json => serde_json::to_string(event)?,
    })
}

fn print_event(event: &Event, format: OutputFormat) -> Result<(), CliError> {
    println!("{}", format_event(event, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_listen_overrides() {
        let cli = Cli::parse_from([
            "lwes", "listen", "-a", "224.1.1.11", "-p", "9292", "-i", "10.0.0.5", "--strict",
        ]);
        let Commands::Listen(args) = cli.command else {
            panic!("expected listen");
        };
        let mut config = LwesConfig::default();
        apply_overrides(&mut config, &args);

        assert_eq!(config.listener.address, "224.1.1.11");
        assert_eq!(config.listener.port, 9292);
        assert_eq!(config.listener.interface.as_deref(), Some("10.0.0.5"));
        assert_eq!(config.listener.decode_mode, DecodeMode::Strict);
    }

    #[test]
    fn test_listen_count_must_be_positive() {
        let err = Cli::try_parse_from(["lwes", "listen", "--count", "0"])
            .err()
            .expect("zero count accepted");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);

        let cli = Cli::try_parse_from(["lwes", "listen", "-n", "1"]).unwrap();
        let Commands::Listen(args) = cli.command else {
            panic!("expected listen");
        };
        assert_eq!(args.count, Some(1));
    }

    #[test]
    fn test_format_event() {
        let data = hex::decode("0450696e670000").unwrap();
        let event = Decoder::new().decode(&data).unwrap();
        assert_eq!(format_event(&event, OutputFormat::Text).unwrap(), "Ping {}");
        assert_eq!(
            format_event(&event, OutputFormat::Json).unwrap(),
            r#"{"name":"Ping","attributes":{}}"#
        );
    }

    #[test]
    fn test_json_error_converts() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = CliError::from(err);
        assert!(matches!(err, CliError::Json(_)));
        assert!(err.to_string().starts_with("JSON encoding error"));
    }

    #[test]
    fn test_decode_requires_input() {
        assert!(Cli::try_parse_from(["lwes", "decode"]).is_err());
        assert!(Cli::try_parse_from(["lwes", "decode", "--hex", "00", "--file", "x"]).is_err());
    }

    #[test]
    fn test_decode_hex() {
        let args = DecodeArgs {
            hex: Some("0450696e670000".into()),
            file: None,
            strict: true,
            format: OutputFormat::Json,
        };
        run_decode(args).unwrap();

        let truncated = DecodeArgs {
            hex: Some("0450696e67".into()),
            file: None,
            strict: true,
            format: OutputFormat::Text,
        };
        assert!(matches!(run_decode(truncated), Err(CliError::Decode(_))));
    }
}
