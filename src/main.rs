use anyhow::{Context, Result, bail};
use bytes::Bytes;
use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::fs::File;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use dxlink_lib::attach::{TelemetrySink, attach_all_monitors, write_test_configuration};
use dxlink_lib::bytes_util::{bytes_to_base64, format_hex, parse_hex};
use dxlink_lib::capabilities::Capabilities;
use dxlink_lib::channel;
use dxlink_lib::codec::{
    BatteryStatus, DetectionMode, EquipmentStatus, HeatingTime, PreTestFailures, PreTestStatus, TemperatureBlock,
    TestConfiguration,
};
use dxlink_lib::config::LinkConfig;
use dxlink_lib::frame::{StatusFrame, TestType};
use dxlink_lib::peer::{MockPeer, shared_peer};
use dxlink_lib::transport::{TransportKind, build_transport};
use dxlink_lib::{HardwareService, Transport};

/// Operator tool for the analyzer's telemetry and control link.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
    /// JSON configuration file (transports, poll intervals).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Optional path to a file to write logs to, in addition to the console.
    #[arg(short, long, global = true)]
    log_file: Option<PathBuf>,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream status frames from the built-in simulator.
    Simulate {
        /// Stop after this many seconds; runs until Ctrl-C otherwise.
        #[arg(short, long)]
        seconds: Option<u64>,
        /// Print each status as a JSON line.
        #[arg(long)]
        json: bool,
        /// Assay the simulator should report.
        #[arg(long, value_enum)]
        assay: Option<Assay>,
    },
    /// Stream status frames from a network-simulated instrument.
    Watch {
        /// WebSocket URL or host:port; overrides the configuration file.
        #[arg(short, long)]
        url: Option<String>,
        #[arg(short, long)]
        seconds: Option<u64>,
        #[arg(long)]
        json: bool,
    },
    /// Decode a 13-byte status frame given as hex.
    Decode {
        /// Hex bytes; spaces, colons and a 0x prefix are accepted.
        hex: String,
    },
    /// Encode a test configuration payload.
    EncodeConfig {
        #[arg(short, long)]
        temperature: f64,
        #[arg(short, long)]
        minutes: f64,
        #[arg(short, long)]
        fluorimetric: bool,
    },
    /// Attach every channel monitor to an in-memory instrument.
    DemoPeer {
        #[arg(short, long, default_value_t = 5)]
        seconds: u64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Assay {
    Cinomose,
    IbvGeral,
    IbvEspecifico,
}

impl From<Assay> for TestType {
    fn from(assay: Assay) -> Self {
        match assay {
            Assay::Cinomose => TestType::Cinomose,
            Assay::IbvGeral => TestType::IbvGeral,
            Assay::IbvEspecifico => TestType::IbvEspecifico,
        }
    }
}

fn setup_logging(log_file_path: Option<PathBuf>, verbosity: &Verbosity<InfoLevel>) -> Result<Option<WorkerGuard>> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time();

    let (file_layer, guard) = if let Some(ref path) = log_file_path {
        let log_file =
            File::create(path).with_context(|| format!("Failed to create log file at: {}", path.display()))?;
        let (non_blocking_writer, guard) = tracing_appender::non_blocking(log_file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking_writer)
            .with_ansi(false)
            .with_target(true);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    // INFO by default, DEBUG with -v; RUST_LOG still wins per target
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    if let Some(path) = log_file_path {
        info!("Logging to file: {}", path.display());
    }

    Ok(guard)
}

fn load_config(path: Option<&PathBuf>) -> Result<LinkConfig> {
    match path {
        Some(path) => {
            LinkConfig::load(path).with_context(|| format!("Failed to load configuration from {}", path.display()))
        }
        None => Ok(LinkConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = setup_logging(cli.log_file.clone(), &cli.verbose)?;

    if let Err(e) = run(cli).await {
        error!("{e:?}");
        process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Simulate { seconds, json, assay } => {
            let transport = build_transport(TransportKind::Simulator, &config)?;
            stream_status(transport, seconds, json, assay.map(TestType::from)).await
        }
        Command::Watch { url, seconds, json } => {
            if !Capabilities::detect().network_transport {
                bail!("this build has no network transport (enable the `websocket` feature)");
            }
            if url.is_some() {
                config.network_url = url;
            }
            config.validate()?;
            let transport = build_transport(TransportKind::Network, &config)?;
            stream_status(transport, seconds, json, None).await
        }
        Command::Decode { hex } => decode(&hex),
        Command::EncodeConfig {
            temperature,
            minutes,
            fluorimetric,
        } => {
            let detection = if fluorimetric {
                DetectionMode::Fluorimetric
            } else {
                DetectionMode::Colorimetric
            };
            let payload = TestConfiguration::new(temperature, minutes, detection).encode();
            println!("hex:    {}", format_hex(&payload));
            println!("base64: {}", bytes_to_base64(&payload));
            Ok(())
        }
        Command::DemoPeer { seconds } => demo_peer(&config, Duration::from_secs(seconds)).await,
    }
}

/// Resolve after `seconds`, or on Ctrl-C.
async fn wait_for_exit(seconds: Option<u64>) {
    let deadline = async {
        match seconds {
            Some(s) => tokio::time::sleep(Duration::from_secs(s)).await,
            None => std::future::pending().await,
        }
    };
    tokio::select! {
        _ = signal::ctrl_c() => info!("Interrupted, shutting down"),
        _ = deadline => {}
    }
}

fn print_status(status: &StatusFrame, json: bool) {
    if json {
        match serde_json::to_string(status) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!("Failed to serialize status: {e}"),
        }
    } else {
        println!("{status}");
    }
}

async fn stream_status(
    transport: Arc<dyn Transport>,
    seconds: Option<u64>,
    json: bool,
    assay: Option<TestType>,
) -> Result<()> {
    let kind = transport.kind();
    let service = HardwareService::new();
    service.on_status(move |status| print_status(status, json));
    service.on_parse_error(|e| warn!("Discarded frame: {e}"));

    service
        .connect(transport)
        .await
        .with_context(|| format!("Failed to connect the {kind} transport"))?;

    if let Some(test_type) = assay {
        let request = StatusFrame {
            test_type,
            ..Default::default()
        };
        service.send_status(&request).await.context("Failed to select assay")?;
    }

    wait_for_exit(seconds).await;
    service.shutdown().await?;
    Ok(())
}

fn decode(hex: &str) -> Result<()> {
    let bytes = parse_hex(hex).context("Invalid hex input")?;
    let status = StatusFrame::parse(&bytes)?;
    println!("{status}");
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

struct PrintSink;

impl TelemetrySink for PrintSink {
    fn battery(&self, value: BatteryStatus) {
        let flag = if value.is_low() { " (low)" } else { "" };
        println!("battery           {value}{flag}");
    }

    fn block_temperature(&self, value: TemperatureBlock) {
        println!("block temperature {value}");
    }

    fn heating_time(&self, value: HeatingTime) {
        println!("heating time      {value}");
    }

    fn equipment_status(&self, value: EquipmentStatus) {
        println!("equipment         {value}");
    }

    fn pre_test_status(&self, value: PreTestStatus) {
        println!("pre-test          {}", value.phase());
    }

    fn pre_test_failures(&self, value: PreTestFailures) {
        if value.any() {
            let wells: Vec<u8> = value.failed_well_indices().collect();
            println!("pre-test failures {value:?} wells {wells:?}");
        }
    }

    fn message(&self, text: String) {
        info!("{text}");
    }
}

async fn demo_peer(config: &LinkConfig, run_for: Duration) -> Result<()> {
    let mock = MockPeer::single_io("demo-analyzer")
        .with_channel(channel::BATTERY_LEVEL, vec![92])
        .with_channel(channel::BLOCK_TEMPERATURE, TemperatureBlock { celsius: 24.0 }.to_bytes().to_vec())
        .with_channel(channel::BLOCK_HEATING_TIME, vec![0, 0])
        .with_channel(channel::EQUIPMENT_STATUS, vec![u8::from(EquipmentStatus::Standby)])
        .with_channel(channel::PRE_TEST_STATUS, vec![0b100])
        .with_channel(channel::PRE_TEST_FAILURE, vec![0, 0])
        .with_channel(channel::TEST_CONFIGURATION, vec![0, 0]);
    let peer = shared_peer(mock.clone());

    let sink: Arc<dyn TelemetrySink> = Arc::new(PrintSink);
    let on_message: dxlink_lib::access::MessageFn = Arc::new(|text: String| info!("{text}"));

    let config_written = write_test_configuration(
        peer.as_ref(),
        &TestConfiguration::new(65.0, 15.0, DetectionMode::Fluorimetric),
        &on_message,
    )
    .await?;
    if !config_written {
        bail!("demo peer refused the test configuration");
    }

    let subs = attach_all_monitors(&peer, &config.poll, sink).await;
    info!(monitors = subs.len(), "Demo running for {:?}", run_for);

    // Heat the block and start the analysis while the monitors poll
    let drift = {
        let mock = mock.clone();
        tokio::spawn(async move {
            let mut celsius = 24.0f32;
            mock.set_value(&channel::EQUIPMENT_STATUS, vec![u8::from(EquipmentStatus::Analysis)]);
            mock.set_value(&channel::PRE_TEST_STATUS, vec![0b001]);
            loop {
                tokio::time::sleep(Duration::from_millis(500)).await;
                celsius = (celsius + 4.0).min(65.0);
                mock.notify(&channel::BLOCK_TEMPERATURE, Bytes::copy_from_slice(&celsius.to_be_bytes()));
            }
        })
    };

    wait_for_exit(Some(run_for.as_secs())).await;
    drift.abort();

    // Dropping the link stops every monitor on its own
    mock.disconnect();
    tokio::time::sleep(Duration::from_millis(50)).await;
    subs.stop();
    info!(writes = mock.writes().len(), reads = mock.read_count(), "Demo finished");
    Ok(())
}
