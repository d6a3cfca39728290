use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use workshop_scanner::{
    spawn_signal_handlers, CameraSourceBuilder, CatalogResolver, CodeDecoder, EventBus,
    EventBusPresenter, EventFilter, EventReceiver, FrameData, HttpResolver, KeyboardInputHandler,
    ManualEntry, MockCameraSource, QrDecoder, ResultResolver, ScanCommand, ScanCoordinator,
    ScanEvent, ScanOutcome, ScanType, ScannerConfig, SourceKind, StaticCapabilityGuard,
};

#[derive(Parser, Debug)]
#[command(name = "workshop-scanner")]
#[command(about = "Camera-driven QR scanner for the workshop management system")]
#[command(version)]
#[command(long_about = "Scans QR codes on jobs, materials and machines with a camera, \
resolves them against the workshop server and reports where to navigate. Codes can also \
be entered by hand or decoded from still images.")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "scanner.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without scanning")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the interactive scanner view (default)
    Scan(ScanArgs),

    /// Submit a code by hand and print the result
    Manual {
        /// Identifier as printed on the label, e.g. MAT-00231
        id: String,

        #[arg(long, default_value = "auto")]
        entry_type: ScanType,

        /// Resolve against the built-in catalog instead of the server
        #[arg(long)]
        offline: bool,

        /// Catalog TOML used with --offline
        #[arg(long, value_name = "FILE")]
        catalog: Option<PathBuf>,
    },

    /// Decode a still image and print the payload
    Decode {
        image: PathBuf,
    },
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
enum SourceArg {
    #[default]
    Camera,
    Mock,
    Image,
}

#[derive(Args, Debug, Default)]
struct ScanArgs {
    /// Frame source
    #[arg(long, value_enum, default_value_t = SourceArg::Camera)]
    source: SourceArg,

    /// Image served as the stream with --source image
    #[arg(long, value_name = "FILE")]
    image: Option<PathBuf>,

    /// Resolve against the built-in catalog instead of the server
    #[arg(long)]
    offline: bool,

    /// Catalog TOML used with --offline
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Type assumed for codes typed with the `m` key
    #[arg(long, default_value = "auto")]
    entry_type: ScanType,

    /// Start the camera without waiting for the `s` key
    #[arg(long)]
    auto_start: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.print_config {
        print_default_config()?;
        return Ok(ExitCode::SUCCESS);
    }

    // Held until main returns so the log file writer flushes
    let _log_guard = init_logging(&cli)?;

    info!("Starting workshop scanner v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", cli.config);

    let config = match ScannerConfig::load_from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        return Ok(ExitCode::FAILURE);
    }

    if cli.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(ExitCode::SUCCESS);
    }

    let exit_code = match cli.command.unwrap_or(Command::Scan(ScanArgs::default())) {
        Command::Scan(args) => run_scan(config, args, cli.debug).await,
        Command::Manual {
            id,
            entry_type,
            offline,
            catalog,
        } => run_manual(config, id, entry_type, offline, catalog).await,
        Command::Decode { image } => run_decode(image),
    }
    .map_err(|e| {
        error!("Scanner error: {}", e);
        e
    })?;

    info!("Workshop scanner exited with code: {}", exit_code);
    Ok(ExitCode::from(exit_code))
}

async fn run_scan(config: ScannerConfig, args: ScanArgs, debug_events: bool) -> Result<u8> {
    let kind = match args.source {
        SourceArg::Camera => SourceKind::Camera {
            index: config.camera.index,
        },
        SourceArg::Mock => SourceKind::Mock,
        SourceArg::Image => SourceKind::Image(
            args.image
                .ok_or_else(|| anyhow!("--image is required with --source image"))?,
        ),
    };
    let (guard, camera) = CameraSourceBuilder::new().kind(kind).build()?;
    let resolver = build_resolver(&config, args.offline, args.catalog.as_ref())?;

    let bus = if debug_events {
        EventBus::with_debug_logging(config.presenter.event_bus_capacity)
    } else {
        EventBus::new(config.presenter.event_bus_capacity)
    };
    let display = spawn_status_display(&bus);

    let mut coordinator = ScanCoordinator::builder()
        .guard(guard)
        .camera(camera)
        .decoder(Arc::new(QrDecoder::new()))
        .resolver(resolver)
        .presenter(Arc::new(EventBusPresenter::new(bus.clone())))
        .config(&config)
        .build()?;
    spawn_signal_handlers(coordinator.cancellation_token());

    let (commands, command_rx) = mpsc::channel(16);
    let keyboard = KeyboardInputHandler::new(commands.clone(), args.entry_type);
    keyboard.start().await?;

    if args.auto_start && commands.send(ScanCommand::Start).await.is_err() {
        warn!("Scanner stopped before auto-start");
    }

    let outcome = coordinator.run(command_rx).await;
    keyboard.stop().await?;

    let _ = bus.publish(ScanEvent::ShutdownRequested {
        reason: outcome_reason(&outcome),
        timestamp: Utc::now(),
    });

    info!("Scan statistics: {}", coordinator.stats());
    finish_display(coordinator, bus, display).await;

    Ok(match outcome {
        ScanOutcome::Navigated(_) | ScanOutcome::Closed => 0,
        ScanOutcome::Failed(_) => 2,
    })
}

async fn run_manual(
    config: ScannerConfig,
    id: String,
    entry_type: ScanType,
    offline: bool,
    catalog: Option<PathBuf>,
) -> Result<u8> {
    let resolver = build_resolver(&config, offline, catalog.as_ref())?;
    let bus = EventBus::new(config.presenter.event_bus_capacity);
    let display = spawn_status_display(&bus);

    // The camera is never opened for a manual entry
    let mut coordinator = ScanCoordinator::builder()
        .guard(Arc::new(StaticCapabilityGuard::available()))
        .camera(Arc::new(MockCameraSource::new()))
        .decoder(Arc::new(QrDecoder::new()))
        .resolver(resolver)
        .presenter(Arc::new(EventBusPresenter::new(bus.clone())))
        .config(&config)
        .build()?;

    coordinator
        .submit_manual(ManualEntry::new(id, entry_type))
        .await;

    let exit_code = match coordinator.pending_navigation() {
        Some(_) => {
            coordinator.wait_for_navigation().await;
            0
        }
        None => 2,
    };

    finish_display(coordinator, bus, display).await;
    Ok(exit_code)
}

fn run_decode(path: PathBuf) -> Result<u8> {
    let image = image::open(&path)?;
    let frame = FrameData::from_image(0, &image);
    let mut raster = Vec::new();
    frame.write_luma(&mut raster)?;

    match QrDecoder::new().decode(&raster, frame.width, frame.height) {
        Some(payload) => {
            println!("{}", payload.text);
            if let Some(bounds) = payload.bounds {
                let corners: Vec<String> = bounds
                    .corners
                    .iter()
                    .map(|p| format!("({}, {})", p.x, p.y))
                    .collect();
                println!("corners: {}", corners.join(" "));
            }
            Ok(0)
        }
        None => {
            eprintln!("No code found in {}", path.display());
            Ok(1)
        }
    }
}

fn build_resolver(
    config: &ScannerConfig,
    offline: bool,
    catalog: Option<&PathBuf>,
) -> Result<Arc<dyn ResultResolver>> {
    if !offline {
        info!("Resolving scans against {}", config.resolver.process_url());
        return Ok(Arc::new(HttpResolver::new(&config.resolver)?));
    }

    let resolver = match catalog {
        Some(path) => CatalogResolver::load(path)?,
        None => CatalogResolver::demo(),
    };
    info!("Resolving scans offline against {} catalog entries", resolver.len());
    Ok(Arc::new(resolver))
}

/// Print status events to the terminal until the bus closes
fn spawn_status_display(bus: &EventBus) -> JoinHandle<()> {
    let mut receiver = EventReceiver::new(bus.subscribe(), EventFilter::All, "terminal".to_string());

    tokio::spawn(async move {
        loop {
            match receiver.recv().await {
                // Raw mode needs an explicit carriage return
                Ok(event) => print!("[{}] {}\r\n", event.event_type(), event.description()),
                Err(workshop_scanner::error::EventBusError::Lagged { missed }) => {
                    warn!("Status display missed {} events", missed);
                }
                Err(_) => break,
            }
        }
    })
}

/// Close the bus by dropping every sender so the display drains and exits
async fn finish_display(coordinator: ScanCoordinator, bus: EventBus, display: JoinHandle<()>) {
    drop(coordinator);
    drop(bus);
    if let Err(e) = display.await {
        warn!("Status display task failed: {}", e);
    }
}

fn outcome_reason(outcome: &ScanOutcome) -> String {
    match outcome {
        ScanOutcome::Navigated(target) => format!("navigated to {}", target),
        ScanOutcome::Failed(message) => format!("scan failed: {}", message),
        ScanOutcome::Closed => "scanner closed".to_string(),
    }
}

fn init_logging(cli: &Cli) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("workshop_scanner={}", log_level)));

    let fmt_layer = match cli.log_format.as_deref() {
        Some("json") => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        Some("compact") => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        Some("pretty") | None => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(cli.debug)
            .with_file(cli.debug)
            .with_line_number(cli.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(cli.debug)
                .with_file(cli.debug)
                .with_line_number(cli.debug)
                .boxed()
        }
    };

    let (file_layer, guard) = match &cli.log_dir {
        Some(dir) => {
            let (writer, guard) = log_file_writer(dir);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(file_layer)
        .with(env_filter)
        .init();

    Ok(guard)
}

/// Non-blocking daily log file; buffered lines are written when the guard drops
fn log_file_writer(dir: &Path) -> (NonBlocking, WorkerGuard) {
    let appender = tracing_appender::rolling::daily(dir, "workshop-scanner.log");
    tracing_appender::non_blocking(appender)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Workshop scanner configuration file");
    println!("# Every key can be overridden with SCANNER__<SECTION>__<KEY>");
    println!();
    println!("{}", ScannerConfig::default().to_toml()?);
    Ok(())
}
