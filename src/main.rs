use clap::Parser;
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use headmouse::config::ConfigSource;
use headmouse::control::{run_console, socket_path, spawn_stdin_reader, ControlServerHandle};
use headmouse::output::{LoggingSink, MotionSink, MotionSinkAdapter, UinputSink};
use headmouse::sensor::{ImuRate, ReplayDriver, ReplayFormat, SampleFeed, SensorDriver};
use headmouse::sensor::sample_feed::DEFAULT_FEED_CAPACITY;
use headmouse::tracking::{HeadTracker, TrackerHandle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Head-orientation mouse daemon.
/// Moves a virtual pointer from head orientation and listens for control commands.
#[derive(Parser, Debug)]
#[command(name = "headmouse", version)]
struct Cli {
    /// Log every sample and emitted event
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    /// Configuration file read before the user and system files
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the loaded configuration to the user config file and exit
    #[arg(long, default_value_t = false)]
    save_config: bool,

    /// Orientation recording to replay, `-` for stdin.
    /// With a file, stdin takes interactive commands (`help` lists them).
    #[arg(long, default_value = "-")]
    replay: PathBuf,

    /// Recording holds raw 36-byte IMU frames instead of text angles
    #[arg(long, default_value_t = false)]
    frames: bool,

    /// Sample rate in Hz (60, 90, 120 or 240)
    #[arg(long, default_value = "120", value_parser = parse_rate)]
    rate: ImuRate,

    /// Log pointer events instead of creating a virtual device
    #[arg(long, default_value_t = false)]
    dry_run: bool,
}

fn parse_rate(value: &str) -> std::result::Result<ImuRate, String> {
    let hz: u32 = value.parse().map_err(|e| format!("{}", e))?;
    ImuRate::from_hz(hz).ok_or_else(|| format!("unsupported rate {} Hz", hz))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup(cli.debug)?;

    let config_source = ConfigSource::new(cli.config.clone());
    let (config, origin) = config_source.load();
    info!("Configuration loaded from {}", origin);

    if cli.save_config {
        let path = config_source
            .save_user(&config)
            .wrap_err("Failed to save configuration")?;
        info!("Configuration written to {}", path.display());
        return Ok(());
    }

    let sink: Box<dyn MotionSink> = if cli.dry_run {
        info!("Dry run, pointer events are only logged");
        Box::new(LoggingSink::new())
    } else {
        Box::new(UinputSink::create().wrap_err("Failed to create virtual mouse")?)
    };

    let format = if cli.frames {
        ReplayFormat::Frames
    } else {
        ReplayFormat::Angles
    };
    let mut driver =
        ReplayDriver::open(&cli.replay, format).map_err(|e| eyre!("Failed to open sensor: {}", e))?;

    let tracker = Arc::new(HeadTracker::new(config, config_source));
    let cancel = CancellationToken::new();

    let (callback, samples) = SampleFeed::bounded(DEFAULT_FEED_CAPACITY);
    let tracker_handle = TrackerHandle::spawn(
        tracker.clone(),
        samples,
        MotionSinkAdapter::new(sink),
        cancel.clone(),
    );

    driver.register(callback);
    driver
        .set_rate(cli.rate)
        .map_err(|e| eyre!("Failed to set sample rate: {}", e))?;
    driver
        .set_enabled(true)
        .map_err(|e| eyre!("Failed to start sensor {}: {}", driver.name(), e))?;

    let control = match ControlServerHandle::start(socket_path(), tracker.clone(), cancel.clone())
    {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("{}, continuing without remote control", e);
            None
        }
    };

    // Stdin carries samples when replaying from it
    if cli.replay != Path::new("-") {
        match spawn_stdin_reader() {
            Ok(lines) => {
                let console_tracker = tracker.clone();
                let console_cancel = cancel.clone();
                tokio::spawn(async move {
                    let stdout = tokio::io::stdout();
                    if let Err(e) =
                        run_console(lines, stdout, &console_tracker, console_cancel).await
                    {
                        warn!("Console stopped: {}", e);
                    }
                });
                info!("Console ready, type 'help' for commands");
            }
            Err(e) => warn!("Failed to start console: {}", e),
        }
    }

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received, shutting down"),
            Err(e) => warn!("Failed to listen for Ctrl-C: {}", e),
        }
        signal_cancel.cancel();
    });

    info!("Head tracking running");
    // Ends on Ctrl-C or when the sensor runs out of samples
    let stats = tracker_handle.wait().await;
    cancel.cancel();

    if let Some(control) = control {
        control.shutdown().await;
    }
    if let Err(e) = driver.set_enabled(false) {
        warn!("Failed to stop sensor: {}", e);
    }

    info!("Stopped after {} samples", stats.received);
    Ok(())
}

fn setup(debug: bool) -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    setup_logging_env(if debug { Level::DEBUG } else { Level::INFO });
    Ok(())
}

fn setup_logging_env(level: Level) {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
