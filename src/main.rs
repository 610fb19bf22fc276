//! waybar-eyes CLI
//!
//! Presence-driven eye counter for waybar.

use anyhow::{bail, Context};
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use waybar_eyes::{
    config::parse_bool_flag,
    pidfile::{self, PidFile},
    reset::forward_signals,
    trigger_channel, waybar_module_snippet, CommandDetector, Config, Debouncer, DetectionError,
    IndicatorState, JsonFileSink, PresenceSource, Renderer, ResetListener, Scheduler,
    SchedulerTiming, SharedIndicator, VERSION,
};

#[derive(Parser)]
#[command(name = "waybar-eyes")]
#[command(version = VERSION)]
#[command(about = "Presence-driven eye counter for waybar", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch the camera and keep the waybar payload up to date
    Run {
        /// Camera device index passed to the detector
        device: Option<u32>,

        /// Cascade classifier file passed to the detector
        classifier: Option<PathBuf>,

        /// Where to write the waybar payload
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Print every payload to stdout and skip the warm-up delay
        #[arg(long)]
        debug: bool,

        /// Skip the warm-up delay before the first poll
        #[arg(long)]
        fast_start: bool,
    },

    /// Clear the eyes of the running daemon
    Reset,

    /// Show the last published payload
    Status,

    /// Show configuration
    Config {
        /// Write the default configuration file if none exists
        #[arg(long)]
        init: bool,
    },

    /// Print the waybar module definition
    Waybar,
}

fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(Config::config_path);

    let result = match cli.command {
        Commands::Run {
            device,
            classifier,
            output,
            debug,
            fast_start,
        } => cmd_run(
            &config_path,
            RunOverrides {
                device,
                classifier,
                output,
                debug,
                fast_start,
            },
        ),
        Commands::Reset => cmd_reset(&config_path),
        Commands::Status => cmd_status(&config_path),
        Commands::Config { init } => cmd_config(&config_path, init),
        Commands::Waybar => cmd_waybar(&config_path),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

/// Command-line values that take precedence over the config file.
struct RunOverrides {
    device: Option<u32>,
    classifier: Option<PathBuf>,
    output: Option<PathBuf>,
    debug: bool,
    fast_start: bool,
}

impl RunOverrides {
    fn apply(self, config: &mut Config) {
        if let Some(device) = self.device {
            config.detector.device = device;
        }
        if let Some(classifier) = self.classifier {
            config.detector.classifier = classifier;
        }
        if let Some(output) = self.output {
            config.output_path = output;
        }
        let env_debug = env::var("DEBUG")
            .map(|value| parse_bool_flag(&value))
            .unwrap_or(false);
        config.debug |= self.debug || env_debug;
        config.fast_start |= self.fast_start;
    }
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    Config::load_from(path).with_context(|| format!("Could not load {}", path.display()))
}

fn cmd_run(config_path: &Path, overrides: RunOverrides) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    overrides.apply(&mut config);
    init_logging(config.debug);
    config.validate()?;

    info!(
        version = VERSION,
        output = %config.output_path.display(),
        device = config.detector.device,
        classifier = %config.detector.classifier.display(),
        "waybar-eyes starting"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Could not start async runtime")?;
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);

    let exit = runtime.block_on(async {
        // Handlers go in before the PID file exists, so `reset` can never
        // hit the default SIGUSR1 action. Signals caught during the probe
        // are queued until the listener runs.
        let (trigger_tx, trigger_rx) = trigger_channel();
        let forwarder = forward_signals(trigger_tx).context("Could not install signal handlers")?;

        let _pid_file = PidFile::create(&config.pid_path)?;

        let mut detector = CommandDetector::new(&config.detector);
        match detector.detect() {
            Ok(detection) => info!(faces = detection.face_count, "Detector ready"),
            Err(DetectionError::Unavailable(e)) => bail!("Presence detector unavailable: {e}"),
            Err(e) => warn!(error = %e, "Detector probe failed; continuing"),
        }

        let indicator = Arc::new(
            SharedIndicator::new(
                IndicatorState::new(
                    config.max_count,
                    config.min_increment_interval,
                    Instant::now(),
                ),
                Renderer::new(config.glyph.clone()),
                Arc::new(JsonFileSink::new(&config.output_path)),
                config.reset_policy,
            )
            .with_echo(config.debug),
        );

        let scheduler = Scheduler::new(
            Debouncer::new(detector, config.debounce_retries, config.debounce_delay),
            Arc::clone(&indicator),
            SchedulerTiming::from_config(&config),
            shutdown_rx,
        );

        // Detached: a detector call may be blocking when we exit.
        let _scheduler = scheduler
            .spawn()
            .context("Could not start scheduler thread")?;

        let exit = ResetListener::new(indicator, trigger_rx, config.reset_pause)
            .run()
            .await;
        forwarder.abort();
        anyhow::Ok(exit)
    })?;

    let _ = shutdown_tx.try_send(());
    info!(?exit, "waybar-eyes stopped");
    Ok(())
}

#[cfg(unix)]
fn cmd_reset(config_path: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let pid = pidfile::send_reset(&config.pid_path)?;
    println!("Reset sent to waybar-eyes (pid {pid}).");
    Ok(())
}

#[cfg(not(unix))]
fn cmd_reset(_config_path: &Path) -> anyhow::Result<()> {
    bail!("reset requires a Unix platform")
}

fn cmd_status(config_path: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    println!("waybar-eyes Status");
    println!("==================");
    println!();

    let running = pidfile::read_pid(&config.pid_path)
        .ok()
        .filter(|&pid| pidfile::is_pid_alive(pid));
    match running {
        Some(pid) => println!("Daemon: running (pid {pid})"),
        None => println!("Daemon: not running"),
    }
    println!("Output file: {}", config.output_path.display());
    println!();

    if !config.output_path.exists() {
        println!("No payload published yet.");
        return Ok(());
    }

    let payload = JsonFileSink::read(&config.output_path)
        .with_context(|| format!("Could not read {}", config.output_path.display()))?;
    println!("Eyes: {} / {}", payload.count, config.max_count);
    println!("Class: {}", payload.class);
    println!("Text: {}", payload.text);

    if let Ok(modified) = std::fs::metadata(&config.output_path).and_then(|m| m.modified()) {
        let modified: DateTime<Local> = modified.into();
        println!("Updated: {}", modified.format("%Y-%m-%d %H:%M:%S"));
    }

    Ok(())
}

fn cmd_config(config_path: &Path, init: bool) -> anyhow::Result<()> {
    if init {
        if config_path.exists() {
            bail!("{} already exists", config_path.display());
        }
        Config::default().save_to(config_path)?;
        println!("Wrote default configuration to {}", config_path.display());
        return Ok(());
    }

    let config = load_config(config_path)?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {}", config_path.display());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_waybar(config_path: &Path) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    println!("{}", waybar_module_snippet(&config.output_path));
    Ok(())
}

/// Logs go to stderr; stdout carries payloads in debug mode.
fn init_logging(debug: bool) {
    let rust_log = env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(debug, rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .init();
}

/// `RUST_LOG` wins when set and valid; otherwise debug mode picks the level.
fn log_filter(debug: bool, rust_log: Option<&str>) -> EnvFilter {
    let default_level = if debug { "debug" } else { "info" };
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_level))
}
