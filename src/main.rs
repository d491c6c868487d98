use facelock::{
    camera::Camera,
    cli::{AsciiPreview, ConsoleLogWriter, KeyboardQuit, TerminalSession},
    common::{Config, Paths},
    core::{
        capture_encodings, AccessController, ActuationCoordinator, CredentialVerifier,
        FramePipeline, FrameView, IdentityResolver, NullView, OnnxFaceEncoder,
    },
    hardware::{Actuator, ConsoleKeypad, LoggingActuator, SysfsGpioActuator, TerminalLcd},
    notify::{LogNotifier, Notifier, WebhookNotifier},
    storage::RecordStore,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "facelock")]
#[command(about = "Two-factor (face + code) lock controller")]
struct Cli {
    /// Enable development mode (config and data under ./dev_data)
    #[arg(long, global = true)]
    dev: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the run mode's default
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the access controller until `q` is pressed
    Run,
    /// Add reference encodings for an identity
    Enroll {
        #[arg(short, long)]
        label: String,
        /// Number of captures
        #[arg(short = 'n', long, default_value = "5")]
        captures: usize,
        /// Delay between captures in milliseconds
        #[arg(short, long, default_value = "500")]
        interval_ms: u64,
    },
    /// List enrolled identities
    List,
    /// Remove every encoding for an identity
    Remove {
        #[arg(short, long)]
        label: String,
    },
    /// List V4L2 cameras and the auto-detected choice
    DetectCamera,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // `run` owns the terminal in raw mode.
    let raw_mode = matches!(cli.command, Commands::Run);
    setup_logging(cli.dev || cli.verbose, cli.dev, raw_mode);

    let paths = Paths::new(cli.dev)?;

    match cli.command {
        Commands::DetectCamera => detect_camera(),
        Commands::List => {
            let config = load_config(&cli.config, &paths)?;
            list_identities(&record_store(&config, &paths))
        }
        Commands::Remove { label } => {
            let config = load_config(&cli.config, &paths)?;
            remove_identity(&record_store(&config, &paths), &label)
        }
        Commands::Enroll { label, captures, interval_ms } => {
            let config = load_config(&cli.config, &paths)?;
            enroll(&config, &paths, &label, captures, Duration::from_millis(interval_ms))
        }
        Commands::Run => {
            let config = load_config(&cli.config, &paths)?;
            run(&config, &paths)
        }
    }
}

fn load_config(explicit: &Option<PathBuf>, paths: &Paths) -> Result<Config> {
    let path = explicit.clone().unwrap_or_else(|| paths.config_file());
    Config::load_from_path(&path).with_context(|| format!("loading {}", path.display()))
}

fn record_store(config: &Config, paths: &Paths) -> RecordStore {
    RecordStore::new(
        config
            .storage
            .encodings_path
            .clone()
            .unwrap_or_else(|| paths.encodings_file()),
    )
}

fn run(config: &Config, paths: &Paths) -> Result<()> {
    // Fatal startup checks first: records, models, camera.
    let records = record_store(config, paths).load()?;
    let resolver = IdentityResolver::new(records, config.recognizer.match_threshold);
    let encoder = OnnxFaceEncoder::new(config, &paths.models_dir())?;
    let camera = Camera::open(&config.camera)?;

    let actuator: Box<dyn Actuator> = match config.actuation.gpio_pin {
        Some(pin) => Box::new(SysfsGpioActuator::new(pin, config.actuation.active_low)?),
        None => {
            tracing::warn!("No gpio_pin configured; lock actions are logged only");
            Box::new(LoggingActuator::default())
        }
    };
    let notifier: Box<dyn Notifier> = match &config.notification.webhook_url {
        Some(url) => Box::new(WebhookNotifier::new(
            url,
            Duration::from_secs(config.notification.timeout_seconds),
        )?),
        None => Box::new(LogNotifier),
    };
    let coordinator = ActuationCoordinator::new(actuator, notifier, (&config.actuation).into())?;

    let controller = AccessController::new(
        config.auth.reference_credential_id,
        config.auth.rearm,
        CredentialVerifier::new(config.auth.identity_codes.clone()),
        Box::new(TerminalLcd::new(config.display.columns, config.display.rows)),
        Box::new(ConsoleKeypad::new(config.auth.prompt_timeout())),
        coordinator,
    );

    let view: Box<dyn FrameView> = if config.display.preview {
        Box::new(AsciiPreview::new(config.display.ascii_width, config.display.ascii_height))
    } else {
        Box::new(NullView)
    };

    let terminal = TerminalSession::start()?;
    let session = camera.start_session()?;
    let mut pipeline = FramePipeline::new(
        session,
        encoder,
        resolver,
        controller,
        view,
        Box::new(KeyboardQuit),
    );

    let summary = pipeline.run()?;
    // Lock and stop the camera before handing the terminal back.
    drop(pipeline);
    drop(terminal);

    println!("[INFO] elapsed time: {:.2}", summary.elapsed.as_secs_f64());
    println!("[INFO] approx. FPS: {:.2}", summary.fps());
    println!("[INFO] attempts: {}, unlocks: {}", summary.attempts, summary.unlocks);
    Ok(())
}

fn enroll(config: &Config, paths: &Paths, label: &str, captures: usize, interval: Duration) -> Result<()> {
    let label = label.trim();
    if label.is_empty() {
        anyhow::bail!("Label must not be empty");
    }

    let store = record_store(config, paths);
    let mut records = store.load_or_default()?;

    let mut encoder = OnnxFaceEncoder::new(config, &paths.models_dir())?;
    let camera = Camera::open(&config.camera)?;
    let mut session = camera.start_session()?;

    println!("Enrolling {}: look at the camera...", label);
    let encodings = capture_encodings(&mut session, &mut encoder, captures, captures * 20, interval)?;

    records.add_encodings(label, encodings);
    store.save(&records)?;
    println!("✅ Enrolled {} ({} encodings) into {}", label, captures, store.path().display());
    Ok(())
}

fn list_identities(store: &RecordStore) -> Result<()> {
    let records = store.load_or_default()?;
    if records.is_empty() {
        println!("No identities enrolled in {}", store.path().display());
        return Ok(());
    }

    for (label, count) in records.labels() {
        println!("{:<24} {} encodings", label, count);
    }
    Ok(())
}

fn remove_identity(store: &RecordStore, label: &str) -> Result<()> {
    let mut records = store.load_or_default()?;
    let removed = records.remove_label(label);
    if removed == 0 {
        anyhow::bail!("No identity named {} in {}", label, store.path().display());
    }

    store.save(&records)?;
    println!("Removed {} encodings for {}", removed, label);
    Ok(())
}

fn detect_camera() -> Result<()> {
    let cameras = Camera::list_all_cameras()?;
    if cameras.is_empty() {
        println!("❌ No cameras found! Check /dev/video* permissions.");
        return Ok(());
    }

    for camera in &cameras {
        println!("📷 /dev/video{}: {}", camera.index, camera.name);
        for feature in &camera.features {
            println!("   - {}", feature);
        }
    }

    let selected = Camera::detect_ir_camera()?;
    println!("\nAuto-detect (device_index = 999) picks /dev/video{}", selected);
    Ok(())
}

fn setup_logging(debug: bool, dev_mode: bool, raw_mode: bool) {
    let builder = tracing_subscriber::fmt().with_writer(move || ConsoleLogWriter::stderr(raw_mode));
    if dev_mode {
        builder
            .with_max_level(tracing::Level::DEBUG)
            .with_file(true)
            .with_line_number(true)
            .init();
    } else if debug {
        builder.with_max_level(tracing::Level::DEBUG).init();
    } else {
        builder.with_max_level(tracing::Level::INFO).init();
    }
}
