use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use uvc_session::{SessionOrchestrator, UvcConfig};

#[derive(Parser, Debug)]
#[command(name = "uvc-session")]
#[command(about = "Camera session controller for hot-plugged USB video devices")]
#[command(version)]
#[command(long_about = "Drives one USB camera from permission grant to live preview. \
Device and surface events are queued and applied in order by a single session worker. \
Runs against simulated devices with an interactive keyboard shell.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, help = "Path to TOML configuration file (default: uvc-session.toml)")]
    config: Option<String>,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting the session")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Number of simulated cameras plugged in at startup
    #[arg(long, value_name = "N", default_value_t = 1, help = "Number of simulated cameras attached at startup")]
    devices: u32,

    /// Run without the keyboard shell
    #[arg(long, help = "Open the selected camera on a fixed surface and run until a signal arrives")]
    headless: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    init_logging(&args)?;

    info!("Starting uvc-session v{}", env!("CARGO_PKG_VERSION"));

    let loaded = match &args.config {
        Some(path) => {
            info!("Configuration file: {}", path);
            UvcConfig::load_from_file(path)
        }
        None => UvcConfig::load(),
    };

    let config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            if args.validate_config {
                eprintln!("✗ Configuration validation failed: {}", e);
                std::process::exit(1);
            }
            return Err(e.into());
        }
    };

    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let mut orchestrator = SessionOrchestrator::new(config).with_device_count(args.devices);
    orchestrator.set_keyboard_enabled(!args.headless);

    orchestrator.start().await.map_err(|e| {
        error!("Failed to start session: {}", e);
        e
    })?;

    let exit_code = orchestrator.run().await.map_err(|e| {
        error!("Session error during execution: {}", e);
        e
    })?;

    info!("uvc-session exited with code: {}", exit_code);
    std::process::exit(exit_code);
}

fn init_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("uvc_session={}", log_level)));

    let fmt_layer = match args.log_format.as_deref() {
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
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        Some(format) => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();

    Ok(())
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# uvc-session configuration file");
    println!("# Every key is optional; values can also be set with UVC_<SECTION>__<KEY>");
    println!();
    println!("{}", UvcConfig::default().to_toml()?);
    Ok(())
}
