//! shelltrace CLI Application
//!
//! Command-line front end for the shelltrace-core library. It adds:
//! - Argument parsing and the privilege check
//! - Live kernel process events (Linux proc connector) or replay from file
//! - Text/JSON reporting on stdout
//! - Ctrl+C handling that tears the event subscription down cleanly

use anyhow::{bail, Context, Result};
use clap::Parser;
use shelltrace_core::{Monitor, MonitorConfig, MonitorStats, Pid};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

mod config;
mod privilege;
mod report;
mod sources;

use config::{AppConfig, OutputFormat};

/// shelltrace - Follow a process tree and recover the commands its shells run
#[derive(Parser, Debug)]
#[command(name = "shelltrace")]
#[command(about = "Track descendants of a process and recover shell commands", long_about = None)]
#[command(version)]
struct Args {
    /// PID of the process whose descendants are monitored
    #[arg(value_name = "ROOT_PID")]
    root_pid: Pid,

    /// Replay recorded events (JSON lines) instead of tracing live
    #[arg(long, value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format (overrides the configuration file)
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Shell executable name to classify (overrides the configuration file)
    #[arg(long, value_name = "NAME")]
    shell: Option<String>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all log output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::debug!("shelltrace v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Using core library v{}", shelltrace_core::VERSION);

    let mut app_config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };
    if let Some(shell) = &args.shell {
        app_config.extractor.shell_executable = shell.clone();
    }
    let format = args.format.unwrap_or(app_config.output.format);

    let monitor_config =
        MonitorConfig::new(args.root_pid).with_extractor(app_config.extractor.clone());
    let mut monitor = Monitor::new(&monitor_config).context("Invalid monitor configuration")?;

    let stop = Arc::new(AtomicBool::new(false));
    let flag = stop.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl+C handler")?;

    let mut reporter = report::stdout_reporter(format);

    let stats = match &args.replay {
        Some(path) => {
            let mut source = sources::ReplaySource::open(path)
                .with_context(|| format!("Failed to open replay file: {:?}", path))?;
            monitor.run(&mut source, reporter.as_mut(), &stop)?
        }
        None => {
            if !privilege::is_elevated() {
                bail!("live tracing must be run with administrator (root) privileges");
            }

            log::info!(
                "Monitoring process tree of root PID {} (press Ctrl+C to stop)",
                args.root_pid
            );
            let mut source = sources::open_live(app_config.source.receive_timeout())
                .context("Failed to start process tracing session")?;
            monitor.run(source.as_mut(), reporter.as_mut(), &stop)?
        }
    };

    log_summary(&stats, monitor.tree().len());
    Ok(())
}

fn log_summary(stats: &MonitorStats, remaining: usize) {
    log::info!(
        "Session finished: {} events, {} joined, {} left, {} commands classified, {} ignored",
        stats.events,
        stats.joined,
        stats.left,
        stats.classified,
        stats.ignored
    );
    log::debug!(
        "{} exec events from members, {} PIDs still tracked",
        stats.member_execs,
        remaining
    );
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
