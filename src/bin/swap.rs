//! launcher-swap: replaces the launcher executable once it has exited.
//!
//! Started by `launcher-update` with:
//!   launcher-swap --pid <PID> --src <STAGED> --dst <DESTINATION> [--ready-file <PATH>]
//!
//! The launcher's stdio is gone by the time this runs, so logs also go to
//! `--log-file` (default `launcher-swap.log` in the temp directory).

use clap::Parser;
use launcher_update::swap::{SwapExecutor, SwapExitCode, SwapRequest};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a staged DailyGameLauncher build after the launcher exits.
#[derive(Parser, Debug)]
#[command(name = "launcher-swap")]
#[command(author, version, about, long_about = None)]
struct SwapArgs {
    /// Launcher process to wait for.
    #[arg(long)]
    pid: u32,

    /// Staged replacement executable.
    #[arg(long)]
    src: PathBuf,

    /// Executable to replace and relaunch.
    #[arg(long)]
    dst: PathBuf,

    /// Marker written once this process is running.
    #[arg(long)]
    ready_file: Option<PathBuf>,

    /// Seconds to wait for the launcher to exit.
    #[arg(long, default_value = "60")]
    wait_timeout_secs: u64,

    /// Log file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log level.
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,
}

fn init_tracing(args: &SwapArgs) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    let log_path = args
        .log_file
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("launcher-swap.log"));
    let file_layer = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok()
        .map(|file| {
            fmt::layer()
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
        });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match SwapArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                SwapExitCode::Usage.into()
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_tracing(&args);
    info!("launcher-swap v{}", env!("CARGO_PKG_VERSION"));

    let request = SwapRequest {
        pid: args.pid,
        source: args.src,
        destination: args.dst,
        ready_file: args.ready_file,
        wait_timeout: Duration::from_secs(args.wait_timeout_secs),
    };

    let code = SwapExecutor::default().run(&request).await;
    info!("Finished with {code:?}");
    code.into()
}
