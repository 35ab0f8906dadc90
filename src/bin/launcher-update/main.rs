//! launcher-update CLI entry point.

mod cli;

use clap::Parser;
use cli::Cli;
use launcher_update::{
    AvailableUpdate, CycleOutcome, EntryPoint, Error, HandoffCoordinator, LaunchMonitor,
    CURRENT_VERSION,
};
use std::io::{BufRead, Write};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Console stand-in for the launcher's consent dialog.
struct ConsoleMonitor {
    assume_yes: bool,
}

impl LaunchMonitor for ConsoleMonitor {
    fn offer_update(&self, update: &AvailableUpdate) -> bool {
        if self.assume_yes {
            return true;
        }

        print!(
            "New version {} is available ({}). Update now? [Y/n] ",
            update.release.version, update.asset.file_name
        );
        let _ = std::io::stdout().flush();

        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_ascii_lowercase().as_str(), "" | "y" | "yes")
    }

    fn report_error(&self, error: &Error) {
        error!("{error}");
        eprintln!("Update failed: {error}");
    }
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse CLI arguments
    let cli = Cli::parse();

    // Build configuration before logging so the file's log level applies
    let config = cli.to_config()?;

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(cli.log_json.then(|| fmt::layer().json()))
        .with((!cli.log_json).then(fmt::layer))
        .with(filter)
        .init();

    info!("launcher-update {CURRENT_VERSION}");

    // The entry point is fixed for the whole run
    let entry = EntryPoint::resolve(&config.entry)?;
    let monitor = Arc::new(ConsoleMonitor {
        assume_yes: cli.yes,
    });
    let coordinator = HandoffCoordinator::new(&config, entry, monitor)?;

    if cli.check_only {
        match coordinator.check().await {
            Some(update) => println!(
                "Update available: {} ({})",
                update.release.version, update.asset.file_name
            ),
            None => println!("No update available ({CURRENT_VERSION})"),
        }
        return Ok(());
    }

    let mut events = coordinator.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            debug!(?event, "update event");
        }
    });

    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, cancelling update");
            let _ = cancel_tx.send(true);
        }
    });

    match coordinator.run_cycle(cancel_rx).await? {
        CycleOutcome::ExitRequired(handoff) => handoff.exit(),
        outcome => info!("Update cycle finished: {outcome:?}"),
    }

    Ok(())
}
