//! `autobatch` watch binary.
//!
//! Loads the config, starts the orchestrator for the configured owner and
//! logs bucket changes until Ctrl-C. Notifications are logged by the
//! orchestrator itself.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::{broadcast, Notify};

use autobatch::{init_logging, load_config, NotificationBroadcaster, Orchestrator};

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("autobatch")
        .join("config.json")
}

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(config.log_format);

    if config.owner_id.as_deref().map_or(true, |o| o.trim().is_empty()) {
        log::error!("Config {} has no owner_id; nothing to watch", config_path.display());
        return ExitCode::FAILURE;
    }

    let notifications = NotificationBroadcaster::new(config.notification_capacity.max(1));
    let orchestrator = match Orchestrator::from_config(&config, Arc::new(notifications)) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            log::error!("Failed to start orchestrator: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Arc::new(Notify::new());
    let signal = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || signal.notify_one()) {
        log::error!("Failed to install Ctrl-C handler: {}", e);
        return ExitCode::FAILURE;
    }

    let mut change_rx = orchestrator.subscribe_changes();

    match orchestrator.start().await {
        Ok(report) => log::info!(
            "Watching {} job(s), {} poller(s) running",
            orchestrator.buckets().len(),
            report.started.len()
        ),
        Err(e) => log::warn!(
            "Initial refresh failed, polling {} restored job(s): {}",
            orchestrator.polling_job_ids().len(),
            e
        ),
    }

    loop {
        tokio::select! {
            _ = shutdown.notified() => break,
            received = change_rx.recv() => match received {
                Ok(event) => log::debug!(
                    "Catalogue changed ({:?}): {} active, {} completed, {} inactive",
                    event.reason,
                    event.snapshot.active.len(),
                    event.snapshot.completed.len(),
                    event.snapshot.inactive.len()
                ),
                Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    orchestrator.shutdown();
    ExitCode::SUCCESS
}
