//! `robot-monitor` daemon.
//!
//! Runs the monitor over in-process local managers. They start out empty:
//! point `fixtures` (or `MONITOR__FIXTURES`) at a TOML file of records to
//! preload them, otherwise every round reports zero counts.
use std::fs;

use robot_monitor::start_server;
use robot_monitor::Data;
use robot_monitor::DataOwner;
use robot_monitor::Fixtures;
use robot_monitor::LocalManagers;
use robot_monitor::LoggingConfig;
use robot_monitor::Managers;
use robot_monitor::Monitor;
use robot_monitor::Result;
use robot_monitor::Settings;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let settings = Settings::new()?.validate()?;

    // Initializing Logs
    let _guard = init_observability(&settings.logging)?;
    info!(?settings, "settings loaded");

    // Initializing Shutdown Signal
    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = graceful_shutdown(shutdown).await {
                error!("Failed to shutdown: {:?}", e);
            }
        });
    }

    if settings.monitoring.prometheus_enabled {
        tokio::spawn(start_server(settings.monitoring.prometheus_port, shutdown.clone()));
    }

    let local = LocalManagers::new();
    match &settings.fixtures {
        Some(path) => local.seed(Fixtures::load(path)?),
        None => warn!("no fixtures configured; local managers stay empty"),
    }

    let monitor = Monitor::new(local.managers(), DataOwner::new(), settings.watch.clone());

    info!("Application started. Waiting for CTRL+C signal...");
    let update = |_: &Managers, data: &Data| -> Result<()> {
        let counts: Vec<String> = data
            .counts()
            .into_iter()
            .map(|(domain, len)| format!("{domain}={len}"))
            .collect();
        info!(generation = data.generation().get(), counts = %counts.join(" "), "snapshot");
        Ok(())
    };
    if let Err(e) = monitor.run(update, shutdown).await {
        error!("monitor stops: {:?}", e);
    }

    println!("Exiting program.");
    Ok(())
}

async fn graceful_shutdown(shutdown: CancellationToken) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Ctrl+C detected.");
        },
    }

    shutdown.cancel();

    info!("Shutdown requested");
    Ok(())
}

pub fn init_observability(logging: &LoggingConfig) -> Result<WorkerGuard> {
    fs::create_dir_all(&logging.log_dir)?;
    let log_file = tracing_appender::rolling::never(&logging.log_dir, &logging.file_name);

    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);
    let base_subscriber = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(base_subscriber).init();

    Ok(guard)
}
