//! autocast-send - Background daemon for scheduled generation and publishing
//!
//! Starts the scheduler and keeps it running until SIGINT or SIGTERM.

use anyhow::Context;
use clap::Parser;
use libautocast::logging::{LogFormat, LoggingConfig};
use libautocast::service::EventReceiver;
use libautocast::{AutocastError, AutocastService, Config, CycleOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{sleep, Duration};
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "autocast-send")]
#[command(version)]
#[command(about = "Background daemon for scheduled generation and publishing")]
#[command(long_about = "\
autocast-send - Background daemon for scheduled generation and publishing

DESCRIPTION:
    autocast-send is a long-running daemon that drives the Autocast schedule.

    Every generation interval it turns pending topics into platform posts
    through the configured AI provider. At each daily publish time it
    publishes approved posts that are due, within the posts-per-day budget.
    One generation run starts immediately at launch.

USAGE:
    # Run in foreground (logs to stderr)
    autocast-send

    # Enable verbose logging
    autocast-send --verbose

    # Run one generation and one publish cycle, print a JSON summary, exit
    autocast-send --once

SIGNALS:
    SIGTERM, SIGINT - Graceful shutdown (lets running cycles finish)

CONFIGURATION:
    Configuration file: ~/.config/autocast/config.toml
    Database location: ~/.local/share/autocast/autocast.db

    [scheduler]
    require_approval = false
    posts_per_day = 2
    schedule_times = \"10:00,16:00\"
    generation_interval = \"2h\"

EXIT CODES:
    0 - Clean shutdown
    1 - Runtime or configuration error
    2 - Authentication error
    3 - Invalid input
")]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long)]
    #[arg(help = "Enable verbose logging (useful for debugging)")]
    verbose: bool,

    /// Log output format: text, json or pretty
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,

    /// Run each cycle once and exit
    #[arg(long)]
    #[arg(help = "Run one generation cycle and one publish cycle, then exit")]
    once: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env(cli.verbose);
    if let Some(format) = cli.log_format {
        logging.format = format;
    }
    logging.init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<AutocastError>()
            .map(AutocastError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;
    let service = AutocastService::from_config(config).await?;

    if cli.once {
        return run_once(&service).await;
    }

    info!("autocast-send daemon starting");

    let shutdown = Arc::new(AtomicBool::new(false));
    setup_signal_handlers(shutdown.clone()).context("Signal setup failed")?;

    spawn_event_logger(&service);
    service.scheduler().start()?;

    while !shutdown.load(Ordering::Relaxed) {
        sleep(Duration::from_millis(500)).await;
    }

    info!("Shutdown requested, waiting for running cycles");
    service.scheduler().stop().await;
    info!("autocast-send daemon stopped");
    Ok(())
}

/// Run both cycles back to back and print their reports as JSON
async fn run_once(service: &AutocastService) -> anyhow::Result<()> {
    let generation = match service.generation().run_cycle().await {
        CycleOutcome::Completed(report) => serde_json::to_value(report)?,
        CycleOutcome::Skipped => serde_json::Value::Null,
        CycleOutcome::Failed(reason) => anyhow::bail!("Generation cycle failed: {}", reason),
    };

    let publish = match service.publishing().run_cycle().await {
        CycleOutcome::Completed(report) => serde_json::to_value(report)?,
        CycleOutcome::Skipped => serde_json::Value::Null,
        CycleOutcome::Failed(reason) => anyhow::bail!("Publish cycle failed: {}", reason),
    };

    let summary = serde_json::json!({
        "generation": generation,
        "publish": publish,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn spawn_event_logger(service: &AutocastService) {
    let events = service.subscribe();
    tokio::spawn(log_events(events));
}

/// Log every event until the bus closes; returns how many were logged
async fn log_events(mut events: EventReceiver) -> usize {
    let mut logged = 0;
    loop {
        match events.recv().await {
            Ok(event) => {
                debug!(event = ?event, "Service event");
                logged += 1;
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event logger lagged behind, events dropped");
            }
            Err(RecvError::Closed) => return logged,
        }
    }
}

/// Set up signal handlers for graceful shutdown
#[cfg(unix)]
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> std::io::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;

    std::thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            info!(signal, "Received shutdown signal, stopping gracefully...");
            shutdown.store(true, Ordering::Relaxed);
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn setup_signal_handlers(_shutdown: Arc<AtomicBool>) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use libautocast::service::{Event, EventBus};

    #[tokio::test]
    async fn test_event_logger_survives_lag() {
        let bus = EventBus::new(2);
        let receiver = bus.subscribe();

        for topic_id in 1..=5 {
            bus.emit(Event::TopicCompleted { topic_id });
        }
        drop(bus);

        // Three events fall out of the buffer, the last two still get logged
        assert_eq!(log_events(receiver).await, 2);
    }
}
