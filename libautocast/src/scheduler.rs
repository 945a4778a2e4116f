//! Timer-driven scheduler for the two cycles
//!
//! One task fires the generation cycle on a fixed interval, and one task per
//! daily slot fires the publish cycle at that local wall-clock time. Shutdown
//! is only observed between firings, so a cycle that has started always runs
//! to completion and never leaves a topic stuck in `generating`.

use chrono::Local;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::error::{AutocastError, Result};
use crate::scheduling::ScheduleTime;
use crate::service::generation::GenerationService;
use crate::service::publishing::PublishingService;

struct Running {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

pub struct Scheduler {
    generation: GenerationService,
    publishing: PublishingService,
    generation_interval: Duration,
    publish_times: Vec<ScheduleTime>,
    running: Mutex<Option<Running>>,
}

impl Scheduler {
    pub fn new(
        generation: GenerationService,
        publishing: PublishingService,
        generation_interval: Duration,
        publish_times: Vec<ScheduleTime>,
    ) -> Self {
        Self {
            generation,
            publishing,
            generation_interval,
            publish_times,
            running: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().is_some()
    }

    pub fn publish_times(&self) -> &[ScheduleTime] {
        &self.publish_times
    }

    /// Register all timers and kick off one generation run immediately
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `AutocastError::Scheduler` if the scheduler is already started.
    pub fn start(&self) -> Result<()> {
        let mut running = self.lock();
        if running.is_some() {
            return Err(AutocastError::Scheduler(
                "Scheduler is already running".to_string(),
            ));
        }

        let (shutdown, _) = watch::channel(false);
        let mut tasks = Vec::with_capacity(self.publish_times.len() + 2);

        let generation = self.generation.clone();
        tasks.push(tokio::spawn(async move {
            generation.run_cycle().await;
        }));

        tasks.push(self.spawn_generation_timer(shutdown.subscribe()));
        for time in &self.publish_times {
            tasks.push(self.spawn_publish_timer(*time, shutdown.subscribe()));
        }

        info!(
            interval = %humantime::format_duration(self.generation_interval),
            publish_times = ?self.publish_times.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "Scheduler started"
        );

        *running = Some(Running { shutdown, tasks });
        Ok(())
    }

    /// Cancel every timer and wait for in-flight cycles to finish
    ///
    /// Stopping a stopped scheduler does nothing. A later [`start`](Self::start)
    /// registers fresh timers.
    pub async fn stop(&self) {
        let Some(running) = self.lock().take() else {
            return;
        };

        // Receivers see the change or the dropped sender; either ends the loop
        let _ = running.shutdown.send(true);
        drop(running.shutdown);

        for task in running.tasks {
            if let Err(e) = task.await {
                debug!(error = %e, "Scheduler task ended abnormally");
            }
        }

        info!("Scheduler stopped");
    }

    fn spawn_generation_timer(&self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let generation = self.generation.clone();
        let period = self.generation_interval;

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        generation.run_cycle().await;
                    }
                    _ = shutdown.changed() => break,
                }
            }
        })
    }

    fn spawn_publish_timer(
        &self,
        time: ScheduleTime,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let publishing = self.publishing.clone();

        tokio::spawn(async move {
            loop {
                let now = Local::now();
                let next = time.next_after(&now);
                let wait = (next - now).to_std().unwrap_or_default();
                debug!(slot = %time, next = %next, "Next publish run scheduled");

                tokio::select! {
                    _ = sleep(wait) => {
                        publishing.run_cycle().await;
                    }
                    _ = shutdown.changed() => break,
                }
            }
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(running) = self.lock().take() {
            for task in &running.tasks {
                task.abort();
            }
        }
    }
}
