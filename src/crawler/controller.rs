//! Crawl controller: scheduling, mutual exclusion and status
//!
//! The controller owns one scheduler task per `start()`. The task sleeps
//! until the next due time and wakes early whenever the schedule changes
//! (interval update, stop, restart), signalled over a `watch` channel.
//!
//! # State Machine
//!
//! ```text
//! IDLE --tick/manual_trigger--> RUNNING --cycle done--> IDLE
//! ```
//!
//! A single atomic flag guards RUNNING. A tick that finds it set is dropped,
//! and `manual_trigger` fails with [`IngestError::Busy`]. Ticks that fall due
//! while a scheduled cycle runs are dropped too, never replayed.

use crate::config::{validate_crawl_config, Config, CrawlConfig};
use crate::crawler::cycle::{run_cycle, Pipeline};
use crate::crawler::status::{CrawlerStatus, CumulativeStats, CycleReport, ErrorEntry, ErrorLog};
use crate::storage::{SharedStorage, TriggerKind};
use crate::wire::WireClient;
use crate::{IngestError, Result};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Mutable controller state behind the state mutex
struct ControllerState {
    enabled: bool,
    config: CrawlConfig,
    last_run: Option<DateTime<Utc>>,
    next_run: Option<DateTime<Utc>>,
    last_report: Option<CycleReport>,
    totals: CumulativeStats,
    recent_errors: ErrorLog,
    /// Bumped by every `start()`; a loop with an older value exits
    generation: u64,
    task: Option<JoinHandle<()>>,
}

struct Inner {
    pipeline: Pipeline,
    state: Mutex<ControllerState>,
    running: AtomicBool,
    schedule_changed: watch::Sender<u64>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify_schedule_changed(&self) {
        self.schedule_changed.send_modify(|v| *v = v.wrapping_add(1));
    }
}

/// Clears the RUNNING flag when a cycle ends, including by panic
struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Handle to the ingestion controller
///
/// Cheap to clone; all clones drive the same scheduler.
#[derive(Clone)]
pub struct CrawlerController {
    inner: Arc<Inner>,
}

fn interval_of(config: &CrawlConfig) -> chrono::Duration {
    chrono::Duration::minutes(i64::from(config.interval_minutes))
}

impl CrawlerController {
    /// Creates an idle controller
    ///
    /// # Arguments
    ///
    /// * `pipeline` - Wire client, store and optional collaborators
    /// * `config` - Initial crawl configuration (used by manual triggers until `start`)
    /// * `recent_errors` - Capacity of the recent-errors ring buffer
    pub fn new(pipeline: Pipeline, config: CrawlConfig, recent_errors: usize) -> Self {
        let (schedule_changed, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                pipeline,
                state: Mutex::new(ControllerState {
                    enabled: false,
                    config,
                    last_run: None,
                    next_run: None,
                    last_report: None,
                    totals: CumulativeStats::default(),
                    recent_errors: ErrorLog::new(recent_errors),
                    generation: 0,
                    task: None,
                }),
                running: AtomicBool::new(false),
                schedule_changed,
            }),
        }
    }

    /// Builds a controller from a full configuration and an open store
    pub fn from_config(config: &Config, storage: SharedStorage) -> Result<Self> {
        let client = WireClient::new(&config.wire, &config.user_agent, &config.rate_limit)?;
        Ok(Self::new(
            Pipeline::new(client, storage),
            config.crawl.clone(),
            config.output.recent_errors,
        ))
    }

    /// The store cycles write to
    pub fn storage(&self) -> &SharedStorage {
        &self.inner.pipeline.storage
    }

    /// Enables recurring cycles
    ///
    /// Must be called from within a tokio runtime. The first tick fires
    /// immediately when `run_immediately` is set, otherwise one interval from
    /// now.
    ///
    /// # Errors
    ///
    /// * [`IngestError::AlreadyRunning`] if the scheduler is already enabled
    /// * [`IngestError::InvalidInterval`] if the interval is below one minute
    pub fn start(&self, config: CrawlConfig) -> Result<()> {
        let mut state = self.inner.state();
        if state.enabled {
            return Err(IngestError::AlreadyRunning);
        }
        if config.interval_minutes < 1 {
            return Err(IngestError::InvalidInterval(config.interval_minutes));
        }
        validate_crawl_config(&config)?;

        let now = Utc::now();
        state.next_run = Some(if config.run_immediately {
            now
        } else {
            now + interval_of(&config)
        });
        state.config = config;
        state.enabled = true;
        state.generation += 1;

        let generation = state.generation;
        let changes = self.inner.schedule_changed.subscribe();
        let inner = Arc::clone(&self.inner);
        state.task = Some(tokio::spawn(schedule_loop(inner, generation, changes)));

        tracing::info!(
            "Scheduler started: every {} minutes, next run at {}",
            state.config.interval_minutes,
            state.next_run.map(|t| t.to_rfc3339()).unwrap_or_default()
        );
        Ok(())
    }

    /// Disables future ticks
    ///
    /// A cycle already executing runs to completion.
    pub fn stop(&self) {
        {
            let mut state = self.inner.state();
            if !state.enabled {
                return;
            }
            state.enabled = false;
            state.next_run = None;
        }
        self.inner.notify_schedule_changed();
        tracing::info!("Scheduler stopped");
    }

    /// Waits for the scheduler task (and any cycle it is running) to finish
    ///
    /// Call after [`stop`](Self::stop) to shut down cleanly.
    pub async fn join(&self) {
        let task = self.inner.state().task.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!("Scheduler task ended abnormally: {}", e);
            }
        }
    }

    /// Runs one cycle now, in the caller's task
    ///
    /// Works whether or not the scheduler is enabled.
    ///
    /// # Errors
    ///
    /// * [`IngestError::Busy`] if a cycle is already running
    pub async fn manual_trigger(&self) -> Result<CycleReport> {
        let guard = RunningGuard::acquire(&self.inner.running).ok_or(IngestError::Busy)?;
        let result = execute_cycle(&self.inner, TriggerKind::Manual).await;
        drop(guard);
        result
    }

    /// Changes the interval and reschedules the next tick
    ///
    /// The next tick moves to `now + minutes`; a cycle in flight is not
    /// affected.
    pub fn update_interval(&self, minutes: u32) -> Result<()> {
        if minutes < 1 {
            return Err(IngestError::InvalidInterval(minutes));
        }

        {
            let mut state = self.inner.state();
            state.config.interval_minutes = minutes;
            if state.enabled {
                state.next_run = Some(Utc::now() + interval_of(&state.config));
            }
        }
        self.inner.notify_schedule_changed();

        tracing::info!("Crawl interval set to {} minutes", minutes);
        Ok(())
    }

    /// Snapshot of scheduler state and statistics
    pub fn get_status(&self) -> CrawlerStatus {
        let state = self.inner.state();
        CrawlerStatus {
            enabled: state.enabled,
            running: self.inner.running.load(Ordering::SeqCst),
            interval_minutes: state.config.interval_minutes,
            last_run: state.last_run,
            next_run: state.next_run,
            last_report: state.last_report.clone(),
            totals: state.totals.clone(),
            recent_errors: state.recent_errors.snapshot(),
        }
    }
}

/// Runs a cycle with the current configuration and folds its outcome into state
///
/// The caller holds the RUNNING guard.
async fn execute_cycle(inner: &Inner, trigger: TriggerKind) -> Result<CycleReport> {
    let config = inner.state().config.clone();
    let result = run_cycle(&inner.pipeline, &config, trigger).await;

    let mut state = inner.state();
    state.last_run = Some(Utc::now());
    match &result {
        Ok(report) => {
            state.totals.absorb(&report.stats);
            state.recent_errors.extend(report.stats.errors.iter().cloned());
            state.last_report = Some(report.clone());
        }
        Err(e) => {
            tracing::error!("Crawl cycle failed: {}", e);
            state
                .recent_errors
                .push(ErrorEntry::new(None, None, e.to_string()));
        }
    }

    result
}

/// What the loop should do after waking
enum Wake {
    Exit,
    Wait(Duration),
    Tick,
}

/// Steps `due` forward in whole intervals until it lies after `now`
///
/// Returns the new due time and the ticks that were stepped over.
fn skip_missed_ticks(
    due: DateTime<Utc>,
    now: DateTime<Utc>,
    interval: chrono::Duration,
) -> (DateTime<Utc>, Vec<DateTime<Utc>>) {
    let mut skipped = Vec::new();
    if interval <= chrono::Duration::zero() {
        return (due, skipped);
    }

    let mut next = due;
    while next <= now {
        skipped.push(next);
        next = next + interval;
    }
    (next, skipped)
}

/// Drops ticks that fell due while a scheduled cycle was running
///
/// Without this a cycle longer than the interval would be followed at once
/// by another one.
fn drop_missed_ticks(inner: &Inner, generation: u64) {
    let mut state = inner.state();
    if !state.enabled || state.generation != generation {
        return;
    }
    let Some(due) = state.next_run else {
        return;
    };

    let (next, skipped) = skip_missed_ticks(due, Utc::now(), interval_of(&state.config));
    for tick in &skipped {
        tracing::info!(
            "Tick due at {} skipped: it fell inside the previous cycle",
            tick.to_rfc3339()
        );
    }
    state.next_run = Some(next);
}

fn check_schedule(inner: &Inner, generation: u64) -> Wake {
    let mut state = inner.state();
    if !state.enabled || state.generation != generation {
        return Wake::Exit;
    }
    let Some(due) = state.next_run else {
        return Wake::Exit;
    };

    let now = Utc::now();
    if due > now {
        return Wake::Wait((due - now).to_std().unwrap_or(Duration::ZERO));
    }

    state.next_run = Some(now + interval_of(&state.config));
    Wake::Tick
}

async fn schedule_loop(inner: Arc<Inner>, generation: u64, mut changes: watch::Receiver<u64>) {
    loop {
        match check_schedule(&inner, generation) {
            Wake::Exit => break,
            Wake::Wait(wait) => {
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    changed = changes.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            Wake::Tick => match RunningGuard::acquire(&inner.running) {
                Some(guard) => {
                    // Errors are already recorded in state
                    let _ = execute_cycle(&inner, TriggerKind::Scheduled).await;
                    drop(guard);
                    drop_missed_ticks(&inner, generation);
                }
                None => tracing::info!("Tick skipped: a cycle is already running"),
            },
        }
    }

    tracing::debug!("Scheduler loop {} exited", generation);
}
