/*
 *
 *
 *
 *
 * MIT License
 * Copyright (c) 2025. Dwight J. Browne
 * dwight[-at-]dwightjbrowne[-dot-]com
 *
 *
 * Permission is hereby granted, free of charge, to any person obtaining a copy
 * of this software and associated documentation files (the "Software"), to deal
 * in the Software without restriction, including without limitation the rights
 * to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
 * copies of the Software, and to permit persons to whom the Software is
 * furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in all
 * copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
 * AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
 * OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
 * SOFTWARE.
 */

//! Fixed-interval scheduling of ingestion runs
//!
//! A [`Scheduler`] owns one *driver* at a time: a set of trigger loops, one
//! per configured job, sharing a liveness flag. Every fire spawns its run on
//! a task tracker owned by the scheduler itself, so tearing a driver down
//! never abandons a run that is already in flight.
//!
//! Per-granularity run locks also live on the scheduler. A fire that finds
//! the previous run for its granularity still holding the lock is skipped.

use crate::process_tracker::ProcessTracker;
use crate::{Ingest, PipelineError};
use futures::future::join_all;
use ge_core::{Granularity, DEFAULT_GRANULARITIES};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

pub const DEFAULT_HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(60);

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// One recurring ingestion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSpec {
  pub granularity: Granularity,
  pub every: Duration,
}

impl JobSpec {
  /// A job firing at the granularity's own cadence
  pub fn new(granularity: Granularity) -> Self {
    Self { granularity, every: granularity.cadence() }
  }

  pub fn every(mut self, every: Duration) -> Self {
    self.every = every.max(MIN_PERIOD);
    self
  }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
  pub jobs: Vec<JobSpec>,
  pub health_check_interval: Duration,
  /// Fire every job immediately instead of one interval after start
  pub run_on_start: bool,
}

impl Default for SchedulerConfig {
  fn default() -> Self {
    Self::for_granularities(&DEFAULT_GRANULARITIES)
  }
}

impl SchedulerConfig {
  pub fn for_granularities(granularities: &[Granularity]) -> Self {
    Self {
      jobs: granularities.iter().copied().map(JobSpec::new).collect(),
      health_check_interval: DEFAULT_HEALTH_CHECK_INTERVAL,
      run_on_start: false,
    }
  }

  pub fn with_health_check_interval(mut self, interval: Duration) -> Self {
    self.health_check_interval = interval.max(MIN_PERIOD);
    self
  }

  pub fn with_run_on_start(mut self, run_on_start: bool) -> Self {
    self.run_on_start = run_on_start;
    self
  }
}

/// Everything a fire needs. Shared by every driver generation.
#[derive(Clone)]
struct Runner {
  ingest: Arc<dyn Ingest>,
  history: ProcessTracker,
  locks: Arc<HashMap<Granularity, Arc<Mutex<()>>>>,
  tasks: TaskTracker,
}

impl Runner {
  async fn fire(&self, granularity: Granularity) {
    let Some(lock) = self.locks.get(&granularity) else {
      return;
    };

    let guard = match Arc::clone(lock).try_lock_owned() {
      Ok(guard) => guard,
      Err(_) => {
        warn!(granularity = %granularity, "Previous run still in flight, skipping this fire");
        self.history.skip(granularity).await;
        return;
      }
    };

    let ingest = Arc::clone(&self.ingest);
    let history = self.history.clone();
    self.tasks.spawn(async move {
      let _guard = guard;
      let run_id = history.start(granularity).await;
      // Own task, so a panicking run still gets closed in the history.
      let run = tokio::spawn(async move { ingest.run(granularity).await });
      match run.await {
        Ok(outcome) => history.complete(run_id, &outcome).await,
        Err(e) => {
          error!(granularity = %granularity, "Ingestion run died: {}", e);
          history.abort(run_id, e.to_string()).await;
        }
      }
    });
  }
}

/// Clears the liveness flag when a trigger loop exits, unwinding included.
struct Heartbeat(Arc<AtomicBool>);

impl Drop for Heartbeat {
  fn drop(&mut self) {
    self.0.store(false, Ordering::SeqCst);
  }
}

async fn trigger_loop(
  job: JobSpec,
  run_on_start: bool,
  runner: Runner,
  alive: Arc<AtomicBool>,
  cancel: CancellationToken,
) {
  let _heartbeat = Heartbeat(Arc::clone(&alive));
  let first = if run_on_start { Instant::now() } else { Instant::now() + job.every };
  let mut ticker = interval_at(first, job.every);
  ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

  loop {
    tokio::select! {
      biased;
      _ = cancel.cancelled() => break,
      _ = ticker.tick() => {
        if !alive.load(Ordering::SeqCst) {
          break;
        }
        debug!(granularity = %job.granularity, "Fire");
        runner.fire(job.granularity).await;
      }
    }
  }

  debug!(granularity = %job.granularity, "Trigger loop stopped");
}

/// One generation of trigger loops.
struct Driver {
  generation: u64,
  alive: Arc<AtomicBool>,
  cancel: CancellationToken,
  loops: Vec<JoinHandle<()>>,
}

impl Driver {
  fn spawn(
    generation: u64,
    jobs: &[JobSpec],
    run_on_start: bool,
    runner: &Runner,
    parent: &CancellationToken,
  ) -> Self {
    let alive = Arc::new(AtomicBool::new(true));
    let cancel = parent.child_token();
    let loops = jobs
      .iter()
      .map(|job| {
        tokio::spawn(trigger_loop(
          *job,
          run_on_start,
          runner.clone(),
          Arc::clone(&alive),
          cancel.clone(),
        ))
      })
      .collect();

    Self { generation, alive, cancel, loops }
  }

  /// A cleared flag or any exited loop means the driver can no longer be trusted.
  fn is_halted(&self) -> bool {
    !self.alive.load(Ordering::SeqCst) || self.loops.iter().any(JoinHandle::is_finished)
  }

  fn stop(self) -> Vec<JoinHandle<()>> {
    self.cancel.cancel();
    self.loops
  }
}

/// Drives [`Ingest`] runs on fixed intervals and heals itself.
///
/// ```ignore
/// let mut scheduler = Scheduler::new(SchedulerConfig::default(), Arc::new(task));
/// scheduler.run_until(async { tokio::signal::ctrl_c().await.ok(); }).await;
/// ```
pub struct Scheduler {
  config: SchedulerConfig,
  runner: Runner,
  shutdown: CancellationToken,
  driver: Option<Driver>,
  generation: u64,
}

impl Scheduler {
  pub fn new(config: SchedulerConfig, ingest: Arc<dyn Ingest>) -> Self {
    Self::with_tracker(config, ingest, ProcessTracker::new())
  }

  pub fn with_tracker(
    config: SchedulerConfig,
    ingest: Arc<dyn Ingest>,
    history: ProcessTracker,
  ) -> Self {
    let locks: HashMap<Granularity, Arc<Mutex<()>>> =
      config.jobs.iter().map(|job| (job.granularity, Arc::new(Mutex::new(())))).collect();
    Self {
      config,
      runner: Runner { ingest, history, locks: Arc::new(locks), tasks: TaskTracker::new() },
      shutdown: CancellationToken::new(),
      driver: None,
      generation: 0,
    }
  }

  /// Run history shared with every fire
  pub fn history(&self) -> ProcessTracker {
    self.runner.history.clone()
  }

  pub fn is_running(&self) -> bool {
    self.driver.is_some()
  }

  /// Number of drivers started so far, restarts included
  pub fn generation(&self) -> u64 {
    self.generation
  }

  /// Spawn the first driver. Does nothing if already started or shut down.
  pub fn start(&mut self) {
    if self.driver.is_some() || self.shutdown.is_cancelled() {
      return;
    }
    let granularities: Vec<&str> = self.config.jobs.iter().map(|j| j.granularity.as_str()).collect();
    info!(
      jobs = ?granularities,
      run_on_start = self.config.run_on_start,
      "Starting scheduler"
    );
    self.spawn_driver(self.config.run_on_start);
  }

  fn spawn_driver(&mut self, run_on_start: bool) {
    self.generation += 1;
    self.driver = Some(Driver::spawn(
      self.generation,
      &self.config.jobs,
      run_on_start,
      &self.runner,
      &self.shutdown,
    ));
  }

  /// Replace a halted driver with a fresh one. Returns whether it restarted.
  ///
  /// Runs in flight keep going and keep their locks. The new driver's first
  /// fires are one interval from now, whatever `run_on_start` says.
  pub fn health_check(&mut self) -> bool {
    if self.shutdown.is_cancelled() {
      return false;
    }
    let Some(stale) = self.driver.take_if(|driver| driver.is_halted()) else {
      return false;
    };

    let err =
      PipelineError::SchedulerLiveness(format!("driver generation {} halted", stale.generation));
    error!("{}; restarting", err);
    for handle in stale.stop() {
      handle.abort();
    }

    self.spawn_driver(false);
    info!(generation = self.generation, "Scheduler driver restarted");
    true
  }

  /// Stop firing and wait for every in-flight run to finish.
  pub async fn shutdown(&mut self) {
    info!("Shutting down scheduler");
    self.shutdown.cancel();
    if let Some(driver) = self.driver.take() {
      join_all(driver.stop()).await;
    }

    self.runner.tasks.close();
    self.runner.tasks.wait().await;
    info!("Scheduler stopped, all runs finished");
  }

  /// Start, health-check on the configured interval until `signal`
  /// completes, then shut down.
  pub async fn run_until<F>(&mut self, signal: F)
  where
    F: Future<Output = ()>,
  {
    self.start();

    let every = self.config.health_check_interval;
    let mut health = interval_at(Instant::now() + every, every);
    health.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(signal);

    loop {
      tokio::select! {
        biased;
        _ = &mut signal => break,
        _ = health.tick() => {
          self.health_check();
        }
      }
    }

    self.shutdown().await;
  }

  /// Make the current driver look dead, as a crashed loop would.
  #[cfg(test)]
  fn halt_driver(&self) {
    if let Some(driver) = &self.driver {
      driver.alive.store(false, Ordering::SeqCst);
      driver.cancel.cancel();
    }
  }
}

impl Drop for Scheduler {
  fn drop(&mut self) {
    self.shutdown.cancel();
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::process_tracker::ProcessState;
  use crate::TaskOutcome;
  use async_trait::async_trait;
  use std::sync::atomic::AtomicU32;
  use tokio::time::sleep;

  #[derive(Default)]
  struct RecordingIngest {
    work: Duration,
    fires: Mutex<Vec<Granularity>>,
    finished: AtomicU32,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
  }

  impl RecordingIngest {
    fn taking(work: Duration) -> Arc<Self> {
      Arc::new(Self { work, ..Self::default() })
    }

    async fn fired(&self, granularity: Granularity) -> usize {
      self.fires.lock().await.iter().filter(|g| **g == granularity).count()
    }
  }

  #[async_trait]
  impl Ingest for RecordingIngest {
    async fn run(&self, granularity: Granularity) -> TaskOutcome {
      self.fires.lock().await.push(granularity);
      let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
      self.max_in_flight.fetch_max(now, Ordering::SeqCst);
      if !self.work.is_zero() {
        sleep(self.work).await;
      }
      self.in_flight.fetch_sub(1, Ordering::SeqCst);
      self.finished.fetch_add(1, Ordering::SeqCst);
      TaskOutcome::Succeeded { granularity, records_stored: 1, skipped: 0 }
    }
  }

  fn five_minutes() -> SchedulerConfig {
    SchedulerConfig::for_granularities(&[Granularity::FiveMinutes])
  }

  #[test]
  fn test_default_config() {
    let config = SchedulerConfig::default();
    assert_eq!(
      config.jobs,
      vec![JobSpec::new(Granularity::FiveMinutes), JobSpec::new(Granularity::OneHour)]
    );
    assert_eq!(config.health_check_interval, Duration::from_secs(60));
    assert!(!config.run_on_start);
  }

  #[test]
  fn test_job_spec_every_overrides_cadence() {
    let job = JobSpec::new(Granularity::OneDay).every(Duration::from_secs(10));
    assert_eq!(job.every, Duration::from_secs(10));
    assert_eq!(JobSpec::new(Granularity::OneDay).every(Duration::ZERO).every, MIN_PERIOD);
  }

  #[tokio::test(start_paused = true)]
  async fn test_first_fire_one_interval_after_start() {
    let ingest = RecordingIngest::taking(Duration::ZERO);
    let mut scheduler = Scheduler::new(five_minutes(), ingest.clone());
    scheduler.start();

    sleep(Duration::from_secs(299)).await;
    assert_eq!(ingest.fired(Granularity::FiveMinutes).await, 0);

    sleep(Duration::from_secs(2)).await;
    assert_eq!(ingest.fired(Granularity::FiveMinutes).await, 1);

    sleep(Duration::from_secs(300)).await;
    assert_eq!(ingest.fired(Granularity::FiveMinutes).await, 2);
    scheduler.shutdown().await;
  }

  #[tokio::test(start_paused = true)]
  async fn test_run_on_start_fires_immediately() {
    let ingest = RecordingIngest::taking(Duration::ZERO);
    let mut scheduler = Scheduler::new(five_minutes().with_run_on_start(true), ingest.clone());
    scheduler.start();

    sleep(Duration::from_millis(1)).await;
    assert_eq!(ingest.fired(Granularity::FiveMinutes).await, 1);
    scheduler.shutdown().await;
  }

  #[tokio::test(start_paused = true)]
  async fn test_granularities_fire_independently() {
    let ingest = RecordingIngest::taking(Duration::ZERO);
    let mut scheduler = Scheduler::new(SchedulerConfig::default(), ingest.clone());
    scheduler.start();

    sleep(Duration::from_secs(3601)).await;
    assert_eq!(ingest.fired(Granularity::FiveMinutes).await, 12);
    assert_eq!(ingest.fired(Granularity::OneHour).await, 1);
    scheduler.shutdown().await;
  }

  #[tokio::test(start_paused = true)]
  async fn test_overlapping_fire_is_skipped() {
    // Each run outlasts the 300s interval.
    let ingest = RecordingIngest::taking(Duration::from_secs(400));
    let mut scheduler = Scheduler::new(five_minutes(), ingest.clone());
    scheduler.start();

    sleep(Duration::from_secs(601)).await;
    assert_eq!(ingest.fired(Granularity::FiveMinutes).await, 1);
    assert_eq!(scheduler.history().count(ProcessState::Skipped).await, 1);

    sleep(Duration::from_secs(300)).await;
    assert_eq!(ingest.fired(Granularity::FiveMinutes).await, 2);
    assert_eq!(ingest.max_in_flight.load(Ordering::SeqCst), 1);
    scheduler.shutdown().await;
  }

  #[tokio::test(start_paused = true)]
  async fn test_healthy_driver_is_left_alone() {
    let ingest = RecordingIngest::taking(Duration::ZERO);
    let mut scheduler = Scheduler::new(five_minutes(), ingest);
    scheduler.start();

    sleep(Duration::from_secs(10)).await;
    assert!(!scheduler.health_check());
    assert_eq!(scheduler.generation(), 1);
    scheduler.shutdown().await;
  }

  #[tokio::test(start_paused = true)]
  async fn test_halted_driver_restarts_and_reschedules_from_restart() {
    let ingest = RecordingIngest::taking(Duration::ZERO);
    let mut scheduler = Scheduler::new(five_minutes(), ingest.clone());
    scheduler.start();

    sleep(Duration::from_secs(100)).await;
    scheduler.halt_driver();
    assert!(scheduler.health_check());
    assert_eq!(scheduler.generation(), 2);
    assert!(scheduler.is_running());

    // The stale driver would have fired at t=300; the new one fires at t=400.
    sleep(Duration::from_secs(299)).await;
    assert_eq!(ingest.fired(Granularity::FiveMinutes).await, 0);
    sleep(Duration::from_secs(2)).await;
    assert_eq!(ingest.fired(Granularity::FiveMinutes).await, 1);
    scheduler.shutdown().await;
  }

  #[tokio::test(start_paused = true)]
  async fn test_restart_keeps_in_flight_run_and_its_lock() {
    let ingest = RecordingIngest::taking(Duration::from_secs(500));
    let mut scheduler = Scheduler::new(five_minutes().with_run_on_start(true), ingest.clone());
    scheduler.start();

    sleep(Duration::from_secs(1)).await;
    scheduler.halt_driver();
    assert!(scheduler.health_check());

    // New driver fires at t=301 while the first run lasts until t=500.
    sleep(Duration::from_secs(301)).await;
    assert_eq!(ingest.fired(Granularity::FiveMinutes).await, 1);
    assert_eq!(scheduler.history().count(ProcessState::Skipped).await, 1);

    sleep(Duration::from_secs(200)).await;
    assert_eq!(ingest.finished.load(Ordering::SeqCst), 1);
    scheduler.shutdown().await;
  }

  struct PanickingIngest;

  #[async_trait]
  impl Ingest for PanickingIngest {
    async fn run(&self, _granularity: Granularity) -> TaskOutcome {
      panic!("normalizer bug");
    }
  }

  #[tokio::test(start_paused = true)]
  async fn test_panicking_run_is_recorded_failed_and_releases_lock() {
    let mut scheduler =
      Scheduler::new(five_minutes().with_run_on_start(true), Arc::new(PanickingIngest));
    scheduler.start();

    sleep(Duration::from_millis(1)).await;
    let history = scheduler.history().get_all().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].state, ProcessState::Failed);
    assert!(history[0].end_time.is_some());
    assert!(history[0].error_message.as_deref().unwrap_or_default().contains("panic"));

    sleep(Duration::from_secs(300)).await;
    assert_eq!(scheduler.history().count(ProcessState::Failed).await, 2);
    assert_eq!(scheduler.history().count(ProcessState::Skipped).await, 0);
    assert!(!scheduler.health_check());
    scheduler.shutdown().await;
  }

  #[tokio::test(start_paused = true)]
  async fn test_shutdown_waits_for_in_flight_runs() {
    let ingest = RecordingIngest::taking(Duration::from_secs(10));
    let mut scheduler = Scheduler::new(five_minutes().with_run_on_start(true), ingest.clone());
    scheduler.start();

    sleep(Duration::from_millis(1)).await;
    assert_eq!(ingest.finished.load(Ordering::SeqCst), 0);

    scheduler.shutdown().await;
    assert_eq!(ingest.finished.load(Ordering::SeqCst), 1);
    assert!(!scheduler.is_running());

    sleep(Duration::from_secs(1000)).await;
    assert_eq!(ingest.fired(Granularity::FiveMinutes).await, 1);
    assert!(!scheduler.health_check());
  }

  #[tokio::test(start_paused = true)]
  async fn test_run_until_signal() {
    let ingest = RecordingIngest::taking(Duration::ZERO);
    let mut scheduler = Scheduler::new(five_minutes(), ingest.clone());

    scheduler.run_until(sleep(Duration::from_secs(650))).await;

    assert_eq!(ingest.fired(Granularity::FiveMinutes).await, 2);
    assert_eq!(scheduler.generation(), 1);
    let history = scheduler.history().get_all().await;
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|p| p.state == ProcessState::Succeeded));
  }
}
