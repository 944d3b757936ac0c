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

//! One ingestion cycle: fetch, normalize, persist

use crate::normalizer::normalize;
use crate::{PipelineError, Stage};
use async_trait::async_trait;
use ge_client::PriceSource;
use ge_core::{Exhausted, Granularity, RetryPolicy};
use ge_database_postgres::PriceRepository;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Default persistence policy: the batch is submitted at most twice.
pub const DEFAULT_PERSIST_ATTEMPTS: u32 = 2;
pub const DEFAULT_PERSIST_BASE_DELAY: Duration = Duration::from_secs(2);

/// How one run ended. Failures are values, never panics or errors.
#[derive(Debug)]
pub enum TaskOutcome {
  Succeeded { granularity: Granularity, records_stored: usize, skipped: usize },
  Failed { granularity: Granularity, stage: Stage, reason: PipelineError },
}

impl TaskOutcome {
  pub fn granularity(&self) -> Granularity {
    match self {
      TaskOutcome::Succeeded { granularity, .. } | TaskOutcome::Failed { granularity, .. } => {
        *granularity
      }
    }
  }

  pub fn is_success(&self) -> bool {
    matches!(self, TaskOutcome::Succeeded { .. })
  }

  /// Final state of the task state machine
  pub fn stage(&self) -> Stage {
    match self {
      TaskOutcome::Succeeded { .. } => Stage::Succeeded,
      TaskOutcome::Failed { .. } => Stage::Failed,
    }
  }
}

/// A unit of work the scheduler can fire for a granularity
#[async_trait]
pub trait Ingest: Send + Sync {
  async fn run(&self, granularity: Granularity) -> TaskOutcome;
}

/// Fetcher, normalizer and repository composed for one granularity.
pub struct IngestionTask {
  source: Arc<dyn PriceSource>,
  repository: Arc<dyn PriceRepository>,
  persist_retry: RetryPolicy,
}

impl IngestionTask {
  pub fn new(source: Arc<dyn PriceSource>, repository: Arc<dyn PriceRepository>) -> Self {
    Self {
      source,
      repository,
      persist_retry: RetryPolicy::new(DEFAULT_PERSIST_ATTEMPTS, DEFAULT_PERSIST_BASE_DELAY),
    }
  }

  pub fn with_persist_retry(mut self, persist_retry: RetryPolicy) -> Self {
    self.persist_retry = persist_retry;
    self
  }

  fn failed(granularity: Granularity, stage: Stage, reason: PipelineError) -> TaskOutcome {
    error!(granularity = %granularity, stage = %stage, "Ingestion failed: {}", reason);
    TaskOutcome::Failed { granularity, stage, reason }
  }
}

#[async_trait]
impl Ingest for IngestionTask {
  #[instrument(skip(self), fields(granularity = %granularity))]
  async fn run(&self, granularity: Granularity) -> TaskOutcome {
    debug!(stage = %Stage::Fetching, "Starting ingestion");
    let payload = match self.source.fetch(granularity).await {
      Ok(payload) => payload,
      Err(failure) => return Self::failed(granularity, Stage::Fetching, failure.into()),
    };

    debug!(stage = %Stage::Normalizing, "Fetched payload at {}", payload.fetched_at);
    let normalized = normalize(&payload, granularity);
    let skipped = normalized.skipped.len();

    if normalized.is_empty() {
      info!(records = 0, skipped, "No records this cycle");
      return TaskOutcome::Succeeded { granularity, records_stored: 0, skipped };
    }

    debug!(stage = %Stage::Persisting, records = normalized.observations.len(), "Persisting batch");
    let repository = &self.repository;
    let batch = normalized.observations.as_slice();
    let stored = self
      .persist_retry
      .run(move |attempt| async move {
        if attempt > 1 {
          warn!(attempt, records = batch.len(), "Re-submitting batch");
        }
        repository.upsert(batch).await
      })
      .await;

    match stored {
      Ok(records_stored) => {
        info!(records = records_stored, skipped, "Ingestion succeeded");
        TaskOutcome::Succeeded { granularity, records_stored, skipped }
      }
      Err(Exhausted { last_error, .. }) => {
        Self::failed(granularity, Stage::Persisting, PipelineError::Storage(last_error))
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::{DateTime, Utc};
  use ge_client::FetchFailure;
  use ge_database_postgres::{
    MemoryPriceRepository, RepositoryError, RepositoryResult, StorageFailure,
  };
  use ge_models::{PriceObservation, RawPayload};
  use serde_json::json;
  use std::sync::atomic::{AtomicU32, Ordering};

  struct CannedSource(serde_json::Value);

  #[async_trait]
  impl PriceSource for CannedSource {
    async fn fetch(&self, _granularity: Granularity) -> Result<RawPayload, FetchFailure> {
      Ok(RawPayload::new(self.0.clone()))
    }
  }

  struct DownSource;

  #[async_trait]
  impl PriceSource for DownSource {
    async fn fetch(&self, granularity: Granularity) -> Result<RawPayload, FetchFailure> {
      Err(FetchFailure {
        granularity,
        attempts: 3,
        source: ge_core::Error::Status { status: 503, url: "http://prices/5m".to_string() },
      })
    }
  }

  /// Fails the first `failures` upserts, then delegates to memory.
  struct FlakyRepository {
    failures: u32,
    calls: AtomicU32,
    inner: MemoryPriceRepository,
  }

  impl FlakyRepository {
    fn new(failures: u32) -> Self {
      Self { failures, calls: AtomicU32::new(0), inner: MemoryPriceRepository::new() }
    }
  }

  #[async_trait]
  impl PriceRepository for FlakyRepository {
    async fn upsert(&self, batch: &[PriceObservation]) -> Result<usize, StorageFailure> {
      let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
      if call <= self.failures {
        return Err(StorageFailure {
          attempted: batch.len(),
          source: RepositoryError::PoolError("connection refused".to_string()),
        });
      }
      self.inner.upsert(batch).await
    }

    async fn count(&self, granularity: Option<Granularity>) -> RepositoryResult<i64> {
      self.inner.count(granularity).await
    }

    async fn latest(&self, granularity: Granularity) -> RepositoryResult<Option<DateTime<Utc>>> {
      self.inner.latest(granularity).await
    }

    async fn snapshot(
      &self,
      granularity: Granularity,
      timestamp: DateTime<Utc>,
    ) -> RepositoryResult<Vec<PriceObservation>> {
      self.inner.snapshot(granularity, timestamp).await
    }
  }

  fn two_items() -> serde_json::Value {
    json!({
      "timestamp": 1700000000,
      "data": {
        "2": {"avgHighPrice": 180, "highPriceVolume": 10, "avgLowPrice": null, "lowPriceVolume": 0},
        "x": {"avgHighPrice": 1},
        "4151": {"avgHighPrice": null, "highPriceVolume": null, "avgLowPrice": 1500000, "lowPriceVolume": 3}
      }
    })
  }

  #[tokio::test]
  async fn test_success_reports_stored_and_skipped() {
    let repo = Arc::new(MemoryPriceRepository::new());
    let task = IngestionTask::new(Arc::new(CannedSource(two_items())), repo.clone());

    let outcome = task.run(Granularity::FiveMinutes).await;
    match outcome {
      TaskOutcome::Succeeded { records_stored, skipped, .. } => {
        assert_eq!(records_stored, 2);
        assert_eq!(skipped, 1);
      }
      other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(repo.count(None).await.unwrap(), 2);
  }

  #[tokio::test]
  async fn test_rerun_is_idempotent() {
    let repo = Arc::new(MemoryPriceRepository::new());
    let task = IngestionTask::new(Arc::new(CannedSource(two_items())), repo.clone());

    task.run(Granularity::OneHour).await;
    let once = repo.all().await;
    task.run(Granularity::OneHour).await;
    assert_eq!(repo.all().await, once);
  }

  #[tokio::test]
  async fn test_fetch_exhaustion_fails_at_fetching_without_writes() {
    let repo = Arc::new(FlakyRepository::new(0));
    let task = IngestionTask::new(Arc::new(DownSource), repo.clone());

    let outcome = task.run(Granularity::FiveMinutes).await;
    assert!(matches!(
      outcome,
      TaskOutcome::Failed {
        stage: Stage::Fetching,
        reason: PipelineError::TransientFetch(_),
        ..
      }
    ));
    assert_eq!(repo.calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test]
  async fn test_empty_data_succeeds_without_touching_store() {
    let repo = Arc::new(FlakyRepository::new(u32::MAX));
    let task =
      IngestionTask::new(Arc::new(CannedSource(json!({"timestamp": 100, "data": {}}))), repo.clone());

    let outcome = task.run(Granularity::FiveMinutes).await;
    assert!(matches!(outcome, TaskOutcome::Succeeded { records_stored: 0, .. }));
    assert_eq!(repo.calls.load(Ordering::SeqCst), 0);
  }

  #[tokio::test(start_paused = true)]
  async fn test_persist_retried_once_then_succeeds() {
    let repo = Arc::new(FlakyRepository::new(1));
    let task = IngestionTask::new(Arc::new(CannedSource(two_items())), repo.clone());

    let outcome = task.run(Granularity::FiveMinutes).await;
    assert!(outcome.is_success());
    assert_eq!(repo.calls.load(Ordering::SeqCst), 2);
    assert_eq!(repo.count(None).await.unwrap(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_persist_failure_fails_at_persisting() {
    let repo = Arc::new(FlakyRepository::new(u32::MAX));
    let task = IngestionTask::new(Arc::new(CannedSource(two_items())), repo.clone());

    let outcome = task.run(Granularity::SixHours).await;
    assert_eq!(outcome.granularity(), Granularity::SixHours);
    assert_eq!(outcome.stage(), Stage::Failed);
    match outcome {
      TaskOutcome::Failed { stage, reason: PipelineError::Storage(failure), .. } => {
        assert_eq!(stage, Stage::Persisting);
        assert_eq!(failure.attempted, 2);
      }
      other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(repo.calls.load(Ordering::SeqCst), DEFAULT_PERSIST_ATTEMPTS);
    assert_eq!(repo.count(None).await.unwrap(), 0);
  }

  #[tokio::test]
  async fn test_custom_persist_retry() {
    let repo = Arc::new(FlakyRepository::new(1));
    let task = IngestionTask::new(Arc::new(CannedSource(two_items())), repo.clone())
      .with_persist_retry(RetryPolicy::none());

    let outcome = task.run(Granularity::FiveMinutes).await;
    assert!(!outcome.is_success());
    assert_eq!(repo.calls.load(Ordering::SeqCst), 1);
  }
}
