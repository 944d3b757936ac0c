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

//! Process tracking for scheduled ingestion runs
//! In-memory only: a bounded ring of the most recent runs.

use crate::TaskOutcome;
use chrono::{DateTime, Utc};
use ge_core::Granularity;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Runs kept when no capacity is given
pub const DEFAULT_HISTORY_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
  Running,
  Succeeded,
  Failed,
  /// Fired while the previous run for the same granularity was in flight
  Skipped,
}

impl fmt::Display for ProcessState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ProcessState::Running => "running",
      ProcessState::Succeeded => "succeeded",
      ProcessState::Failed => "failed",
      ProcessState::Skipped => "skipped",
    };
    f.write_str(name)
  }
}

#[derive(Debug, Clone)]
pub struct ProcessInfo {
  pub run_id: u64,
  pub granularity: Granularity,
  pub start_time: DateTime<Utc>,
  pub end_time: Option<DateTime<Utc>>,
  pub state: ProcessState,
  pub error_message: Option<String>,
  pub records_stored: Option<usize>,
}

/// In-memory process tracker
///
/// Cheap to clone; clones share the same history.
#[derive(Clone)]
pub struct ProcessTracker {
  processes: Arc<Mutex<VecDeque<ProcessInfo>>>,
  next_id: Arc<AtomicU64>,
  capacity: usize,
}

impl Default for ProcessTracker {
  fn default() -> Self {
    Self::new()
  }
}

impl ProcessTracker {
  pub fn new() -> Self {
    Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
  }

  pub fn with_capacity(capacity: usize) -> Self {
    let capacity = capacity.max(1);
    Self {
      processes: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
      next_id: Arc::new(AtomicU64::new(1)),
      capacity,
    }
  }

  async fn push(&self, info: ProcessInfo) {
    let mut processes = self.processes.lock().await;
    if processes.len() == self.capacity {
      processes.pop_front();
    }
    processes.push_back(info);
  }

  /// Record a run as started and return its id
  pub async fn start(&self, granularity: Granularity) -> u64 {
    let run_id = self.next_id.fetch_add(1, Ordering::Relaxed);
    self
      .push(ProcessInfo {
        run_id,
        granularity,
        start_time: Utc::now(),
        end_time: None,
        state: ProcessState::Running,
        error_message: None,
        records_stored: None,
      })
      .await;
    run_id
  }

  /// Close a run with its outcome. A run already evicted from the ring is ignored.
  pub async fn complete(&self, run_id: u64, outcome: &TaskOutcome) {
    let mut processes = self.processes.lock().await;
    if let Some(info) = processes.iter_mut().rev().find(|p| p.run_id == run_id) {
      info.end_time = Some(Utc::now());
      match outcome {
        TaskOutcome::Succeeded { records_stored, .. } => {
          info.state = ProcessState::Succeeded;
          info.records_stored = Some(*records_stored);
        }
        TaskOutcome::Failed { stage, reason, .. } => {
          info.state = ProcessState::Failed;
          info.error_message = Some(format!("{} ({})", reason, stage));
        }
      }
    }
  }

  /// Close a run that ended without an outcome, such as one that panicked.
  pub async fn abort(&self, run_id: u64, message: String) {
    let mut processes = self.processes.lock().await;
    if let Some(info) = processes.iter_mut().rev().find(|p| p.run_id == run_id) {
      info.end_time = Some(Utc::now());
      info.state = ProcessState::Failed;
      info.error_message = Some(message);
    }
  }

  /// Record a fire that did not run
  pub async fn skip(&self, granularity: Granularity) {
    let now = Utc::now();
    let run_id = self.next_id.fetch_add(1, Ordering::Relaxed);
    self
      .push(ProcessInfo {
        run_id,
        granularity,
        start_time: now,
        end_time: Some(now),
        state: ProcessState::Skipped,
        error_message: Some("previous run still in flight".to_string()),
        records_stored: None,
      })
      .await;
  }

  /// Oldest first
  pub async fn get_all(&self) -> Vec<ProcessInfo> {
    self.processes.lock().await.iter().cloned().collect()
  }

  /// Count of recorded runs in the given state
  pub async fn count(&self, state: ProcessState) -> usize {
    self.processes.lock().await.iter().filter(|p| p.state == state).count()
  }
}
