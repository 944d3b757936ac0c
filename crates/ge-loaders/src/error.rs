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

use ge_client::FetchFailure;
use ge_database_postgres::StorageFailure;
use std::fmt;
use thiserror::Error;

/// Failures the ingestion pipeline can run into.
///
/// None of these stop the process: fetch and data-shape problems are
/// downgraded where they occur, storage failures fail one task, liveness
/// problems are healed by the scheduler.
#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("Transient fetch failure: {0}")]
  TransientFetch(#[from] FetchFailure),

  #[error("Malformed data: {0}")]
  DataShape(String),

  #[error("Storage failure: {0}")]
  Storage(#[from] StorageFailure),

  #[error("Scheduler liveness: {0}")]
  SchedulerLiveness(String),
}

/// Where an ingestion task is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Idle,
  Fetching,
  Normalizing,
  Persisting,
  Succeeded,
  Failed,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Stage::Idle => "idle",
      Stage::Fetching => "fetching",
      Stage::Normalizing => "normalizing",
      Stage::Persisting => "persisting",
      Stage::Succeeded => "succeeded",
      Stage::Failed => "failed",
    };
    f.write_str(name)
  }
}
