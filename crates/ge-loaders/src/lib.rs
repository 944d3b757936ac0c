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

//! # ge-loaders
//!
//! The price ingestion pipeline for OSRS Grand Exchange data.
//!
//! - [`normalizer`]: raw API payload to canonical observations
//! - [`ingestion`]: one fetch, normalize, persist cycle for a granularity
//! - [`scheduler`]: fixed-interval triggering with overlap skipping and
//!   self-healing
//! - [`process_tracker`]: bounded in-memory history of runs

pub mod error;
pub mod ingestion;
pub mod normalizer;
pub mod process_tracker;
pub mod scheduler;

// Re-export commonly used types
pub use error::{PipelineError, Stage};
pub use ingestion::{Ingest, IngestionTask, TaskOutcome};
pub use normalizer::{normalize, Normalized, SkippedEntry};
pub use process_tracker::{ProcessInfo, ProcessState, ProcessTracker};
pub use scheduler::{JobSpec, Scheduler, SchedulerConfig};

// Prelude for convenient imports
pub mod prelude {
  pub use crate::{
    Ingest, IngestionTask, JobSpec, PipelineError, ProcessTracker, Scheduler, SchedulerConfig,
    TaskOutcome,
  };
}
