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

pub mod history;
pub mod once;
pub mod run;
pub mod setup;

use crate::config::Config;
use anyhow::{Context, Result};
use ge_client::PriceClient;
use ge_database_postgres::{DatabaseContext, MemoryPriceRepository, PriceRepository};
use ge_loaders::{IngestionTask, ProcessState, ProcessTracker};
use std::sync::Arc;
use tracing::{info, warn};

/// Wire the client and a repository into an ingestion task.
///
/// `dry_run` swaps the database for an in-memory store, so no
/// `DATABASE_URL` is needed.
pub(crate) fn ingestion_task(config: &Config, dry_run: bool) -> Result<IngestionTask> {
  let client =
    PriceClient::new(&config.api_config).context("Failed to create prices API client")?;

  let repository: Arc<dyn PriceRepository> = if dry_run {
    info!("Dry run: records are kept in memory only");
    Arc::new(MemoryPriceRepository::new())
  } else {
    let url = config.require_database_url()?;
    let context = DatabaseContext::with_pool_config(url, config.pool_size, 1)
      .context("Failed to connect to database")?;
    Arc::new(context.price_repository())
  };

  Ok(IngestionTask::new(Arc::new(client), repository))
}

pub(crate) async fn log_history(history: &ProcessTracker) {
  let runs = history.get_all().await;
  let count = |state: ProcessState| runs.iter().filter(|r| r.state == state).count();
  info!(
    runs = runs.len(),
    succeeded = count(ProcessState::Succeeded),
    failed = count(ProcessState::Failed),
    skipped = count(ProcessState::Skipped),
    "Run summary"
  );

  for run in runs.iter().filter(|r| r.state == ProcessState::Failed) {
    warn!(
      granularity = %run.granularity,
      started = %run.start_time,
      "{}",
      run.error_message.as_deref().unwrap_or("unknown error")
    );
  }
}
