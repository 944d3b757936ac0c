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

use crate::config::Config;
use anyhow::Result;
use clap::Args;
use ge_core::Granularity;
use ge_loaders::{Scheduler, SchedulerConfig};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Args, Debug)]
pub struct RunArgs {
  /// Granularities to poll, comma separated (defaults to GE_GRANULARITIES)
  #[arg(short, long, value_delimiter = ',')]
  pub granularity: Vec<Granularity>,

  /// Fire every job once right away instead of after the first interval
  #[arg(long)]
  pub run_on_start: bool,

  /// Dry run - don't save to database
  #[arg(long)]
  pub dry_run: bool,
}

pub async fn execute(args: RunArgs) -> Result<()> {
  let config = Config::from_env()?;
  let granularities =
    if args.granularity.is_empty() { config.granularities.clone() } else { args.granularity };

  let task = super::ingestion_task(&config, args.dry_run)?;
  let scheduler_config = SchedulerConfig::for_granularities(&granularities)
    .with_health_check_interval(Duration::from_secs(config.health_check_secs))
    .with_run_on_start(args.run_on_start);

  let mut scheduler = Scheduler::new(scheduler_config, Arc::new(task));
  scheduler.run_until(shutdown_signal()).await;

  super::log_history(&scheduler.history()).await;
  Ok(())
}

/// Completes on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      error!("Failed to listen for Ctrl-C: {}", e);
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
      Ok(mut sigterm) => {
        sigterm.recv().await;
      }
      Err(e) => {
        error!("Failed to listen for SIGTERM: {}", e);
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => info!("Ctrl-C received"),
    _ = terminate => info!("SIGTERM received"),
  }
}
