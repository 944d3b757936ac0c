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
use anyhow::{bail, Result};
use clap::Args;
use ge_core::Granularity;
use ge_loaders::{Ingest, TaskOutcome};

#[derive(Args, Debug)]
pub struct OnceArgs {
  /// Granularity to fetch (5m, 1h, 6h, 24h)
  #[arg(short, long)]
  pub granularity: Granularity,

  /// Dry run - don't save to database
  #[arg(long)]
  pub dry_run: bool,
}

pub async fn execute(args: OnceArgs) -> Result<()> {
  let config = Config::from_env()?;
  let task = super::ingestion_task(&config, args.dry_run)?;

  match task.run(args.granularity).await {
    TaskOutcome::Succeeded { granularity, records_stored, skipped } => {
      println!("Stored {} {} records ({} skipped)", records_stored, granularity, skipped);
      Ok(())
    }
    TaskOutcome::Failed { granularity, stage, reason } => {
      bail!("{} ingestion failed while {}: {}", granularity, stage, reason)
    }
  }
}
