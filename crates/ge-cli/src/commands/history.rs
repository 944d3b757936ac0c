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

use crate::config;
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use ge_core::Granularity;
use ge_database_postgres::{DatabaseContext, PriceRepository};

#[derive(Args, Debug)]
pub struct HistoryArgs {
  /// Only this granularity
  #[arg(short, long)]
  pub granularity: Option<Granularity>,
}

pub async fn execute(args: HistoryArgs) -> Result<()> {
  let database_url = config::database_url()?;
  let repository = DatabaseContext::with_pool_config(&database_url, 2, 1)
    .context("Failed to connect to database")?
    .price_repository();

  let granularities = match args.granularity {
    Some(g) => vec![g],
    None => Granularity::ALL.to_vec(),
  };

  println!("{:<6} {:>12}  NEWEST", "GRAN", "ROWS");
  for granularity in granularities {
    let rows = repository.count(Some(granularity)).await?;
    let newest = match repository.latest(granularity).await? {
      Some(ts) => format!(
        "{} ({} min ago)",
        ts.format("%Y-%m-%d %H:%M:%S UTC"),
        (Utc::now() - ts).num_minutes()
      ),
      None => "-".to_string(),
    };
    println!("{:<6} {:>12}  {}", granularity.as_str(), rows, newest);
  }

  Ok(())
}
