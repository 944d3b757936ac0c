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
use clap::Args;
use ge_database_postgres::{enable_timescale, establish_connection, run_migrations};
use tracing::info;

#[derive(Args, Debug)]
pub struct SetupArgs {
  /// Also turn item_prices into a compressed TimescaleDB hypertable
  #[arg(long)]
  pub timescale: bool,
}

pub async fn execute(args: SetupArgs) -> Result<()> {
  let database_url = config::database_url()?;

  tokio::task::spawn_blocking(move || -> Result<()> {
    let mut conn = establish_connection(&database_url).context("Failed to connect to database")?;

    let applied = run_migrations(&mut conn)?;
    if applied.is_empty() {
      info!("Schema already up to date");
    }
    for version in &applied {
      info!("Applied migration {}", version);
    }

    if args.timescale {
      enable_timescale(&mut conn).context("Is the timescaledb extension installed?")?;
    }
    Ok(())
  })
  .await?
}
