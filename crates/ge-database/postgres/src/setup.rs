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

//! Schema bootstrap, run by the `setup` command before the pipeline starts.

use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use thiserror::Error;
use tracing::info;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Error, Debug)]
pub enum SetupError {
  #[error("Migration failed: {0}")]
  Migration(String),

  #[error("TimescaleDB setup failed: {0}")]
  Timescale(#[from] diesel::result::Error),
}

/// Apply every pending migration, returning the versions that ran.
pub fn run_migrations(conn: &mut PgConnection) -> Result<Vec<String>, SetupError> {
  let applied = conn
    .run_pending_migrations(MIGRATIONS)
    .map_err(|e| SetupError::Migration(e.to_string()))?;

  let versions: Vec<String> = applied.iter().map(|v| v.to_string()).collect();
  info!("Applied {} migration(s)", versions.len());
  Ok(versions)
}

/// Turn `item_prices` into a compressed hypertable. Safe to repeat.
///
/// Requires the timescaledb extension to be installable on the server.
pub fn enable_timescale(conn: &mut PgConnection) -> Result<(), SetupError> {
  conn.transaction::<_, diesel::result::Error, _>(|conn| {
    diesel::sql_query("CREATE EXTENSION IF NOT EXISTS timescaledb").execute(conn)?;
    diesel::sql_query(
      "SELECT create_hypertable('item_prices', 'timestamp', \
       if_not_exists => TRUE, migrate_data => TRUE)",
    )
    .execute(conn)?;
    diesel::sql_query(
      "ALTER TABLE item_prices SET (\
       timescaledb.compress, \
       timescaledb.compress_orderby = 'timestamp DESC', \
       timescaledb.compress_segmentby = 'item_id')",
    )
    .execute(conn)?;
    Ok(())
  })?;

  info!("item_prices is a compressed hypertable");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use diesel::migration::MigrationSource;

  #[test]
  fn test_migrations_are_embedded() {
    let names: Vec<String> = MigrationSource::<diesel::pg::Pg>::migrations(&MIGRATIONS)
      .unwrap()
      .iter()
      .map(|m| m.name().to_string())
      .collect();
    assert_eq!(names.len(), 1);
    assert!(names[0].contains("create_item_prices"));
  }
}
