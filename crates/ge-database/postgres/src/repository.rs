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

//! Database repository abstraction layer
//!
//! Provides the write path the ingestion pipeline needs (one atomic upsert
//! per batch) behind the [`PriceRepository`] trait, plus the handful of reads
//! used for reporting. Two implementations: PostgreSQL through a pooled
//! diesel connection, and an in-memory map with the same semantics.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::result::Error as DieselError;
use ge_core::Granularity;
use ge_models::{ObservationKey, PriceObservation};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::models::{ItemPrice, NewItemPrice};
use crate::schema::item_prices;

pub type DbPool = Pool<ConnectionManager<PgConnection>>;
pub type DbConnection = PooledConnection<ConnectionManager<PgConnection>>;

const MAX_POOL_SIZE: u32 = 10;
const MIN_POOL_IDLE: u32 = 1;
/// Connection timeout in seconds - pool will fail instead of retrying forever
const CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Rows per INSERT statement. Seven bind parameters per row keeps this far
/// below the 65535 parameter limit.
const UPSERT_CHUNK_SIZE: usize = 1000;

/// Database repository errors
#[derive(Error, Debug)]
pub enum RepositoryError {
  #[error("Connection pool error: {0}")]
  PoolError(String),

  #[error("Database query error: {0}")]
  QueryError(String),

  #[error("Serialization error: {0}")]
  SerializationError(String),

  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Constraint violation: {0}")]
  ConstraintViolation(String),

  #[error("Transaction error: {0}")]
  TransactionError(String),
}

impl From<DieselError> for RepositoryError {
  fn from(err: DieselError) -> Self {
    match err {
      DieselError::NotFound => RepositoryError::NotFound("Record not found".to_string()),
      DieselError::DatabaseError(kind, info) => match kind {
        diesel::result::DatabaseErrorKind::UniqueViolation
        | diesel::result::DatabaseErrorKind::ForeignKeyViolation
        | diesel::result::DatabaseErrorKind::NotNullViolation
        | diesel::result::DatabaseErrorKind::CheckViolation => {
          RepositoryError::ConstraintViolation(info.message().to_string())
        }
        _ => RepositoryError::QueryError(info.message().to_string()),
      },
      DieselError::RollbackErrorOnCommit { .. }
      | DieselError::RollbackTransaction
      | DieselError::AlreadyInTransaction
      | DieselError::NotInTransaction
      | DieselError::BrokenTransactionManager => RepositoryError::TransactionError(err.to_string()),
      _ => RepositoryError::QueryError(err.to_string()),
    }
  }
}

impl From<diesel::r2d2::PoolError> for RepositoryError {
  fn from(err: diesel::r2d2::PoolError) -> Self {
    RepositoryError::PoolError(err.to_string())
  }
}

impl From<ge_core::Error> for RepositoryError {
  fn from(err: ge_core::Error) -> Self {
    RepositoryError::SerializationError(err.to_string())
  }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// A batch upsert that was rolled back.
///
/// Nothing from the batch was written. The repository does not retry; that
/// decision belongs to the caller.
#[derive(Error, Debug)]
#[error("upsert of {attempted} record(s) failed: {source}")]
pub struct StorageFailure {
  /// Records in the abandoned batch
  pub attempted: usize,
  #[source]
  pub source: RepositoryError,
}

/// Persistence of price observations
#[async_trait]
pub trait PriceRepository: Send + Sync {
  /// Insert the batch, overwriting the measurement fields of rows whose
  /// `(timestamp, item_id, granularity)` already exists.
  ///
  /// All or nothing. An empty batch is a no-op returning zero. Entries
  /// sharing a key collapse to the last one, and the returned count is of
  /// distinct keys.
  async fn upsert(&self, batch: &[PriceObservation]) -> Result<usize, StorageFailure>;

  /// Number of stored rows, optionally for one granularity
  async fn count(&self, granularity: Option<Granularity>) -> RepositoryResult<i64>;

  /// Newest stored snapshot time for a granularity
  async fn latest(&self, granularity: Granularity) -> RepositoryResult<Option<DateTime<Utc>>>;

  /// Every stored row of one snapshot, ordered by item id
  async fn snapshot(
    &self,
    granularity: Granularity,
    timestamp: DateTime<Utc>,
  ) -> RepositoryResult<Vec<PriceObservation>>;
}

/// Database context that provides access to repositories and connection pool
#[derive(Clone)]
pub struct DatabaseContext {
  pool: Arc<DbPool>,
}

impl DatabaseContext {
  /// Create a new database context with connection pooling
  ///
  /// Fails fast if the database is unavailable by testing the connection at startup.
  pub fn new(database_url: &str) -> RepositoryResult<Self> {
    Self::with_pool_config(database_url, MAX_POOL_SIZE, MIN_POOL_IDLE)
  }

  /// Create with custom pool configuration
  ///
  /// Fails fast if the database is unavailable by testing the connection at startup.
  /// This prevents the r2d2 pool from spawning background threads that retry forever.
  pub fn with_pool_config(
    database_url: &str,
    max_size: u32,
    min_idle: u32,
  ) -> RepositoryResult<Self> {
    // Test connection BEFORE creating the pool to fail fast without background retry noise
    PgConnection::establish(database_url).map_err(|e| {
      RepositoryError::PoolError(format!("Failed to connect to database: {}", e))
    })?;

    let manager = ConnectionManager::<PgConnection>::new(database_url);
    let pool = Pool::builder()
      .max_size(max_size.max(1))
      .min_idle(Some(min_idle.min(max_size.max(1))))
      .connection_timeout(Duration::from_secs(CONNECTION_TIMEOUT_SECS))
      .build(manager)
      .map_err(|e| RepositoryError::PoolError(e.to_string()))?;

    Ok(Self { pool: Arc::new(pool) })
  }

  /// Get a connection from the pool
  pub fn get_connection(&self) -> RepositoryResult<DbConnection> {
    self.pool.get().map_err(|e| RepositoryError::PoolError(e.to_string()))
  }

  /// Create a price repository sharing this pool
  pub fn price_repository(&self) -> PgPriceRepository {
    PgPriceRepository { context: self.clone() }
  }

  /// Execute a blocking database operation asynchronously
  pub async fn run<F, R>(&self, f: F) -> RepositoryResult<R>
  where
    F: FnOnce(&mut DbConnection) -> RepositoryResult<R> + Send + 'static,
    R: Send + 'static,
  {
    let pool = Arc::clone(&self.pool);
    tokio::task::spawn_blocking(move || {
      let mut conn = pool.get().map_err(|e| RepositoryError::PoolError(e.to_string()))?;
      f(&mut conn)
    })
    .await
    .map_err(|e| RepositoryError::QueryError(format!("Task join error: {}", e)))?
  }
}

/// PostgreSQL implementation of [`PriceRepository`]
#[derive(Clone)]
pub struct PgPriceRepository {
  context: DatabaseContext,
}

impl PgPriceRepository {
  /// Upsert inside an already open connection, in one transaction.
  fn upsert_rows(conn: &mut DbConnection, rows: &[NewItemPrice]) -> RepositoryResult<usize> {
    use diesel::upsert::excluded;

    conn.transaction(|conn| {
      let mut total = 0;
      for chunk in rows.chunks(UPSERT_CHUNK_SIZE) {
        total += diesel::insert_into(item_prices::table)
          .values(chunk)
          .on_conflict((item_prices::tstamp, item_prices::item_id, item_prices::granularity))
          .do_update()
          .set((
            item_prices::avg_high_price.eq(excluded(item_prices::avg_high_price)),
            item_prices::high_price_volume.eq(excluded(item_prices::high_price_volume)),
            item_prices::avg_low_price.eq(excluded(item_prices::avg_low_price)),
            item_prices::low_price_volume.eq(excluded(item_prices::low_price_volume)),
          ))
          .execute(conn)?;
      }
      Ok(total)
    })
  }
}

#[async_trait]
impl PriceRepository for PgPriceRepository {
  async fn upsert(&self, batch: &[PriceObservation]) -> Result<usize, StorageFailure> {
    if batch.is_empty() {
      return Ok(0);
    }

    let rows: Vec<NewItemPrice> =
      collapse(batch).into_values().map(NewItemPrice::from).collect();
    let attempted = rows.len();

    let stored = self
      .context
      .run(move |conn| Self::upsert_rows(conn, &rows))
      .await
      .map_err(|source| {
        error!("Rolled back upsert of {} price records: {}", attempted, source);
        StorageFailure { attempted, source }
      })?;

    debug!("Upserted {} price records", stored);
    Ok(stored)
  }

  async fn count(&self, granularity: Option<Granularity>) -> RepositoryResult<i64> {
    self
      .context
      .run(move |conn| {
        let n = match granularity {
          Some(g) => item_prices::table
            .filter(item_prices::granularity.eq(g.as_str()))
            .count()
            .get_result(conn)?,
          None => item_prices::table.count().get_result(conn)?,
        };
        Ok(n)
      })
      .await
  }

  async fn latest(&self, granularity: Granularity) -> RepositoryResult<Option<DateTime<Utc>>> {
    self
      .context
      .run(move |conn| {
        let newest: Option<DateTime<Utc>> = item_prices::table
          .filter(item_prices::granularity.eq(granularity.as_str()))
          .select(diesel::dsl::max(item_prices::tstamp))
          .get_result(conn)?;
        Ok(newest)
      })
      .await
  }

  async fn snapshot(
    &self,
    granularity: Granularity,
    timestamp: DateTime<Utc>,
  ) -> RepositoryResult<Vec<PriceObservation>> {
    self
      .context
      .run(move |conn| {
        let rows: Vec<ItemPrice> = item_prices::table
          .filter(item_prices::granularity.eq(granularity.as_str()))
          .filter(item_prices::tstamp.eq(timestamp))
          .order(item_prices::item_id.asc())
          .select(ItemPrice::as_select())
          .load(conn)?;

        rows.into_iter().map(|row| row.into_observation().map_err(RepositoryError::from)).collect()
      })
      .await
  }
}

/// In-process [`PriceRepository`] with the same key and overwrite rules.
///
/// Backs `--dry-run` and tests. State lives only as long as the value.
#[derive(Default)]
pub struct MemoryPriceRepository {
  rows: Mutex<BTreeMap<ObservationKey, [Option<i64>; 4]>>,
}

impl MemoryPriceRepository {
  pub fn new() -> Self {
    Self::default()
  }

  /// All stored observations in key order
  pub async fn all(&self) -> Vec<PriceObservation> {
    self.rows.lock().await.iter().map(|(key, m)| observation_from(key, m)).collect()
  }
}

/// Last entry per key wins. A single `ON CONFLICT` statement cannot touch
/// the same row twice.
fn collapse(batch: &[PriceObservation]) -> BTreeMap<ObservationKey, &PriceObservation> {
  batch.iter().map(|obs| (obs.key(), obs)).collect()
}

fn observation_from(key: &ObservationKey, m: &[Option<i64>; 4]) -> PriceObservation {
  PriceObservation {
    timestamp: key.timestamp,
    item_id: key.item_id,
    granularity: key.granularity,
    avg_high_price: m[0],
    high_price_volume: m[1],
    avg_low_price: m[2],
    low_price_volume: m[3],
  }
}

#[async_trait]
impl PriceRepository for MemoryPriceRepository {
  async fn upsert(&self, batch: &[PriceObservation]) -> Result<usize, StorageFailure> {
    let unique = collapse(batch);
    let mut rows = self.rows.lock().await;
    for (key, obs) in &unique {
      rows.insert(*key, obs.measurements());
    }
    Ok(unique.len())
  }

  async fn count(&self, granularity: Option<Granularity>) -> RepositoryResult<i64> {
    let rows = self.rows.lock().await;
    let n = rows.keys().filter(|k| granularity.map_or(true, |g| k.granularity == g)).count();
    Ok(n as i64)
  }

  async fn latest(&self, granularity: Granularity) -> RepositoryResult<Option<DateTime<Utc>>> {
    let rows = self.rows.lock().await;
    Ok(rows.keys().filter(|k| k.granularity == granularity).map(|k| k.timestamp).max())
  }

  async fn snapshot(
    &self,
    granularity: Granularity,
    timestamp: DateTime<Utc>,
  ) -> RepositoryResult<Vec<PriceObservation>> {
    let rows = self.rows.lock().await;
    let mut out: Vec<PriceObservation> = rows
      .iter()
      .filter(|(k, _)| k.granularity == granularity && k.timestamp == timestamp)
      .map(|(k, m)| observation_from(k, m))
      .collect();
    out.sort_by_key(|o| o.item_id);
    Ok(out)
  }
}
