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

//! Prices API client with bounded retry

use crate::transport::Transport;
use async_trait::async_trait;
use ge_core::{Config, Error, Exhausted, Granularity, Result, RetryPolicy};
use ge_models::RawPayload;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// A fetch that ran out of attempts.
///
/// Not fatal: callers treat it as "no data this cycle".
#[derive(Error, Debug)]
#[error("fetch of {granularity} prices failed after {attempts} attempt(s): {source}")]
pub struct FetchFailure {
  /// Granularity that was being fetched
  pub granularity: Granularity,
  /// Attempts made before giving up
  pub attempts: u32,
  /// Error of the last attempt
  #[source]
  pub source: Error,
}

/// Anything that can produce one raw price payload per granularity.
///
/// [`PriceClient`] is the real implementation; the seam exists so ingestion
/// can be driven by canned payloads.
#[async_trait]
pub trait PriceSource: Send + Sync {
  /// Fetch the current snapshot for `granularity`
  async fn fetch(&self, granularity: Granularity) -> std::result::Result<RawPayload, FetchFailure>;
}

/// Prices API client
///
/// Wraps the [`Transport`] with a bounded [`RetryPolicy`]: transport errors
/// and non-2xx statuses are retried with exponential backoff, a body that is
/// not JSON is handed on as an empty payload.
///
/// # Examples
///
/// ```ignore
/// use ge_client::{PriceClient, PriceSource};
/// use ge_core::{Config, Granularity};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::from_env()?;
///     let client = PriceClient::new(&config)?;
///
///     let payload = client.fetch(Granularity::FiveMinutes).await?;
///     println!("fetched at {}", payload.fetched_at);
///
///     Ok(())
/// }
/// ```
pub struct PriceClient {
  transport: Arc<Transport>,
  retry: RetryPolicy,
}

impl PriceClient {
  /// Create a new client from configuration
  ///
  /// # Errors
  ///
  /// Returns an error if the HTTP client cannot be created.
  pub fn new(config: &Config) -> Result<Self> {
    Ok(Self { transport: Arc::new(Transport::new(config)?), retry: config.retry_policy() })
  }

  /// Replace the retry policy
  pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  /// Retry policy applied to each fetch
  pub fn retry_policy(&self) -> RetryPolicy {
    self.retry
  }

  /// Underlying transport
  pub fn transport(&self) -> &Transport {
    &self.transport
  }
}

#[async_trait]
impl PriceSource for PriceClient {
  #[instrument(skip(self), fields(granularity = %granularity))]
  async fn fetch(&self, granularity: Granularity) -> std::result::Result<RawPayload, FetchFailure> {
    let transport = &self.transport;
    let outcome = self
      .retry
      .run_when(move |_attempt| async move { transport.get_json(granularity).await }, Error::is_transient)
      .await;

    match outcome {
      Ok(body) => {
        info!("Successfully fetched {} data", granularity);
        Ok(RawPayload::new(body))
      }
      Err(Exhausted { last_error: Error::Serde(e), .. }) => {
        warn!("Discarding non-JSON {} response: {}", granularity, e);
        Ok(RawPayload::empty())
      }
      Err(Exhausted { attempts, last_error }) => {
        Err(FetchFailure { granularity, attempts, source: last_error })
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  #[test]
  fn test_client_uses_config_retry_policy() {
    let config = Config::default_with_contact("@tester".to_string());
    let client = PriceClient::new(&config).unwrap();
    assert_eq!(client.retry_policy(), RetryPolicy::new(3, Duration::from_secs(1)));
  }

  #[test]
  fn test_with_retry_policy() {
    let config = Config::default_with_contact("@tester".to_string());
    let client = PriceClient::new(&config).unwrap().with_retry_policy(RetryPolicy::none());
    assert_eq!(client.retry_policy().max_attempts(), 1);
  }

  #[test]
  fn test_fetch_failure_display() {
    let failure = FetchFailure {
      granularity: Granularity::FiveMinutes,
      attempts: 3,
      source: Error::Status { status: 503, url: "http://x/5m".to_string() },
    };
    assert_eq!(
      failure.to_string(),
      "fetch of 5m prices failed after 3 attempt(s): Unexpected status 503 from http://x/5m"
    );
  }
}
