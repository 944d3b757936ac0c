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

//! Bounded retry with exponential backoff
//!
//! A [`RetryPolicy`] is a plain value: how many attempts in total, and the
//! delay before the second one. Each further attempt doubles the delay. No
//! sleep follows the last attempt.

use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::warn;

/// Returned when every attempt allowed by a [`RetryPolicy`] failed.
#[derive(Error, Debug)]
#[error("gave up after {attempts} attempt(s): {last_error}")]
pub struct Exhausted<E> {
  /// Attempts actually made
  pub attempts: u32,
  /// Error of the final attempt
  pub last_error: E,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  max_attempts: u32,
  base_delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self::new(3, Duration::from_secs(1))
  }
}

impl RetryPolicy {
  /// `max_attempts` is clamped to at least one.
  pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
    Self { max_attempts: max_attempts.max(1), base_delay }
  }

  /// A policy that tries exactly once.
  pub fn none() -> Self {
    Self::new(1, Duration::ZERO)
  }

  pub fn max_attempts(&self) -> u32 {
    self.max_attempts
  }

  pub fn base_delay(&self) -> Duration {
    self.base_delay
  }

  /// Delay to wait after the given (1-based) failed attempt.
  pub fn delay_after(&self, attempt: u32) -> Duration {
    2u32
      .checked_pow(attempt.saturating_sub(1))
      .and_then(|factor| self.base_delay.checked_mul(factor))
      .unwrap_or(Duration::MAX)
  }

  /// Run `op` until it succeeds or the attempts run out.
  ///
  /// `op` receives the 1-based attempt number.
  pub async fn run<T, E, F, Fut>(&self, op: F) -> Result<T, Exhausted<E>>
  where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
  {
    self.run_when(op, |_| true).await
  }

  /// Like [`RetryPolicy::run`], but stops early on errors `retryable` rejects.
  pub async fn run_when<T, E, F, Fut, P>(&self, mut op: F, retryable: P) -> Result<T, Exhausted<E>>
  where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
    P: Fn(&E) -> bool,
  {
    let mut attempt = 1;
    loop {
      match op(attempt).await {
        Ok(value) => return Ok(value),
        Err(e) if attempt >= self.max_attempts || !retryable(&e) => {
          return Err(Exhausted { attempts: attempt, last_error: e });
        }
        Err(e) => {
          let delay = self.delay_after(attempt);
          warn!(
            attempt,
            max_attempts = self.max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %e,
            "Attempt failed, backing off"
          );
          sleep(delay).await;
          attempt += 1;
        }
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};
  use tokio::time::Instant;

  #[test]
  fn test_delay_doubles() {
    let policy = RetryPolicy::new(4, Duration::from_secs(1));
    assert_eq!(policy.delay_after(1), Duration::from_secs(1));
    assert_eq!(policy.delay_after(2), Duration::from_secs(2));
    assert_eq!(policy.delay_after(3), Duration::from_secs(4));
  }

  #[test]
  fn test_delay_saturates() {
    let policy = RetryPolicy::new(100, Duration::from_secs(1));
    assert_eq!(policy.delay_after(80), Duration::MAX);
    assert_eq!(policy.delay_after(33), Duration::MAX);
    assert_eq!(policy.delay_after(32), Duration::from_secs(1 << 31));
  }

  #[test]
  fn test_zero_attempts_clamped() {
    assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts(), 1);
    assert_eq!(RetryPolicy::none().max_attempts(), 1);
  }

  #[tokio::test(start_paused = true)]
  async fn test_exhausts_after_max_attempts() {
    let calls = AtomicU32::new(0);
    let counter = &calls;
    let policy = RetryPolicy::new(3, Duration::from_secs(1));
    let started = Instant::now();

    let result: Result<(), _> = policy
      .run(|_| async move {
        counter.fetch_add(1, Ordering::SeqCst);
        Err::<(), _>("503")
      })
      .await;

    let err = result.unwrap_err();
    assert_eq!(err.attempts, 3);
    assert_eq!(err.last_error, "503");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    // 1s after the first failure, 2s after the second, none after the last
    assert_eq!(started.elapsed(), Duration::from_secs(3));
  }

  #[tokio::test(start_paused = true)]
  async fn test_succeeds_on_later_attempt() {
    let policy = RetryPolicy::new(3, Duration::from_secs(1));
    let result = policy
      .run(|attempt| async move { if attempt < 2 { Err("flaky") } else { Ok(attempt) } })
      .await;
    assert_eq!(result.unwrap(), 2);
  }

  #[tokio::test(start_paused = true)]
  async fn test_non_retryable_error_stops_early() {
    let calls = AtomicU32::new(0);
    let counter = &calls;
    let policy = RetryPolicy::new(5, Duration::from_secs(1));
    let result: Result<(), _> = policy
      .run_when(
        |_| async move {
          counter.fetch_add(1, Ordering::SeqCst);
          Err::<(), _>("fatal")
        },
        |e| *e != "fatal",
      )
      .await;
    assert_eq!(result.unwrap_err().attempts, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[test]
  fn test_exhausted_display() {
    let err = Exhausted { attempts: 3, last_error: "boom" };
    assert_eq!(err.to_string(), "gave up after 3 attempt(s): boom");
  }
}
