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

//! Configuration management for the prices API client

use crate::error::{Error, Result};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Main configuration struct for the prices API client
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
  /// Base URL of the prices API, without the granularity segment
  pub base_url: String,

  /// Sent as `User-Agent`; the API asks clients to identify themselves
  pub user_agent: String,

  /// Sent as `From`; a way for the API operators to reach us
  pub contact: String,

  /// Request timeout in seconds
  pub timeout_secs: u64,

  /// Total attempts per fetch, first try included
  pub max_retries: u32,

  /// Backoff before the second attempt, doubled for each one after
  pub retry_base_delay_ms: u64,
}

impl Config {
  /// Load configuration from environment variables (and `.env`, if present)
  pub fn from_env() -> Result<Self> {
    dotenv().ok();
    Self::from_lookup(|key| env::var(key).ok())
  }

  /// Build the configuration from an arbitrary key lookup.
  pub fn from_lookup<F>(lookup: F) -> Result<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let contact = lookup("GE_CONTACT")
      .filter(|v| !v.trim().is_empty())
      .ok_or_else(|| Error::Config("GE_CONTACT not set".to_string()))?;

    let base_url = lookup("GE_API_BASE_URL").unwrap_or_else(|| crate::PRICES_API_BASE_URL.to_string());
    Url::parse(&base_url)
      .map_err(|e| Error::Config(format!("Invalid GE_API_BASE_URL '{}': {}", base_url, e)))?;

    let user_agent = lookup("GE_USER_AGENT").unwrap_or_else(|| crate::DEFAULT_USER_AGENT.to_string());

    let timeout_secs = parse_or(&lookup, "GE_TIMEOUT_SECS", 30)?;
    let max_retries = parse_or(&lookup, "GE_MAX_RETRIES", 3)?;
    let retry_base_delay_ms = parse_or(&lookup, "GE_RETRY_BASE_MS", 1000)?;

    if timeout_secs == 0 {
      return Err(Error::Config("GE_TIMEOUT_SECS must be at least 1".to_string()));
    }
    if max_retries == 0 {
      return Err(Error::Config("GE_MAX_RETRIES must be at least 1".to_string()));
    }

    Ok(Config {
      base_url: base_url.trim_end_matches('/').to_string(),
      user_agent,
      contact,
      timeout_secs,
      max_retries,
      retry_base_delay_ms,
    })
  }

  /// Create a config with default values (for testing)
  pub fn default_with_contact(contact: String) -> Self {
    Config {
      base_url: crate::PRICES_API_BASE_URL.to_string(),
      user_agent: crate::DEFAULT_USER_AGENT.to_string(),
      contact,
      timeout_secs: 30,
      max_retries: 3,
      retry_base_delay_ms: 1000,
    }
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.timeout_secs)
  }

  pub fn retry_policy(&self) -> crate::RetryPolicy {
    crate::RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_base_delay_ms))
  }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
  F: Fn(&str) -> Option<String>,
  T: FromStr,
{
  match lookup(key) {
    Some(raw) => raw.trim().parse().map_err(|_| Error::Config(format!("Invalid {}", key))),
    None => Ok(default),
  }
}
