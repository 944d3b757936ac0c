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

use anyhow::{Context, Result};
use ge_core::{Config as CoreConfig, Granularity, DEFAULT_GRANULARITIES};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
  pub api_config: CoreConfig,
  pub database_url: Option<String>,
  pub granularities: Vec<Granularity>,
  pub health_check_secs: u64,
  pub pool_size: u32,
}

impl Config {
  pub fn from_env() -> Result<Self> {
    Self::from_lookup(|key| env::var(key).ok())
  }

  pub fn from_lookup<F>(lookup: F) -> Result<Self>
  where
    F: Fn(&str) -> Option<String>,
  {
    let api_config = CoreConfig::from_lookup(&lookup).context("Invalid prices API configuration")?;

    let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

    let granularities = match lookup("GE_GRANULARITIES") {
      Some(list) => Granularity::parse_list(&list).context("Invalid GE_GRANULARITIES")?,
      None => DEFAULT_GRANULARITIES.to_vec(),
    };

    let health_check_secs = parse_or(&lookup, "GE_HEALTH_CHECK_SECS", 60)?;
    let pool_size = parse_or(&lookup, "GE_DB_POOL_SIZE", 10)?;

    Ok(Self { api_config, database_url, granularities, health_check_secs, pool_size })
  }

  pub fn require_database_url(&self) -> Result<&str> {
    self.database_url.as_deref().context("DATABASE_URL environment variable not set")
  }
}

/// `DATABASE_URL` alone, for commands that never talk to the prices API.
pub fn database_url() -> Result<String> {
  env::var("DATABASE_URL").context("DATABASE_URL environment variable not set")
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
  F: Fn(&str) -> Option<String>,
  T: FromStr,
{
  match lookup(key) {
    Some(raw) => raw.trim().parse().ok().with_context(|| format!("Invalid {}: '{}'", key, raw)),
    None => Ok(default),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> =
      pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |key| map.get(key).cloned()
  }

  #[test]
  fn test_defaults() {
    let config = Config::from_lookup(lookup_from(&[("GE_CONTACT", "@me")])).unwrap();
    assert_eq!(config.granularities, vec![Granularity::FiveMinutes, Granularity::OneHour]);
    assert_eq!(config.health_check_secs, 60);
    assert_eq!(config.pool_size, 10);
    assert!(config.database_url.is_none());
    assert!(config.require_database_url().is_err());
  }

  #[test]
  fn test_overrides() {
    let config = Config::from_lookup(lookup_from(&[
      ("GE_CONTACT", "@me"),
      ("DATABASE_URL", "postgres://localhost/ge"),
      ("GE_GRANULARITIES", "1h,24h"),
      ("GE_HEALTH_CHECK_SECS", "15"),
      ("GE_DB_POOL_SIZE", "4"),
    ]))
    .unwrap();
    assert_eq!(config.require_database_url().unwrap(), "postgres://localhost/ge");
    assert_eq!(config.granularities, vec![Granularity::OneHour, Granularity::OneDay]);
    assert_eq!(config.health_check_secs, 15);
    assert_eq!(config.pool_size, 4);
  }

  #[test]
  fn test_missing_contact_is_fatal() {
    let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
    assert!(format!("{:#}", err).contains("GE_CONTACT"));
  }

  #[test]
  fn test_bad_values_are_fatal() {
    assert!(Config::from_lookup(lookup_from(&[("GE_CONTACT", "@me"), ("GE_GRANULARITIES", "2m")]))
      .is_err());
    assert!(Config::from_lookup(lookup_from(&[("GE_CONTACT", "@me"), ("GE_DB_POOL_SIZE", "many")]))
      .is_err());
  }
}
