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

pub mod config;
pub mod error;
pub mod retry;

pub use config::Config;
pub use error::{Error, Result};
pub use retry::{Exhausted, RetryPolicy};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Sampling interval published by the prices API.
///
/// The tag doubles as the path segment of the endpoint (`<base>/5m`) and as
/// the value stored in the `time_interval` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Granularity {
  #[serde(rename = "5m")]
  FiveMinutes,
  #[serde(rename = "1h")]
  OneHour,
  #[serde(rename = "6h")]
  SixHours,
  #[serde(rename = "24h")]
  OneDay,
}

impl Granularity {
  /// Every granularity the API serves, shortest first.
  pub const ALL: [Granularity; 4] =
    [Granularity::FiveMinutes, Granularity::OneHour, Granularity::SixHours, Granularity::OneDay];

  pub fn as_str(&self) -> &'static str {
    match self {
      Granularity::FiveMinutes => "5m",
      Granularity::OneHour => "1h",
      Granularity::SixHours => "6h",
      Granularity::OneDay => "24h",
    }
  }

  /// How often a fresh snapshot appears upstream, and so how often it is polled.
  pub fn cadence(&self) -> Duration {
    match self {
      Granularity::FiveMinutes => Duration::from_secs(5 * 60),
      Granularity::OneHour => Duration::from_secs(60 * 60),
      Granularity::SixHours => Duration::from_secs(6 * 60 * 60),
      Granularity::OneDay => Duration::from_secs(24 * 60 * 60),
    }
  }

  /// Parse a comma separated list such as `"5m,1h"`, dropping repeats.
  pub fn parse_list(s: &str) -> Result<Vec<Granularity>> {
    let mut out = Vec::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
      let g: Granularity = part.parse()?;
      if !out.contains(&g) {
        out.push(g);
      }
    }
    if out.is_empty() {
      return Err(Error::Config(format!("no granularity in '{}'", s)));
    }
    Ok(out)
  }
}

impl fmt::Display for Granularity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Granularity {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "5m" => Ok(Granularity::FiveMinutes),
      "1h" => Ok(Granularity::OneHour),
      "6h" => Ok(Granularity::SixHours),
      "24h" => Ok(Granularity::OneDay),
      other => Err(Error::Config(format!("unknown granularity '{}'", other))),
    }
  }
}

/// Base URL of the OSRS Wiki real-time prices API
pub const PRICES_API_BASE_URL: &str = "https://prices.runescape.wiki/api/v1/osrs";

/// Default `User-Agent` sent with every request
pub const DEFAULT_USER_AGENT: &str = "osrs_ge_price_tracker";

/// Granularities polled when none are configured
pub const DEFAULT_GRANULARITIES: [Granularity; 2] = [Granularity::FiveMinutes, Granularity::OneHour];

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_granularity_tags_round_trip_through_from_str() {
    for g in Granularity::ALL {
      assert_eq!(g.as_str().parse::<Granularity>().unwrap(), g);
    }
  }

  #[test]
  fn test_unknown_granularity_is_config_error() {
    let err = "15m".parse::<Granularity>().unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains("15m"));
  }

  #[test]
  fn test_cadence() {
    assert_eq!(Granularity::FiveMinutes.cadence(), Duration::from_secs(300));
    assert_eq!(Granularity::OneHour.cadence(), Duration::from_secs(3600));
    assert_eq!(Granularity::OneDay.cadence(), Duration::from_secs(86_400));
  }

  #[test]
  fn test_parse_list_trims_and_dedups() {
    let list = Granularity::parse_list(" 5m, 1h,5m ,").unwrap();
    assert_eq!(list, vec![Granularity::FiveMinutes, Granularity::OneHour]);
  }

  #[test]
  fn test_parse_list_rejects_empty() {
    assert!(Granularity::parse_list(" , ").is_err());
    assert!(Granularity::parse_list("5m,2h").is_err());
  }

  #[test]
  fn test_serde_uses_api_tags() {
    let json = serde_json::to_string(&Granularity::OneDay).unwrap();
    assert_eq!(json, "\"24h\"");
    let back: Granularity = serde_json::from_str("\"1h\"").unwrap();
    assert_eq!(back, Granularity::OneHour);
  }
}
