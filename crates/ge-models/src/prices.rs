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

//! Wire models for the `/5m`, `/1h`, `/6h` and `/24h` price endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Body of one API response, as received.
///
/// The body is kept as untyped JSON: deciding what is malformed, and what to
/// do about it, belongs to normalization rather than transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPayload {
  /// Decoded response body (`Null` when the body was not JSON)
  pub body: serde_json::Value,

  /// When the response arrived
  pub fetched_at: DateTime<Utc>,
}

impl RawPayload {
  pub fn new(body: serde_json::Value) -> Self {
    Self { body, fetched_at: Utc::now() }
  }

  /// A payload carrying nothing usable.
  pub fn empty() -> Self {
    Self::new(serde_json::Value::Null)
  }
}

/// Top level of a price response.
///
/// Entries of `data` stay untyped here so that a single bad item can be
/// skipped without rejecting the whole response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceEnvelope {
  /// Unix seconds at which the snapshot was produced
  pub timestamp: i64,

  /// Item id (as a string key) to its field set
  pub data: BTreeMap<String, serde_json::Value>,
}

/// Field set of one item. Absent and `null` both mean "no trades".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFields {
  #[serde(default)]
  pub avg_high_price: Option<i64>,

  #[serde(default)]
  pub high_price_volume: Option<i64>,

  #[serde(default)]
  pub avg_low_price: Option<i64>,

  #[serde(default)]
  pub low_price_volume: Option<i64>,
}
