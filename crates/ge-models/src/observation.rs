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

use chrono::{DateTime, Utc};
use ge_core::Granularity;
use serde::{Deserialize, Serialize};

/// Uniqueness key of a stored observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObservationKey {
  pub timestamp: DateTime<Utc>,
  pub item_id: i32,
  pub granularity: Granularity,
}

/// One item's trade summary for one snapshot of one granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
  pub timestamp: DateTime<Utc>,
  pub item_id: i32,
  pub granularity: Granularity,
  pub avg_high_price: Option<i64>,
  pub high_price_volume: Option<i64>,
  pub avg_low_price: Option<i64>,
  pub low_price_volume: Option<i64>,
}

impl PriceObservation {
  pub fn key(&self) -> ObservationKey {
    ObservationKey { timestamp: self.timestamp, item_id: self.item_id, granularity: self.granularity }
  }

  /// The four measurement fields, in column order.
  pub fn measurements(&self) -> [Option<i64>; 4] {
    [self.avg_high_price, self.high_price_volume, self.avg_low_price, self.low_price_volume]
  }
}
