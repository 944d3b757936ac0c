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

//! Raw price payload to canonical observations
//!
//! Tolerant by construction: a payload that is not a price envelope yields
//! nothing, a bad item is skipped, and neither is an error.

use crate::PipelineError;
use chrono::{TimeZone, Utc};
use ge_core::Granularity;
use ge_models::{ItemFields, PriceEnvelope, PriceObservation, RawPayload};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// An item entry that did not make it into the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
  /// The item key exactly as it appeared in `data`
  pub key: String,
  pub reason: String,
}

/// Result of normalizing one payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
  /// One observation per valid item, ordered by `item_id`
  pub observations: Vec<PriceObservation>,
  pub skipped: Vec<SkippedEntry>,
}

impl Normalized {
  pub fn is_empty(&self) -> bool {
    self.observations.is_empty()
  }
}

/// Turn one API response into observations sharing its timestamp and
/// `granularity`.
pub fn normalize(payload: &RawPayload, granularity: Granularity) -> Normalized {
  if payload.body.is_null() {
    debug!(granularity = %granularity, "Empty payload, nothing to normalize");
    return Normalized::default();
  }

  let envelope = match PriceEnvelope::deserialize(&payload.body) {
    Ok(envelope) => envelope,
    Err(e) => {
      warn!(granularity = %granularity, "{}", PipelineError::DataShape(e.to_string()));
      return Normalized::default();
    }
  };

  let Some(timestamp) = Utc.timestamp_opt(envelope.timestamp, 0).single() else {
    let err = PipelineError::DataShape(format!("timestamp {} out of range", envelope.timestamp));
    warn!(granularity = %granularity, "{}", err);
    return Normalized::default();
  };

  let mut by_id: BTreeMap<i32, PriceObservation> = BTreeMap::new();
  let mut skipped = Vec::new();

  for (key, value) in envelope.data {
    let parsed = key
      .parse::<i32>()
      .map_err(|e| format!("item id '{}' is not an integer: {}", key, e))
      .and_then(|item_id| parse_fields(value).map(|fields| (item_id, fields)));

    let outcome = parsed.and_then(|(item_id, fields)| {
      if by_id.contains_key(&item_id) {
        return Err(format!("duplicate item id {}", item_id));
      }
      by_id.insert(
        item_id,
        PriceObservation {
          timestamp,
          item_id,
          granularity,
          avg_high_price: fields.avg_high_price,
          high_price_volume: fields.high_price_volume,
          avg_low_price: fields.avg_low_price,
          low_price_volume: fields.low_price_volume,
        },
      );
      Ok(())
    });

    if let Err(reason) = outcome {
      warn!(granularity = %granularity, item = %key, "Skipping entry: {}", reason);
      skipped.push(SkippedEntry { key, reason });
    }
  }

  debug!(
    granularity = %granularity,
    records = by_id.len(),
    skipped = skipped.len(),
    "Normalized payload"
  );

  Normalized { observations: by_id.into_values().collect(), skipped }
}

fn parse_fields(value: serde_json::Value) -> Result<ItemFields, String> {
  if !value.is_object() {
    return Err(format!("field set is not an object: {}", value));
  }
  serde_json::from_value(value).map_err(|e| format!("bad field set: {}", e))
}
