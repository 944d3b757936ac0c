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
use diesel::prelude::*;
use ge_core::Granularity;
use ge_models::PriceObservation;

use crate::schema::item_prices;

#[derive(Queryable, Selectable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = item_prices)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ItemPrice {
  pub tstamp: DateTime<Utc>,
  pub item_id: i32,
  pub granularity: String,
  pub avg_high_price: Option<i64>,
  pub high_price_volume: Option<i64>,
  pub avg_low_price: Option<i64>,
  pub low_price_volume: Option<i64>,
}

impl ItemPrice {
  /// Back to the canonical form. Fails only on a granularity tag this
  /// version does not know.
  pub fn into_observation(self) -> ge_core::Result<PriceObservation> {
    let granularity: Granularity = self.granularity.parse()?;
    Ok(PriceObservation {
      timestamp: self.tstamp,
      item_id: self.item_id,
      granularity,
      avg_high_price: self.avg_high_price,
      high_price_volume: self.high_price_volume,
      avg_low_price: self.avg_low_price,
      low_price_volume: self.low_price_volume,
    })
  }
}

#[derive(Insertable, Debug, Clone, PartialEq, Eq)]
#[diesel(table_name = item_prices)]
pub struct NewItemPrice {
  pub tstamp: DateTime<Utc>,
  pub item_id: i32,
  pub granularity: String,
  pub avg_high_price: Option<i64>,
  pub high_price_volume: Option<i64>,
  pub avg_low_price: Option<i64>,
  pub low_price_volume: Option<i64>,
}

impl From<&PriceObservation> for NewItemPrice {
  fn from(obs: &PriceObservation) -> Self {
    Self {
      tstamp: obs.timestamp,
      item_id: obs.item_id,
      granularity: obs.granularity.as_str().to_string(),
      avg_high_price: obs.avg_high_price,
      high_price_volume: obs.high_price_volume,
      avg_low_price: obs.avg_low_price,
      low_price_volume: obs.low_price_volume,
    }
  }
}
