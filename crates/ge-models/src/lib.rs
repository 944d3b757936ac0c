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

//! # ge-models
//!
//! Data models for the GE price tracker.
//!
//! Two layers live here:
//!
//! - **Wire types** (`prices` module): the JSON envelope served by the prices
//!   API for a single granularity (`{"timestamp": ..., "data": {...}}`) and the
//!   per-item field set.
//! - **Canonical types**: [`PriceObservation`], the unit the rest of the
//!   pipeline persists, keyed by `(timestamp, item_id, granularity)`.
//!
//! ## Usage
//!
//! ```ignore
//! use ge_models::prices::PriceEnvelope;
//!
//! let envelope: PriceEnvelope = serde_json::from_value(payload.body.clone())?;
//! println!("{} items at {}", envelope.data.len(), envelope.timestamp);
//! ```

#![warn(clippy::all)]

pub mod observation;
pub mod prices;

pub use observation::{ObservationKey, PriceObservation};
pub use prices::{ItemFields, PriceEnvelope, RawPayload};
