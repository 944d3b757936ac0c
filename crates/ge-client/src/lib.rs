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

//! # ge-client
//!
//! Client for the OSRS Wiki real-time prices API, with no database dependencies.
//!
//! ## Features
//!
//! - **Identifying headers**: every request carries `User-Agent` and `From`
//! - **Bounded retry**: transport errors and non-2xx statuses are retried with
//!   exponential backoff, then reported as a [`FetchFailure`]
//! - **Lenient bodies**: payloads stay untyped JSON so normalization can skip
//!   bad entries instead of rejecting whole responses
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ge_client::{PriceClient, PriceSource};
//! use ge_core::{Config, Granularity};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let client = PriceClient::new(&config)?;
//!
//!     let payload = client.fetch(Granularity::OneHour).await?;
//!     println!("{}", payload.body);
//!
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod transport;

pub use client::{FetchFailure, PriceClient, PriceSource};
pub use ge_core::{Config, Error, Granularity, Result};
pub use ge_models::RawPayload;
