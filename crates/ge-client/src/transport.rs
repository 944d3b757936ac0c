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

//! HTTP transport layer for prices API requests

use ge_core::{Config, Error, Granularity, Result};
use reqwest::header::{HeaderMap, HeaderValue, FROM};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, error, instrument};
use url::Url;

/// HTTP transport layer for making requests to the prices API
pub struct Transport {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl Transport {
    /// Create a new transport instance
    ///
    /// The identifying header pair (`User-Agent`, `From`) is fixed here and
    /// sent with every request.
    pub fn new(config: &Config) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let contact = HeaderValue::from_str(&config.contact)
            .map_err(|e| Error::Config(format!("Invalid contact header value: {}", e)))?;
        headers.insert(FROM, contact);

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Http(format!("Failed to create HTTP client: {}", e)))?;

        Url::parse(&config.base_url)
            .map_err(|e| Error::Config(format!("Invalid base URL: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout(),
        })
    }

    /// Make a single GET request for one granularity and decode the body as JSON
    ///
    /// # Errors
    ///
    /// * `Error::Http` - the request could not be sent or the body not read
    /// * `Error::Status` - the API answered with a non-2xx status
    /// * `Error::Serde` - the body was not JSON
    #[instrument(skip(self), fields(granularity = %granularity))]
    pub async fn get_json(&self, granularity: Granularity) -> Result<serde_json::Value> {
        let url = self.endpoint_url(granularity)?;
        debug!("Making request to: {}", url);

        let response = self.make_request(&url).await?;
        let text = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("Failed to read response body: {}", e)))?;

        debug!("Response body length: {} bytes", text.len());

        serde_json::from_str(&text).map_err(|e| {
            error!(
                "Response is not JSON ({}); first 200 chars: {}",
                e,
                &text[..text.char_indices().nth(200).map_or(text.len(), |(i, _)| i)]
            );
            Error::Serde(e)
        })
    }

    /// Build the full URL for one granularity
    pub fn endpoint_url(&self, granularity: Granularity) -> Result<Url> {
        Url::parse(&format!("{}/{}", self.base_url, granularity))
            .map_err(|e| Error::Config(format!("Invalid endpoint URL: {}", e)))
    }

    /// Make the actual HTTP request
    async fn make_request(&self, url: &Url) -> Result<Response> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::Http(format!("Request failed: {}", e)))?;

        let status = response.status();

        if status.is_success() {
            debug!("Request successful with status: {}", status);
            Ok(response)
        } else {
            error!("Request failed with status: {}", status);
            Err(Error::Status { status: status.as_u16(), url: url.to_string() })
        }
    }

    /// Get the base URL being used
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get request timeout duration
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_config() -> Config {
        let mut config = Config::default_with_contact("@tester on Discord".to_string());
        config.base_url = "https://mock.prices.example/api/v1/osrs/".to_string();
        config
    }

    #[test]
    fn test_endpoint_url() {
        let transport = Transport::new(&mock_config()).unwrap();

        let url = transport.endpoint_url(Granularity::FiveMinutes).unwrap();
        assert_eq!(url.as_str(), "https://mock.prices.example/api/v1/osrs/5m");

        let url = transport.endpoint_url(Granularity::OneDay).unwrap();
        assert!(url.as_str().ends_with("/24h"));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let transport = Transport::new(&mock_config()).unwrap();
        assert_eq!(transport.base_url(), "https://mock.prices.example/api/v1/osrs");
        assert_eq!(transport.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_contact_with_newline_rejected() {
        let config = Config::default_with_contact("bad\ncontact".to_string());
        assert!(matches!(Transport::new(&config), Err(Error::Config(_))));
    }
}
