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

use ge_client::{Error, PriceClient, PriceSource};
use ge_core::{Config, Granularity, RetryPolicy};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> PriceClient {
  let mut config = Config::default_with_contact("@tester on Discord".to_string());
  config.base_url = format!("{}/api/v1/osrs", server.uri());
  config.user_agent = "ge-tracker-tests".to_string();
  PriceClient::new(&config)
    .unwrap()
    .with_retry_policy(RetryPolicy::new(3, Duration::from_millis(10)))
}

#[tokio::test]
async fn test_fetch_sends_identifying_headers() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/api/v1/osrs/5m"))
    .and(header("User-Agent", "ge-tracker-tests"))
    .and(header("From", "@tester on Discord"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({
      "timestamp": 1700000100,
      "data": {"2": {"avgHighPrice": 180, "highPriceVolume": 10, "avgLowPrice": null, "lowPriceVolume": 0}}
    })))
    .expect(1)
    .mount(&server)
    .await;

  let payload = client_for(&server).fetch(Granularity::FiveMinutes).await.unwrap();
  assert_eq!(payload.body["timestamp"], json!(1700000100));
  assert_eq!(payload.body["data"]["2"]["avgHighPrice"], json!(180));
}

#[tokio::test]
async fn test_fetch_gives_up_after_three_503s() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/api/v1/osrs/1h"))
    .respond_with(ResponseTemplate::new(503))
    .expect(3)
    .mount(&server)
    .await;

  let failure = client_for(&server).fetch(Granularity::OneHour).await.unwrap_err();
  assert_eq!(failure.granularity, Granularity::OneHour);
  assert_eq!(failure.attempts, 3);
  assert!(matches!(failure.source, Error::Status { status: 503, .. }));
}

#[tokio::test]
async fn test_fetch_recovers_after_transient_errors() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/api/v1/osrs/5m"))
    .respond_with(ResponseTemplate::new(502))
    .up_to_n_times(2)
    .with_priority(1)
    .mount(&server)
    .await;
  Mock::given(method("GET"))
    .and(path("/api/v1/osrs/5m"))
    .respond_with(ResponseTemplate::new(200).set_body_json(json!({"timestamp": 100, "data": {}})))
    .expect(1)
    .mount(&server)
    .await;

  let payload = client_for(&server).fetch(Granularity::FiveMinutes).await.unwrap();
  assert_eq!(payload.body, json!({"timestamp": 100, "data": {}}));
}

#[tokio::test]
async fn test_non_json_body_is_empty_payload_without_retry() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/api/v1/osrs/5m"))
    .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
    .expect(1)
    .mount(&server)
    .await;

  let payload = client_for(&server).fetch(Granularity::FiveMinutes).await.unwrap();
  assert!(payload.body.is_null());
}

#[tokio::test]
async fn test_client_error_status_is_also_retried() {
  let server = MockServer::start().await;
  Mock::given(method("GET"))
    .and(path("/api/v1/osrs/24h"))
    .respond_with(ResponseTemplate::new(429))
    .expect(3)
    .mount(&server)
    .await;

  let failure = client_for(&server).fetch(Granularity::OneDay).await.unwrap_err();
  assert_eq!(failure.attempts, 3);
}
