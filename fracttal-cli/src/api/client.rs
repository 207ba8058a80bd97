//! HTTP client for the Fracttal meter endpoints
//!
//! Every call isolates its own failures: authentication yields a bool, lookups
//! an `Option`, updates a [`MeterUpdateResult`]. Nothing here returns an error
//! to the caller once the client has been built.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, FixedOffset, Utc};
use log::{debug, warn};
use reqwest::StatusCode;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;

use super::models::{MeterListResponse, MeterReadingPayload, MeterUpdateResult, TokenResponse};
use super::resilience::{RetryConfig, with_retry};
use crate::config::{ApiConfig, Credentials};

mod endpoints {
    pub const METERS: &str = "/api/meters";
    pub const METER_READING: &str = "/api/meter_reading";
}

/// Operations the update pipeline needs from the remote platform
#[async_trait]
pub trait MeterApi: Send + Sync {
    /// Obtain and store a bearer token. Must succeed before any other call.
    async fn authenticate(&mut self) -> bool;

    /// Last accumulated value for an asset.
    ///
    /// `None` covers both "no meter" and "request failed"; callers cannot tell them apart.
    async fn get_meter_value(&self, asset_id: &str) -> Option<f64>;

    /// Submit a new accumulated value; `timestamp` defaults to now
    async fn update_meter(
        &self,
        asset_id: &str,
        new_value: f64,
        is_historical: bool,
        timestamp: Option<DateTime<FixedOffset>>,
    ) -> MeterUpdateResult;
}

/// Fracttal REST client
pub struct FracttalClient {
    http: reqwest::Client,
    credentials: Credentials,
    auth_url: String,
    base_url: String,
    offset: FixedOffset,
    retry: RetryConfig,
    token: Option<String>,
}

impl FracttalClient {
    pub fn new(config: &ApiConfig, credentials: Credentials) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        let retry = config.retry_config();
        if retry.is_enabled() {
            debug!(
                "Retrying transport failures up to {} attempts, {:?} apart",
                retry.max_attempts, retry.delay
            );
        }

        Ok(Self {
            http,
            credentials,
            auth_url: config.auth_url.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            offset: config.utc_offset()?,
            retry,
            token: None,
        })
    }

    fn basic_auth_value(&self) -> String {
        let raw = format!("{}:{}", self.credentials.api_key, self.credentials.api_secret);
        format!("Basic {}", general_purpose::STANDARD.encode(raw))
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// Render a reading timestamp in the configured offset, e.g. `2024-05-01T10:00:00-03:00`
    pub fn format_timestamp(&self, timestamp: Option<DateTime<FixedOffset>>) -> String {
        let local = match timestamp {
            Some(ts) => ts.with_timezone(&self.offset),
            None => Utc::now().with_timezone(&self.offset),
        };
        local.format("%Y-%m-%dT%H:%M:%S%:z").to_string()
    }
}

#[async_trait]
impl MeterApi for FracttalClient {
    async fn authenticate(&mut self) -> bool {
        let auth_value = self.basic_auth_value();
        debug!("POST {}", self.auth_url);

        let response = with_retry(&self.retry, "authentication", || {
            self.http
                .post(&self.auth_url)
                .header(AUTHORIZATION, &auth_value)
                .form(&[("grant_type", "client_credentials")])
                .send()
        })
        .await
        .and_then(|r| r.error_for_status());

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!("Authentication error: {}", e);
                return false;
            }
        };

        match response.json::<TokenResponse>().await {
            Ok(TokenResponse {
                access_token: Some(token),
            }) => {
                self.token = Some(token);
                true
            }
            Ok(_) => {
                warn!("Authentication response did not contain an access token");
                false
            }
            Err(e) => {
                warn!("Authentication response could not be parsed: {}", e);
                false
            }
        }
    }

    async fn get_meter_value(&self, asset_id: &str) -> Option<f64> {
        let Some(token) = self.token.as_deref() else {
            warn!("Meter lookup for {} attempted before authentication", asset_id);
            return None;
        };
        let url = self.url(endpoints::METERS);
        debug!("GET {}?serial={}", url, asset_id);

        let response = with_retry(&self.retry, "meter lookup", || {
            self.http
                .get(&url)
                .query(&[("serial", asset_id)])
                .bearer_auth(token)
                .send()
        })
        .await
        .and_then(|r| r.error_for_status());

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!("Error getting meter for {}: {}", asset_id, e);
                return None;
            }
        };

        match response.json::<MeterListResponse>().await {
            Ok(meters) => meters.accumulated_value(),
            Err(e) => {
                warn!("Unexpected meter response for {}: {}", asset_id, e);
                None
            }
        }
    }

    async fn update_meter(
        &self,
        asset_id: &str,
        new_value: f64,
        is_historical: bool,
        timestamp: Option<DateTime<FixedOffset>>,
    ) -> MeterUpdateResult {
        let Some(token) = self.token.as_deref() else {
            return MeterUpdateResult::failed("Not authenticated with Fracttal");
        };

        let payload = MeterReadingPayload {
            date: self.format_timestamp(timestamp),
            value: new_value,
            serial: asset_id.to_string(),
            is_historical,
        };
        let url = self.url(endpoints::METER_READING);
        debug!("PUT {}?code={} {:?}", url, asset_id, payload);

        let response = with_retry(&self.retry, "meter update", || {
            self.http
                .put(&url)
                .query(&[("code", asset_id)])
                .bearer_auth(token)
                .json(&payload)
                .send()
        })
        .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                return MeterUpdateResult::failed(format!("Exception while updating meter: {}", e));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return MeterUpdateResult::failed(format!("Failed to read update response: {}", e));
            }
        };

        if status != StatusCode::OK {
            return MeterUpdateResult::failed(format!("HTTP error {}: {}", status.as_u16(), body));
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(data) if data.get("success").and_then(Value::as_bool) == Some(true) => {
                MeterUpdateResult::ok("Meter updated successfully.")
            }
            Ok(data) => {
                MeterUpdateResult::failed(format!("Error reported by Fracttal: {}", data))
            }
            Err(_) => {
                MeterUpdateResult::failed(format!("Unexpected response from Fracttal: {}", body))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> ApiConfig {
        ApiConfig {
            auth_url: format!("{}/oauth/token", server.uri()),
            base_url: format!("{}/", server.uri()),
            ..ApiConfig::default()
        }
    }

    fn client_for(server: &MockServer) -> FracttalClient {
        FracttalClient::new(&config_for(server), Credentials::new("key", "secret")).unwrap()
    }

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok" })),
            )
            .mount(server)
            .await;
    }

    async fn authenticated_client(server: &MockServer) -> FracttalClient {
        mount_token(server).await;
        let mut client = client_for(server);
        assert!(client.authenticate().await);
        client
    }

    #[tokio::test]
    async fn test_authenticate_sends_client_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(header("authorization", "Basic a2V5OnNlY3JldA=="))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string("grant_type=client_credentials"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client_for(&server);
        assert!(client.authenticate().await);
        assert_eq!(client.token.as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_authenticate_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
            .mount(&server)
            .await;

        let mut client = client_for(&server);
        assert!(!client.authenticate().await);
        assert!(client.token.is_none());
    }

    #[tokio::test]
    async fn test_authenticate_without_token_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "token_type": "bearer" })),
            )
            .mount(&server)
            .await;

        let mut client = client_for(&server);
        assert!(!client.authenticate().await);
    }

    #[tokio::test]
    async fn test_authenticate_unreachable_host() {
        let config = ApiConfig {
            auth_url: "http://127.0.0.1:9/oauth/token".to_string(),
            ..ApiConfig::default()
        };
        let mut client = FracttalClient::new(&config, Credentials::new("k", "s")).unwrap();
        assert!(!client.authenticate().await);
    }

    #[tokio::test]
    async fn test_get_meter_value() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/meters"))
            .and(query_param("serial", "ER-1022"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [ { "last_data": { "accumulated_value": 1000.0 } } ]
            })))
            .mount(&server)
            .await;

        let client = authenticated_client(&server).await;
        assert_eq!(client.get_meter_value("ER-1022").await, Some(1000.0));
    }

    #[tokio::test]
    async fn test_get_meter_value_empty_and_error_are_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("serial", "EMPTY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("serial", "BROKEN"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = authenticated_client(&server).await;
        assert_eq!(client.get_meter_value("EMPTY").await, None);
        assert_eq!(client.get_meter_value("BROKEN").await, None);
    }

    #[tokio::test]
    async fn test_calls_before_authentication_make_no_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.get_meter_value("ER-1").await, None);
        assert!(!client.update_meter("ER-1", 1.0, false, None).await.success);
    }

    #[tokio::test]
    async fn test_update_meter_success() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/meter_reading"))
            .and(query_param("code", "ER-1022"))
            .and(header("authorization", "Bearer tok"))
            .and(body_json(json!({
                "date": "2024-05-01T10:00:00-03:00",
                "value": 1050.0,
                "serial": "ER-1022",
                "is_historical": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(1)
            .mount(&server)
            .await;

        let client = authenticated_client(&server).await;
        let ts = DateTime::parse_from_rfc3339("2024-05-01T13:00:00Z").unwrap();
        let result = client.update_meter("ER-1022", 1050.0, false, Some(ts)).await;

        assert!(result.success, "{}", result.message);
    }

    #[tokio::test]
    async fn test_update_meter_remote_failure_surfaces_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "message": "value lower than last reading"
            })))
            .mount(&server)
            .await;

        let client = authenticated_client(&server).await;
        let result = client.update_meter("ER-1022", 10.0, false, None).await;

        assert!(!result.success);
        assert!(result.message.contains("Error reported by Fracttal"));
        assert!(result.message.contains("value lower than last reading"));
    }

    #[tokio::test]
    async fn test_update_meter_http_error_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad serial"))
            .mount(&server)
            .await;

        let client = authenticated_client(&server).await;
        let result = client.update_meter("XX", 10.0, true, None).await;

        assert!(!result.success);
        assert_eq!(result.message, "HTTP error 422: bad serial");
    }

    #[tokio::test]
    async fn test_format_timestamp_uses_configured_offset() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        let ts = DateTime::parse_from_rfc3339("2024-01-01T02:30:00+00:00").unwrap();

        assert_eq!(client.format_timestamp(Some(ts)), "2023-12-31T23:30:00-03:00");
        assert!(client.format_timestamp(None).ends_with("-03:00"));
    }
}
