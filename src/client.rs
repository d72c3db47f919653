// Copyright 2024 The DocAssert Authors
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::str::FromStr;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Body, Client, Method};
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::domain::{ApiRequest, HttpMethod, RequestSnapshot, ResponseSnapshot};

/// Host (optionally with scheme) of the API under test.
pub const RESOURCE_URL_VAR: &str = "RESOURCE_URL";
/// Enables request logging when set to `true`, `1`, `yes` or `on`.
pub const USE_LOGS_VAR: &str = "USE_LOGS";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("environment variable '{0}' not set")]
    MissingEnv(&'static str),
    #[error("invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    log_requests: bool,
    timeout: Option<Duration>,
}

impl ClientConfig {
    /// Creates a config for `base_url`; `https://` is prefixed when the URL
    /// has no scheme.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            log_requests: false,
            timeout: None,
        }
    }

    /// Logs every sent request as `METHOD URL` at info level.
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.log_requests = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Reads `RESOURCE_URL` (required) and `USE_LOGS` (optional).
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup(RESOURCE_URL_VAR)
            .filter(|url| !url.trim().is_empty())
            .ok_or(ClientError::MissingEnv(RESOURCE_URL_VAR))?;
        let log_requests = lookup(USE_LOGS_VAR)
            .map(|flag| parse_flag(&flag))
            .unwrap_or(false);

        Ok(Self::new(&base_url).with_request_logging(log_requests))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn log_requests(&self) -> bool {
        self.log_requests
    }
}

/// HTTP client for the API under test.
///
/// Every response is read completely and returned together with a snapshot
/// of the request that produced it, so failure reports can show both.
#[derive(Debug, Clone)]
pub struct ApiClient {
    inner: Client,
    config: ClientConfig,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            inner: builder.build()?,
            config,
        })
    }

    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub async fn send(&self, request: ApiRequest) -> Result<ResponseSnapshot, ClientError> {
        let method = request.http_method;
        let mut request_builder = self
            .inner
            .request(
                map_method(&method),
                format!("{}{}", self.config.base_url, request.path),
            )
            .headers(map_headers(&request.headers)?);
        if !request.query.is_empty() {
            request_builder = request_builder.query(&request.query);
        }
        if let Some(body) = request.body {
            request_builder = request_builder.body(Body::from(body));
        }

        let built = request_builder.build()?;
        let sent = snapshot_request(method, &built);
        if self.config.log_requests {
            info!("{} {}", method, built.url());
        }

        let response = self.inner.execute(built).await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect::<Vec<_>>();
        let body = response.bytes().await?;

        Ok(headers.into_iter().fold(
            ResponseSnapshot::new(status, body.to_vec(), sent),
            |snapshot, (name, value)| snapshot.with_header(name, value),
        ))
    }

    pub async fn get(&self, path: &str) -> Result<ResponseSnapshot, ClientError> {
        self.send(ApiRequest::get(path)).await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Result<ResponseSnapshot, ClientError> {
        self.send(ApiRequest::post(path).with_json(body)).await
    }
}

fn snapshot_request(method: HttpMethod, request: &reqwest::Request) -> RequestSnapshot {
    let mut snapshot = RequestSnapshot::new(method, request.url().as_str());
    for (name, value) in request.headers() {
        snapshot = snapshot.with_header(
            name.as_str(),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        );
    }
    for (name, value) in request.url().query_pairs() {
        snapshot = snapshot.with_query(name.into_owned(), value.into_owned());
    }
    match request.body().and_then(Body::as_bytes) {
        Some(body) => snapshot.with_body(body.to_vec()),
        None => snapshot,
    }
}

fn map_headers(headers: &[(String, String)]) -> Result<HeaderMap, ClientError> {
    let mut header_map = HeaderMap::new();
    for (key, value) in headers {
        let invalid = |reason: String| ClientError::InvalidHeader {
            name: key.clone(),
            reason,
        };
        let header_name = HeaderName::from_str(key).map_err(|e| invalid(e.to_string()))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
        header_map.append(header_name, header_value);
    }
    Ok(header_map)
}

fn map_method(http_method: &HttpMethod) -> Method {
    match http_method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

fn parse_flag(flag: &str) -> bool {
    matches!(
        flag.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
