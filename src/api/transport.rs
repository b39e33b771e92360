//! HTTP transport seam
//!
//! The API client only talks to a [`Transport`]; the real implementation wraps
//! a blocking reqwest client with a cookie jar and 5xx retry, tests use a
//! scripted double.

use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use crate::constants::{status, timing};
use crate::error::{KeeperError, KeeperResult, RequestError};
use crate::shutdown::Shutdown;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>, query: &[(&str, &str)]) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Cookies set by the response as `(name, value)`, in arrival order
    pub cookies: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            cookies: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        status::is_success(self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, RequestError> {
        serde_json::from_str(&self.body).map_err(|e| RequestError::Decode(e.to_string()))
    }

    /// Error describing this response as an unexpected status
    pub fn status_error(&self) -> RequestError {
        RequestError::Status {
            status: self.status,
            body: self.body.chars().take(200).collect(),
        }
    }
}

pub trait Transport {
    /// Send one request with the current cookie jar attached
    fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse, RequestError>;

    fn cookie(&self, name: &str) -> Option<String>;

    fn set_cookie(&mut self, name: &str, value: &str);
}

/// Exponential backoff over server-side failures, for idempotent requests only
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub attempts: u32,
    pub backoff_factor: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts,
            backoff_factor: Duration::from_secs_f64(timing::RETRY_BACKOFF_FACTOR_SECS),
        }
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        status::RETRYABLE.contains(&status)
    }

    /// Delay before retry number `retry` (1-based): factor * 2^(retry - 1)
    pub fn delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.backoff_factor * 2u32.pow(exponent)
    }
}

/// Blocking reqwest transport with a manual cookie jar
///
/// GETs are retried per the [`RetryPolicy`]; POSTs go out exactly once so a
/// placement the server already applied is never replayed. Backoff sleeps end
/// early on shutdown and no further retries are made.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    cookies: BTreeMap<String, String>,
    retry: RetryPolicy,
    shutdown: Shutdown,
}

impl HttpTransport {
    pub fn new(timeout: Duration, retry: RetryPolicy, shutdown: Shutdown) -> KeeperResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| KeeperError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            cookies: BTreeMap::new(),
            retry,
            shutdown,
        })
    }

    fn may_retry(&self, request: &HttpRequest, retry: u32) -> bool {
        request.method == Method::Get
            && retry < self.retry.attempts
            && !self.shutdown.is_requested()
    }

    fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn send_once(&self, request: &HttpRequest) -> Result<HttpResponse, reqwest::Error> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };
        let mut builder = self.client.request(method, &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if !self.cookies.is_empty() {
            builder = builder.header(reqwest::header::COOKIE, self.cookie_header());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send()?;
        let status = response.status().as_u16();
        let cookies = response
            .cookies()
            .map(|cookie| (cookie.name().to_string(), cookie.value().to_string()))
            .collect();
        let body = response.text()?;
        Ok(HttpResponse {
            status,
            cookies,
            body,
        })
    }
}

impl Transport for HttpTransport {
    fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse, RequestError> {
        let mut retry = 0;
        loop {
            match self.send_once(request) {
                Ok(response)
                    if self.retry.should_retry_status(response.status)
                        && self.may_retry(request, retry) =>
                {
                    warn!(url = %request.url, status = response.status, retry = retry + 1, "Server error, retrying");
                }
                Ok(response) => {
                    debug!(url = %request.url, status = response.status, "Request complete");
                    return Ok(response);
                }
                Err(e) if (e.is_connect() || e.is_timeout()) && self.may_retry(request, retry) => {
                    warn!(url = %request.url, error = %e, retry = retry + 1, "Transport error, retrying");
                }
                Err(e) => return Err(RequestError::Transport(e.to_string())),
            }
            retry += 1;
            self.shutdown.sleep(self.retry.delay(retry));
        }
    }

    fn cookie(&self, name: &str) -> Option<String> {
        self.cookies.get(name).cloned()
    }

    fn set_cookie(&mut self, name: &str, value: &str) {
        self.cookies.insert(name.to_string(), value.to_string());
    }
}
