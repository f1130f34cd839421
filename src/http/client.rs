//! Request executor.
//!
//! # Responsibilities
//! - Resolve the URL, headers and body of a call once
//! - Send it through the [`Fetch`] backend under cancellation and timeout
//! - Retry qualifying failures with backoff
//! - Coerce the successful body, or surface a [`FetchError`]
//!
//! # State Transitions
//! ```text
//! Idle → Sending
//! Sending → Success                      (2xx, body coerced)
//! Sending → Retrying → Sending           (retryable failure, budget left)
//! Sending | Retrying → Aborted           (cancellation, terminal)
//! Sending → Failed                       (budget exhausted or not retryable, terminal)
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::{validate_config, ConfigError, FetchConfig, ValidationError};
use crate::http::base_url::{with_base, with_query};
use crate::http::error::{AbortReason, ErrorKind, FetchError};
use crate::http::fetch::{Fetch, RawRequest, RawResponse, ReqwestFetch};
use crate::http::headers::{merge_headers, normalize_headers, HeaderInit};
use crate::http::options::FetchOptions;
use crate::http::response::{self, ParsedResponse, ResponseParser, ResponseType};
use crate::observability::metrics;
use crate::resilience::retries::{default_retry_count, RetryPolicy};
use crate::resilience::timeouts::{sleep_or_cancel, with_deadline};

/// Defaults inherited by every call of a client.
#[derive(Debug)]
struct ClientDefaults {
    base_url: Option<String>,
    headers: HeaderMap,
    timeout: Option<Duration>,
    retry: Option<u32>,
    retry_delay: Duration,
    max_retry_delay: Duration,
    retry_status_codes: Vec<StatusCode>,
}

impl ClientDefaults {
    fn from_config(config: &FetchConfig) -> Result<Self, ConfigError> {
        validate_config(config).map_err(ConfigError::Validation)?;

        let headers = normalize_headers(HeaderInit::Map(config.headers.clone()))
            .map_err(|e| ConfigError::Validation(vec![ValidationError::Header(e.to_string())]))?;
        let retry_status_codes = config
            .retries
            .status_codes
            .iter()
            .filter_map(|code| StatusCode::from_u16(*code).ok())
            .collect();

        Ok(Self {
            base_url: config.base_url.clone(),
            headers,
            timeout: config.timeouts.request(),
            retry: config.retries.count,
            retry_delay: Duration::from_millis(config.retries.base_delay_ms),
            max_retry_delay: Duration::from_millis(config.retries.max_delay_ms),
            retry_status_codes,
        })
    }
}

/// A request after URL resolution, header merging and body serialization.
/// Re-sent unchanged on every attempt.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedRequest {
    pub method: Method,
    /// The resolved URL as the caller's inputs produced it.
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    parsed_url: Url,
}

impl ResolvedRequest {
    fn to_raw(&self, signal: CancellationToken) -> RawRequest {
        RawRequest {
            method: self.method.clone(),
            url: self.parsed_url.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
            signal,
        }
    }
}

/// Everything one call needs, fixed before the first attempt.
struct PreparedCall {
    request: ResolvedRequest,
    policy: RetryPolicy,
    timeout: Option<Duration>,
    signal: CancellationToken,
    response_type: Option<ResponseType>,
    parser: Option<ResponseParser>,
    ignore_response_error: bool,
}

impl PreparedCall {
    fn error(&self, kind: ErrorKind) -> FetchError {
        FetchError::new(self.request.url.clone(), self.request.method.clone(), kind)
    }
}

/// A response with its coerced body.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    request: String,
    method: Method,
    response: RawResponse,
    data: ParsedResponse,
}

impl FetchResponse {
    /// The resolved request URL.
    pub fn request(&self) -> &str {
        &self.request
    }

    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.response.headers()
    }

    pub fn raw(&self) -> &RawResponse {
        &self.response
    }

    pub fn data(&self) -> &ParsedResponse {
        &self.data
    }

    pub fn into_data(self) -> ParsedResponse {
        self.data
    }

    pub fn into_parts(self) -> (RawResponse, ParsedResponse) {
        (self.response, self.data)
    }
}

/// HTTP request helper layered over a [`Fetch`] backend.
///
/// Cheap to clone; clones share the backend and defaults.
#[derive(Clone)]
pub struct Client {
    fetch: Arc<dyn Fetch>,
    defaults: Arc<ClientDefaults>,
}

impl Client {
    /// Create a client over `fetch` with defaults from `config`.
    pub fn new(fetch: impl Fetch + 'static, config: &FetchConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            fetch: Arc::new(fetch),
            defaults: Arc::new(ClientDefaults::from_config(config)?),
        })
    }

    /// Create a `reqwest`-backed client with defaults from `config`.
    pub fn from_config(config: &FetchConfig) -> Result<Self, ConfigError> {
        Self::new(ReqwestFetch::new(), config)
    }

    /// Create a client over `fetch` with default settings.
    pub fn with_fetch(fetch: impl Fetch + 'static) -> Self {
        Self {
            fetch: Arc::new(fetch),
            defaults: Arc::new(ClientDefaults {
                base_url: None,
                headers: HeaderMap::new(),
                timeout: None,
                retry: None,
                retry_delay: Duration::from_millis(100),
                max_retry_delay: Duration::from_millis(2000),
                retry_status_codes: Vec::new(),
            }),
        }
    }

    /// Send a request and return its coerced body.
    pub async fn execute(&self, url: &str, options: FetchOptions) -> Result<ParsedResponse, FetchError> {
        self.raw(url, options).await.map(FetchResponse::into_data)
    }

    /// Send a request and deserialize its body into `T`.
    ///
    /// The response type defaults to JSON when the options leave it unset.
    pub async fn json<T: DeserializeOwned>(&self, url: &str, mut options: FetchOptions) -> Result<T, FetchError> {
        if options.response_type.is_none() && options.parse_response.is_none() {
            options.response_type = Some(ResponseType::Json);
        }
        let response = self.raw(url, options).await?;
        let FetchResponse {
            request,
            method,
            response,
            data,
        } = response;
        data.deserialize().map_err(|e| {
            FetchError::new(request, method, ErrorKind::Parse(e.into())).with_response(response, None)
        })
    }

    /// Send a request and return the response together with its coerced body.
    pub async fn raw(&self, url: &str, options: FetchOptions) -> Result<FetchResponse, FetchError> {
        let call = self.prepare(url, options)?;
        let method = call.request.method.clone();
        let start = Instant::now();

        let result = self.run(&call).await;

        metrics::record_duration(&method, start);
        if let Err(e) = &result {
            metrics::record_failure(&method, e.kind().label());
            tracing::warn!(
                method = %method,
                url = %call.request.url,
                error = %e,
                "Request failed"
            );
        }
        result
    }

    /// Resolve URL, headers, body and per-call settings.
    fn prepare(&self, url: &str, options: FetchOptions) -> Result<PreparedCall, FetchError> {
        let method = options.method.unwrap_or(Method::GET);
        let base_url = options.base_url.as_deref().or(self.defaults.base_url.as_deref());
        let resolved_url = with_query(&with_base(url, base_url), &options.query);

        let invalid = |message: String| {
            FetchError::new(resolved_url.clone(), method.clone(), ErrorKind::InvalidRequest(message))
        };

        let parsed_url = Url::parse(&resolved_url).map_err(|e| invalid(format!("{}: {}", resolved_url, e)))?;

        let mut defaults = self.defaults.headers.clone();
        if matches!(options.response_type, None | Some(ResponseType::Json)) && !defaults.contains_key(ACCEPT) {
            defaults.insert(ACCEPT, HeaderValue::from_static("application/json"));
        }
        let user_headers = match options.headers {
            Some(init) => normalize_headers(init).map_err(|e| invalid(e.to_string()))?,
            None => HeaderMap::new(),
        };
        let mut headers = merge_headers(&defaults, &user_headers);

        let body = match options.body {
            Some(body) => Some(body.serialize(&mut headers).map_err(|e| invalid(e.to_string()))?),
            None => None,
        };

        let policy = RetryPolicy {
            retries: options
                .retry
                .or(self.defaults.retry)
                .unwrap_or_else(|| default_retry_count(&method)),
            base_delay: options.retry_delay.unwrap_or(self.defaults.retry_delay),
            max_delay: self.defaults.max_retry_delay.max(options.retry_delay.unwrap_or_default()),
            status_codes: options
                .retry_status_codes
                .unwrap_or_else(|| self.defaults.retry_status_codes.clone()),
        };

        Ok(PreparedCall {
            request: ResolvedRequest {
                method,
                url: resolved_url,
                headers,
                body,
                parsed_url,
            },
            policy,
            timeout: match options.timeout {
                Some(timeout) if timeout.is_zero() => None,
                Some(timeout) => Some(timeout),
                None => self.defaults.timeout,
            },
            signal: options.signal.unwrap_or_else(CancellationToken::new),
            response_type: options.response_type,
            parser: options.parse_response,
            ignore_response_error: options.ignore_response_error,
        })
    }

    /// Drive the attempt/retry loop until success or a terminal failure.
    async fn run(&self, call: &PreparedCall) -> Result<FetchResponse, FetchError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            tracing::debug!(
                method = %call.request.method,
                url = %call.request.url,
                attempt,
                "Sending request"
            );

            let err = match self.send_once(call).await {
                Ok(response) => return Ok(response),
                Err(err) => err,
            };

            if call.signal.is_cancelled() {
                return Err(call.error(ErrorKind::Abort(AbortReason::Cancelled)));
            }
            if !call.policy.should_retry(attempt, &err) {
                return Err(err);
            }

            let delay = call.policy.delay(attempt);
            tracing::info!(
                method = %call.request.method,
                url = %call.request.url,
                attempt,
                delay = ?delay,
                error = %err,
                "Retrying request"
            );
            metrics::record_retry(&call.request.method);

            if let Err(reason) = sleep_or_cancel(delay, &call.signal).await {
                return Err(call.error(ErrorKind::Abort(reason)));
            }
        }
    }

    /// One attempt: fetch, classify the status, coerce the body.
    async fn send_once(&self, call: &PreparedCall) -> Result<FetchResponse, FetchError> {
        let outcome = with_deadline(&call.signal, call.timeout, |attempt_signal| {
            self.fetch.fetch(call.request.to_raw(attempt_signal))
        })
        .await;

        let response = match outcome {
            Err(reason) => return Err(call.error(ErrorKind::Abort(reason))),
            Ok(Err(transport)) => return Err(call.error(ErrorKind::Network(transport))),
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        metrics::record_attempt(&call.request.method, status.as_u16());

        if !response.ok() && !call.ignore_response_error {
            let data = response::error_payload(&response);
            return Err(call.error(ErrorKind::Http(status)).with_response(response, data));
        }

        match response::coerce(
            &response,
            &call.request.method,
            call.response_type,
            call.parser.as_ref(),
        ) {
            Ok(data) => Ok(FetchResponse {
                request: call.request.url.clone(),
                method: call.request.method.clone(),
                response,
                data,
            }),
            Err(e) => Err(call.error(ErrorKind::Parse(e)).with_response(response, None)),
        }
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::with_fetch(ReqwestFetch::new())
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.defaults.base_url)
            .field("timeout", &self.defaults.timeout)
            .field("retry", &self.defaults.retry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::fetch::TransportError;
    use async_trait::async_trait;
    use reqwest::header::CONTENT_TYPE;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records every request and answers with a fixed response.
    #[derive(Clone, Default)]
    struct Recorder {
        seen: Arc<Mutex<Vec<RawRequest>>>,
    }

    #[async_trait]
    impl Fetch for Recorder {
        async fn fetch(&self, request: RawRequest) -> Result<RawResponse, TransportError> {
            let url = request.url.to_string();
            self.seen.lock().unwrap().push(request);
            let mut headers = HeaderMap::new();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            Ok(RawResponse::new(url, StatusCode::OK, headers, Bytes::from_static(b"{\"ok\":true}")))
        }
    }

    #[tokio::test]
    async fn test_prepare_joins_base_and_serializes_body() {
        let recorder = Recorder::default();
        let client = Client::with_fetch(recorder.clone());

        let data = client
            .execute(
                "/items",
                FetchOptions::new()
                    .method(Method::POST)
                    .base_url("http://api.test/v1/")
                    .query("page", "2")
                    .headers(vec![("X-Header", "1")])
                    .body(json!({ "num": 42 })),
            )
            .await
            .unwrap();
        assert_eq!(data, ParsedResponse::Json(json!({ "ok": true })));

        let seen = recorder.seen.lock().unwrap();
        let request = &seen[0];
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url.as_str(), "http://api.test/v1/items?page=2");
        assert_eq!(request.headers.get("x-header").unwrap(), "1");
        assert_eq!(request.headers.get(ACCEPT).unwrap(), "application/json");
        assert_eq!(request.headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(request.body.as_deref(), Some(&b"{\"num\":42}"[..]));
    }

    #[tokio::test]
    async fn test_text_response_type_skips_default_accept() {
        let recorder = Recorder::default();
        let client = Client::with_fetch(recorder.clone());

        let data = client
            .execute("http://api.test/", FetchOptions::new().response_type(ResponseType::Text))
            .await
            .unwrap();
        assert_eq!(data, ParsedResponse::Text("{\"ok\":true}".to_string()));
        assert!(recorder.seen.lock().unwrap()[0].headers.get(ACCEPT).is_none());
    }

    #[tokio::test]
    async fn test_config_defaults_apply() {
        let recorder = Recorder::default();
        let mut config = FetchConfig::default();
        config.base_url = Some("http://api.test/root".to_string());
        config.headers.insert("Authorization".to_string(), "Bearer t".to_string());
        let client = Client::new(recorder.clone(), &config).unwrap();

        client.execute("status", FetchOptions::new()).await.unwrap();

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen[0].url.as_str(), "http://api.test/root/status");
        assert_eq!(seen[0].headers.get("authorization").unwrap(), "Bearer t");
    }

    #[tokio::test]
    async fn test_relative_url_without_base_is_invalid() {
        let recorder = Recorder::default();
        let client = Client::with_fetch(recorder.clone());

        let err = client.execute("/nowhere", FetchOptions::new()).await.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidRequest(_)));
        assert_eq!(err.request(), "/nowhere");
        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_json_deserializes_typed() {
        #[derive(serde::Deserialize)]
        struct Health {
            ok: bool,
        }
        let client = Client::with_fetch(Recorder::default());
        let out: Health = client.json("http://api.test/", FetchOptions::new()).await.unwrap();
        assert!(out.ok);
    }

    /// Answers after a short pause.
    struct Slow;

    #[async_trait]
    impl Fetch for Slow {
        async fn fetch(&self, request: RawRequest) -> Result<RawResponse, TransportError> {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(RawResponse::new(request.url.to_string(), StatusCode::OK, HeaderMap::new(), Bytes::from_static(b"done")))
        }
    }

    #[tokio::test]
    async fn test_zero_timeout_disables_deadline() {
        let mut config = FetchConfig::default();
        config.timeouts.request_ms = Some(1);
        let client = Client::new(Slow, &config).unwrap();

        let data = client
            .execute(
                "http://api.test/",
                FetchOptions::new()
                    .timeout(Duration::ZERO)
                    .retry(0)
                    .response_type(ResponseType::Text),
            )
            .await
            .unwrap();
        assert_eq!(data, ParsedResponse::Text("done".to_string()));

        let err = client
            .execute("http://api.test/", FetchOptions::new().retry(0))
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = FetchConfig::default();
        config.base_url = Some("relative/path".to_string());
        assert!(matches!(
            Client::new(Recorder::default(), &config),
            Err(ConfigError::Validation(_))
        ));
    }
}
