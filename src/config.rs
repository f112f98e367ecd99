//! Request configuration and default/override resolution.

use crate::{
    adapter::Adapter,
    body::Body,
    cancel::CancelToken,
    headers::RequestHeaders,
    transform::{default_request_transform, default_response_transform, Transformer},
    uri::{Params, ParamsSerializer},
};
use http::{Method, StatusCode};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Decides whether a received status counts as success.
pub type StatusValidator = Arc<dyn Fn(StatusCode) -> bool + Send + Sync>;

/// Receives upload or download progress.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Bytes transferred so far, and the expected total when known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub loaded: u64,
    pub total: Option<u64>,
}

impl ProgressEvent {
    /// Fraction transferred in `0.0..=1.0`, when the total is known and nonzero.
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => Some(self.loaded as f64 / total as f64),
            _ => None,
        }
    }
}

/// How the adapter should expose the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseType {
    /// Text, decoded by the response transforms.
    #[default]
    Default,
    Text,
    /// Parsed as JSON by the adapter; unparseable bodies become [`Body::Empty`].
    Json,
    Blob,
    ArrayBuffer,
    Document,
}

/// HTTP Basic credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Configuration for one request.
///
/// Every field is optional; unset fields fall back to the client defaults when
/// the two are combined with [`merge_config`].
///
/// # Examples
///
/// ```
/// use courier::{RequestConfig, Params};
/// use std::time::Duration;
///
/// let config = RequestConfig::get("/search")
///     .params(Params::new().with("q", "rust").with("page", 2))
///     .header("X-Request-Id", "abc")
///     .timeout(Duration::from_secs(5));
///
/// assert_eq!(config.url.as_deref(), Some("/search"));
/// ```
#[derive(Clone, Default)]
pub struct RequestConfig {
    pub url: Option<String>,
    pub method: Option<Method>,
    pub base_url: Option<String>,
    pub headers: RequestHeaders,
    pub params: Option<Params>,
    pub params_serializer: Option<ParamsSerializer>,
    pub data: Option<Body>,
    /// Zero means no timeout.
    pub timeout: Option<Duration>,
    pub with_credentials: Option<bool>,
    pub response_type: Option<ResponseType>,
    pub xsrf_cookie_name: Option<String>,
    pub xsrf_header_name: Option<String>,
    pub on_upload_progress: Option<ProgressCallback>,
    pub on_download_progress: Option<ProgressCallback>,
    pub auth: Option<BasicAuth>,
    /// Defaults to accepting `200..300`.
    pub validate_status: Option<StatusValidator>,
    pub cancel_token: Option<CancelToken>,
    pub transform_request: Option<Vec<Transformer>>,
    pub transform_response: Option<Vec<Transformer>>,
    pub adapter: Option<Arc<dyn Adapter>>,
}

impl RequestConfig {
    /// Creates a configuration for `method` and `url`.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method: Some(method),
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// The defaults every client starts from.
    pub fn library_defaults() -> Self {
        let mut headers = RequestHeaders::new();
        headers
            .common
            .set("Accept", "application/json, text/plain, */*");
        for method in [Method::POST, Method::PUT, Method::PATCH] {
            headers
                .method_mut(&method)
                .set("Content-Type", "application/x-www-form-urlencoded");
        }

        Self {
            method: Some(Method::GET),
            headers,
            timeout: Some(Duration::ZERO),
            xsrf_cookie_name: Some("XSRF-TOKEN".to_string()),
            xsrf_header_name: Some("X-XSRF-TOKEN".to_string()),
            transform_request: Some(vec![default_request_transform()]),
            transform_response: Some(vec![default_response_transform()]),
            validate_status: Some(Arc::new(|status: StatusCode| status.is_success())),
            ..Self::default()
        }
    }

    /// Sets a call-level header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    /// Masks a header that a lower-priority bucket would otherwise send.
    pub fn unset_header(mut self, name: impl AsRef<str>) -> Self {
        self.headers.own.unset(name);
        self
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    pub fn data(mut self, data: impl Into<Body>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Sets a JSON body from any serializable value.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> serde_json::Result<Self> {
        self.data = Some(Body::json(value)?);
        Ok(self)
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    pub fn with_credentials(mut self, enabled: bool) -> Self {
        self.with_credentials = Some(enabled);
        self
    }

    pub fn auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some(BasicAuth::new(username, password));
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    pub fn validate_status<F>(mut self, validator: F) -> Self
    where
        F: Fn(StatusCode) -> bool + Send + Sync + 'static,
    {
        self.validate_status = Some(Arc::new(validator));
        self
    }

    pub fn on_upload_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressEvent) + Send + Sync + 'static,
    {
        self.on_upload_progress = Some(Arc::new(callback));
        self
    }

    pub fn on_download_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressEvent) + Send + Sync + 'static,
    {
        self.on_download_progress = Some(Arc::new(callback));
        self
    }

    pub fn adapter(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Returns the method, defaulting to GET.
    pub fn method_or_default(&self) -> Method {
        self.method.clone().unwrap_or(Method::GET)
    }
}

/// Combines client `defaults` with per-call `overrides`.
///
/// Headers are merged bucket by bucket, case-insensitively, with the override
/// winning on conflict. Every other field takes the override when it is set and
/// the default otherwise.
pub fn merge_config(defaults: &RequestConfig, overrides: RequestConfig) -> RequestConfig {
    let RequestConfig {
        url,
        method,
        base_url,
        headers,
        params,
        params_serializer,
        data,
        timeout,
        with_credentials,
        response_type,
        xsrf_cookie_name,
        xsrf_header_name,
        on_upload_progress,
        on_download_progress,
        auth,
        validate_status,
        cancel_token,
        transform_request,
        transform_response,
        adapter,
    } = overrides;

    RequestConfig {
        url: url.or_else(|| defaults.url.clone()),
        method: method.or_else(|| defaults.method.clone()),
        base_url: base_url.or_else(|| defaults.base_url.clone()),
        headers: defaults.headers.merge(&headers),
        params: params.or_else(|| defaults.params.clone()),
        params_serializer: params_serializer.or_else(|| defaults.params_serializer.clone()),
        data: data.or_else(|| defaults.data.clone()),
        timeout: timeout.or(defaults.timeout),
        with_credentials: with_credentials.or(defaults.with_credentials),
        response_type: response_type.or(defaults.response_type),
        xsrf_cookie_name: xsrf_cookie_name.or_else(|| defaults.xsrf_cookie_name.clone()),
        xsrf_header_name: xsrf_header_name.or_else(|| defaults.xsrf_header_name.clone()),
        on_upload_progress: on_upload_progress.or_else(|| defaults.on_upload_progress.clone()),
        on_download_progress: on_download_progress
            .or_else(|| defaults.on_download_progress.clone()),
        auth: auth.or_else(|| defaults.auth.clone()),
        validate_status: validate_status.or_else(|| defaults.validate_status.clone()),
        cancel_token: cancel_token.or_else(|| defaults.cancel_token.clone()),
        transform_request: transform_request.or_else(|| defaults.transform_request.clone()),
        transform_response: transform_response.or_else(|| defaults.transform_response.clone()),
        adapter: adapter.or_else(|| defaults.adapter.clone()),
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("base_url", &self.base_url)
            .field("headers", &self.headers)
            .field("params", &self.params)
            .field("data", &self.data)
            .field("timeout", &self.timeout)
            .field("with_credentials", &self.with_credentials)
            .field("response_type", &self.response_type)
            .field("xsrf_cookie_name", &self.xsrf_cookie_name)
            .field("xsrf_header_name", &self.xsrf_header_name)
            .field("auth", &self.auth)
            .field("cancel_token", &self.cancel_token)
            .field(
                "transform_request",
                &self.transform_request.as_ref().map(Vec::len),
            )
            .field(
                "transform_response",
                &self.transform_response.as_ref().map(Vec::len),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins_when_present() {
        let defaults = RequestConfig::library_defaults()
            .base_url("http://a/")
            .timeout(Duration::from_secs(1));
        let merged = merge_config(
            &defaults,
            RequestConfig::post("/users").timeout(Duration::from_secs(5)),
        );

        assert_eq!(merged.method, Some(Method::POST));
        assert_eq!(merged.url.as_deref(), Some("/users"));
        assert_eq!(merged.base_url.as_deref(), Some("http://a/"));
        assert_eq!(merged.timeout, Some(Duration::from_secs(5)));
        assert_eq!(merged.xsrf_cookie_name.as_deref(), Some("XSRF-TOKEN"));
        assert_eq!(merged.transform_request.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_defaults_kept_when_override_absent() {
        let defaults = RequestConfig::default()
            .data("default body")
            .with_credentials(true);
        let merged = merge_config(&defaults, RequestConfig::default());

        assert_eq!(merged.data, Some(Body::Text("default body".into())));
        assert_eq!(merged.with_credentials, Some(true));
        assert!(merged.url.is_none());
    }

    #[test]
    fn test_headers_deep_merge_case_insensitive() {
        let mut defaults = RequestConfig::library_defaults();
        defaults.headers.set("X-Client", "courier");
        defaults.headers.set("X-Shared", "default");

        let merged = merge_config(
            &defaults,
            RequestConfig::get("/").header("x-shared", "override"),
        );

        assert_eq!(merged.headers.get("X-Client"), Some("courier"));
        assert_eq!(merged.headers.get("X-Shared"), Some("override"));
        assert_eq!(
            merged.headers.common.get("accept"),
            Some("application/json, text/plain, */*")
        );
        assert!(merged.headers.method(&Method::POST).is_some());
    }

    #[test]
    fn test_library_defaults_validate_2xx() {
        let defaults = RequestConfig::library_defaults();
        let validate = defaults.validate_status.unwrap();
        assert!(validate(StatusCode::OK));
        assert!(validate(StatusCode::NO_CONTENT));
        assert!(!validate(StatusCode::MULTIPLE_CHOICES));
        assert!(!validate(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_auth_debug_redacts_password() {
        let auth = BasicAuth::new("ada", "hunter2");
        let printed = format!("{:?}", auth);
        assert!(printed.contains("ada"));
        assert!(!printed.contains("hunter2"));
    }
}
