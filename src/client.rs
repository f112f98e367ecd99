//! The client: defaults, interceptors, and the call pipeline.
//!
//! The [`Client`] type is the entry point for issuing requests.
//! Use [`ClientBuilder`] to configure and create clients.

use crate::{
    adapter::{Adapter, HttpAdapter},
    config::{merge_config, RequestConfig, ResponseType},
    dispatch::dispatch_request,
    interceptor::Interceptors,
    uri::OriginContext,
    Error, Response, Result,
};
use http::{HeaderName, HeaderValue, Method, StatusCode};
use reqwest::cookie::Jar;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// An HTTP client that runs every request through its interceptors, the
/// dispatcher, and a transport adapter.
///
/// The client is cheap to clone; clones share defaults and interceptors.
///
/// # Examples
///
/// ```no_run
/// use courier::{Client, RequestConfig};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), courier::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .timeout(Duration::from_secs(30))
///     .header("User-Agent", "my-app/1.0")?
///     .build()?;
///
/// client.interceptors().request.on_fulfilled(|config| async move {
///     Ok(config.header("Authorization", "Bearer token"))
/// });
///
/// let response = client.request(RequestConfig::get("/users/123")).await?;
/// println!("Status: {}", response.status);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    defaults: RequestConfig,
    interceptors: Interceptors,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client with the library defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the default transport cannot be initialized.
    pub fn new() -> Result<Self> {
        ClientBuilder::new().build()
    }

    /// Returns the defaults merged into every request.
    pub fn defaults(&self) -> &RequestConfig {
        &self.inner.defaults
    }

    /// Returns the interceptor registries.
    pub fn interceptors(&self) -> &Interceptors {
        &self.inner.interceptors
    }

    /// Issues a request.
    ///
    /// `config` is merged over the client defaults, then passed through the
    /// request interceptors (most recently registered first), dispatched, and
    /// passed through the response interceptors (in registration order).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use courier::{Client, Params, RequestConfig};
    /// use serde::Serialize;
    ///
    /// #[derive(Serialize)]
    /// struct Search { query: String }
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = Client::builder()
    ///     .base_url("https://api.example.com")?
    ///     .build()?;
    ///
    /// let config = RequestConfig::post("/search")
    ///     .params(Params::new().with("page", 1))
    ///     .json(&Search { query: "rust".to_string() })?;
    ///
    /// let response = client.request(config).await?;
    /// println!("{:?}", response.data);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn request(&self, config: RequestConfig) -> Result<Response> {
        let config = merge_config(&self.inner.defaults, config);

        tracing::debug!(
            method = %config.method_or_default(),
            url = config.url.as_deref().unwrap_or_default(),
            "Starting request pipeline"
        );

        let result = self.inner.interceptors.run(config, dispatch_request).await;

        if let Err(e) = &result {
            tracing::warn!(error = %e, kind = ?e.kind(), "Request failed");
        }
        result
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use courier::ClientBuilder;
/// use http::Method;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), courier::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://api.example.com")?
///     .origin("https://app.example.com")?
///     .timeout(Duration::from_secs(30))
///     .common_header("X-Client", "courier")?
///     .method_header(Method::POST, "Content-Type", "application/json")?
///     .with_credentials(true)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    defaults: RequestConfig,
    origin: Option<Url>,
    jar: Option<Arc<Jar>>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` starting from the library defaults.
    pub fn new() -> Self {
        Self {
            defaults: RequestConfig::library_defaults(),
            origin: None,
            jar: None,
        }
    }

    fn invalid(&self, message: String) -> Error {
        Error::configuration(message, self.defaults.clone())
    }

    fn checked_header(&self, name: &str, value: &str) -> Result<()> {
        HeaderName::try_from(name)
            .map_err(|e| self.invalid(format!("Invalid header name: {}", e)))?;
        HeaderValue::try_from(value)
            .map_err(|e| self.invalid(format!("Invalid header value: {}", e)))?;
        Ok(())
    }

    /// Sets the base URL relative request URLs are joined to.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        let url = url.as_ref();
        Url::parse(url).map_err(|e| self.invalid(format!("Invalid base URL: {}", e)))?;
        self.defaults.base_url = Some(url.to_string());
        Ok(self)
    }

    /// Sets the origin the client acts for.
    ///
    /// Requests to this origin are same-origin: they carry cookies and the XSRF
    /// header. Relative URLs without a base URL resolve against it.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn origin(mut self, url: impl AsRef<str>) -> Result<Self> {
        let origin =
            Url::parse(url.as_ref()).map_err(|e| self.invalid(format!("Invalid origin: {}", e)))?;
        self.origin = Some(origin);
        Ok(self)
    }

    /// Shares a cookie jar with the default adapter.
    pub fn cookie_jar(mut self, jar: Arc<Jar>) -> Self {
        self.jar = Some(jar);
        self
    }

    /// Adds a call-level default header.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        self.checked_header(name.as_ref(), value.as_ref())?;
        self.defaults.headers.set(name, value.as_ref());
        Ok(self)
    }

    /// Adds a header sent with every method.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn common_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        self.checked_header(name.as_ref(), value.as_ref())?;
        self.defaults.headers.common.set(name, value.as_ref());
        Ok(self)
    }

    /// Adds a header sent only with `method`.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn method_header(
        mut self,
        method: Method,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self> {
        self.checked_header(name.as_ref(), value.as_ref())?;
        self.defaults
            .headers
            .method_mut(&method)
            .set(name, value.as_ref());
        Ok(self)
    }

    /// Sets the request timeout. Zero disables it.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.defaults.timeout = Some(timeout);
        self
    }

    /// Sends cookies and the XSRF header on cross-origin requests too.
    pub fn with_credentials(mut self, enabled: bool) -> Self {
        self.defaults.with_credentials = Some(enabled);
        self
    }

    /// Sets the cookie the XSRF token is read from.
    pub fn xsrf_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.defaults.xsrf_cookie_name = Some(name.into());
        self
    }

    /// Sets the header the XSRF token is sent in.
    pub fn xsrf_header_name(mut self, name: impl Into<String>) -> Self {
        self.defaults.xsrf_header_name = Some(name.into());
        self
    }

    /// Sets the default response type.
    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.defaults.response_type = Some(response_type);
        self
    }

    /// Sets the default status validation.
    pub fn validate_status<F>(mut self, validator: F) -> Self
    where
        F: Fn(StatusCode) -> bool + Send + Sync + 'static,
    {
        self.defaults.validate_status = Some(Arc::new(validator));
        self
    }

    /// Replaces the default transport adapter.
    pub fn adapter(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.defaults.adapter = Some(adapter);
        self
    }

    /// Replaces the whole default configuration.
    pub fn defaults(mut self, defaults: RequestConfig) -> Self {
        self.defaults = defaults;
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the default adapter cannot be created.
    pub fn build(mut self) -> Result<Client> {
        if self.defaults.adapter.is_none() {
            let context = self
                .origin
                .clone()
                .map_or_else(OriginContext::none, OriginContext::new);
            let jar = self.jar.clone().unwrap_or_default();
            let adapter = HttpAdapter::new(context, jar).map_err(|e| {
                self.invalid(format!("Failed to build HTTP client: {}", e))
                    .with_source(e)
            })?;
            self.defaults.adapter = Some(Arc::new(adapter));
        }

        Ok(Client {
            inner: Arc::new(ClientInner {
                defaults: self.defaults,
                interceptors: Interceptors::default(),
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
