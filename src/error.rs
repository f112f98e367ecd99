//! Error types for the request pipeline.
//!
//! Every failure that leaves the pipeline is an [`Error`]. It always carries the
//! [`RequestConfig`] that produced it, and optionally a machine-readable
//! [`ErrorCode`], the transport handle, and the [`Response`] when one was received.
//!
//! Callers distinguish "the server answered with a bad status" from "no answer at
//! all" by checking [`Error::response`]:
//!
//! ```no_run
//! use courier::{Client, RequestConfig};
//!
//! # async fn example() -> Result<(), courier::Error> {
//! let client = Client::builder().base_url("https://api.example.com")?.build()?;
//!
//! match client.request(RequestConfig::get("/users/1")).await {
//!     Ok(response) => println!("status {}", response.status),
//!     Err(e) if e.is_cancel() => println!("cancelled: {}", e),
//!     Err(e) => match e.response() {
//!         Some(response) => eprintln!("bad status {}", response.status),
//!         None => eprintln!("no response: {} ({:?})", e, e.code()),
//!     },
//! }
//! # Ok(())
//! # }
//! ```

use crate::{adapter::RequestHandle, cancel::Cancel, config::RequestConfig, Response};
use http::StatusCode;
use std::fmt;

/// A boxed, thread-safe error used for transform and transport sources.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Broad classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The caller cancelled the request through its [`CancelToken`](crate::CancelToken).
    Cancelled,
    /// The transport failed before any response was received.
    Network,
    /// The adapter's deadline elapsed before the exchange completed.
    Timeout,
    /// A response was received but rejected by `validate_status`.
    Status,
    /// A request or response transform failed.
    Transform,
    /// The response data could not be decoded into the requested type.
    Deserialization,
    /// The request could not be built from its configuration.
    Configuration,
}

/// Machine-readable error codes attached to transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// The exchange was aborted because the timeout elapsed.
    ConnectionAborted,
    /// Connection-level failure.
    Network,
    /// Status validation rejected the response.
    BadResponse,
    /// The request was cancelled.
    Canceled,
    /// An option in the request configuration was invalid.
    BadOption,
}

impl ErrorCode {
    /// Returns the wire-compatible string form of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ConnectionAborted => "ECONNABORTED",
            ErrorCode::Network => "ERR_NETWORK",
            ErrorCode::BadResponse => "ERR_BAD_RESPONSE",
            ErrorCode::Canceled => "ERR_CANCELED",
            ErrorCode::BadOption => "ERR_BAD_OPTION",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error value produced by every stage of the pipeline.
#[derive(thiserror::Error, Debug)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    code: Option<ErrorCode>,
    config: Box<RequestConfig>,
    request: Option<RequestHandle>,
    response: Option<Box<Response>>,
    cancel: Option<Cancel>,
    #[source]
    source: Option<BoxError>,
}

impl Error {
    /// Builds an error from its parts.
    ///
    /// This is the single construction point the named constructors below
    /// delegate to; adapters outside this crate use it to honor the same shape.
    pub fn create(
        kind: ErrorKind,
        message: impl Into<String>,
        config: RequestConfig,
        code: Option<ErrorCode>,
        request: Option<RequestHandle>,
        response: Option<Response>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            code,
            config: Box::new(config),
            request,
            response: response.map(Box::new),
            cancel: None,
            source: None,
        }
    }

    /// The request was cancelled with `reason`.
    pub fn cancelled(reason: Cancel, config: RequestConfig) -> Self {
        let mut error = Self::create(
            ErrorKind::Cancelled,
            reason.message(),
            config,
            Some(ErrorCode::Canceled),
            None,
            None,
        );
        error.cancel = Some(reason);
        error
    }

    /// The transport failed without producing a response.
    pub fn network(
        config: RequestConfig,
        request: RequestHandle,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::create(
            ErrorKind::Network,
            "Network Error",
            config,
            Some(ErrorCode::Network),
            Some(request),
            None,
        )
        .with_source(source)
    }

    /// The exchange did not finish within `timeout_ms`.
    pub fn timeout(config: RequestConfig, request: RequestHandle, timeout_ms: u128) -> Self {
        Self::create(
            ErrorKind::Timeout,
            format!("Timeout of {} ms exceeded", timeout_ms),
            config,
            Some(ErrorCode::ConnectionAborted),
            Some(request),
            None,
        )
    }

    /// A response was received but failed status validation.
    pub fn status(response: Response) -> Self {
        let message = format!(
            "Request failed with status code {}",
            response.status.as_u16()
        );
        let config = response.config.clone();
        let request = response.request.clone();
        Self::create(
            ErrorKind::Status,
            message,
            config,
            Some(ErrorCode::BadResponse),
            Some(request),
            Some(response),
        )
    }

    /// The configuration could not be turned into a request.
    pub fn configuration(message: impl Into<String>, config: RequestConfig) -> Self {
        Self::create(
            ErrorKind::Configuration,
            message,
            config,
            Some(ErrorCode::BadOption),
            None,
            None,
        )
    }

    /// A request or response transform failed.
    pub fn transform(source: impl Into<BoxError>, config: RequestConfig) -> Self {
        let source = source.into();
        Self::create(
            ErrorKind::Transform,
            format!("Transform failed: {}", source),
            config,
            None,
            None,
            None,
        )
        .with_source(source)
    }

    /// Attaches an underlying cause.
    pub fn with_source(mut self, source: impl Into<BoxError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns the error classification.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the machine-readable code, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        self.code
    }

    /// Returns the configuration of the failed request.
    pub fn config(&self) -> &RequestConfig {
        &self.config
    }

    /// Returns the transport handle, if the request got that far.
    pub fn request(&self) -> Option<&RequestHandle> {
        self.request.as_ref()
    }

    /// Returns the response for status-validation failures.
    ///
    /// Always `None` for network, timeout, and cancellation failures.
    pub fn response(&self) -> Option<&Response> {
        self.response.as_deref()
    }

    /// Consumes the error, returning the attached response if there is one.
    pub fn into_response(self) -> Option<Response> {
        self.response.map(|response| *response)
    }

    /// Returns the HTTP status of the attached response.
    pub fn status_code(&self) -> Option<StatusCode> {
        self.response.as_ref().map(|response| response.status)
    }

    /// Returns `true` if the request was cancelled by the caller.
    pub fn is_cancel(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }

    /// Returns the cancellation reason for cancelled requests.
    pub fn cancel_reason(&self) -> Option<&Cancel> {
        self.cancel.as_ref()
    }

    pub(crate) fn take_response(&mut self) -> Option<Response> {
        self.response.take().map(|response| *response)
    }

    pub(crate) fn set_response(&mut self, response: Response) {
        self.response = Some(Box::new(response));
    }
}

/// A specialized `Result` type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;
