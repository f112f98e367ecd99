//! The transport boundary.
//!
//! An [`Adapter`] performs the network exchange for exactly one request. It is
//! handed a fully processed [`RequestConfig`]: the URL already carries its query,
//! the body has been through the request transforms, and the headers are flat.
//!
//! Implementations must honor the same contract as [`HttpAdapter`]:
//!
//! - resolve with a [`Response`] only when `validate_status` accepts the status
//!   (default `200..300`), otherwise fail with [`Error::status`];
//! - fail with [`Error::network`] or [`Error::timeout`] without a response;
//! - stop work and fail with [`Error::cancelled`] once the request's
//!   [`CancelToken`](crate::CancelToken) fires.

mod transport;

pub use self::transport::HttpAdapter;

use crate::{config::RequestConfig, headers::Headers, Error, Response, Result};
use async_trait::async_trait;
use http::{Method, StatusCode};

/// Executes one request against a concrete transport.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Performs the exchange described by `config`.
    async fn execute(&self, config: RequestConfig) -> Result<Response>;
}

/// A snapshot of what the adapter put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHandle {
    pub method: Method,
    pub url: String,
    pub headers: Headers,
}

impl RequestHandle {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Headers::new(),
        }
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }
}

/// Applies the request's status validation, failing with a status error on rejection.
pub fn settle(response: Response) -> Result<Response> {
    let accepted = match &response.config.validate_status {
        Some(validate) => validate(response.status),
        None => default_validate(response.status),
    };
    if accepted {
        Ok(response)
    } else {
        Err(Error::status(response))
    }
}

fn default_validate(status: StatusCode) -> bool {
    status.is_success()
}
