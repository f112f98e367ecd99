//! The default adapter, backed by `reqwest`.

use super::{settle, Adapter, RequestHandle};
use crate::{
    body::Body,
    cancel::{Cancel, CancelToken},
    config::{ProgressCallback, ProgressEvent, RequestConfig, ResponseType},
    headers::{Headers, CONTENT_TYPE},
    uri::OriginContext,
    Error, Response, Result,
};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use reqwest::cookie::{CookieStore, Jar};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;
const AUTHORIZATION: &str = "Authorization";

/// Performs requests over HTTP with `reqwest`.
///
/// The adapter owns the [`OriginContext`] the client acts for and a cookie jar.
/// Cookies are attached, and `Set-Cookie` responses stored, only for
/// same-origin requests or requests with `with_credentials` enabled.
#[derive(Clone)]
pub struct HttpAdapter {
    client: reqwest::Client,
    context: OriginContext,
    jar: Arc<Jar>,
}

struct Received {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

enum Outcome {
    Cancelled(Cancel),
    TimedOut,
    Completed(reqwest::Result<Received>),
}

impl HttpAdapter {
    /// Creates an adapter for `context` that shares cookies through `jar`.
    pub fn new(context: OriginContext, jar: Arc<Jar>) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            context,
            jar,
        })
    }

    /// Returns the cookie jar.
    pub fn jar(&self) -> &Arc<Jar> {
        &self.jar
    }

    /// Returns the origin context.
    pub fn context(&self) -> &OriginContext {
        &self.context
    }

    /// Reads a cookie visible to the origin.
    fn read_cookie(&self, name: &str) -> Option<String> {
        let origin = self.context.origin()?;
        let cookies = self.jar.cookies(origin)?;
        let cookies = cookies.to_str().ok()?;
        cookies.split(';').find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then(|| value.to_string())
        })
    }

    fn header_map(headers: &Headers, config: &RequestConfig) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        for (name, value) in headers.iter() {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                Error::configuration(
                    format!("Invalid header name {}: {}", name, e),
                    config.clone(),
                )
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                Error::configuration(
                    format!("Invalid value for header {}: {}", name, e),
                    config.clone(),
                )
            })?;
            map.insert(header_name, header_value);
        }
        Ok(map)
    }
}

fn upload_body(bytes: Bytes, progress: Option<ProgressCallback>) -> reqwest::Body {
    let Some(progress) = progress else {
        return reqwest::Body::from(bytes);
    };

    let total = bytes.len() as u64;
    let chunks: Vec<Bytes> = (0..bytes.len())
        .step_by(UPLOAD_CHUNK_SIZE)
        .map(|start| bytes.slice(start..(start + UPLOAD_CHUNK_SIZE).min(bytes.len())))
        .collect();
    let mut loaded = 0u64;
    let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
        loaded += chunk.len() as u64;
        progress(ProgressEvent {
            loaded,
            total: Some(total),
        });
        Ok::<_, std::io::Error>(chunk)
    }));
    reqwest::Body::wrap_stream(stream)
}

fn response_data(body: Bytes, response_type: ResponseType) -> Body {
    match response_type {
        ResponseType::Default | ResponseType::Text | ResponseType::Document => {
            Body::Text(String::from_utf8_lossy(&body).into_owned())
        }
        ResponseType::Json => serde_json::from_slice(&body)
            .map(Body::Json)
            .unwrap_or(Body::Empty),
        ResponseType::Blob | ResponseType::ArrayBuffer => Body::Bytes(body),
    }
}

async fn receive(
    request: reqwest::RequestBuilder,
    on_download: Option<ProgressCallback>,
) -> reqwest::Result<Received> {
    let mut response = request.send().await?;
    let status = response.status();
    let headers = response.headers().clone();

    let body = match on_download {
        None => response.bytes().await?,
        Some(progress) => {
            let total = response.content_length();
            let mut buffer = BytesMut::new();
            while let Some(chunk) = response.chunk().await? {
                buffer.extend_from_slice(&chunk);
                progress(ProgressEvent {
                    loaded: buffer.len() as u64,
                    total,
                });
            }
            buffer.freeze()
        }
    };

    Ok(Received {
        status,
        headers,
        body,
    })
}

async fn cancellation(token: Option<CancelToken>) -> Cancel {
    match token {
        Some(token) => token.cancelled().await,
        None => futures::future::pending().await,
    }
}

async fn deadline<F: Future>(future: F, timeout: Option<Duration>) -> Option<F::Output> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, future).await.ok(),
        None => Some(future.await),
    }
}

#[async_trait]
impl Adapter for HttpAdapter {
    async fn execute(&self, config: RequestConfig) -> Result<Response> {
        let method = config.method_or_default();
        let raw_url = config.url.clone().unwrap_or_default();
        let url: Url = self.context.resolve(&raw_url).map_err(|e| {
            Error::configuration(format!("Invalid URL {}: {}", raw_url, e), config.clone())
                .with_source(e)
        })?;

        let mut headers = config.headers.own.clone();
        let credentialed =
            config.with_credentials.unwrap_or(false) || self.context.is_same_origin(&url);

        if credentialed {
            if let (Some(cookie_name), Some(header_name)) = (
                config.xsrf_cookie_name.as_deref(),
                config.xsrf_header_name.as_deref(),
            ) {
                if let Some(token) = self.read_cookie(cookie_name) {
                    headers.set(header_name, token);
                }
            }
        }

        if config.auth.is_some() {
            headers.remove(AUTHORIZATION);
        }

        let data = config.data.clone().unwrap_or_default();
        let upload_progress = config.on_upload_progress.clone();
        let mut request = self.client.request(method.clone(), url.clone());
        let mut sized_body = None;

        request = match data {
            Body::Empty => request,
            Body::Form(form) => {
                let form = form.into_multipart().map_err(|e| {
                    Error::configuration(format!("Invalid form data: {}", e), config.clone())
                        .with_source(e)
                })?;
                request.multipart(form)
            }
            Body::UrlEncoded(pairs) => {
                if !headers.is_present(CONTENT_TYPE) {
                    headers.set(
                        CONTENT_TYPE,
                        "application/x-www-form-urlencoded;charset=utf-8",
                    );
                }
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(&pairs)
                    .finish();
                sized_body = Some(encoded.len());
                request.body(upload_body(Bytes::from(encoded), upload_progress))
            }
            Body::Text(text) => {
                sized_body = Some(text.len());
                request.body(upload_body(Bytes::from(text), upload_progress))
            }
            Body::Json(value) => {
                let encoded = serde_json::to_vec(&value).map_err(|e| {
                    Error::configuration(format!("Invalid JSON body: {}", e), config.clone())
                        .with_source(e)
                })?;
                sized_body = Some(encoded.len());
                request.body(upload_body(Bytes::from(encoded), upload_progress))
            }
            Body::Bytes(bytes) => {
                sized_body = Some(bytes.len());
                request.body(upload_body(bytes, upload_progress))
            }
        };

        let mut map = Self::header_map(&headers, &config)?;
        if let (Some(length), Some(_)) = (sized_body, config.on_upload_progress.as_ref()) {
            map.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
        }
        if credentialed {
            if let Some(cookies) = self.jar.cookies(&url) {
                map.insert(header::COOKIE, cookies);
            }
        }
        request = request.headers(map);
        if let Some(auth) = &config.auth {
            request = request.basic_auth(&auth.username, Some(&auth.password));
        }

        let handle = RequestHandle::new(method.clone(), url.as_str()).with_headers(headers);
        let timeout = config.timeout.filter(|limit| !limit.is_zero());

        tracing::debug!(
            method = %method,
            url = %url,
            timeout_ms = timeout.map(|limit| limit.as_millis() as u64),
            "Opening transport handle"
        );

        let started = Instant::now();
        let exchange = receive(request, config.on_download_progress.clone());
        let outcome = tokio::select! {
            biased;
            reason = cancellation(config.cancel_token.clone()) => Outcome::Cancelled(reason),
            received = deadline(exchange, timeout) => match received {
                Some(result) => Outcome::Completed(result),
                None => Outcome::TimedOut,
            },
        };

        let received = match outcome {
            Outcome::Cancelled(reason) => {
                tracing::debug!(url = %url, reason = %reason, "Request aborted by cancellation");
                return Err(Error::cancelled(reason, config));
            }
            Outcome::TimedOut => {
                let limit = timeout.map(|limit| limit.as_millis()).unwrap_or_default();
                tracing::warn!(url = %url, timeout_ms = limit as u64, "Request timed out");
                return Err(Error::timeout(config, handle, limit));
            }
            Outcome::Completed(Err(e)) => {
                tracing::warn!(error = %e, url = %url, "Network error");
                return Err(Error::network(config, handle, e));
            }
            Outcome::Completed(Ok(received)) => received,
        };

        if credentialed {
            let mut set_cookies = received.headers.get_all(header::SET_COOKIE).iter();
            self.jar.set_cookies(&mut set_cookies, &url);
        }

        tracing::info!(
            status = received.status.as_u16(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Received HTTP response"
        );

        let response_type = config.response_type.unwrap_or_default();
        let response = Response {
            data: response_data(received.body, response_type),
            status: received.status,
            status_text: received
                .status
                .canonical_reason()
                .unwrap_or_default()
                .to_string(),
            headers: Headers::from(&received.headers),
            config,
            request: handle,
        };

        settle(response).inspect_err(|e| {
            if let Some(status) = e.status_code() {
                if status.is_client_error() {
                    tracing::error!(status = status.as_u16(), "Client error (4xx)");
                } else {
                    tracing::warn!(
                        status = status.as_u16(),
                        "Response failed status validation"
                    );
                }
            }
        })
    }
}
