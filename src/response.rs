//! The normalized response produced by every adapter.
//!
//! A [`Response`] keeps the transformed data together with the status line,
//! normalized headers, the configuration that produced it, and a handle
//! describing what was sent.

use crate::{adapter::RequestHandle, body::Body, config::RequestConfig, headers::Headers};
use crate::{Error, ErrorKind, Result};
use http::StatusCode;
use serde::de::DeserializeOwned;

/// A response that passed status validation, or the response attached to a
/// status-validation [`Error`].
///
/// # Examples
///
/// ```no_run
/// use courier::{Client, RequestConfig};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), courier::Error> {
/// let client = Client::builder()
///     .base_url("https://api.example.com")?
///     .build()?;
///
/// let response = client.request(RequestConfig::get("/users/123")).await?;
///
/// println!("Status: {} {}", response.status, response.status_text);
/// println!("Content-Type: {:?}", response.header("content-type"));
///
/// let user: User = response.json()?;
/// println!("User: {}", user.name);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    /// The response data, after the response transforms ran.
    pub data: Body,

    /// The HTTP status code.
    pub status: StatusCode,

    /// The canonical reason phrase for `status`.
    pub status_text: String,

    /// Response headers with lowercase names.
    pub headers: Headers,

    /// The configuration of the request that produced this response.
    pub config: RequestConfig,

    /// What the adapter put on the wire.
    pub request: RequestHandle,
}

impl Response {
    /// Returns a header value by name, ignoring case.
    ///
    /// # Examples
    ///
    /// ```
    /// # use courier::{Body, Headers, RequestConfig, RequestHandle, Response};
    /// # use http::{Method, StatusCode};
    /// let mut headers = Headers::new();
    /// headers.set("content-type", "application/json");
    ///
    /// let response = Response {
    ///     data: Body::Empty,
    ///     status: StatusCode::OK,
    ///     status_text: "OK".to_string(),
    ///     headers,
    ///     config: RequestConfig::get("/"),
    ///     request: RequestHandle::new(Method::GET, "http://localhost/"),
    /// };
    ///
    /// assert_eq!(response.header("Content-Type"), Some("application/json"));
    /// ```
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Returns `true` for `2xx` statuses.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns the data as text, if the transforms left it as text.
    pub fn text(&self) -> Option<&str> {
        self.data.as_text()
    }

    /// Decodes the data into `T`.
    ///
    /// Works on JSON data as well as text or bytes that were not decoded by the
    /// response transforms.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::Deserialization`] error that preserves the raw
    /// data and this response.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let decoded = match &self.data {
            Body::Json(value) => T::deserialize(value).map_err(|e| (e, value.to_string())),
            Body::Text(text) => serde_json::from_str(text).map_err(|e| (e, text.clone())),
            Body::Bytes(bytes) => serde_json::from_slice(bytes)
                .map_err(|e| (e, String::from_utf8_lossy(bytes).into_owned())),
            Body::Empty => serde_json::from_str("null").map_err(|e| (e, String::new())),
            Body::Form(_) | Body::UrlEncoded(_) => {
                return Err(Error::create(
                    ErrorKind::Deserialization,
                    "Response data is not decodable as JSON",
                    self.config.clone(),
                    None,
                    Some(self.request.clone()),
                    Some(self.clone()),
                ));
            }
        };

        decoded.map_err(|(e, raw)| {
            tracing::error!(
                error = %e,
                raw_response = %raw,
                "Failed to deserialize response"
            );
            Error::create(
                ErrorKind::Deserialization,
                format!(
                    "Failed to deserialize response (status {}): {}",
                    self.status.as_u16(),
                    e
                ),
                self.config.clone(),
                None,
                Some(self.request.clone()),
                Some(self.clone()),
            )
            .with_source(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
    }

    fn response(data: Body) -> Response {
        Response {
            data,
            status: StatusCode::OK,
            status_text: "OK".to_string(),
            headers: Headers::new(),
            config: RequestConfig::get("/items/1"),
            request: RequestHandle::new(Method::GET, "http://localhost/items/1"),
        }
    }

    #[test]
    fn test_json_from_each_representation() {
        let expected = Item { id: 7 };
        let from_json = response(Body::Json(serde_json::json!({"id": 7})));
        assert_eq!(from_json.json::<Item>().unwrap(), expected);

        let from_text = response(Body::Text(r#"{"id":7}"#.into()));
        assert_eq!(from_text.json::<Item>().unwrap(), expected);

        let from_bytes = response(Body::Bytes(bytes::Bytes::from_static(br#"{"id":7}"#)));
        assert_eq!(from_bytes.json::<Item>().unwrap(), expected);

        let empty = response(Body::Empty);
        assert_eq!(empty.json::<Option<Item>>().unwrap(), None);
    }

    #[test]
    fn test_json_failure_keeps_response() {
        let resp = response(Body::Text("invalid json".into()));
        let err = resp.json::<Item>().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Deserialization);
        assert!(err.to_string().contains("status 200"));
        assert_eq!(
            err.response().and_then(Response::text),
            Some("invalid json")
        );
    }
}
