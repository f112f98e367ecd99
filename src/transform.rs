//! Request and response data transforms.
//!
//! A transform is a function `(data, headers) -> data`. Transforms run in
//! order; the first failure stops the sequence.

use crate::{body::Body, error::BoxError, headers::Headers, headers::CONTENT_TYPE};
use std::sync::Arc;

/// A single step of a transform sequence.
pub type Transformer =
    Arc<dyn Fn(Body, &mut Headers) -> Result<Body, BoxError> + Send + Sync>;

/// Wraps a closure as a [`Transformer`].
pub fn transformer<F>(f: F) -> Transformer
where
    F: Fn(Body, &mut Headers) -> Result<Body, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Encodes JSON bodies as text and defaults `Content-Type` to `application/json`.
///
/// An unset `Content-Type` stays unset.
pub fn default_request_transform() -> Transformer {
    transformer(|data, headers| match data {
        Body::Json(value) => {
            if !headers.is_present(CONTENT_TYPE) {
                headers.set(CONTENT_TYPE, "application/json");
            }
            Ok(Body::Text(serde_json::to_string(&value)?))
        }
        other => Ok(other),
    })
}

/// Decodes text data as JSON when it parses; leaves it as text otherwise.
pub fn default_response_transform() -> Transformer {
    transformer(|data, _headers| match data {
        Body::Text(text) => match serde_json::from_str(&text) {
            Ok(value) => Ok(Body::Json(value)),
            Err(_) => Ok(Body::Text(text)),
        },
        other => Ok(other),
    })
}

pub(crate) fn run(
    mut data: Body,
    headers: &mut Headers,
    transforms: Option<&[Transformer]>,
) -> Result<Body, BoxError> {
    for transform in transforms.unwrap_or_default() {
        data = transform(data, headers)?;
    }
    Ok(data)
}
