//! Runs one request through the transforms and its adapter.

use crate::{
    config::RequestConfig,
    headers::{flatten, strip_content_type, RequestHeaders},
    transform,
    uri::{build_url, combine_url, is_absolute_url},
    Error, Response, Result,
};

/// Resolves the final request URL: base URL joined to relative URLs, then the
/// query parameters appended.
pub fn transform_url(config: &RequestConfig) -> String {
    let mut url = config.url.clone().unwrap_or_default();
    if let Some(base_url) = config.base_url.as_deref() {
        if !is_absolute_url(&url) {
            url = combine_url(base_url, &url);
        }
    }
    build_url(
        &url,
        config.params.as_ref(),
        config.params_serializer.as_ref(),
    )
}

fn process_config(config: &mut RequestConfig) -> std::result::Result<(), crate::BoxError> {
    config.url = Some(transform_url(config));

    let method = config.method_or_default();
    let data = config.data.take().unwrap_or_default();
    let data = transform::run(
        data,
        &mut config.headers.own,
        config.transform_request.as_deref(),
    )?;

    let mut headers = flatten(&config.headers, &method);
    strip_content_type(&mut headers, &data);
    config.headers = RequestHeaders::from(headers);
    config.method = Some(method);
    config.data = Some(data);
    Ok(())
}

fn transform_response_data(mut response: Response) -> Result<Response> {
    let data = std::mem::take(&mut response.data);
    match transform::run(
        data,
        &mut response.headers,
        response.config.transform_response.as_deref(),
    ) {
        Ok(data) => {
            response.data = data;
            Ok(response)
        }
        Err(e) => Err(Error::transform(e, response.config)),
    }
}

/// Sends `config` through its adapter.
///
/// Fails immediately, without touching the adapter, when the request's cancel
/// token has already fired. Otherwise the URL, body, and headers are processed,
/// the adapter runs, and the response transforms are applied to the response,
/// including the response attached to a status-validation error.
pub async fn dispatch_request(mut config: RequestConfig) -> Result<Response> {
    if let Some(token) = &config.cancel_token {
        if let Err(reason) = token.throw_if_requested() {
            tracing::debug!(reason = %reason, "Request cancelled before dispatch");
            return Err(Error::cancelled(reason, config));
        }
    }

    let Some(adapter) = config.adapter.clone() else {
        return Err(Error::configuration(
            "No adapter configured for request",
            config,
        ));
    };

    if let Err(e) = process_config(&mut config) {
        return Err(Error::transform(e, config));
    }

    tracing::debug!(
        method = %config.method_or_default(),
        url = config.url.as_deref().unwrap_or_default(),
        "Dispatching request"
    );

    match adapter.execute(config).await {
        Ok(response) => transform_response_data(response),
        Err(mut error) => {
            if let Some(response) = error.take_response() {
                error.set_response(transform_response_data(response)?);
            }
            Err(error)
        }
    }
}
