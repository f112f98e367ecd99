//! Integration tests using wiremock to simulate HTTP servers.

use courier::{
    Body, CancelToken, Client, ErrorCode, ErrorKind, FormData, Params, ProgressEvent,
    RequestConfig, ResponseType,
};
use http::Method;
use reqwest::cookie::{CookieStore, Jar};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{basic_auth, body_json, body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct TestData {
    id: u32,
    name: String,
}

async fn client_for(server: &MockServer) -> Client {
    Client::builder()
        .base_url(server.uri())
        .unwrap()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_successful_get_request() {
    let mock_server = MockServer::start().await;

    let response_data = TestData {
        id: 1,
        name: "Test".to_string(),
    };

    Mock::given(method("GET"))
        .and(path("/test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&response_data))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).await;
    let response = client.request(RequestConfig::get("/test")).await.unwrap();

    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.status_text, "OK");
    assert!(matches!(response.data, Body::Json(_)));
    assert_eq!(response.json::<TestData>().unwrap(), response_data);
    assert_eq!(response.request.url, format!("{}/test", mock_server.uri()));

    let received = mock_server.received_requests().await.unwrap();
    assert_eq!(
        received[0].headers.get("accept").unwrap(),
        "application/json, text/plain, */*"
    );
}

#[tokio::test]
async fn test_successful_post_json_request() {
    let mock_server = MockServer::start().await;

    let request_data = TestData {
        id: 0,
        name: "New".to_string(),
    };
    let response_data = TestData {
        id: 1,
        name: "New".to_string(),
    };

    Mock::given(method("POST"))
        .and(path("/test"))
        .and(header("content-type", "application/json"))
        .and(body_json(&request_data))
        .respond_with(ResponseTemplate::new(201).set_body_json(&response_data))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).await;
    let config = RequestConfig::post("/test").json(&request_data).unwrap();
    let response = client.request(config).await.unwrap();

    assert_eq!(response.status.as_u16(), 201);
    assert_eq!(response.json::<TestData>().unwrap(), response_data);
}

#[tokio::test]
async fn test_status_error_keeps_transformed_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(serde_json::json!({"error": "not found"})),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).await;
    let err = client
        .request(RequestConfig::get("/missing"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Status);
    assert_eq!(err.code(), Some(ErrorCode::BadResponse));
    assert_eq!(err.to_string(), "Request failed with status code 404");
    assert!(err.request().is_some());

    let response = err.response().unwrap();
    assert_eq!(response.status.as_u16(), 404);
    assert_eq!(
        response.data,
        Body::Json(serde_json::json!({"error": "not found"}))
    );
}

#[tokio::test]
async fn test_custom_validate_status_accepts_404() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).await;
    let config = RequestConfig::get("/missing").validate_status(|status| status.as_u16() < 500);
    let response = client.request(config).await.unwrap();

    assert_eq!(response.status.as_u16(), 404);
    assert!(!response.is_success());
}

#[tokio::test]
async fn test_query_params_on_the_wire() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "rust lang"))
        .and(query_param("page", "2"))
        .and(query_param("tags[]", "a"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).await;
    let params = Params::new()
        .with("q", "rust lang")
        .with("page", 2)
        .with("tags", vec!["a", "b"])
        .with("skipped", Option::<&str>::None);
    let response = client
        .request(RequestConfig::get("/search").params(params))
        .await
        .unwrap();

    assert_eq!(response.text(), Some("ok"));
    assert!(!response.request.url.contains("skipped"));
}

#[tokio::test]
async fn test_base_url_joined_to_relative_path() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(format!("{}/api/v1/", mock_server.uri()))
        .unwrap()
        .build()
        .unwrap();

    let response = client.request(RequestConfig::get("/users")).await.unwrap();
    assert_eq!(response.data, Body::Json(serde_json::json!([])));
}

#[tokio::test]
async fn test_timeout_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .timeout(Duration::from_millis(50))
        .build()
        .unwrap();

    let err = client.request(RequestConfig::get("/slow")).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(err.code(), Some(ErrorCode::ConnectionAborted));
    assert_eq!(err.message(), "Timeout of 50 ms exceeded");
    assert!(err.response().is_none());
    assert!(err.request().is_some());
}

#[tokio::test]
async fn test_zero_timeout_waits() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(100)))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).await;
    let response = client.request(RequestConfig::get("/slow")).await.unwrap();
    assert_eq!(response.status.as_u16(), 200);
}

#[tokio::test]
async fn test_cancel_in_flight() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).await;
    let source = CancelToken::source();
    let canceler = source.canceler.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceler.cancel("user abort");
    });

    let config = RequestConfig::get("/slow").cancel_token(source.token.clone());
    let err = client.request(config).await.unwrap_err();

    assert!(err.is_cancel());
    assert_eq!(err.code(), Some(ErrorCode::Canceled));
    assert_eq!(err.cancel_reason().map(|c| c.message()), Some("user abort"));
    assert!(err.response().is_none());
}

#[tokio::test]
async fn test_network_error() {
    let client = Client::builder()
        .base_url("http://127.0.0.1:1")
        .unwrap()
        .build()
        .unwrap();

    let err = client.request(RequestConfig::get("/")).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(err.code(), Some(ErrorCode::Network));
    assert_eq!(err.message(), "Network Error");
    assert!(err.response().is_none());
    assert!(err.request().is_some());
}

#[tokio::test]
async fn test_xsrf_header_for_same_origin() {
    let mock_server = MockServer::start().await;
    let origin = Url::parse(&mock_server.uri()).unwrap();

    Mock::given(method("POST"))
        .and(path("/form"))
        .and(header("x-xsrf-token", "token-123"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let jar = Arc::new(Jar::default());
    jar.add_cookie_str("XSRF-TOKEN=token-123; Path=/", &origin);

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .origin(mock_server.uri())
        .unwrap()
        .cookie_jar(jar)
        .build()
        .unwrap();

    let response = client
        .request(RequestConfig::post("/form").data("a=1"))
        .await
        .unwrap();
    assert_eq!(response.status.as_u16(), 204);
}

#[tokio::test]
async fn test_no_xsrf_header_cross_origin() {
    let mock_server = MockServer::start().await;
    let origin = Url::parse("http://app.example.test/").unwrap();

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let jar = Arc::new(Jar::default());
    jar.add_cookie_str("XSRF-TOKEN=token-123; Path=/", &origin);

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .origin(origin.as_str())
        .unwrap()
        .cookie_jar(jar)
        .build()
        .unwrap();

    client.request(RequestConfig::get("/data")).await.unwrap();

    let received = mock_server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert!(received[0].headers.get("x-xsrf-token").is_none());
    assert!(received[0].headers.get("cookie").is_none());
}

#[tokio::test]
async fn test_set_cookie_stored_for_same_origin() {
    let mock_server = MockServer::start().await;
    let origin = Url::parse(&mock_server.uri()).unwrap();

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "session=s1; Path=/"))
        .mount(&mock_server)
        .await;

    let jar = Arc::new(Jar::default());
    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .origin(mock_server.uri())
        .unwrap()
        .cookie_jar(Arc::clone(&jar))
        .build()
        .unwrap();

    client.request(RequestConfig::get("/login")).await.unwrap();

    let cookies = jar.cookies(&origin).unwrap();
    assert_eq!(cookies.to_str().unwrap(), "session=s1");
}

#[tokio::test]
async fn test_basic_auth_replaces_authorization_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/private"))
        .and(basic_auth("user", "pass"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).await;
    let config = RequestConfig::get("/private")
        .header("Authorization", "Bearer stale")
        .auth("user", "pass");
    client.request(config).await.unwrap();
}

#[tokio::test]
async fn test_method_headers_only_for_their_method() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/item"))
        .and(header("x-confirm", "yes"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/item"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = Client::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .method_header(Method::DELETE, "X-Confirm", "yes")
        .unwrap()
        .build()
        .unwrap();

    client
        .request(RequestConfig::new(Method::DELETE, "/item"))
        .await
        .unwrap();
    client.request(RequestConfig::get("/item")).await.unwrap();

    let received = mock_server.received_requests().await.unwrap();
    let get = received.iter().find(|r| r.method.as_str() == "GET").unwrap();
    assert!(get.headers.get("x-confirm").is_none());
}

#[tokio::test]
async fn test_form_data_upload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).await;
    let form = FormData::new()
        .text("title", "report")
        .file("file", "report.txt", Some("text/plain"), b"contents".to_vec());
    client
        .request(RequestConfig::post("/upload").data(form))
        .await
        .unwrap();

    let received = mock_server.received_requests().await.unwrap();
    let content_type = received[0].headers.get("content-type").unwrap();
    assert!(content_type
        .to_str()
        .unwrap()
        .starts_with("multipart/form-data; boundary="));
    let body = String::from_utf8_lossy(&received[0].body);
    assert!(body.contains("report.txt"));
    assert!(body.contains("contents"));
}

#[tokio::test]
async fn test_upload_and_download_progress() {
    let mock_server = MockServer::start().await;
    let payload = "x".repeat(150 * 1024);

    Mock::given(method("PUT"))
        .and(path("/blob"))
        .and(body_string(payload.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let uploads: Arc<Mutex<Vec<ProgressEvent>>> = Arc::default();
    let downloads: Arc<Mutex<Vec<ProgressEvent>>> = Arc::default();
    let upload_sink = Arc::clone(&uploads);
    let download_sink = Arc::clone(&downloads);

    let client = client_for(&mock_server).await;
    let config = RequestConfig::new(Method::PUT, "/blob")
        .data(payload.clone())
        .response_type(ResponseType::ArrayBuffer)
        .on_upload_progress(move |event| upload_sink.lock().unwrap().push(event))
        .on_download_progress(move |event| download_sink.lock().unwrap().push(event));
    let response = client.request(config).await.unwrap();

    assert_eq!(response.data, Body::Bytes(vec![7u8; 4096].into()));

    let uploads = uploads.lock().unwrap();
    assert_eq!(uploads.len(), 3);
    let last = uploads.last().unwrap();
    assert_eq!(last.loaded, payload.len() as u64);
    assert_eq!(last.total, Some(payload.len() as u64));
    assert!(uploads.windows(2).all(|w| w[0].loaded < w[1].loaded));

    let downloads = downloads.lock().unwrap();
    let last = downloads.last().unwrap();
    assert_eq!(last.loaded, 4096);
    assert_eq!(last.fraction(), Some(1.0));
}

#[tokio::test]
async fn test_request_interceptor_adds_header() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/traced"))
        .and(header("x-trace-id", "abc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).await;
    client
        .interceptors()
        .request
        .on_fulfilled(|config| async move { Ok(config.header("X-Trace-Id", "abc")) });

    client.request(RequestConfig::get("/traced")).await.unwrap();
}

#[tokio::test]
async fn test_response_interceptor_recovers_from_status_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).await;
    client.interceptors().response.on_rejected(|error| async move {
        match error.into_response() {
            Some(response) => Ok(response),
            None => panic!("status errors carry the response"),
        }
    });

    let response = client.request(RequestConfig::get("/flaky")).await.unwrap();
    assert_eq!(response.status.as_u16(), 503);
    assert_eq!(response.text(), Some("unavailable"));
}

#[tokio::test]
async fn test_client_is_clonable_and_shares_interceptors() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/shared"))
        .and(header("x-shared", "1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server).await;
    let clone = client.clone();
    client
        .interceptors()
        .request
        .on_fulfilled(|config| async move { Ok(config.header("X-Shared", "1")) });

    client.request(RequestConfig::get("/shared")).await.unwrap();
    clone.request(RequestConfig::get("/shared")).await.unwrap();
}
