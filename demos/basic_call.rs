//! Basic example demonstrating GET and POST requests with interceptors.
//!
//! Run with: `cargo run --example basic_call`

use courier::{CancelToken, Client, Params, RequestConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct Post {
    #[serde(rename = "userId")]
    user_id: u32,
    id: u32,
    title: String,
    body: String,
}

#[derive(Debug, Serialize)]
struct NewPost {
    title: String,
    body: String,
    #[serde(rename = "userId")]
    user_id: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("courier=debug,basic_call=info")
        .init();

    let client = Client::builder()
        .base_url("https://jsonplaceholder.typicode.com")?
        .timeout(Duration::from_secs(10))
        .build()?;

    client
        .interceptors()
        .request
        .on_fulfilled(|config| async move { Ok(config.header("X-Demo", "basic_call")) });

    println!("=== GET Request Example ===");
    let response = client.request(RequestConfig::get("/posts/1")).await?;
    let post: Post = response.json()?;
    println!("Post ID: {}", post.id);
    println!("Title: {}", post.title);
    println!("Status: {} {}", response.status, response.status_text);
    println!("Sent to: {}", response.request.url);
    println!();

    println!("=== Query Parameters ===");
    let config = RequestConfig::get("/comments").params(Params::new().with("postId", 1));
    let response = client.request(config).await?;
    println!("Request URL: {}", response.request.url);
    println!();

    println!("=== POST Request Example ===");
    let new_post = NewPost {
        title: "My New Post".to_string(),
        body: "This is the content of my new post!".to_string(),
        user_id: 1,
    };
    let response = client
        .request(RequestConfig::post("/posts").json(&new_post)?)
        .await?;
    let created: Post = response.json()?;
    println!("Created post ID: {}", created.id);
    println!("Content-Type: {:?}", response.header("content-type"));
    println!();

    println!("=== Cancellation ===");
    let source = CancelToken::source();
    source.canceler.cancel("demo cancelled");
    let result = client
        .request(RequestConfig::get("/posts").cancel_token(source.token.clone()))
        .await;
    match result {
        Err(e) if e.is_cancel() => println!("Cancelled: {}", e),
        Err(e) => return Err(e.into()),
        Ok(_) => println!("Request was not cancelled"),
    }

    Ok(())
}
