//! # Courier - a promise-style HTTP client core
//!
//! Courier turns a layered request configuration into one HTTP exchange and a
//! normalized [`Response`]. Every call goes through the same pipeline: client
//! defaults are merged with the call's configuration, request interceptors run,
//! the dispatcher applies the request transforms and hands the request to a
//! transport [`Adapter`], and response interceptors see the result.
//!
//! ## Quick Start
//!
//! ```no_run
//! use courier::{Client, Params, RequestConfig};
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Serialize)]
//! struct CreateUser {
//!     name: String,
//!     email: String,
//! }
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::builder()
//!         .base_url("https://api.example.com")?
//!         .timeout(Duration::from_secs(30))
//!         .build()?;
//!
//!     // GET /users/123?expand=teams
//!     let config = RequestConfig::get("/users/123").params(Params::new().with("expand", "teams"));
//!     let user: User = client.request(config).await?.json()?;
//!     println!("User: {}", user.name);
//!
//!     // POST a JSON body
//!     let new_user = CreateUser {
//!         name: "Alice".to_string(),
//!         email: "alice@example.com".to_string(),
//!     };
//!     let created = client.request(RequestConfig::post("/users").json(&new_user)?).await?;
//!     println!("Created: {}", created.json::<User>()?.id);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Every failure is an [`Error`] carrying the configuration of the request, and
//! where available the request handle and the response:
//!
//! ```no_run
//! use courier::{Client, ErrorKind, RequestConfig};
//!
//! # async fn example() -> Result<(), courier::Error> {
//! # let client = Client::builder().base_url("https://api.example.com")?.build()?;
//! match client.request(RequestConfig::get("/endpoint")).await {
//!     Ok(response) => println!("Success: {:?}", response.data),
//!     Err(e) if e.is_cancel() => println!("Cancelled: {:?}", e.cancel_reason()),
//!     Err(e) if e.kind() == ErrorKind::Status => {
//!         if let Some(response) = e.response() {
//!             eprintln!("HTTP error {}: {:?}", response.status, response.data);
//!         }
//!     }
//!     Err(e) => eprintln!("Other error ({:?}): {}", e.code(), e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Cancellation
//!
//! ```no_run
//! use courier::{CancelToken, Client, RequestConfig};
//!
//! # async fn example() -> Result<(), courier::Error> {
//! # let client = Client::new()?;
//! let source = CancelToken::source();
//! let pending = client.request(
//!     RequestConfig::get("https://api.example.com/slow").cancel_token(source.token.clone()),
//! );
//! source.canceler.cancel("user navigated away");
//! assert!(pending.await.unwrap_err().is_cancel());
//! # Ok(())
//! # }
//! ```

pub mod adapter;
mod body;
mod cancel;
mod client;
mod config;
mod dispatch;
mod error;
mod headers;
pub mod interceptor;
mod response;
pub mod transform;
pub mod uri;

pub use adapter::{settle, Adapter, HttpAdapter, RequestHandle};
pub use body::{Body, FormData, FormPart};
pub use cancel::{Cancel, CancelToken, CancelTokenSource, Canceler};
pub use client::{Client, ClientBuilder};
pub use config::{
    merge_config, BasicAuth, ProgressCallback, ProgressEvent, RequestConfig, ResponseType,
    StatusValidator,
};
pub use dispatch::{dispatch_request, transform_url};
pub use error::{BoxError, Error, ErrorCode, ErrorKind, Result};
pub use headers::{flatten, strip_content_type, Headers, RequestHeaders};
pub use interceptor::{InterceptorId, InterceptorManager, Interceptors};
pub use response::Response;
pub use transform::{transformer, Transformer};
pub use uri::{build_url, OriginContext, ParamValue, Params, ParamsSerializer};
