//! Typed HTTP request delegate.
//!
//! # Overview
//! A thin façade over `reqwest` and `serde_json`: describe a call (path,
//! method, headers, query, body fields, files), await it, and get back a
//! `NetworkResponse<T, E>` holding either the decoded success payload or a
//! classified error with the server's decoded error body.
//!
//! # Design
//! - `RequestBuilder` turns call parameters into a plain-data `Request`
//!   without touching the network, so request shape is unit-testable.
//! - `body` picks JSON or multipart encoding from what the caller supplied.
//! - `NetworkError::from_status` is the one place status codes are
//!   classified.
//! - `NetworkDelegate` owns the shared client and hooks, and folds every
//!   failure into the returned value; `execute` has no error channel.
//!
//! ```no_run
//! use netkit_core::{Call, NetworkDelegate, NetworkResponse};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Item { name: String }
//!
//! #[derive(Deserialize)]
//! struct ApiError { message: String }
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let delegate = NetworkDelegate::new("https://api.example.com")?;
//! let call = Call::get("/items/1").header("Authorization", "Bearer token");
//! match delegate.execute::<Item, ApiError>(call).await {
//!     NetworkResponse::Success(item) => println!("{}", item.name),
//!     NetworkResponse::Error { kind, detail } => {
//!         eprintln!("{kind}: {:?}", detail.map(|d| d.message));
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod body;
pub mod builder;
pub mod config;
pub mod delegate;
pub mod error;
pub mod http;
pub mod intercept;
pub mod response;

pub use body::Fields;
pub use builder::RequestBuilder;
pub use config::ClientConfig;
pub use delegate::{Call, DelegateBuilder, NetworkDelegate};
pub use error::{BuildError, ConfigError, NetworkError, TransportError};
pub use http::{ContentType, HttpMethod, Part, Request, RequestBody};
pub use intercept::{Authenticator, BearerAuthenticator, Interceptor, LoggingInterceptor};
pub use response::NetworkResponse;
