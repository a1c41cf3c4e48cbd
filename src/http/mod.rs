//! HTTP client facade.
//!
//! This module provides the fluent request builder, the cooperative
//! dispatcher, and the three-way outcome classification.
//!
//! # Example
//!
//! ```ignore
//! use stratus_http::{HttpContext, HttpResponse};
//!
//! let ctx = HttpContext::new();
//!
//! // Callback mode: register subscribers, send, and keep ticking.
//! ctx.get("https://api.example.com/data")
//!     .on_success(|res: &HttpResponse| println!("{}", res.text().unwrap_or_default()))
//!     .on_error(|res| eprintln!("HTTP {}", res.status_code()))
//!     .on_network_error(|res| eprintln!("offline: {:?}", res.error()))
//!     .send();
//!
//! // Awaitable mode: one future per logical send.
//! let response = ctx.get("https://api.example.com/data").send_awaitable().await?;
//! assert!(response.is_successful());
//! ```

mod client;
mod dispatcher;
mod headers;
mod progress;
mod request;
mod response;
mod transport;
mod util;

pub use client::{HttpConfig, HttpContext};
pub use dispatcher::{Dispatcher, RequestToken, runtime};
pub use headers::SuperHeaders;
pub use progress::{ProgressChannel, ProgressTracker};
pub use request::HttpRequest;
pub use response::{HttpOutcome, HttpResponse, classify};
pub use transport::{
    DecodeMode, Exchange, HttpMethod, HttpTransport, MultipartForm, ReqwestTransport, RequestBody,
    TransferState, TransportCall, TransportResult, TypedAsset,
};
pub use util::{construct_uri_with_parameters, write_file};
