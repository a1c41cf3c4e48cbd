//! Fluent HTTP client facade for event-loop-driven hosts.
//!
//! This crate wraps a pluggable HTTP transport behind an ergonomic request
//! API designed for applications that own a frame or event loop:
//!
//! - **Fluent requests**: chainable configuration of headers, timeout and
//!   redirect limit, with convenience constructors for the common verbs.
//! - **Super headers**: context-wide headers snapshotted into every request
//!   at construction time.
//! - **Two completion idioms**: multicast callbacks
//!   (`on_success`/`on_error`/`on_network_error`) or a single awaitable
//!   result per send — never both for one exchange.
//! - **Monotonic progress**: per-request upload/download fractions polled
//!   each scheduling tick, delivered only when they strictly increase.
//! - **Three-way outcomes**: every exchange terminates as exactly one of
//!   success, protocol (HTTP) error, or network error.
//! - **Abort**: best-effort cancellation that silently retires the exchange
//!   without invoking any completion callback.
//!
//! # Getting started
//!
//! ```ignore
//! use std::time::Duration;
//! use stratus_http::HttpContext;
//!
//! let ctx = HttpContext::new();
//! ctx.set_super_header("X-Api-Key", "secret")?;
//!
//! // Hosts with their own loop call ctx.tick() once per iteration;
//! // everyone else spawns a ticker.
//! let _ticker = ctx.spawn_ticker(Duration::from_millis(16));
//!
//! let request = ctx
//!     .get("https://api.example.com/report.csv")
//!     .set_timeout(Duration::from_secs(10))
//!     .on_download_progress(|fraction| println!("{:.0}%", fraction * 100.0));
//!
//! match request.send_awaitable().await {
//!     Ok(response) => println!("{} bytes", response.body().map_or(0, |b| b.len())),
//!     Err(failure) => eprintln!("{failure}"),
//! }
//! ```
//!
//! # Scheduling model
//!
//! A single logical owner drives all requests cooperatively: one scheduler
//! tick polls every in-flight request's progress and checks each transport
//! operation for completion. Callback-mode sends never block the caller;
//! the only suspension point is awaiting [`HttpRequest::send_awaitable`].
//! The transport performs its I/O on a shared background runtime.

mod error;
pub mod http;

pub use error::{HttpError, Result};

// Re-export commonly used types at the crate root
pub use http::{
    DecodeMode, HttpConfig, HttpContext, HttpMethod, HttpOutcome, HttpRequest, HttpResponse,
    HttpTransport, MultipartForm, ProgressChannel, ProgressTracker, RequestBody, RequestToken,
    SuperHeaders, TransferState, TransportCall, TransportResult, TypedAsset,
};
