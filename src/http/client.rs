//! Request context: configuration, super headers, scheduling entry points
//! and the convenience request constructors.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;

use super::dispatcher::{Dispatcher, runtime};
use super::headers::SuperHeaders;
use super::request::HttpRequest;
use super::transport::{
    DecodeMode, HttpMethod, HttpTransport, MultipartForm, ReqwestTransport, RequestBody,
};
use crate::error::Result;

/// Configuration for the transport client.
#[derive(Clone, Debug)]
pub struct HttpConfig {
    /// Default request timeout; per-request overrides win.
    pub timeout: Option<Duration>,
    /// Connect timeout.
    pub connect_timeout: Option<Duration>,
    /// Default maximum number of redirects to follow; per-request overrides
    /// win, `0` disables redirect following.
    pub max_redirects: usize,
    /// Whether to enable cookie storage.
    pub cookies_enabled: bool,
    /// Default user agent.
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Some(Duration::from_secs(30)),
            connect_timeout: Some(Duration::from_secs(10)),
            max_redirects: 10,
            cookies_enabled: true,
            user_agent: Some(format!("StratusHttp/{} (Rust)", env!("CARGO_PKG_VERSION"))),
        }
    }
}

/// Owner of the facade's shared state: the super-header store, the
/// dispatcher with its in-flight registry, and the transport.
///
/// Construct one context per host process (or per test) and keep it for the
/// process lifetime; requests hold handles into it and dropping it while
/// exchanges are in flight abandons them. All shared state is reached
/// through this handle rather than ambient globals, and readers receive
/// defensive copies.
///
/// The context performs no work on its own: the host event loop calls
/// [`tick`](Self::tick) once per frame/iteration, or
/// [`spawn_ticker`](Self::spawn_ticker) runs one at a fixed interval for
/// hosts without their own loop.
///
/// # Example
///
/// ```ignore
/// use stratus_http::HttpContext;
///
/// let ctx = HttpContext::new();
/// ctx.set_super_header("Authorization", "Bearer token123")?;
/// let ticker = ctx.spawn_ticker(std::time::Duration::from_millis(16));
///
/// let response = ctx.get("https://api.example.com/user").send_awaitable().await?;
/// println!("{}", response.text().unwrap_or_default());
/// ```
pub struct HttpContext {
    super_headers: Arc<SuperHeaders>,
    dispatcher: Arc<Dispatcher>,
    config: HttpConfig,
}

impl Default for HttpContext {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpContext {
    /// Create a context with default configuration and the reqwest-backed
    /// transport.
    pub fn new() -> Self {
        Self::with_config(HttpConfig::default())
            .expect("Failed to create HTTP context with default configuration")
    }

    /// Create a context with the given configuration and the reqwest-backed
    /// transport.
    pub fn with_config(config: HttpConfig) -> Result<Self> {
        let transport = Arc::new(ReqwestTransport::new(config.clone())?);
        Ok(Self::with_transport(config, transport))
    }

    /// Create a context over a custom transport.
    pub fn with_transport(config: HttpConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            super_headers: Arc::new(SuperHeaders::new()),
            dispatcher: Arc::new(Dispatcher::new(transport)),
            config,
        }
    }

    /// The context's configuration.
    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    /// An independent copy of the current super-header set.
    ///
    /// Super headers are key/value pairs added to every request constructed
    /// after they are set.
    pub fn super_headers(&self) -> HashMap<String, String> {
        self.super_headers.snapshot()
    }

    /// Set a super header; if the key already exists the value is replaced.
    ///
    /// Fails with a configuration error if the key or value is empty.
    pub fn set_super_header(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        self.super_headers.set(key, value)
    }

    /// Remove a super header. Returns whether an entry was removed.
    ///
    /// Fails with a configuration error if the key is empty.
    pub fn remove_super_header(&self, key: &str) -> Result<bool> {
        self.super_headers.remove(key)
    }

    /// Drive one scheduling tick: poll progress for every in-flight request
    /// and deliver terminal outcomes for completed exchanges.
    pub fn tick(&self) {
        self.dispatcher.tick();
    }

    /// Spawn a background task that ticks the dispatcher at a fixed
    /// interval, for hosts without their own frame loop.
    ///
    /// The returned handle can be aborted to stop the ticker; dropping it
    /// leaves the ticker running.
    pub fn spawn_ticker(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let dispatcher = self.dispatcher.clone();
        runtime::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            loop {
                timer.tick().await;
                dispatcher.tick();
            }
        })
    }

    /// Number of exchanges currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.dispatcher.in_flight_count()
    }

    /// The dispatcher driving this context's exchanges.
    ///
    /// Useful for hosts that wire [`Dispatcher::tick`] into their own
    /// scheduler or abort exchanges by token.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Create a GET request.
    pub fn get(&self, uri: impl Into<String>) -> HttpRequest {
        self.build(HttpMethod::Get, uri, RequestBody::None, DecodeMode::Buffer)
    }

    /// Create a GET request whose response is decoded as an image.
    ///
    /// A payload that fails to decode is reported through the error
    /// callback as a protocol error.
    pub fn get_image(&self, uri: impl Into<String>) -> HttpRequest {
        self.build(HttpMethod::Get, uri, RequestBody::None, DecodeMode::Image)
    }

    /// Create a GET request whose response payload is written to `path`.
    ///
    /// The write uses the size-thresholded file helper; write failures are
    /// logged, not surfaced through the request outcome.
    pub fn get_to_file(&self, uri: impl Into<String>, path: impl Into<PathBuf>) -> HttpRequest {
        self.build(
            HttpMethod::Get,
            uri,
            RequestBody::None,
            DecodeMode::File(path.into()),
        )
    }

    /// Create a POST request with a plain text body.
    pub fn post_text(&self, uri: impl Into<String>, body: impl Into<String>) -> HttpRequest {
        self.build(
            HttpMethod::Post,
            uri,
            RequestBody::Text(body.into()),
            DecodeMode::Buffer,
        )
    }

    /// Create a POST request with URL-encoded form fields, transmitted in
    /// the given order.
    pub fn post_form<K, V>(
        &self,
        uri: impl Into<String>,
        fields: impl IntoIterator<Item = (K, V)>,
    ) -> HttpRequest
    where
        K: Into<String>,
        V: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.build(
            HttpMethod::Post,
            uri,
            RequestBody::Form(fields),
            DecodeMode::Buffer,
        )
    }

    /// Create a POST request with a JSON body serialized from `body`.
    pub fn post_json<T: Serialize>(&self, uri: impl Into<String>, body: &T) -> HttpRequest {
        let body = match serde_json::to_value(body) {
            Ok(value) => RequestBody::Json(value),
            Err(e) => {
                tracing::error!(target: "stratus_http::client", "Failed to serialize JSON body: {}", e);
                RequestBody::None
            }
        };
        self.build(HttpMethod::Post, uri, body, DecodeMode::Buffer)
    }

    /// Create a POST request with a raw byte body and an explicit content
    /// type.
    pub fn post_bytes(
        &self,
        uri: impl Into<String>,
        bytes: impl Into<Bytes>,
        content_type: impl Into<String>,
    ) -> HttpRequest {
        self.build(
            HttpMethod::Post,
            uri,
            RequestBody::Bytes {
                data: bytes.into(),
                content_type: content_type.into(),
            },
            DecodeMode::Buffer,
        )
    }

    /// Create a POST request with a multipart form body.
    pub fn post_multipart(&self, uri: impl Into<String>, form: MultipartForm) -> HttpRequest {
        self.build(
            HttpMethod::Post,
            uri,
            RequestBody::Multipart(form),
            DecodeMode::Buffer,
        )
    }

    /// Create a PUT request with a plain text body.
    pub fn put_text(&self, uri: impl Into<String>, body: impl Into<String>) -> HttpRequest {
        self.build(
            HttpMethod::Put,
            uri,
            RequestBody::Text(body.into()),
            DecodeMode::Buffer,
        )
    }

    /// Create a PUT request with a raw byte body.
    pub fn put_bytes(&self, uri: impl Into<String>, bytes: impl Into<Bytes>) -> HttpRequest {
        self.build(
            HttpMethod::Put,
            uri,
            RequestBody::Bytes {
                data: bytes.into(),
                content_type: "application/octet-stream".to_string(),
            },
            DecodeMode::Buffer,
        )
    }

    /// Create a DELETE request.
    pub fn delete(&self, uri: impl Into<String>) -> HttpRequest {
        self.build(
            HttpMethod::Delete,
            uri,
            RequestBody::None,
            DecodeMode::Buffer,
        )
    }

    /// Create a HEAD request.
    pub fn head(&self, uri: impl Into<String>) -> HttpRequest {
        self.build(HttpMethod::Head, uri, RequestBody::None, DecodeMode::Buffer)
    }

    /// Create a body-less request with a custom method.
    pub fn request(&self, method: HttpMethod, uri: impl Into<String>) -> HttpRequest {
        self.build(method, uri, RequestBody::None, DecodeMode::Buffer)
    }

    fn build(
        &self,
        method: HttpMethod,
        uri: impl Into<String>,
        body: RequestBody,
        decode: DecodeMode,
    ) -> HttpRequest {
        HttpRequest::new(
            self.dispatcher.clone(),
            self.super_headers.clone(),
            method,
            uri.into(),
            body,
            decode,
        )
    }
}

impl std::fmt::Debug for HttpContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpContext")
            .field("config", &self.config)
            .field("in_flight", &self.dispatcher.in_flight_count())
            .finish()
    }
}
