//! Request builder and lifecycle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::dispatcher::{Dispatcher, RequestToken};
use super::headers::{self, SuperHeaders};
use super::progress::{ProgressChannel, ProgressTracker};
use super::response::{HttpOutcome, HttpResponse};
use super::transport::{DecodeMode, HttpMethod, RequestBody, TransportCall};
use crate::error::{HttpError, Result};

type ResponseCallback = dyn Fn(&HttpResponse) + Send + Sync;

/// Where a terminal outcome is delivered.
///
/// Callback mode multicasts to the registered subscriber lists; awaitable
/// mode settles a single-shot channel. Switching to awaitable mode replaces
/// the sink wholesale, it never adds to it.
enum CompletionSink {
    Callbacks {
        on_success: Vec<Arc<ResponseCallback>>,
        on_error: Vec<Arc<ResponseCallback>>,
        on_network_error: Vec<Arc<ResponseCallback>>,
    },
    Awaitable {
        settle: Option<oneshot::Sender<Result<HttpResponse>>>,
    },
}

impl CompletionSink {
    fn callbacks() -> Self {
        Self::Callbacks {
            on_success: Vec::new(),
            on_error: Vec::new(),
            on_network_error: Vec::new(),
        }
    }
}

/// Configuration that is mutable between sends.
struct RequestState {
    headers: HashMap<String, String>,
    timeout: Option<Duration>,
    redirect_limit: Option<usize>,
}

struct RequestInner {
    dispatcher: Arc<Dispatcher>,
    super_headers: Arc<SuperHeaders>,
    method: HttpMethod,
    url: String,
    body: RequestBody,
    decode: DecodeMode,
    state: Mutex<RequestState>,
    sink: Mutex<CompletionSink>,
    progress: ProgressTracker,
    in_flight: Mutex<Option<RequestToken>>,
}

/// A configurable HTTP request.
///
/// Constructed through [`HttpContext`](super::HttpContext); its header set
/// starts as a deep copy of the context's super headers at construction
/// time. Configuration methods chain and may be called in any order before
/// [`send`](Self::send). The handle is cheaply cloneable; clones refer to
/// the same request.
///
/// A request can be re-sent after a previous exchange reached its terminal
/// outcome; each send reuses the current configuration and starts a fresh
/// exchange. Re-sending while an exchange is still in flight is a caller
/// error: the request only tracks its newest exchange for [`abort`](Self::abort).
///
/// # Example
///
/// ```ignore
/// use stratus_http::HttpContext;
///
/// let ctx = HttpContext::new();
/// ctx.get("https://api.example.com/data")
///     .set_header("Accept", "application/json")?
///     .on_success(|res| println!("{}", res.text().unwrap_or_default()))
///     .on_network_error(|res| eprintln!("offline: {:?}", res.error()))
///     .send();
/// ```
#[derive(Clone)]
pub struct HttpRequest {
    inner: Arc<RequestInner>,
}

impl HttpRequest {
    pub(crate) fn new(
        dispatcher: Arc<Dispatcher>,
        super_headers: Arc<SuperHeaders>,
        method: HttpMethod,
        url: String,
        body: RequestBody,
        decode: DecodeMode,
    ) -> Self {
        let snapshot = super_headers.snapshot();
        Self {
            inner: Arc::new(RequestInner {
                dispatcher,
                super_headers,
                method,
                url,
                body,
                decode,
                state: Mutex::new(RequestState {
                    headers: snapshot,
                    timeout: None,
                    redirect_limit: None,
                }),
                sink: Mutex::new(CompletionSink::callbacks()),
                progress: ProgressTracker::new(),
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// The request URL.
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// The HTTP method.
    pub fn method(&self) -> HttpMethod {
        self.inner.method
    }

    /// An independent copy of this request's current headers.
    pub fn headers(&self) -> HashMap<String, String> {
        self.inner.state.lock().headers.clone()
    }

    /// Whether an exchange started by this request is still in flight.
    pub fn is_in_flight(&self) -> bool {
        self.inner.in_flight.lock().is_some()
    }

    /// Insert a header, replacing the value if the key already exists.
    ///
    /// Fails with [`HttpError::Configuration`] if the key or value is empty.
    pub fn set_header(self, key: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let (key, value) = (key.into(), value.into());
        headers::validate_pair(&key, &value)?;
        self.inner.state.lock().headers.insert(key, value);
        Ok(self)
    }

    /// Insert several headers at once.
    pub fn set_headers<K, V>(self, headers: impl IntoIterator<Item = (K, V)>) -> Result<Self>
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut request = self;
        for (key, value) in headers {
            request = request.set_header(key, value)?;
        }
        Ok(request)
    }

    /// Remove a header from this request. Returns whether it was present.
    ///
    /// Fails with [`HttpError::Configuration`] if the key is empty.
    pub fn remove_header(&self, key: &str) -> Result<bool> {
        headers::validate_key(key)?;
        Ok(self.inner.state.lock().headers.remove(key).is_some())
    }

    /// Remove, from this request's headers, every key currently present in
    /// the context's super-header store.
    ///
    /// This is a one-time diff at call time, not a live link: super headers
    /// added to the store afterwards are unaffected, and so are headers this
    /// request set itself under other keys.
    pub fn remove_super_headers(self) -> Self {
        let snapshot = self.inner.super_headers.snapshot();
        {
            let mut state = self.inner.state.lock();
            for key in snapshot.keys() {
                state.headers.remove(key);
            }
        }
        self
    }

    /// Set the timeout for exchanges started by this request.
    /// Overwrites any previously set value.
    pub fn set_timeout(self, timeout: Duration) -> Self {
        self.inner.state.lock().timeout = Some(timeout);
        self
    }

    /// Set the redirect limit for exchanges started by this request.
    /// `0` disables redirect following. Overwrites any previously set value.
    pub fn set_redirect_limit(self, limit: usize) -> Self {
        self.inner.state.lock().redirect_limit = Some(limit);
        self
    }

    /// Subscribe to strictly increasing upload-progress fractions.
    /// Each call adds a subscriber.
    pub fn on_upload_progress(self, callback: impl Fn(f32) + Send + Sync + 'static) -> Self {
        self.inner
            .progress
            .subscribe(ProgressChannel::Upload, callback);
        self
    }

    /// Subscribe to strictly increasing download-progress fractions.
    /// Each call adds a subscriber.
    pub fn on_download_progress(self, callback: impl Fn(f32) + Send + Sync + 'static) -> Self {
        self.inner
            .progress
            .subscribe(ProgressChannel::Download, callback);
        self
    }

    /// Add a subscriber invoked when an exchange completes successfully.
    pub fn on_success(self, callback: impl Fn(&HttpResponse) + Send + Sync + 'static) -> Self {
        self.add_callback(Slot::Success, Arc::new(callback));
        self
    }

    /// Add a subscriber invoked when a response is obtained but indicates
    /// failure.
    pub fn on_error(self, callback: impl Fn(&HttpResponse) + Send + Sync + 'static) -> Self {
        self.add_callback(Slot::Error, Arc::new(callback));
        self
    }

    /// Add a subscriber invoked when the exchange fails before a response
    /// is obtained.
    pub fn on_network_error(
        self,
        callback: impl Fn(&HttpResponse) + Send + Sync + 'static,
    ) -> Self {
        self.add_callback(Slot::NetworkError, Arc::new(callback));
        self
    }

    /// Snapshot the configuration and start the exchange.
    ///
    /// Never blocks. The terminal outcome is delivered through the
    /// completion sink on a later dispatcher tick, after any pending
    /// progress notifications, at most once per send. Returns the token
    /// identifying this exchange in the in-flight registry.
    pub fn send(&self) -> RequestToken {
        let call = self.build_call();
        let token = RequestToken::new();
        *self.inner.in_flight.lock() = Some(token);
        self.inner.dispatcher.send(token, self.clone(), call);
        token
    }

    /// Send the request and await its terminal outcome.
    ///
    /// Replaces any previously registered success/error/network-error
    /// callbacks with a single-shot channel: choose one completion idiom per
    /// logical send. Resolves with the response on success and rejects with
    /// [`HttpError::Protocol`] or [`HttpError::Network`] (each carrying the
    /// full response) otherwise. Calling again after a prior settlement is
    /// legal and starts a fresh exchange with fresh wiring.
    ///
    /// An [`abort`](Self::abort) leaves the returned future permanently
    /// unresolved; pair abort with your own timeout if you need it to settle.
    pub async fn send_awaitable(&self) -> Result<HttpResponse> {
        let (settle, settled) = oneshot::channel();
        *self.inner.sink.lock() = CompletionSink::Awaitable {
            settle: Some(settle),
        };
        self.send();

        match settled.await {
            Ok(outcome) => outcome,
            // The exchange was aborted or the sink was rewired; this future
            // stays unresolved rather than inventing a terminal outcome.
            Err(_) => std::future::pending().await,
        }
    }

    /// Request cancellation of the in-flight exchange.
    ///
    /// No-op if no exchange is in flight. The transport operation is
    /// cancelled if it has not finished and the registry entry is removed;
    /// no completion callback fires for an aborted exchange.
    pub fn abort(&self) {
        if let Some(token) = self.inner.in_flight.lock().take() {
            self.inner.dispatcher.abort(token);
        }
    }

    fn build_call(&self) -> TransportCall {
        let state = self.inner.state.lock();
        TransportCall {
            method: self.inner.method,
            url: self.inner.url.clone(),
            headers: state.headers.clone(),
            body: self.inner.body.clone(),
            timeout: state.timeout,
            redirect_limit: state.redirect_limit,
            decode: self.inner.decode.clone(),
        }
    }

    fn add_callback(&self, slot: Slot, callback: Arc<ResponseCallback>) {
        let mut sink = self.inner.sink.lock();
        match &mut *sink {
            CompletionSink::Callbacks {
                on_success,
                on_error,
                on_network_error,
            } => {
                let list = match slot {
                    Slot::Success => on_success,
                    Slot::Error => on_error,
                    Slot::NetworkError => on_network_error,
                };
                list.push(callback);
            }
            CompletionSink::Awaitable { .. } => {
                tracing::warn!(
                    target: "stratus_http::request",
                    url = %self.inner.url,
                    "completion callback registered while the request is in awaitable mode; ignored"
                );
            }
        }
    }

    /// Feed the latest transport fractions into the progress tracker.
    pub(crate) fn poll_progress(&self, upload: f32, download: f32) {
        self.inner.progress.report(ProgressChannel::Upload, upload);
        self.inner
            .progress
            .report(ProgressChannel::Download, download);
    }

    /// Deliver a terminal outcome through the completion sink.
    pub(crate) fn complete(&self, token: RequestToken, response: HttpResponse) {
        {
            let mut in_flight = self.inner.in_flight.lock();
            // A newer send may already own the slot.
            if *in_flight == Some(token) {
                *in_flight = None;
            }
        }

        let delivery = {
            let mut sink = self.inner.sink.lock();
            match &mut *sink {
                CompletionSink::Callbacks {
                    on_success,
                    on_error,
                    on_network_error,
                } => {
                    let list = match response.outcome() {
                        HttpOutcome::Success => on_success,
                        HttpOutcome::ProtocolError => on_error,
                        HttpOutcome::NetworkError => on_network_error,
                    };
                    Delivery::Multicast(list.clone())
                }
                CompletionSink::Awaitable { settle } => Delivery::Settle(settle.take()),
            }
        };

        match delivery {
            Delivery::Multicast(subscribers) => {
                for subscriber in &subscribers {
                    subscriber(&response);
                }
            }
            Delivery::Settle(Some(settle)) => {
                let outcome = match response.outcome() {
                    HttpOutcome::Success => Ok(response),
                    HttpOutcome::ProtocolError => Err(HttpError::Protocol(Box::new(response))),
                    HttpOutcome::NetworkError => Err(HttpError::Network(Box::new(response))),
                };
                // The receiver may have been dropped by the caller; nothing
                // to deliver to in that case.
                let _ = settle.send(outcome);
            }
            Delivery::Settle(None) => {}
        }
    }
}

enum Slot {
    Success,
    Error,
    NetworkError,
}

enum Delivery {
    Multicast(Vec<Arc<ResponseCallback>>),
    Settle(Option<oneshot::Sender<Result<HttpResponse>>>),
}

impl std::fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.inner.method)
            .field("url", &self.inner.url)
            .field("in_flight", &self.is_in_flight())
            .finish()
    }
}
