//! In-flight registry and the cooperative scheduling tick.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::oneshot;

use super::request::HttpRequest;
use super::response::classify;
use super::transport::{HttpTransport, TransferState, TransportCall, TransportResult};

/// Opaque identity of one dispatched exchange.
///
/// Returned by [`HttpRequest::send`](super::HttpRequest::send) and used as
/// the in-flight registry key; a request that is sent again receives a fresh
/// token for the new exchange.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// One registry entry: the request handle, the transport's live fractions,
/// the completion slot the transport task fills, and the cancel line.
struct InFlight {
    request: HttpRequest,
    transfer: Arc<TransferState>,
    done: Arc<Mutex<Option<TransportResult>>>,
    cancel_tx: Option<oneshot::Sender<()>>,
}

/// Drives every in-flight request to completion.
///
/// The dispatcher owns the in-flight registry and performs no work on its
/// own: the host event loop calls [`tick`](Self::tick) once per
/// frame/iteration. Each tick polls every in-flight request's transfer
/// fractions into its progress tracker, then collects completed exchanges,
/// removes them from the registry, and delivers their terminal outcome. The
/// tick rate is the host's choice; the dispatcher only assumes ticks keep
/// coming while requests are in flight.
///
/// Terminal callbacks therefore run on the ticking thread, after that
/// exchange's final progress notifications, and at most once per send.
/// [`abort`](Self::abort) removes the registry entry synchronously; an
/// exchange whose entry is gone can no longer deliver anything.
pub struct Dispatcher {
    transport: Arc<dyn HttpTransport>,
    in_flight: Mutex<HashMap<RequestToken, InFlight>>,
}

impl Dispatcher {
    pub(crate) fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Start an exchange: spawn the transport operation on the runtime and
    /// register it under the given token.
    pub(crate) fn send(&self, token: RequestToken, request: HttpRequest, call: TransportCall) {
        let transfer = Arc::new(TransferState::new());
        let done = Arc::new(Mutex::new(None));
        let (cancel_tx, cancel_rx) = oneshot::channel();

        tracing::debug!(
            target: "stratus_http::dispatcher",
            ?token,
            method = %call.method,
            url = %call.url,
            "dispatching request"
        );

        let exchange = self.transport.execute(call, transfer.clone());
        let slot = done.clone();
        runtime::spawn(async move {
            tokio::select! {
                result = exchange => {
                    *slot.lock() = Some(result);
                }
                _ = cancel_rx => {
                    // Cancelled: dropping the exchange future abandons the
                    // transport operation.
                }
            }
        });

        self.in_flight.lock().insert(
            token,
            InFlight {
                request,
                transfer,
                done,
                cancel_tx: Some(cancel_tx),
            },
        );
    }

    /// Cancel the transport operation if it has not finished and
    /// unconditionally remove the registry entry.
    ///
    /// After this returns, no completion callback fires for the exchange,
    /// even if the transport had already produced a result that no tick had
    /// collected yet. A delivery already started by a concurrent tick cannot
    /// be recalled.
    pub fn abort(&self, token: RequestToken) {
        let entry = self.in_flight.lock().remove(&token);
        if let Some(mut entry) = entry {
            if let Some(cancel) = entry.cancel_tx.take() {
                let _ = cancel.send(());
            }
            tracing::debug!(target: "stratus_http::dispatcher", ?token, "aborted request");
        }
    }

    /// One cooperative scheduling tick.
    ///
    /// Level-triggered: polls the current transfer fractions of every
    /// in-flight request (the progress trackers suppress non-increasing
    /// samples), then delivers terminal outcomes for exchanges whose
    /// transport operation has completed.
    pub fn tick(&self) {
        let (polls, finished) = {
            let mut in_flight = self.in_flight.lock();

            let polls: Vec<(HttpRequest, f32, f32)> = in_flight
                .values()
                .map(|entry| {
                    (
                        entry.request.clone(),
                        entry.transfer.upload(),
                        entry.transfer.download(),
                    )
                })
                .collect();

            let completed: Vec<RequestToken> = in_flight
                .iter()
                .filter(|(_, entry)| entry.done.lock().is_some())
                .map(|(token, _)| *token)
                .collect();
            let finished: Vec<(RequestToken, InFlight)> = completed
                .into_iter()
                .filter_map(|token| in_flight.remove(&token).map(|entry| (token, entry)))
                .collect();

            (polls, finished)
        };

        // Callbacks run outside the registry lock so they may freely send
        // or abort requests.
        for (request, upload, download) in polls {
            request.poll_progress(upload, download);
        }

        for (token, entry) in finished {
            let Some(result) = entry.done.lock().take() else {
                continue;
            };
            let response = classify(result);
            tracing::debug!(
                target: "stratus_http::dispatcher",
                ?token,
                outcome = ?response.outcome(),
                status = response.status_code(),
                "request finished"
            );
            entry.request.complete(token, response);
        }
    }

    /// Number of exchanges currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("in_flight", &self.in_flight.lock().len())
            .finish()
    }
}

/// Runtime management for the transport's background I/O.
///
/// Request orchestration itself is cooperative (see [`Dispatcher::tick`]);
/// the runtime only carries the transport operations and background file
/// writes.
pub mod runtime {
    use std::sync::OnceLock;

    use tokio::runtime::Runtime;

    static RUNTIME: OnceLock<Runtime> = OnceLock::new();

    /// Initialize the shared runtime.
    ///
    /// Called implicitly on first use; call it explicitly early in the
    /// host's startup if you want the thread pool created up front. The
    /// runtime lives until the process exits.
    pub fn init() -> &'static Runtime {
        RUNTIME.get_or_init(|| {
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .expect("Failed to create tokio runtime")
        })
    }

    /// Get a reference to the shared runtime, initializing it if needed.
    pub fn get() -> &'static Runtime {
        init()
    }

    /// Block on a future using the shared runtime.
    ///
    /// # Warning
    ///
    /// Do not call this from within an async context or the host event
    /// loop, as it will block the current thread.
    pub fn block_on<F: std::future::Future>(future: F) -> F::Output {
        get().block_on(future)
    }

    /// Spawn a future on the shared runtime.
    pub fn spawn<F>(future: F) -> tokio::task::JoinHandle<F::Output>
    where
        F: std::future::Future + Send + 'static,
        F::Output: Send + 'static,
    {
        get().spawn(future)
    }
}
