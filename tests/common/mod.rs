//! Shared test transport and tick-driving helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use stratus_http::http::{
    Exchange, HttpTransport, TransferState, TransportCall, TransportResult,
};
use stratus_http::HttpContext;

type Responder = dyn Fn(&TransportCall) -> TransportResult + Send + Sync;

/// A scripted transport: optional progress steps, an optional delay, then a
/// canned result. Records every call it receives.
pub struct MockTransport {
    delay: Duration,
    progress_steps: Vec<(f32, f32)>,
    step_pause: Duration,
    responder: Box<Responder>,
    calls: Arc<Mutex<Vec<TransportCall>>>,
}

impl MockTransport {
    pub fn new(
        responder: impl Fn(&TransportCall) -> TransportResult + Send + Sync + 'static,
    ) -> Self {
        Self {
            delay: Duration::ZERO,
            progress_steps: Vec::new(),
            step_pause: Duration::from_millis(20),
            responder: Box::new(responder),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn respond_with(result: TransportResult) -> Self {
        Self::new(move |_| result.clone())
    }

    /// Sleep this long before producing the result.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Walk these (upload, download) fractions before completing, pausing
    /// between steps so tick polling can observe them.
    pub fn with_progress(mut self, steps: Vec<(f32, f32)>) -> Self {
        self.progress_steps = steps;
        self
    }

    /// The calls this transport has received, in order.
    pub fn calls(&self) -> Arc<Mutex<Vec<TransportCall>>> {
        self.calls.clone()
    }
}

impl HttpTransport for MockTransport {
    fn execute(
        &self,
        call: TransportCall,
        transfer: Arc<TransferState>,
    ) -> BoxFuture<'static, TransportResult> {
        self.calls.lock().push(call.clone());
        let result = (self.responder)(&call);
        let steps = self.progress_steps.clone();
        let step_pause = self.step_pause;
        let delay = self.delay;
        async move {
            for (upload, download) in steps {
                transfer.set_upload(upload);
                transfer.set_download(download);
                tokio::time::sleep(step_pause).await;
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            result
        }
        .boxed()
    }
}

pub fn ok_result(url: &str, status: u16, body: &str) -> TransportResult {
    TransportResult {
        url: url.to_string(),
        exchange: Exchange::Response {
            status,
            headers: HashMap::new(),
            body: Some(Bytes::from(body.to_string())),
            asset: None,
        },
    }
}

pub fn network_failure(url: &str, message: &str) -> TransportResult {
    TransportResult {
        url: url.to_string(),
        exchange: Exchange::ConnectionFailed {
            message: message.to_string(),
        },
    }
}

/// Tick the context until `cond` holds, panicking if it never does.
pub async fn tick_until(ctx: &HttpContext, mut cond: impl FnMut() -> bool) {
    for _ in 0..1000 {
        ctx.tick();
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not reached after ticking for 2s");
}
