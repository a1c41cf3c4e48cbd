//! Response value type and the three-way outcome classifier.

use std::collections::HashMap;

use bytes::Bytes;

use super::transport::{Exchange, TransportResult, TypedAsset};

/// Terminal classification of one exchange. Exactly one bucket applies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpOutcome {
    /// A complete, well-formed response with a non-error status.
    Success,
    /// A response was obtained but indicates failure: a non-2xx status or a
    /// body that could not be decoded into the requested shape.
    ProtocolError,
    /// No response was obtained.
    NetworkError,
}

/// An immutable record of one completed exchange.
///
/// Every bucket carries the same field set; fields that the exchange did not
/// produce are `None`. The three predicates are derived from
/// [`outcome`](Self::outcome) and are mutually exclusive.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    url: String,
    status_code: u16,
    outcome: HttpOutcome,
    body: Option<Bytes>,
    text: Option<String>,
    error: Option<String>,
    asset: Option<TypedAsset>,
    headers: HashMap<String, String>,
}

impl HttpResponse {
    /// Final URL of the exchange.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// HTTP status code; 0 when no response was obtained.
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// The outcome bucket of this exchange.
    pub fn outcome(&self) -> HttpOutcome {
        self.outcome
    }

    /// Raw response payload, if the exchange produced one.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// UTF-8 text view of the payload, if the exchange produced one.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Failure description; `None` on success.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Decoded asset for asset-typed requests.
    pub fn asset(&self) -> Option<&TypedAsset> {
        self.asset.as_ref()
    }

    /// Response headers; empty when no response was obtained.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// A specific response header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Whether the exchange completed with a non-error status.
    pub fn is_successful(&self) -> bool {
        self.outcome == HttpOutcome::Success
    }

    /// Whether a response was obtained but indicates failure.
    pub fn is_http_error(&self) -> bool {
        self.outcome == HttpOutcome::ProtocolError
    }

    /// Whether the exchange failed before a response was obtained.
    pub fn is_network_error(&self) -> bool {
        self.outcome == HttpOutcome::NetworkError
    }
}

/// Map a raw transport result into exactly one outcome bucket.
///
/// Pure: the outcome is a function of the transport's observation alone.
/// A response with a 2xx status is `Success`; any other obtained response,
/// or a payload that failed to decode, is `ProtocolError`; everything that
/// ended without a response is `NetworkError`.
pub fn classify(result: TransportResult) -> HttpResponse {
    match result.exchange {
        Exchange::Response {
            status,
            headers,
            body,
            asset,
        } => {
            let outcome = if (200..300).contains(&status) {
                HttpOutcome::Success
            } else {
                HttpOutcome::ProtocolError
            };
            let error = match outcome {
                HttpOutcome::Success => None,
                _ => Some(format!("HTTP {status}")),
            };
            let text = body
                .as_ref()
                .map(|body| String::from_utf8_lossy(body).into_owned());
            HttpResponse {
                url: result.url,
                status_code: status,
                outcome,
                body,
                text,
                error,
                asset,
                headers,
            }
        }
        Exchange::DecodeFailed {
            status,
            headers,
            body,
            message,
        } => {
            let text = body
                .as_ref()
                .map(|body| String::from_utf8_lossy(body).into_owned());
            HttpResponse {
                url: result.url,
                status_code: status,
                outcome: HttpOutcome::ProtocolError,
                body,
                text,
                error: Some(message),
                asset: None,
                headers,
            }
        }
        Exchange::ConnectionFailed { message } => HttpResponse {
            url: result.url,
            status_code: 0,
            outcome: HttpOutcome::NetworkError,
            body: None,
            text: None,
            error: Some(message),
            asset: None,
            headers: HashMap::new(),
        },
    }
}
