//! Transport abstraction and the reqwest-backed implementation.
//!
//! The facade never talks to the network directly; it hands a fully
//! described [`TransportCall`] to an [`HttpTransport`] and receives a raw
//! [`TransportResult`] back. The production implementation
//! ([`ReqwestTransport`]) wraps a shared [`reqwest::Client`]; tests plug in
//! their own transports.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use reqwest::redirect::Policy;

use super::client::HttpConfig;
use super::util;
use crate::error::{HttpError, Result};

/// HTTP request methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// HTTP GET method.
    Get,
    /// HTTP POST method.
    Post,
    /// HTTP PUT method.
    Put,
    /// HTTP DELETE method.
    Delete,
    /// HTTP PATCH method.
    Patch,
    /// HTTP HEAD method.
    Head,
    /// HTTP OPTIONS method.
    Options,
}

impl HttpMethod {
    /// Convert to reqwest method.
    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
            Self::Patch => reqwest::Method::PATCH,
            Self::Head => reqwest::Method::HEAD,
            Self::Options => reqwest::Method::OPTIONS,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
            Self::Patch => write!(f, "PATCH"),
            Self::Head => write!(f, "HEAD"),
            Self::Options => write!(f, "OPTIONS"),
        }
    }
}

/// The body of an HTTP request.
///
/// Bodies are opaque payloads with a content-type label; serialization
/// happens once, at transmission time.
#[derive(Clone, Debug, Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    None,
    /// Plain text body.
    Text(String),
    /// JSON body (serialized from a value).
    Json(serde_json::Value),
    /// URL-encoded form fields, transmitted in insertion order.
    Form(Vec<(String, String)>),
    /// Raw binary body with an explicit content type.
    Bytes {
        /// The payload.
        data: Bytes,
        /// MIME type of the payload.
        content_type: String,
    },
    /// Multipart form data.
    Multipart(MultipartForm),
}

/// Multipart form data for file uploads.
///
/// Sections are stored owned so a request can be re-sent; the wire form is
/// rebuilt per exchange.
#[derive(Clone, Debug, Default)]
pub struct MultipartForm {
    sections: Vec<MultipartSection>,
}

#[derive(Clone, Debug)]
enum MultipartSection {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        bytes: Bytes,
        filename: String,
        mime: Option<String>,
    },
}

impl MultipartForm {
    /// Create a new empty multipart form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field to the form.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.sections.push(MultipartSection::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Add a file field from bytes.
    pub fn file_bytes(
        mut self,
        name: impl Into<String>,
        bytes: impl Into<Bytes>,
        filename: impl Into<String>,
        mime: Option<&str>,
    ) -> Self {
        self.sections.push(MultipartSection::File {
            name: name.into(),
            bytes: bytes.into(),
            filename: filename.into(),
            mime: mime.map(str::to_string),
        });
        self
    }

    /// Number of sections in the form.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Whether the form has no sections.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub(crate) fn to_reqwest(&self) -> reqwest::multipart::Form {
        let mut form = reqwest::multipart::Form::new();
        for section in &self.sections {
            match section {
                MultipartSection::Text { name, value } => {
                    form = form.text(name.clone(), value.clone());
                }
                MultipartSection::File {
                    name,
                    bytes,
                    filename,
                    mime,
                } => {
                    let part = reqwest::multipart::Part::bytes(bytes.to_vec())
                        .file_name(filename.clone());
                    let part = match mime {
                        Some(mime) => part.mime_str(mime).unwrap_or_else(|e| {
                            tracing::warn!(target: "stratus_http::transport", "Invalid MIME type '{}': {}", mime, e);
                            reqwest::multipart::Part::bytes(bytes.to_vec())
                                .file_name(filename.clone())
                        }),
                        None => part,
                    };
                    form = form.part(name.clone(), part);
                }
            }
        }
        form
    }
}

/// How the response payload should be interpreted.
///
/// `Buffer` keeps the raw bytes and a lossy UTF-8 text view of them; the
/// other modes additionally decode an image or stream the payload to disk.
#[derive(Clone, Debug)]
pub enum DecodeMode {
    /// Keep the payload in memory as bytes plus decoded text.
    Buffer,
    /// Decode the payload as an image; a failed decode is a protocol error.
    Image,
    /// Write the payload to the given path on completion.
    File(PathBuf),
}

/// Live upload/download fractions for one in-flight exchange.
///
/// Written by the transport as the exchange advances and read by the
/// dispatcher on every scheduling tick. Fractions are in `[0.0, 1.0]`.
pub struct TransferState {
    upload: AtomicU32,
    download: AtomicU32,
}

impl Default for TransferState {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferState {
    /// Both fractions start at 0.0.
    pub fn new() -> Self {
        Self {
            upload: AtomicU32::new(0.0f32.to_bits()),
            download: AtomicU32::new(0.0f32.to_bits()),
        }
    }

    /// Current upload fraction.
    pub fn upload(&self) -> f32 {
        f32::from_bits(self.upload.load(Ordering::Relaxed))
    }

    /// Current download fraction.
    pub fn download(&self) -> f32 {
        f32::from_bits(self.download.load(Ordering::Relaxed))
    }

    /// Record the upload fraction.
    pub fn set_upload(&self, fraction: f32) {
        self.upload.store(fraction.to_bits(), Ordering::Relaxed);
    }

    /// Record the download fraction.
    pub fn set_download(&self, fraction: f32) {
        self.download.store(fraction.to_bits(), Ordering::Relaxed);
    }
}

impl std::fmt::Debug for TransferState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferState")
            .field("upload", &self.upload())
            .field("download", &self.download())
            .finish()
    }
}

/// Everything the transport needs to perform one exchange.
#[derive(Clone, Debug)]
pub struct TransportCall {
    /// The HTTP method.
    pub method: HttpMethod,
    /// The request URL.
    pub url: String,
    /// Finalized request headers.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: RequestBody,
    /// Per-request timeout override.
    pub timeout: Option<Duration>,
    /// Per-request redirect limit override.
    pub redirect_limit: Option<usize>,
    /// How to interpret the response payload.
    pub decode: DecodeMode,
}

/// A decoded, typed response payload.
#[derive(Clone)]
pub enum TypedAsset {
    /// A decoded image.
    Image(image::DynamicImage),
}

impl TypedAsset {
    /// The decoded image, if this asset is one.
    pub fn as_image(&self) -> Option<&image::DynamicImage> {
        match self {
            Self::Image(image) => Some(image),
        }
    }
}

impl std::fmt::Debug for TypedAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use image::GenericImageView as _;
        match self {
            Self::Image(image) => {
                let (width, height) = image.dimensions();
                f.debug_struct("Image")
                    .field("width", &width)
                    .field("height", &height)
                    .finish()
            }
        }
    }
}

/// What the transport observed at the end of an exchange.
#[derive(Clone, Debug)]
pub enum Exchange {
    /// A complete response was obtained.
    Response {
        /// HTTP status code.
        status: u16,
        /// Response headers.
        headers: HashMap<String, String>,
        /// Response payload, absent for file-mode exchanges.
        body: Option<Bytes>,
        /// Decoded asset for asset-typed requests.
        asset: Option<TypedAsset>,
    },
    /// No response was obtained: DNS failure, refused connection, timeout,
    /// or a transfer interrupted before completion.
    ConnectionFailed {
        /// Human-readable failure description.
        message: String,
    },
    /// A response was obtained but its body could not be decoded into the
    /// requested shape.
    DecodeFailed {
        /// HTTP status code of the obtained response.
        status: u16,
        /// Response headers.
        headers: HashMap<String, String>,
        /// The undecodable payload.
        body: Option<Bytes>,
        /// Human-readable decode failure description.
        message: String,
    },
}

/// Raw terminal outcome of one transport exchange, before classification.
#[derive(Clone, Debug)]
pub struct TransportResult {
    /// Final URL of the exchange (after redirects when known).
    pub url: String,
    /// What the transport observed.
    pub exchange: Exchange,
}

/// A host-provided primitive capable of performing one network exchange.
///
/// Implementations report live upload/download fractions through the
/// supplied [`TransferState`]. Cancellation is out-of-band: the dispatcher
/// drops the returned future, which must abandon the exchange.
pub trait HttpTransport: Send + Sync + 'static {
    /// Perform one exchange described by `call`, reporting progress into
    /// `transfer`, and resolve with the raw terminal outcome.
    fn execute(
        &self,
        call: TransportCall,
        transfer: Arc<TransferState>,
    ) -> BoxFuture<'static, TransportResult>;
}

/// The production transport backed by [`reqwest`].
///
/// A single shared client carries the context-wide configuration. A request
/// that overrides the redirect limit gets a freshly built client for that
/// exchange, since reqwest fixes the redirect policy per client.
pub struct ReqwestTransport {
    client: reqwest::Client,
    config: HttpConfig,
}

impl ReqwestTransport {
    /// Build the transport from the context configuration.
    pub fn new(config: HttpConfig) -> Result<Self> {
        let client = build_client(&config, None)?;
        Ok(Self { client, config })
    }
}

impl HttpTransport for ReqwestTransport {
    fn execute(
        &self,
        call: TransportCall,
        transfer: Arc<TransferState>,
    ) -> BoxFuture<'static, TransportResult> {
        let client = if call.redirect_limit.is_some() {
            match build_client(&self.config, call.redirect_limit) {
                Ok(client) => client,
                Err(e) => {
                    let result = TransportResult {
                        url: call.url.clone(),
                        exchange: Exchange::ConnectionFailed {
                            message: e.to_string(),
                        },
                    };
                    return futures_util::future::ready(result).boxed();
                }
            }
        } else {
            self.client.clone()
        };
        perform(client, call, transfer).boxed()
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("config", &self.config)
            .finish()
    }
}

fn build_client(config: &HttpConfig, redirect_limit: Option<usize>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();

    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    if let Some(connect_timeout) = config.connect_timeout {
        builder = builder.connect_timeout(connect_timeout);
    }

    let limit = redirect_limit.unwrap_or(config.max_redirects);
    builder = builder.redirect(if limit == 0 {
        Policy::none()
    } else {
        Policy::limited(limit)
    });

    if config.cookies_enabled {
        builder = builder.cookie_store(true);
    }

    if let Some(ref ua) = config.user_agent {
        builder = builder.user_agent(ua);
    }

    builder
        .build()
        .map_err(|e| HttpError::Configuration(format!("failed to build transport client: {e}")))
}

async fn perform(
    client: reqwest::Client,
    call: TransportCall,
    transfer: Arc<TransferState>,
) -> TransportResult {
    let url = match url::Url::parse(&call.url) {
        Ok(url) => url,
        Err(e) => {
            return TransportResult {
                url: call.url.clone(),
                exchange: Exchange::ConnectionFailed {
                    message: format!("invalid URL: {e}"),
                },
            };
        }
    };

    let mut builder = client.request(call.method.to_reqwest(), url);
    for (name, value) in &call.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    if let Some(timeout) = call.timeout {
        builder = builder.timeout(timeout);
    }
    builder = match apply_body(builder, &call.body, &transfer) {
        Ok(builder) => builder,
        Err(message) => {
            return TransportResult {
                url: call.url.clone(),
                exchange: Exchange::ConnectionFailed { message },
            };
        }
    };

    let mut response = match builder.send().await {
        Ok(response) => response,
        Err(e) => {
            return TransportResult {
                url: call.url.clone(),
                exchange: Exchange::ConnectionFailed {
                    message: e.to_string(),
                },
            };
        }
    };
    transfer.set_upload(1.0);

    let status = response.status().as_u16();
    let final_url = response.url().to_string();
    let mut headers = HashMap::new();
    for (name, value) in response.headers() {
        if let Ok(value) = value.to_str() {
            headers.insert(name.to_string(), value.to_string());
        }
    }
    let total = response.content_length();

    // Stream the body so the download fraction advances chunk by chunk.
    let mut data = Vec::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                data.extend_from_slice(&chunk);
                if let Some(total) = total
                    && total > 0
                {
                    transfer.set_download((data.len() as f32 / total as f32).min(1.0));
                }
            }
            Ok(None) => break,
            Err(e) => {
                return TransportResult {
                    url: final_url,
                    exchange: Exchange::ConnectionFailed {
                        message: e.to_string(),
                    },
                };
            }
        }
    }
    transfer.set_download(1.0);

    let exchange = decode_response(status, headers, Bytes::from(data), &call.decode);
    TransportResult {
        url: final_url,
        exchange,
    }
}

fn apply_body(
    builder: reqwest::RequestBuilder,
    body: &RequestBody,
    transfer: &Arc<TransferState>,
) -> std::result::Result<reqwest::RequestBuilder, String> {
    Ok(match body {
        RequestBody::None => builder,
        RequestBody::Text(text) => builder
            .header(http::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(counting_body(Bytes::from(text.clone()), transfer.clone())),
        RequestBody::Json(value) => {
            let data = serde_json::to_vec(value)
                .map_err(|e| format!("failed to serialize JSON body: {e}"))?;
            builder
                .header(http::header::CONTENT_TYPE, "application/json")
                .body(counting_body(Bytes::from(data), transfer.clone()))
        }
        RequestBody::Form(fields) => {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())))
                .finish();
            builder
                .header(
                    http::header::CONTENT_TYPE,
                    "application/x-www-form-urlencoded",
                )
                .body(counting_body(Bytes::from(encoded), transfer.clone()))
        }
        RequestBody::Bytes { data, content_type } => builder
            .header(http::header::CONTENT_TYPE, content_type.as_str())
            .body(counting_body(data.clone(), transfer.clone())),
        // Multipart uploads go through reqwest's own encoder; the upload
        // fraction jumps to 1.0 once the response arrives.
        RequestBody::Multipart(form) => builder.multipart(form.to_reqwest()),
    })
}

/// Wrap a payload in a stream that records the upload fraction as chunks
/// are pulled onto the wire.
fn counting_body(data: Bytes, transfer: Arc<TransferState>) -> reqwest::Body {
    const CHUNK: usize = 16 * 1024;

    let total = data.len();
    if total == 0 {
        return reqwest::Body::from(data);
    }

    let mut chunks = Vec::with_capacity(total.div_ceil(CHUNK));
    let mut pos = 0;
    while pos < total {
        let end = (pos + CHUNK).min(total);
        chunks.push(data.slice(pos..end));
        pos = end;
    }

    let mut sent = 0usize;
    let stream = futures_util::stream::iter(chunks.into_iter().map(move |chunk| {
        sent += chunk.len();
        transfer.set_upload(sent as f32 / total as f32);
        Ok::<Bytes, std::convert::Infallible>(chunk)
    }));
    reqwest::Body::wrap_stream(stream)
}

fn decode_response(
    status: u16,
    headers: HashMap<String, String>,
    body: Bytes,
    decode: &DecodeMode,
) -> Exchange {
    let ok = (200..300).contains(&status);
    match decode {
        DecodeMode::Buffer => Exchange::Response {
            status,
            headers,
            body: Some(body),
            asset: None,
        },
        DecodeMode::Image if ok => match image::load_from_memory(&body) {
            Ok(decoded) => Exchange::Response {
                status,
                headers,
                body: Some(body),
                asset: Some(TypedAsset::Image(decoded)),
            },
            Err(e) => Exchange::DecodeFailed {
                status,
                headers,
                body: Some(body),
                message: format!("image decode failed: {e}"),
            },
        },
        // Error statuses are classified by status alone; no decode attempt.
        DecodeMode::Image => Exchange::Response {
            status,
            headers,
            body: Some(body),
            asset: None,
        },
        DecodeMode::File(path) if ok => {
            util::write_file(body, path.clone());
            Exchange::Response {
                status,
                headers,
                body: None,
                asset: None,
            }
        }
        DecodeMode::File(_) => Exchange::Response {
            status,
            headers,
            body: Some(body),
            asset: None,
        },
    }
}
