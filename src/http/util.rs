//! URI formatting and file-persistence helpers.

use std::path::PathBuf;

use bytes::Bytes;

use super::dispatcher::runtime;

/// Payloads below this size are written to disk synchronously; larger ones
/// go to the background runtime.
const SYNC_WRITE_THRESHOLD: usize = 150 * 1024;

/// Format and append parameters to a URI.
///
/// The first pair is prefixed with `?`, subsequent pairs are joined with
/// `&`, in iteration order. Values are appended as given; escaping is the
/// caller's responsibility. An empty parameter sequence returns the URI
/// unchanged.
///
/// # Example
///
/// ```
/// use stratus_http::http::construct_uri_with_parameters;
///
/// let uri = construct_uri_with_parameters("http://example.com", [("a", "1"), ("b", "2")]);
/// assert_eq!(uri, "http://example.com?a=1&b=2");
/// ```
pub fn construct_uri_with_parameters<I, K, V>(uri: &str, parameters: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut out = String::from(uri);
    for (i, (key, value)) in parameters.into_iter().enumerate() {
        out.push(if i == 0 { '?' } else { '&' });
        out.push_str(key.as_ref());
        out.push('=');
        out.push_str(value.as_ref());
    }
    out
}

/// Write response bytes to a file.
///
/// Payloads under 150 KiB are written synchronously; larger payloads are
/// written on the background runtime so the caller is not blocked. Write
/// failures are logged and never surfaced to the request's completion
/// outcome.
pub fn write_file(data: Bytes, path: impl Into<PathBuf>) {
    let path = path.into();
    if data.len() < SYNC_WRITE_THRESHOLD {
        if let Err(e) = std::fs::write(&path, &data) {
            tracing::error!(
                target: "stratus_http::util",
                path = %path.display(),
                "file write failed: {e}"
            );
        }
    } else {
        runtime::spawn(async move {
            if let Err(e) = tokio::fs::write(&path, &data).await {
                tracing::error!(
                    target: "stratus_http::util",
                    path = %path.display(),
                    "background file write failed: {e}"
                );
            }
        });
    }
}
