//! Tests for the three-way outcome classifier.

use std::collections::HashMap;

use bytes::Bytes;
use stratus_http::http::classify;
use stratus_http::http::Exchange;
use stratus_http::{HttpOutcome, HttpResponse, TransportResult};

fn response_result(status: u16, body: &str) -> TransportResult {
    let mut headers = HashMap::new();
    headers.insert("content-type".to_string(), "text/plain".to_string());
    TransportResult {
        url: "http://example.com/resource".to_string(),
        exchange: Exchange::Response {
            status,
            headers,
            body: Some(Bytes::from(body.to_string())),
            asset: None,
        },
    }
}

/// Exactly one of the three predicates is true for any response.
fn assert_exclusive(response: &HttpResponse) {
    let flags = [
        response.is_successful(),
        response.is_http_error(),
        response.is_network_error(),
    ];
    assert_eq!(flags.iter().filter(|&&flag| flag).count(), 1);
}

#[test]
fn test_2xx_statuses_are_success() {
    for status in [200, 201, 204, 299] {
        let response = classify(response_result(status, "ok"));
        assert_eq!(response.outcome(), HttpOutcome::Success);
        assert!(response.is_successful());
        assert!(response.error().is_none());
        assert_exclusive(&response);
    }
}

#[test]
fn test_non_2xx_statuses_are_protocol_errors() {
    for status in [199, 300, 301, 404, 500] {
        let response = classify(response_result(status, "no"));
        assert_eq!(response.outcome(), HttpOutcome::ProtocolError);
        assert!(response.is_http_error());
        assert_eq!(response.status_code(), status);
        assert_eq!(response.error(), Some(format!("HTTP {status}").as_str()));
        assert_exclusive(&response);
    }
}

#[test]
fn test_connection_failure_is_network_error() {
    let response = classify(TransportResult {
        url: "http://unreachable.invalid/".to_string(),
        exchange: Exchange::ConnectionFailed {
            message: "dns error".to_string(),
        },
    });

    assert_eq!(response.outcome(), HttpOutcome::NetworkError);
    assert!(response.is_network_error());
    assert_eq!(response.status_code(), 0);
    assert!(response.body().is_none());
    assert!(response.text().is_none());
    assert_eq!(response.error(), Some("dns error"));
    assert!(response.headers().is_empty());
    assert_exclusive(&response);
}

#[test]
fn test_decode_failure_is_protocol_error_despite_2xx() {
    let response = classify(TransportResult {
        url: "http://example.com/avatar.png".to_string(),
        exchange: Exchange::DecodeFailed {
            status: 200,
            headers: HashMap::new(),
            body: Some(Bytes::from_static(b"not an image")),
            message: "image decode failed: bad magic".to_string(),
        },
    });

    assert_eq!(response.outcome(), HttpOutcome::ProtocolError);
    assert!(response.is_http_error());
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.error(), Some("image decode failed: bad magic"));
    assert!(response.asset().is_none());
    assert_exclusive(&response);
}

#[test]
fn test_response_fields_carried_through() {
    let response = classify(response_result(200, "hello"));

    assert_eq!(response.url(), "http://example.com/resource");
    assert_eq!(response.text(), Some("hello"));
    assert_eq!(response.body().map(|b| b.as_ref()), Some(b"hello".as_ref()));
    assert_eq!(response.header("content-type"), Some("text/plain"));
    assert!(response.asset().is_none());
}
