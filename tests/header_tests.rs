//! Tests for super headers and request-level header mutation.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockTransport, ok_result};
use stratus_http::{HttpConfig, HttpContext, HttpError};

fn mock_context() -> HttpContext {
    let transport = MockTransport::respond_with(ok_result("http://x", 200, "ok"))
        .with_delay(Duration::from_secs(10));
    HttpContext::with_transport(HttpConfig::default(), Arc::new(transport))
}

#[test]
fn test_super_header_validation() {
    let ctx = mock_context();

    assert!(matches!(
        ctx.set_super_header("", "value"),
        Err(HttpError::Configuration(_))
    ));
    assert!(matches!(
        ctx.set_super_header("key", ""),
        Err(HttpError::Configuration(_))
    ));
    assert!(matches!(
        ctx.remove_super_header(""),
        Err(HttpError::Configuration(_))
    ));
}

#[test]
fn test_super_header_set_replace_remove() {
    let ctx = mock_context();

    ctx.set_super_header("X-Token", "first").unwrap();
    ctx.set_super_header("X-Token", "second").unwrap();
    assert_eq!(
        ctx.super_headers().get("X-Token").map(String::as_str),
        Some("second")
    );

    assert!(ctx.remove_super_header("X-Token").unwrap());
    assert!(!ctx.remove_super_header("X-Token").unwrap());
    assert!(ctx.super_headers().is_empty());
}

#[test]
fn test_super_headers_returns_defensive_copy() {
    let ctx = mock_context();
    ctx.set_super_header("X-Token", "abc").unwrap();

    let mut copy = ctx.super_headers();
    copy.insert("Injected".to_string(), "nope".to_string());
    copy.remove("X-Token");

    let fresh = ctx.super_headers();
    assert_eq!(fresh.get("X-Token").map(String::as_str), Some("abc"));
    assert!(!fresh.contains_key("Injected"));
}

#[test]
fn test_request_snapshots_super_headers_at_construction() {
    let ctx = mock_context();
    ctx.set_super_header("X-Token", "abc").unwrap();

    let early = ctx.get("http://x/early");
    ctx.remove_super_header("X-Token").unwrap();
    let late = ctx.get("http://x/late");

    assert_eq!(
        early.headers().get("X-Token").map(String::as_str),
        Some("abc")
    );
    assert!(!late.headers().contains_key("X-Token"));
}

#[test]
fn test_request_header_validation() {
    let ctx = mock_context();

    assert!(matches!(
        ctx.get("http://x").set_header("", "v"),
        Err(HttpError::Configuration(_))
    ));
    assert!(matches!(
        ctx.get("http://x").set_header("k", ""),
        Err(HttpError::Configuration(_))
    ));

    let request = ctx.get("http://x");
    assert!(matches!(
        request.remove_header(""),
        Err(HttpError::Configuration(_))
    ));
    assert!(!request.remove_header("missing").unwrap());
}

#[test]
fn test_request_set_and_remove_headers() {
    let ctx = mock_context();

    let request = ctx
        .get("http://x")
        .set_header("Accept", "application/json")
        .unwrap()
        .set_headers([("A", "1"), ("B", "2")])
        .unwrap();

    let headers = request.headers();
    assert_eq!(headers.get("Accept").map(String::as_str), Some("application/json"));
    assert_eq!(headers.get("A").map(String::as_str), Some("1"));
    assert_eq!(headers.get("B").map(String::as_str), Some("2"));

    assert!(request.remove_header("A").unwrap());
    assert!(!request.headers().contains_key("A"));
}

#[test]
fn test_remove_super_headers_is_one_time_diff() {
    let ctx = mock_context();
    ctx.set_super_header("X-Token", "abc").unwrap();
    ctx.set_super_header("X-Trace", "on").unwrap();

    // The request overrides one super header and adds one of its own.
    let request = ctx
        .get("http://x")
        .set_header("X-Token", "overridden")
        .unwrap()
        .set_header("X-Own", "mine")
        .unwrap()
        .remove_super_headers();

    // Removal diffs by key, so the overridden value goes too.
    let headers = request.headers();
    assert!(!headers.contains_key("X-Token"));
    assert!(!headers.contains_key("X-Trace"));
    assert_eq!(headers.get("X-Own").map(String::as_str), Some("mine"));

    // Super headers set after the diff are unaffected on a later call.
    ctx.set_super_header("X-Later", "later").unwrap();
    assert!(!request.headers().contains_key("X-Later"));
}
