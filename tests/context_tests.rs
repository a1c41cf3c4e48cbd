//! Tests for context configuration and the convenience constructors.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockTransport, ok_result};
use stratus_http::{HttpConfig, HttpContext, HttpMethod, MultipartForm};

fn mock_context() -> HttpContext {
    let transport = MockTransport::respond_with(ok_result("http://x", 200, "ok"))
        .with_delay(Duration::from_secs(10));
    HttpContext::with_transport(HttpConfig::default(), Arc::new(transport))
}

#[test]
fn test_default_config() {
    let config = HttpConfig::default();
    assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    assert_eq!(config.max_redirects, 10);
    assert!(config.cookies_enabled);
    assert!(config.user_agent.is_some());
}

#[test]
fn test_constructors_set_method_and_url() {
    let ctx = mock_context();

    assert_eq!(ctx.get("http://x/a").method(), HttpMethod::Get);
    assert_eq!(ctx.get_image("http://x/a").method(), HttpMethod::Get);
    assert_eq!(ctx.get_to_file("http://x/a", "/tmp/a").method(), HttpMethod::Get);
    assert_eq!(ctx.post_text("http://x/a", "body").method(), HttpMethod::Post);
    assert_eq!(
        ctx.post_form("http://x/a", [("k", "v")]).method(),
        HttpMethod::Post
    );
    assert_eq!(
        ctx.post_json("http://x/a", &serde_json::json!({"k": 1})).method(),
        HttpMethod::Post
    );
    assert_eq!(
        ctx.post_bytes("http://x/a", vec![1u8, 2, 3], "image/png").method(),
        HttpMethod::Post
    );
    assert_eq!(
        ctx.post_multipart("http://x/a", MultipartForm::new().text("f", "v"))
            .method(),
        HttpMethod::Post
    );
    assert_eq!(ctx.put_text("http://x/a", "body").method(), HttpMethod::Put);
    assert_eq!(ctx.put_bytes("http://x/a", vec![1u8]).method(), HttpMethod::Put);
    assert_eq!(ctx.delete("http://x/a").method(), HttpMethod::Delete);
    assert_eq!(ctx.head("http://x/a").method(), HttpMethod::Head);
    assert_eq!(
        ctx.request(HttpMethod::Options, "http://x/a").method(),
        HttpMethod::Options
    );

    assert_eq!(ctx.get("http://x/a").url(), "http://x/a");
}

#[test]
fn test_multipart_form_sections() {
    let form = MultipartForm::new()
        .text("field", "value")
        .file_bytes("file", vec![1u8, 2, 3, 4], "test.bin", Some("application/octet-stream"));

    assert_eq!(form.len(), 2);
    assert!(!form.is_empty());
}
