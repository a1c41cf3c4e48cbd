//! Tests for URI formatting and the file-persistence helper.

use std::time::Duration;

use bytes::Bytes;
use stratus_http::http::{construct_uri_with_parameters, write_file};

#[test]
fn test_uri_parameters_in_order() {
    let uri = construct_uri_with_parameters("http://x", [("a", "1"), ("b", "2")]);
    assert_eq!(uri, "http://x?a=1&b=2");
}

#[test]
fn test_uri_single_parameter() {
    let uri = construct_uri_with_parameters("http://x/path", [("q", "rust")]);
    assert_eq!(uri, "http://x/path?q=rust");
}

#[test]
fn test_uri_empty_parameters_unchanged() {
    let empty: [(&str, &str); 0] = [];
    assert_eq!(construct_uri_with_parameters("http://x", empty), "http://x");
}

#[test]
fn test_uri_values_not_escaped() {
    // Escaping is the caller's responsibility.
    let uri = construct_uri_with_parameters("http://x", [("q", "a b&c")]);
    assert_eq!(uri, "http://x?q=a b&c");
}

#[test]
fn test_write_file_small_is_synchronous() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("small.bin");

    write_file(Bytes::from_static(b"payload"), &path);

    // Below the threshold the write completes before returning.
    assert_eq!(std::fs::read(&path).unwrap(), b"payload");
}

#[test]
fn test_write_file_large_goes_to_background() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("large.bin");
    let data = vec![0xA5u8; 256 * 1024];

    write_file(Bytes::from(data.clone()), &path);

    // The write happens on the background runtime; poll for it.
    for _ in 0..200 {
        if std::fs::read(&path).is_ok_and(|written| written == data) {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("background write did not complete");
}
