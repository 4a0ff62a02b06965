// crates/perf-ledger-core/tests/classifier.rs
// ============================================================================
// Module: Resource Classifier Tests
// Description: Bucketing rules and numeric policy for request sizes.
// Purpose: Pin category precedence and end-of-run KB rounding.
// Dependencies: perf-ledger-core
// ============================================================================

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    missing_docs,
    reason = "Test-only panic-based assertions are permitted."
)]

use perf_ledger_core::RequestDescriptor;
use perf_ledger_core::ResourceCategory;
use perf_ledger_core::ResourceSizes;
use perf_ledger_core::classifier::accumulate_bytes;
use perf_ledger_core::classify_requests;

fn request(url: &str, transfer: Option<f64>, resource: Option<f64>) -> RequestDescriptor {
    RequestDescriptor {
        url: url.to_string(),
        transfer_size: transfer,
        resource_size: resource,
        mime_type: None,
    }
}

fn with_mime(url: &str, size: f64, mime: &str) -> RequestDescriptor {
    RequestDescriptor {
        mime_type: Some(mime.to_string()),
        ..request(url, Some(size), None)
    }
}

#[test]
fn single_script_lands_in_js_bucket() {
    let sizes = classify_requests(&[request("a.js", Some(2048.0), None)]);
    assert_eq!(
        sizes,
        ResourceSizes {
            js: 2,
            ..ResourceSizes::default()
        }
    );
}

#[test]
fn empty_input_yields_zero_buckets() {
    let none: [RequestDescriptor; 0] = [];
    let sizes = classify_requests(&none);
    assert_eq!(sizes, ResourceSizes::default());
    assert_eq!(sizes.total(), 0);
}

#[test]
fn extension_beats_mime_type() {
    let category =
        ResourceCategory::classify("https://cdn.example.org/x.css?v=3", Some("image/png"));
    assert_eq!(category, ResourceCategory::Css);
    assert_eq!(
        ResourceCategory::classify("https://example.org/logo.SVG#frag", None),
        ResourceCategory::Image
    );
    assert_eq!(ResourceCategory::classify("/fonts/a.woff2", None), ResourceCategory::Font);
}

#[test]
fn mime_type_decides_when_extension_is_unknown() {
    let cases = [
        ("application/javascript", ResourceCategory::Js),
        ("application/json", ResourceCategory::Js),
        ("text/css", ResourceCategory::Css),
        ("image/avif", ResourceCategory::Image),
        ("font/woff2", ResourceCategory::Font),
        ("text/html", ResourceCategory::Other),
    ];
    for (mime, expected) in cases {
        let category = ResourceCategory::classify("https://example.org/resource", Some(mime));
        assert_eq!(category, expected, "{mime}");
    }
}

#[test]
fn host_dots_are_not_extensions() {
    assert_eq!(ResourceCategory::classify("https://example.js/", None), ResourceCategory::Other);
}

#[test]
fn transfer_size_preferred_and_non_positive_excluded() {
    let sizes = classify_requests(&[
        request("a.js", Some(1024.0), Some(99_999.0)),
        request("b.js", None, Some(1024.0)),
        request("c.js", Some(0.0), Some(4096.0)),
        request("d.js", Some(-5.0), None),
        request("e.js", None, None),
    ]);
    assert_eq!(sizes.js, 2);
}

#[test]
fn rounding_happens_once_per_bucket() {
    // Three 400-byte scripts: per-item rounding would give 0 KB, totals give 1 KB.
    let requests: Vec<_> =
        (0 .. 3).map(|i| request(&format!("{i}.js"), Some(400.0), None)).collect();
    assert_eq!(classify_requests(&requests).js, 1);
    let totals = accumulate_bytes(&requests);
    assert!((totals.js - 1200.0).abs() < f64::EPSILON);
}

#[test]
fn mixed_requests_fill_every_bucket() {
    let sizes = classify_requests(&[
        request("app.js", Some(10_240.0), None),
        request("site.css", Some(5120.0), None),
        request("hero.jpeg", Some(20_480.0), None),
        request("body.ttf", Some(3072.0), None),
        with_mime("https://example.org/page", 2048.0, "text/html"),
    ]);
    assert_eq!(
        sizes,
        ResourceSizes {
            js: 10,
            css: 5,
            image: 20,
            font: 3,
            other: 2,
        }
    );
    assert_eq!(sizes.total(), 40);
}
