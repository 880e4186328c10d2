use lazyreq::utils::UrlUtils;

#[test]
fn test_version() {
    assert!(!lazyreq::VERSION.is_empty());
}

#[test]
fn test_url_utils_adds_scheme() {
    let url = UrlUtils::validate_url("example.com").expect("URL should parse");
    assert_eq!(url.scheme(), "http");
}

#[test]
fn test_unsent_request_reports_configuration() {
    let req = lazyreq::Request::get("http://example.com/a?x=1").with_query("y", "2");
    assert_eq!(req.method(), "GET");
    assert_eq!(req.url(), "http://example.com/a?x=1");
    assert_eq!(req.full_url(), "http://example.com/a?x=1&y=2");
    assert!(!req.is_executed());
    assert!(req.error().is_none());
}
