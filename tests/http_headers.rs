use lazyreq::{options, Request};
use reqwest::header::USER_AGENT;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_custom_header_sent() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/headers"))
        .and(header("X-Test-Header", "lazyreq"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let req = Request::get(format!("{}/headers", server.uri()))
        .with_header("X-Test-Header", "lazyreq");
    assert_eq!(req.status().await.expect("status"), 200);
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_repeated_headers_append_but_user_agent_replaces() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/headers"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let req = Request::get(format!("{}/headers", server.uri()))
        .with_header("a", "1")
        .with_headers([("a", "2"), ("b", "3")])
        .with_header("User-Agent", "first/1.0")
        .with_header("User-Agent", "second/2.0");
    req.status().await.expect("status");

    let requests = server.received_requests().await.expect("requests");
    let sent = &requests[0].headers;
    let a: Vec<_> = sent.get_all("a").iter().collect();
    assert_eq!(a, ["1", "2"]);
    let agents: Vec<_> = sent.get_all(USER_AGENT.as_str()).iter().collect();
    assert_eq!(agents, ["second/2.0"]);
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_default_user_agent_is_sent() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header(
            "user-agent",
            lazyreq::config::default_user_agent().as_str(),
        ))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let req = Request::get(server.uri());
    assert_eq!(req.status().await.expect("status"), 204);
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_query_merge_order_on_the_wire() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/get"))
        .and(query_param("b", "3"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let req = Request::get(format!("{}/get?a=1", server.uri()))
        .with_options(&[options::query("a", "2"), options::query("b", "3")]);
    assert_eq!(req.status().await.expect("status"), 200);

    let requests = server.received_requests().await.expect("requests");
    assert_eq!(requests[0].url.query(), Some("a=1&a=2&b=3"));
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_response_header_accessors() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/resp-headers"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("x-multi", "one")
                .append_header("x-multi", "two")
                .append_header("set-cookie", "a=1; Path=/")
                .append_header("set-cookie", "a=2; Path=/"),
        )
        .mount(&server)
        .await;

    let req = Request::get(format!("{}/resp-headers", server.uri()));
    assert_eq!(
        req.header("x-multi").await.expect("header"),
        Some("one".to_string())
    );
    assert_eq!(
        req.header_values("x-multi").await.expect("values"),
        ["one", "two"]
    );
    assert_eq!(req.header("x-missing").await.expect("header"), None);
    assert_eq!(req.cookies("a").await.expect("cookies"), ["1", "2"]);
    assert!(req.headers().await.expect("headers").contains_key("x-multi"));
    assert!(!req.is_read());
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_redirect_can_be_disabled() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/start"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/final"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/final"))
        .respond_with(ResponseTemplate::new(200).set_body_string("final"))
        .mount(&server)
        .await;

    let followed = Request::get(format!("{}/start", server.uri()));
    assert_eq!(followed.text().await.expect("text"), "final");
    let head = followed.response_head().await.expect("head");
    assert_eq!(head.url.path(), "/final");

    let stopped = Request::get(format!("{}/start", server.uri())).with_redirect(false);
    assert_eq!(stopped.status().await.expect("status"), 302);
    assert_eq!(
        stopped.header("location").await.expect("location"),
        Some("/final".to_string())
    );
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_response_hook_sees_final_hop_only() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hop"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/landed"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/landed"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let seen = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let recorder = std::sync::Arc::clone(&seen);
    let req = Request::get(format!("{}/hop", server.uri())).with_wrap_response(move |resp| {
        recorder.lock().expect("lock").push(resp.status().as_u16());
        Ok(resp)
    });
    assert_eq!(req.status().await.expect("status"), 200);
    assert_eq!(*seen.lock().expect("lock"), [200]);
}
