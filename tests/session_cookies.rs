use std::sync::Arc;

use lazyreq::{options, SessionRegistry};
use tempfile::tempdir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

async fn cookie_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "sid=42; Path=/; Max-Age=3600")
                .set_body_string("logged in"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("cookie", "sid=42"))
        .respond_with(ResponseTemplate::new(200).set_body_string("welcome back"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    server
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_cookies_shared_between_lookups_and_persisted() {
    if !can_bind_localhost() {
        return;
    }

    let server = cookie_server().await;
    let dir = tempdir().expect("tempdir");
    let cookie_file = dir.path().join("cookies.json");
    let registry = SessionRegistry::new();

    let first = registry.get_or_create(&cookie_file, Vec::new());
    let second = registry.get_or_create(&cookie_file, Vec::new());
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.len(), 1);

    let login = first.get(format!("{}/login", server.uri()));
    assert_eq!(login.text().await.expect("login"), "logged in");

    let me = second.get(format!("{}/me", server.uri()));
    assert_eq!(me.status().await.expect("status"), 200);
    assert_eq!(me.text().await.expect("text"), "welcome back");

    let saved = std::fs::read_to_string(&cookie_file).expect("cookie file written");
    assert!(saved.contains("sid"));
    assert!(saved.contains("42"));

    // a fresh registry reloads the cookie from disk
    let reopened = SessionRegistry::new().get_or_create(&cookie_file, Vec::new());
    assert!(reopened.error().is_none());
    let me_again = reopened.get(format!("{}/me", server.uri()));
    assert_eq!(me_again.status().await.expect("status"), 200);
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_url_cookie_is_added_to_caller_cookies() {
    if !can_bind_localhost() {
        return;
    }

    let server = cookie_server().await;
    Mock::given(method("GET"))
        .and(path("/echo"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let dir = tempdir().expect("tempdir");
    let session = SessionRegistry::new().get_or_create(dir.path().join("jar.json"), Vec::new());
    session
        .get(format!("{}/login", server.uri()))
        .status()
        .await
        .expect("login");

    let req = session
        .get(format!("{}/echo", server.uri()))
        .with_header("Cookie", "manual=1")
        .with_url_cookie(&server.uri());
    req.status().await.expect("status");

    let requests = server.received_requests().await.expect("requests");
    let echo = requests
        .iter()
        .find(|r| r.url.path() == "/echo")
        .expect("echo request");
    let sent: Vec<String> = echo
        .headers
        .get_all("cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect();
    let joined = sent.join("; ");
    assert!(joined.contains("manual=1"), "cookies sent: {}", joined);
    assert!(joined.contains("sid=42"), "cookies sent: {}", joined);
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_jar_cookies_added_to_caller_cookie_header() {
    if !can_bind_localhost() {
        return;
    }

    let server = cookie_server().await;
    let dir = tempdir().expect("tempdir");
    let session = SessionRegistry::new().get_or_create(dir.path().join("merge.json"), Vec::new());
    session
        .get(format!("{}/login", server.uri()))
        .status()
        .await
        .expect("login");

    let req = session
        .get(format!("{}/me", server.uri()))
        .with_header("Cookie", "manual=1");
    req.status().await.expect("status");

    let requests = server.received_requests().await.expect("requests");
    let me = requests
        .iter()
        .rev()
        .find(|r| r.url.path() == "/me")
        .expect("me request");
    let sent: Vec<String> = me
        .headers
        .get_all("cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect();
    assert!(sent.iter().any(|v| v.contains("manual=1")), "cookies sent: {:?}", sent);
    assert!(sent.iter().any(|v| v.contains("sid=42")), "cookies sent: {:?}", sent);
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_session_options_apply_to_every_request() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tagged"))
        .and(header("x-session", "default"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tagged"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let dir = tempdir().expect("tempdir");
    let session = SessionRegistry::new().get_or_create(
        dir.path().join("opts.json"),
        vec![options::header("X-Session", "default")],
    );

    let url = format!("{}/tagged", server.uri());
    assert_eq!(session.get(url.as_str()).status().await.expect("status"), 200);
    assert_eq!(session.get(url.as_str()).status().await.expect("status"), 200);
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_unreadable_cookie_file_fails_every_request() {
    let dir = tempdir().expect("tempdir");
    // a directory cannot be loaded as a cookie file
    let session = SessionRegistry::new().get_or_create(dir.path(), Vec::new());
    assert!(session.error().is_some());

    let req = session.get("http://127.0.0.1:1/never");
    let err = req.text().await.expect_err("poisoned");
    assert_eq!(err.to_string(), session.error().expect("error").to_string());
    assert!(!req.is_executed());
}
