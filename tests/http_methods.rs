use lazyreq::Request;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn can_bind_localhost() -> bool {
    std::net::TcpListener::bind("127.0.0.1:0").is_ok()
}

async fn send_with_method(server: &MockServer, http_method: &str, build: fn(String) -> Request) {
    Mock::given(method(http_method))
        .and(path("/resource"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(server)
        .await;

    let req = build(format!("{}/resource", server.uri()));
    assert_eq!(req.status().await.expect("status"), 200);
    assert_eq!(req.text().await.expect("text"), "ok");
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_get_request() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    send_with_method(&server, "GET", Request::get).await;
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_post_request() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    send_with_method(&server, "POST", Request::post).await;
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_put_request() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    send_with_method(&server, "PUT", Request::put).await;
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_patch_request() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    send_with_method(&server, "PATCH", Request::patch).await;
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_delete_request() {
    if !can_bind_localhost() {
        return;
    }
    let server = MockServer::start().await;
    send_with_method(&server, "DELETE", Request::delete).await;
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_status_403_is_a_value_not_an_error() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status/403"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let req = Request::get(format!("{}/status/403", server.uri()));
    assert_eq!(req.status().await.expect("status"), 403);
}

#[cfg_attr(miri, ignore)]
#[tokio::test]
async fn test_concurrent_accessors_hit_server_once() {
    if !can_bind_localhost() {
        return;
    }

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/once"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("shared")
                .set_delay(std::time::Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let req = Request::get(format!("{}/once", server.uri()));
    let handles: Vec<_> = (0..10)
        .map(|_| {
            let req = req.clone();
            tokio::spawn(async move { req.text().await })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.await.expect("join").expect("text"), "shared");
    }

    let requests = server.received_requests().await.expect("requests");
    assert_eq!(requests.len(), 1);
}
