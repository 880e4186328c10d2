//! Reusable request options
//!
//! An option is a shareable function applied to a request while it is being
//! built. Sessions keep a list of default options and apply them to every
//! request they create, before the call-site options.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::context::Context;
use crate::http::Request;
use crate::logging::Logger;
use crate::query::{Query, ToQuery};

#[derive(Clone)]
pub struct RequestOption(Arc<dyn Fn(Request) -> Request + Send + Sync>);

impl RequestOption {
    pub fn new<F>(apply: F) -> Self
    where
        F: Fn(Request) -> Request + Send + Sync + 'static,
    {
        Self(Arc::new(apply))
    }

    pub fn apply(&self, request: Request) -> Request {
        (self.0)(request)
    }
}

impl fmt::Debug for RequestOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RequestOption")
    }
}

pub fn timeout(timeout: Duration) -> RequestOption {
    RequestOption::new(move |req| req.with_timeout(timeout))
}

pub fn header(key: impl Into<String>, value: impl Into<String>) -> RequestOption {
    let (key, value) = (key.into(), value.into());
    RequestOption::new(move |req| req.with_header(&key, &value))
}

pub fn headers<I, K, V>(headers: I) -> RequestOption
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let headers: Vec<(String, String)> = headers
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect();
    RequestOption::new(move |req| req.with_headers(headers.iter().map(|(k, v)| (k, v))))
}

pub fn query(key: impl Into<String>, value: impl Into<String>) -> RequestOption {
    let (key, value) = (key.into(), value.into());
    RequestOption::new(move |req| req.with_query(&key, &value))
}

/// Snapshot `queries` now; the option appends the same pairs every time.
pub fn queries<Q: ToQuery + ?Sized>(queries: &Q) -> RequestOption {
    let mut snapshot = Query::new();
    queries.to_query(&mut snapshot);
    RequestOption::new(move |req| req.with_queries(&snapshot))
}

pub fn logger(logger: Arc<dyn Logger>) -> RequestOption {
    RequestOption::new(move |req| req.with_logger(Arc::clone(&logger)))
}

pub fn context(context: Context) -> RequestOption {
    RequestOption::new(move |req| req.with_context(context))
}

pub fn redirect(follow: bool) -> RequestOption {
    RequestOption::new(move |req| req.with_redirect(follow))
}

pub fn ignore_ssl(ignore: bool) -> RequestOption {
    RequestOption::new(move |req| req.with_ignore_ssl(ignore))
}

pub fn basic_auth(username: impl Into<String>, password: impl Into<String>) -> RequestOption {
    let (username, password) = (username.into(), password.into());
    RequestOption::new(move |req| req.with_basic_auth(&username, &password))
}

pub fn bearer_token(token: impl Into<String>) -> RequestOption {
    let token = token.into();
    RequestOption::new(move |req| req.with_bearer_token(&token))
}

#[cfg(test)]
mod tests {
    use super::{header, query, timeout, RequestOption};
    use crate::error::LazyreqError;
    use crate::http::Request;
    use std::time::Duration;

    #[test]
    fn later_options_win() {
        let opts = [timeout(Duration::from_secs(10)), timeout(Duration::from_secs(1))];
        let req = Request::get("http://example.com").with_options(&opts);
        assert_eq!(req.timeout(), Duration::from_secs(1));
    }

    #[test]
    fn options_accumulate_headers_and_query() {
        let opts = [header("Auth", "hey"), query("query", "value")];
        let req = Request::get("http://example.com/get?x=1").with_options(&opts);
        assert_eq!(req.request_headers().get("auth").expect("auth"), "hey");
        assert_eq!(req.full_url(), "http://example.com/get?query=value&x=1");
    }

    #[test]
    fn custom_option_can_record_an_error() {
        let fail = RequestOption::new(|req| {
            req.set_error(LazyreqError::Config("must fail".to_string()));
            req
        });
        let req = Request::get("http://example.com").with_options([&fail]);
        assert_eq!(
            req.error().expect("error").to_string(),
            "Configuration error: must fail"
        );
    }
}
