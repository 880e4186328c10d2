//! Configuration for lazyreq requests
//!
//! [`RequestConfig`] is the mutable builder state behind every
//! [`Request`](crate::Request). It is only reachable through
//! [`Request::configure`](crate::Request::configure), which holds the
//! request lock and refuses mutation once the request has been sent.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::Method;
use url::Url;

use crate::context::Context;
use crate::error::{BoxError, LazyreqError, Result};
use crate::logging::{self, Logger};
use crate::query::Query;
use crate::transport::OutboundRequest;

/// Default per-request timeout. A zero timeout disables it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Redirect hops followed before giving up.
pub const MAX_REDIRECTS: usize = 10;

pub fn default_user_agent() -> String {
    format!("lazyreq/{}", crate::VERSION)
}

/// Rewrites the raw response right after it arrives.
pub type ResponseHook =
    Arc<dyn Fn(reqwest::Response) -> std::result::Result<reqwest::Response, BoxError> + Send + Sync>;

/// Outbound request payload
pub enum RequestBody {
    Bytes(Bytes),
    /// Multipart forms are single-use; the form is taken when the request is sent.
    Multipart(reqwest::multipart::Form),
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Bytes(bytes) => write!(f, "{}", logging::preview(bytes)),
            RequestBody::Multipart(form) => write!(f, "<multipart boundary={}>", form.boundary()),
        }
    }
}

/// Builder state for one logical request
pub struct RequestConfig {
    pub(crate) method: String,
    pub(crate) url: String,
    pub(crate) query: Query,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<RequestBody>,
    pub(crate) timeout: Duration,
    pub(crate) follow_redirects: bool,
    pub(crate) verify_tls: bool,
    pub(crate) response_hook: Option<ResponseHook>,
    pub(crate) context: Context,
    pub(crate) logger: Arc<dyn Logger>,
    pub(crate) error: Option<LazyreqError>,
}

impl RequestConfig {
    pub(crate) fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&default_user_agent()) {
            headers.insert(USER_AGENT, value);
        }

        RequestConfig {
            method: method.into(),
            url: url.into(),
            query: Query::new(),
            headers,
            body: None,
            timeout: DEFAULT_TIMEOUT,
            follow_redirects: true,
            verify_tls: true,
            response_hook: None,
            context: Context::background(),
            logger: logging::default_logger(),
            error: None,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Set a header. `User-Agent` replaces the current value; every other
    /// header appends.
    pub fn header(&mut self, key: &str, value: &str) -> Result<()> {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| LazyreqError::Config(format!("Invalid header name '{}': {}", key, e)))?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            LazyreqError::Config(format!("Invalid value for header '{}': {}", key, e))
        })?;

        if name == USER_AGENT {
            self.headers.insert(name, value);
        } else {
            self.headers.append(name, value);
        }
        Ok(())
    }

    /// Replace a header regardless of the append rule.
    pub fn set_header(&mut self, name: HeaderName, value: &str) -> Result<()> {
        let value = HeaderValue::from_str(value).map_err(|e| {
            LazyreqError::Config(format!("Invalid value for header '{}': {}", name, e))
        })?;
        self.headers.insert(name, value);
        Ok(())
    }

    pub fn query_mut(&mut self) -> &mut Query {
        &mut self.query
    }

    pub fn set_body(&mut self, body: RequestBody) {
        self.body = Some(body);
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn set_follow_redirects(&mut self, follow: bool) {
        self.follow_redirects = follow;
    }

    pub fn set_verify_tls(&mut self, verify: bool) {
        self.verify_tls = verify;
    }

    pub fn set_context(&mut self, context: Context) {
        self.context = context;
    }

    pub fn set_logger(&mut self, logger: Arc<dyn Logger>) {
        self.logger = logger;
    }

    pub fn set_response_hook(&mut self, hook: ResponseHook) {
        self.response_hook = Some(hook);
    }

    /// Base URL with the builder query merged in.
    pub(crate) fn resolve_url(&self) -> std::result::Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.url)?;
        self.query.apply_to(&mut url);
        Ok(url)
    }

    /// Resolved URL as a string, falling back to the raw URL when it does not parse.
    pub(crate) fn full_url(&self) -> String {
        self.resolve_url()
            .map(String::from)
            .unwrap_or_else(|_| self.url.clone())
    }

    /// Move the sendable parts into an [`OutboundRequest`].
    pub(crate) fn outbound(&mut self, url: Url, timeout: Option<Duration>) -> Result<OutboundRequest> {
        let method = Method::from_bytes(self.method.as_bytes()).map_err(|e| LazyreqError::Build {
            method: self.method.clone(),
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let body = match self.body.take() {
            Some(RequestBody::Bytes(bytes)) => {
                self.body = Some(RequestBody::Bytes(bytes.clone()));
                Some(RequestBody::Bytes(bytes))
            }
            other => other,
        };

        Ok(OutboundRequest {
            method,
            url,
            headers: self.headers.clone(),
            body,
            timeout,
            verify_tls: self.verify_tls,
            follow_redirects: self.follow_redirects,
        })
    }

    pub(crate) fn body_preview(&self) -> String {
        self.body
            .as_ref()
            .map(|body| format!("{:?}", body))
            .unwrap_or_default()
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("query", &self.query)
            .field("headers", &self.headers)
            .field("body", &self.body)
            .field("timeout", &self.timeout)
            .field("follow_redirects", &self.follow_redirects)
            .field("verify_tls", &self.verify_tls)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
