//! Transport capability
//!
//! The request lifecycle never talks to the network directly. It hands an
//! [`OutboundRequest`] to a [`Transport`] and gets back a raw
//! `reqwest::Response` or an error. [`ReqwestTransport`] is the default.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use futures_util::future::BoxFuture;
use reqwest::cookie::CookieStore;
use reqwest::header::{HeaderMap, COOKIE};
use reqwest::{Client, ClientBuilder, Method};
use url::Url;

use crate::config::{RequestBody, MAX_REDIRECTS};
use crate::cookies::PersistentJar;
use crate::error::BoxError;

/// Everything a transport needs to send one request
#[derive(Debug)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<RequestBody>,
    /// Time left before the request deadline, if any.
    pub timeout: Option<Duration>,
    pub verify_tls: bool,
    pub follow_redirects: bool,
}

/// Sends a request and returns the raw response.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: OutboundRequest,
    ) -> BoxFuture<'_, Result<reqwest::Response, BoxError>>;
}

/// reqwest-backed transport
///
/// One client is built lazily per (TLS verification, redirect policy)
/// combination. A transport created with a jar shares it with every client as
/// the cookie provider.
pub struct ReqwestTransport {
    jar: Option<Arc<PersistentJar>>,
    clients: Mutex<HashMap<(bool, bool), Client>>,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            jar: None,
            clients: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_jar(jar: Arc<PersistentJar>) -> Self {
        Self {
            jar: Some(jar),
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Process-wide transport without a cookie jar.
    pub fn shared() -> Arc<ReqwestTransport> {
        static SHARED: OnceLock<Arc<ReqwestTransport>> = OnceLock::new();
        SHARED
            .get_or_init(|| Arc::new(ReqwestTransport::new()))
            .clone()
    }

    fn client(&self, verify_tls: bool, follow_redirects: bool) -> Result<Client, BoxError> {
        let mut clients = self
            .clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(client) = clients.get(&(verify_tls, follow_redirects)) {
            return Ok(client.clone());
        }

        let mut builder = ClientBuilder::new().redirect(if follow_redirects {
            reqwest::redirect::Policy::limited(MAX_REDIRECTS)
        } else {
            reqwest::redirect::Policy::none()
        });

        if !verify_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(jar) = &self.jar {
            builder = builder.cookie_provider(Arc::clone(jar));
        }

        let client = builder.build()?;
        clients.insert((verify_tls, follow_redirects), client.clone());
        Ok(client)
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for ReqwestTransport {
    fn send(
        &self,
        request: OutboundRequest,
    ) -> BoxFuture<'_, Result<reqwest::Response, BoxError>> {
        Box::pin(async move {
            let client = self.client(request.verify_tls, request.follow_redirects)?;

            let mut headers = request.headers;
            // reqwest skips its cookie provider when a Cookie header is present
            if let Some(jar) = &self.jar {
                if headers.contains_key(COOKIE) {
                    if let Some(cookies) = jar.cookies(&request.url) {
                        headers.append(COOKIE, cookies);
                    }
                }
            }

            let mut builder = client.request(request.method, request.url).headers(headers);

            if let Some(timeout) = request.timeout {
                builder = builder.timeout(timeout);
            }

            builder = match request.body {
                Some(RequestBody::Bytes(bytes)) => builder.body(bytes),
                Some(RequestBody::Multipart(form)) => builder.multipart(form),
                None => builder,
            };

            let response = client.execute(builder.build()?).await?;
            Ok(response)
        })
    }
}
