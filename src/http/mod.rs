//! HTTP request module
//!
//! A [`Request`] accumulates configuration, sends itself at most once when a
//! result is first demanded, and caches everything it learns. The execution
//! guard lives here; the fluent setters are in [`request`] and the cached
//! accessors in [`response`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use bytes::Bytes;
use tokio::sync::OnceCell;
use tokio::time::Instant;

use crate::config::RequestConfig;
use crate::context::Context;
use crate::cookies::PersistentJar;
use crate::error::{BoxError, LazyreqError, Result};
use crate::logging::{self, Logger};
use crate::transport::{ReqwestTransport, Transport};

pub mod auth;
pub mod body;
pub mod request;
pub mod response;

pub use response::ResponseHead;

/// A lazily executed, single-shot HTTP request
///
/// `Request` is a cheap handle: clones share the same configuration and the
/// same execution state, so a request can be handed to several tasks and
/// still hit the network only once.
#[derive(Clone)]
pub struct Request {
    inner: Arc<Inner>,
}

struct Inner {
    config: Mutex<RequestConfig>,
    executed: AtomicBool,
    read: AtomicBool,
    cached_url: OnceLock<String>,
    exchange: OnceCell<Option<Exchange>>,
    bytes: OnceCell<Option<Bytes>>,
    transport: Arc<dyn Transport>,
    jar: Option<Arc<PersistentJar>>,
}

/// What the send step leaves behind for the read step and the accessors.
pub(crate) struct Exchange {
    head: ResponseHead,
    body: Mutex<Option<reqwest::Response>>,
    deadline: Option<Instant>,
}

/// Values captured under the config lock for logging and error context.
struct Snapshot {
    method: String,
    url: String,
    context: Context,
    logger: Arc<dyn Logger>,
}

impl Request {
    /// Create a request sent through the process-wide transport.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self::with_parts(method, url, ReqwestTransport::shared(), None)
    }

    /// Create a request sent through a custom transport.
    pub fn with_transport(
        method: impl Into<String>,
        url: impl Into<String>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self::with_parts(method, url, transport, None)
    }

    pub(crate) fn with_parts(
        method: impl Into<String>,
        url: impl Into<String>,
        transport: Arc<dyn Transport>,
        jar: Option<Arc<PersistentJar>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config: Mutex::new(RequestConfig::new(method, url)),
                executed: AtomicBool::new(false),
                read: AtomicBool::new(false),
                cached_url: OnceLock::new(),
                exchange: OnceCell::new(),
                bytes: OnceCell::new(),
                transport,
                jar,
            }),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new("GET", url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new("POST", url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new("PUT", url)
    }

    pub fn patch(url: impl Into<String>) -> Self {
        Self::new("PATCH", url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new("DELETE", url)
    }

    /// Apply a mutation to the builder state.
    ///
    /// The mutation only runs while the request is still being built and no
    /// error has been recorded. After the request was sent, the call records
    /// an [`LazyreqError::AlreadySent`] error instead. A failing mutator
    /// records its own error. The first recorded error is never replaced.
    pub fn configure<F>(&self, mutate: F) -> &Self
    where
        F: FnOnce(&mut RequestConfig) -> Result<()>,
    {
        let mut config = self.lock_config();
        if config.error.is_some() {
            return self;
        }

        if self.inner.executed.load(Ordering::Acquire) {
            let url = self.cached_or_full_url(&config);
            config.error = Some(LazyreqError::AlreadySent {
                method: config.method.clone(),
                url,
            });
            return self;
        }

        if let Err(err) = mutate(&mut config) {
            config.error = Some(err);
        }
        self
    }

    /// Record `err` unless an error is already present.
    pub fn set_error(&self, err: LazyreqError) -> &Self {
        let mut config = self.lock_config();
        if config.error.is_none() {
            config.error = Some(err);
        }
        self
    }

    /// The sticky error, if one has been recorded.
    pub fn error(&self) -> Option<LazyreqError> {
        self.lock_config().error.clone()
    }

    pub fn is_executed(&self) -> bool {
        self.inner.executed.load(Ordering::Acquire)
    }

    pub fn is_read(&self) -> bool {
        self.inner.read.load(Ordering::Acquire)
    }

    pub fn method(&self) -> String {
        self.lock_config().method.clone()
    }

    /// The URL as given, without the builder query.
    pub fn url(&self) -> String {
        self.lock_config().url.clone()
    }

    /// The URL that is (or would be) requested, query included.
    pub fn full_url(&self) -> String {
        let config = self.lock_config();
        self.cached_or_full_url(&config)
    }

    pub fn timeout(&self) -> std::time::Duration {
        self.lock_config().timeout
    }

    pub fn request_headers(&self) -> reqwest::header::HeaderMap {
        self.lock_config().headers.clone()
    }

    pub(crate) fn jar(&self) -> Option<&Arc<PersistentJar>> {
        self.inner.jar.as_ref()
    }

    fn lock_config(&self) -> MutexGuard<'_, RequestConfig> {
        self.inner
            .config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn cached_or_full_url(&self, config: &RequestConfig) -> String {
        self.inner
            .cached_url
            .get()
            .cloned()
            .unwrap_or_else(|| config.full_url())
    }

    fn snapshot(&self) -> Snapshot {
        let config = self.lock_config();
        Snapshot {
            method: config.method.clone(),
            url: self.cached_or_full_url(&config),
            context: config.context,
            logger: Arc::clone(&config.logger),
        }
    }

    fn record_error(&self, err: LazyreqError) {
        self.set_error(err);
    }

    fn sticky_or_abandoned(&self) -> LazyreqError {
        self.error().unwrap_or_else(|| {
            let snapshot = self.snapshot();
            LazyreqError::Abandoned {
                method: snapshot.method,
                url: snapshot.url,
            }
        })
    }

    /// Send the request once; later and concurrent callers wait for that send.
    pub(crate) async fn execute(&self) -> Result<&Exchange> {
        if let Some(err) = self.error() {
            return Err(err);
        }

        let exchange = self.inner.exchange.get_or_init(|| self.send_once()).await;
        match (exchange, self.error()) {
            (_, Some(err)) => Err(err),
            (Some(exchange), None) => Ok(exchange),
            (None, None) => Err(self.sticky_or_abandoned()),
        }
    }

    /// Send, then drain the body once; later calls reuse the bytes.
    pub(crate) async fn read(&self) -> Result<Bytes> {
        let exchange = self.execute().await?;
        let bytes = self
            .inner
            .bytes
            .get_or_init(|| self.read_once(exchange))
            .await;
        match (bytes, self.error()) {
            (_, Some(err)) => Err(err),
            (Some(bytes), None) => Ok(bytes.clone()),
            (None, None) => Err(self.sticky_or_abandoned()),
        }
    }

    async fn send_once(&self) -> Option<Exchange> {
        let started = Instant::now();

        let (outbound, deadline, hook, snapshot) = {
            let mut config = self.lock_config();
            if config.error.is_some() {
                return None;
            }

            if self
                .inner
                .executed
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                // an earlier send was dropped mid-flight; never send twice
                let url = self.cached_or_full_url(&config);
                config.error = Some(LazyreqError::Abandoned {
                    method: config.method.clone(),
                    url,
                });
                return None;
            }

            let resolved = config.resolve_url();
            let url_string = match &resolved {
                Ok(url) => url.to_string(),
                Err(_) => config.url.clone(),
            };
            let _ = self.inner.cached_url.set(url_string.clone());

            let snapshot = Snapshot {
                method: config.method.clone(),
                url: url_string,
                context: config.context,
                logger: Arc::clone(&config.logger),
            };

            snapshot.logger.info(
                &snapshot.context,
                format_args!(
                    "[lazyreq] {}: {}, body={}, header={:?}",
                    snapshot.method,
                    snapshot.url,
                    config.body_preview(),
                    config.headers
                ),
            );

            let deadline = config.context.effective_deadline(started, config.timeout);
            let timeout = deadline.map(|d| d.saturating_duration_since(started));

            let outbound = resolved
                .map_err(|e| LazyreqError::Build {
                    method: snapshot.method.clone(),
                    url: snapshot.url.clone(),
                    message: e.to_string(),
                })
                .and_then(|url| config.outbound(url, timeout));

            (outbound, deadline, config.response_hook.clone(), snapshot)
        };

        let outcome = match outbound {
            Ok(outbound) => {
                let sent = self.inner.transport.send(outbound);
                let response = match deadline {
                    Some(deadline) => match tokio::time::timeout_at(deadline, sent).await {
                        Ok(result) => result.map_err(|e| send_error(&snapshot, e)),
                        Err(_) => Err(timeout_error(&snapshot, "send request")),
                    },
                    None => sent.await.map_err(|e| send_error(&snapshot, e)),
                };

                response.and_then(|response| match &hook {
                    Some(hook) => hook(response).map_err(|e| send_error(&snapshot, e)),
                    None => Ok(response),
                })
            }
            Err(err) => Err(err),
        };

        self.persist_cookies(&snapshot);

        match outcome {
            Ok(response) => Some(Exchange {
                head: ResponseHead::from_response(&response),
                body: Mutex::new(Some(response)),
                deadline,
            }),
            Err(err) => {
                self.record_error(err);
                None
            }
        }
    }

    async fn read_once(&self, exchange: &Exchange) -> Option<Bytes> {
        let snapshot = self.snapshot();

        if self
            .inner
            .read
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.record_error(LazyreqError::Abandoned {
                method: snapshot.method,
                url: snapshot.url,
            });
            return None;
        }

        let response = exchange
            .body
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(response) = response else {
            self.record_error(LazyreqError::Abandoned {
                method: snapshot.method,
                url: snapshot.url,
            });
            return None;
        };

        let drained = response.bytes();
        let result = match exchange.deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, drained).await {
                Ok(result) => result.map_err(|e| read_error(&snapshot, e)),
                Err(_) => Err(timeout_error(&snapshot, "read response")),
            },
            None => drained.await.map_err(|e| read_error(&snapshot, e)),
        };

        match result {
            Ok(bytes) => {
                snapshot.logger.info(
                    &snapshot.context,
                    format_args!(
                        "[lazyreq] {}: {}, read: {}",
                        snapshot.method,
                        snapshot.url,
                        logging::preview(&bytes)
                    ),
                );
                Some(bytes)
            }
            Err(err) => {
                self.record_error(err);
                None
            }
        }
    }

    fn persist_cookies(&self, snapshot: &Snapshot) {
        if let Some(jar) = &self.inner.jar {
            if let Err(e) = jar.save() {
                snapshot.logger.error(
                    &snapshot.context,
                    format_args!("[lazyreq] save cookie failed: {}", e),
                );
            }
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let config = self.lock_config();
        f.debug_struct("Request")
            .field("method", &config.method)
            .field("url", &self.cached_or_full_url(&config))
            .field("executed", &self.is_executed())
            .field("read", &self.is_read())
            .field("error", &config.error)
            .finish()
    }
}

fn send_error(snapshot: &Snapshot, err: BoxError) -> LazyreqError {
    if let Some(reqwest_err) = err.downcast_ref::<reqwest::Error>() {
        if reqwest_err.is_timeout() {
            return timeout_error(snapshot, "send request");
        }
        if reqwest_err.is_builder() {
            return LazyreqError::Build {
                method: snapshot.method.clone(),
                url: snapshot.url.clone(),
                message: reqwest_err.to_string(),
            };
        }
    }
    LazyreqError::Transport {
        method: snapshot.method.clone(),
        url: snapshot.url.clone(),
        source: Arc::from(err),
    }
}

fn read_error(snapshot: &Snapshot, err: reqwest::Error) -> LazyreqError {
    if err.is_timeout() {
        return timeout_error(snapshot, "read response");
    }
    LazyreqError::Read {
        method: snapshot.method.clone(),
        url: snapshot.url.clone(),
        source: Arc::new(err),
    }
}

fn timeout_error(snapshot: &Snapshot, phase: &'static str) -> LazyreqError {
    LazyreqError::Timeout {
        method: snapshot.method.clone(),
        url: snapshot.url.clone(),
        phase,
    }
}
