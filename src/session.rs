//! Cookie-jar-backed request factories
//!
//! A [`Session`] is identified by the path of its cookie file. The
//! [`SessionRegistry`] hands out one shared instance per path; the global
//! registry is created on first use and lives for the rest of the process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use crate::cookies::PersistentJar;
use crate::error::LazyreqError;
use crate::http::Request;
use crate::options::RequestOption;
use crate::transport::{ReqwestTransport, Transport};

/// Registry of sessions keyed by cookie-file path
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<PathBuf, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static SessionRegistry {
        static GLOBAL: OnceLock<SessionRegistry> = OnceLock::new();
        GLOBAL.get_or_init(SessionRegistry::new)
    }

    /// Return the session for `cookie_file`, creating it on first use.
    ///
    /// `options` only take effect when the session is created.
    pub fn get_or_create(
        &self,
        cookie_file: impl AsRef<Path>,
        options: Vec<RequestOption>,
    ) -> Arc<Session> {
        let key = cookie_file.as_ref().to_path_buf();
        let mut sessions = self
            .sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(session) = sessions.get(&key) {
            return Arc::clone(session);
        }

        let session = Arc::new(Session::open(key.clone(), options));
        sessions.insert(key, Arc::clone(&session));
        session
    }

    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A request factory sharing one cookie jar and a set of default options
pub struct Session {
    cookie_file: PathBuf,
    jar: Option<Arc<PersistentJar>>,
    error: Option<LazyreqError>,
    options: Vec<RequestOption>,
    transport: Arc<dyn Transport>,
}

impl Session {
    /// Shorthand for [`SessionRegistry::global`]`().get_or_create(..)`.
    pub fn get_or_create(cookie_file: impl AsRef<Path>, options: Vec<RequestOption>) -> Arc<Session> {
        SessionRegistry::global().get_or_create(cookie_file, options)
    }

    fn open(cookie_file: PathBuf, options: Vec<RequestOption>) -> Self {
        match PersistentJar::open(&cookie_file) {
            Ok(jar) => {
                let jar = Arc::new(jar);
                Self {
                    cookie_file,
                    transport: Arc::new(ReqwestTransport::with_jar(Arc::clone(&jar))),
                    jar: Some(jar),
                    error: None,
                    options,
                }
            }
            Err(err) => {
                log::warn!("Failed to open cookie file {:?}: {}", cookie_file, err);
                Self {
                    cookie_file,
                    jar: None,
                    error: Some(err),
                    options,
                    transport: ReqwestTransport::shared(),
                }
            }
        }
    }

    /// Use a custom transport for the requests this session builds.
    ///
    /// The transport is responsible for feeding [`Session::jar`] if cookies
    /// should be tracked.
    pub fn with_transport(
        cookie_file: impl AsRef<Path>,
        options: Vec<RequestOption>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let mut session = Self::open(cookie_file.as_ref().to_path_buf(), options);
        session.transport = transport;
        session
    }

    /// Build a request: session jar and transport attached, construction
    /// error seeded, session options applied, then call-site options.
    pub fn new_request(
        &self,
        method: impl Into<String>,
        url: impl Into<String>,
        options: &[RequestOption],
    ) -> Request {
        let request = Request::with_parts(
            method,
            url,
            Arc::clone(&self.transport),
            self.jar.clone(),
        );
        if let Some(err) = &self.error {
            request.set_error(err.clone());
        }
        request
            .with_options(&self.options)
            .with_options(options)
    }

    /// GET with the session defaults only; use [`Session::new_request`] to
    /// add call-site options. The same holds for the other method shorthands.
    pub fn get(&self, url: impl Into<String>) -> Request {
        self.new_request("GET", url, &[])
    }

    pub fn post(&self, url: impl Into<String>) -> Request {
        self.new_request("POST", url, &[])
    }

    pub fn put(&self, url: impl Into<String>) -> Request {
        self.new_request("PUT", url, &[])
    }

    pub fn patch(&self, url: impl Into<String>) -> Request {
        self.new_request("PATCH", url, &[])
    }

    pub fn delete(&self, url: impl Into<String>) -> Request {
        self.new_request("DELETE", url, &[])
    }

    pub fn jar(&self) -> Option<&Arc<PersistentJar>> {
        self.jar.as_ref()
    }

    pub fn cookie_file(&self) -> &Path {
        &self.cookie_file
    }

    /// Error raised while opening the cookie file, if any.
    pub fn error(&self) -> Option<&LazyreqError> {
        self.error.as_ref()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("cookie_file", &self.cookie_file)
            .field("error", &self.error)
            .field("options", &self.options.len())
            .finish_non_exhaustive()
    }
}
