//! File-backed cookie jar shared by sessions.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use bytes::Bytes;
use cookie_store::CookieStore as Store;
use reqwest::header::HeaderValue;
use url::Url;

use crate::error::{LazyreqError, Result};

/// A cookie jar persisted as JSON at a fixed path.
///
/// The jar is the reqwest cookie provider for every client of a session, so
/// `Set-Cookie` headers from any hop land here. [`PersistentJar::save`]
/// writes the persistent (non-session, unexpired) cookies back to disk.
pub struct PersistentJar {
    path: PathBuf,
    store: RwLock<Store>,
    save_lock: Mutex<()>,
}

impl std::fmt::Debug for PersistentJar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentJar")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl PersistentJar {
    /// Open the jar at `path`. A missing or empty file yields an empty jar.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let store = match std::fs::metadata(&path) {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Store::default(),
            Err(e) => return Err(e.into()),
            Ok(meta) if meta.is_dir() => {
                return Err(LazyreqError::CookieStore(format!(
                    "Cookie file {:?} is a directory",
                    path
                )))
            }
            Ok(meta) if meta.len() == 0 => Store::default(),
            Ok(_) => {
                let reader = BufReader::new(File::open(&path)?);
                cookie_store::serde::json::load(reader).map_err(|e| {
                    LazyreqError::CookieStore(format!(
                        "Failed to load cookies from {:?}: {}",
                        path, e
                    ))
                })?
            }
        };

        Ok(Self {
            path,
            store: RwLock::new(store),
            save_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Cookies that would be sent to `url`, as (name, value) pairs.
    pub fn cookies_for(&self, url: &Url) -> Vec<(String, String)> {
        let store = self.store.read().unwrap_or_else(|p| p.into_inner());
        store
            .get_request_values(url)
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect()
    }

    /// Store a raw `Set-Cookie` value as if it came from `url`.
    pub fn add_cookie_str(&self, cookie: &str, url: &Url) {
        let cookies = cookie::Cookie::parse(cookie)
            .ok()
            .map(cookie::Cookie::into_owned)
            .into_iter();
        let mut store = self.store.write().unwrap_or_else(|p| p.into_inner());
        store.store_response_cookies(cookies, url);
    }

    /// Persist the jar, replacing the file atomically.
    pub fn save(&self) -> Result<()> {
        let _guard = self.save_lock.lock().unwrap_or_else(|p| p.into_inner());

        let mut buf = Vec::new();
        {
            let store = self.store.read().unwrap_or_else(|p| p.into_inner());
            cookie_store::serde::json::save(&store, &mut buf).map_err(|e| {
                LazyreqError::CookieStore(format!("Failed to serialize cookies: {}", e))
            })?;
        }

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut file = tempfile::NamedTempFile::new_in(&dir)?;
        file.write_all(&buf)?;
        file.persist(&self.path).map_err(|e| LazyreqError::from(e.error))?;
        Ok(())
    }
}

impl reqwest::cookie::CookieStore for PersistentJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let cookies: Vec<_> = cookie_headers
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| cookie::Cookie::parse(value).ok())
            .map(cookie::Cookie::into_owned)
            .collect();

        let mut store = self.store.write().unwrap_or_else(|p| p.into_inner());
        store.store_response_cookies(cookies.into_iter(), url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let header = self
            .cookies_for(url)
            .into_iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ");

        if header.is_empty() {
            return None;
        }
        HeaderValue::from_maybe_shared(Bytes::from(header)).ok()
    }
}
