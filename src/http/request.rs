//! Fluent configuration methods
//!
//! Every setter goes through [`Request::configure`], so all of them share the
//! same rules: no effect once an error is recorded, and an
//! [`AlreadySent`](crate::LazyreqError::AlreadySent) error once the request
//! has been sent.

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE};
use serde::Serialize;
use url::Url;

use super::auth::Auth;
use super::body;
use super::Request;
use crate::config::{RequestBody, ResponseHook};
use crate::context::Context;
use crate::error::{BoxError, LazyreqError};
use crate::logging::Logger;
use crate::options::RequestOption;
use crate::query::ToQuery;

impl Request {
    pub fn with_context(self, context: Context) -> Self {
        self.configure(|c| {
            c.set_context(context);
            Ok(())
        });
        self
    }

    /// Zero disables the request's own timeout.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.configure(|c| {
            c.set_timeout(timeout);
            Ok(())
        });
        self
    }

    /// Skip TLS certificate verification.
    pub fn with_ignore_ssl(self, ignore: bool) -> Self {
        self.configure(|c| {
            c.set_verify_tls(!ignore);
            Ok(())
        });
        self
    }

    /// Follow `Location` redirects (the default) or stop at the first response.
    pub fn with_redirect(self, follow: bool) -> Self {
        self.configure(|c| {
            c.set_follow_redirects(follow);
            Ok(())
        });
        self
    }

    /// Run `wrap` on the response before it is cached.
    ///
    /// With redirects enabled the hook only sees the final hop; intermediate
    /// redirect responses are consumed by the transport.
    pub fn with_wrap_response<F>(self, wrap: F) -> Self
    where
        F: Fn(reqwest::Response) -> Result<reqwest::Response, BoxError> + Send + Sync + 'static,
    {
        let hook: ResponseHook = Arc::new(wrap);
        self.configure(|c| {
            c.set_response_hook(hook);
            Ok(())
        });
        self
    }

    pub fn with_header(self, key: &str, value: &str) -> Self {
        self.configure(|c| c.header(key, value));
        self
    }

    pub fn with_headers<I, K, V>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.configure(|c| {
            headers
                .into_iter()
                .try_for_each(|(k, v)| c.header(k.as_ref(), v.as_ref()))
        });
        self
    }

    pub fn with_query(self, key: &str, value: &str) -> Self {
        self.configure(|c| {
            c.query_mut().append(key, value);
            Ok(())
        });
        self
    }

    pub fn with_queries<Q: ToQuery + ?Sized>(self, queries: &Q) -> Self {
        self.configure(|c| {
            queries.to_query(c.query_mut());
            Ok(())
        });
        self
    }

    pub fn with_body(self, payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();
        self.configure(|c| {
            c.set_body(RequestBody::Bytes(payload));
            Ok(())
        });
        self
    }

    /// JSON body with `Content-Type: application/json`.
    pub fn with_json<T: Serialize + ?Sized>(self, value: &T) -> Self {
        self.configure(|c| {
            c.set_body(body::json(value)?);
            c.set_header(CONTENT_TYPE, body::CONTENT_TYPE_JSON)
        });
        self
    }

    pub fn with_form_urlencoded(self, fields: &HashMap<String, String>) -> Self {
        self.configure(|c| {
            c.set_body(body::form_urlencoded(fields));
            c.set_header(CONTENT_TYPE, body::CONTENT_TYPE_FORM_URLENCODED)
        });
        self
    }

    /// Multipart body of text fields.
    pub fn with_form(self, fields: &HashMap<String, String>) -> Self {
        self.configure(|c| {
            c.headers.remove(CONTENT_TYPE);
            c.set_body(body::multipart_fields(fields.clone()));
            Ok(())
        });
        self
    }

    /// Multipart upload of `reader` as `filename` under `file_field`, plus text fields.
    pub fn with_file<R: Read>(
        self,
        filename: &str,
        reader: R,
        file_field: &str,
        fields: &HashMap<String, String>,
    ) -> Self {
        self.configure(|c| {
            c.headers.remove(CONTENT_TYPE);
            c.set_body(body::multipart_file(
                file_field,
                filename,
                reader,
                fields.clone(),
            )?);
            Ok(())
        });
        self
    }

    pub fn with_basic_auth(self, username: &str, password: &str) -> Self {
        self.configure(|c| c.set_header(AUTHORIZATION, &Auth::basic_auth(username, password)));
        self
    }

    pub fn with_bearer_token(self, token: &str) -> Self {
        self.configure(|c| c.set_header(AUTHORIZATION, &Auth::bearer_token(token)));
        self
    }

    /// Add the session jar's cookies for `uri` as an extra `Cookie` header.
    ///
    /// Caller-set cookie headers are kept. Requests without a jar ignore this.
    pub fn with_url_cookie(self, uri: &str) -> Self {
        let jar = self.jar().cloned();
        self.configure(|c| {
            let Some(jar) = jar else {
                return Ok(());
            };
            let url = Url::parse(uri)
                .map_err(|e| LazyreqError::InvalidUrl(format!("Invalid URL '{}': {}", uri, e)))?;

            let cookies = jar
                .cookies_for(&url)
                .into_iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>();
            if cookies.is_empty() {
                return Ok(());
            }
            c.header(COOKIE.as_str(), &cookies.join("; "))
        });
        self
    }

    pub fn with_logger(self, logger: Arc<dyn Logger>) -> Self {
        self.configure(|c| {
            c.set_logger(logger);
            Ok(())
        });
        self
    }

    /// Apply options in order; later options win on conflicting fields.
    pub fn with_options<'a, I>(self, options: I) -> Self
    where
        I: IntoIterator<Item = &'a RequestOption>,
    {
        options.into_iter().fold(self, |req, option| option.apply(req))
    }
}
