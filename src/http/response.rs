//! Cached response accessors
//!
//! Every accessor returns a [`Result`]. The first call drives the execution
//! guard; later calls read the cached response head or body bytes. Decode
//! failures are reported to the caller only and do not poison the request.

use reqwest::header::{HeaderMap, SET_COOKIE};
use reqwest::{StatusCode, Version};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use url::Url;

use super::Request;
use crate::error::{LazyreqError, Result};
use crate::logging;

/// Status line and headers of the final response
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub version: Version,
    pub headers: HeaderMap,
    /// URL of the final hop, after redirects.
    pub url: Url,
}

impl ResponseHead {
    pub(crate) fn from_response(response: &reqwest::Response) -> Self {
        Self {
            status: response.status(),
            version: response.version(),
            headers: response.headers().clone(),
            url: response.url().clone(),
        }
    }

    /// Values of `Set-Cookie` entries named `name`, in header order.
    pub fn cookies(&self, name: &str) -> Vec<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| cookie::Cookie::parse(value).ok())
            .filter(|cookie| cookie.name() == name)
            .map(|cookie| cookie.value().to_string())
            .collect()
    }
}

impl Request {
    /// Response body bytes. Sends and reads on first use.
    pub async fn bytes(&self) -> Result<bytes::Bytes> {
        self.read().await
    }

    /// Response body as text; invalid UTF-8 is replaced, never transcoded.
    pub async fn text(&self) -> Result<String> {
        self.bytes()
            .await
            .map(|data| String::from_utf8_lossy(&data).into_owned())
    }

    /// Parse the body as JSON into `T`.
    pub async fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let data = self.bytes().await?;
        serde_json::from_slice(&data).map_err(|e| self.decode_error(&data, std::any::type_name::<T>(), e))
    }

    /// Parse the body as a JSON object.
    pub async fn as_map(&self) -> Result<Map<String, Value>> {
        let data = self.bytes().await?;
        serde_json::from_slice(&data).map_err(|e| self.decode_error(&data, "map", e))
    }

    /// Status line and headers. Sends on first use; never reads the body.
    pub async fn response_head(&self) -> Result<ResponseHead> {
        self.execute().await.map(|exchange| exchange.head.clone())
    }

    pub async fn status(&self) -> Result<u16> {
        self.execute()
            .await
            .map(|exchange| exchange.head.status.as_u16())
    }

    pub async fn headers(&self) -> Result<HeaderMap> {
        self.execute()
            .await
            .map(|exchange| exchange.head.headers.clone())
    }

    /// First value of response header `key`.
    pub async fn header(&self, key: &str) -> Result<Option<String>> {
        self.execute().await.map(|exchange| {
            exchange
                .head
                .headers
                .get(key)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        })
    }

    /// All values of response header `key`, in order.
    pub async fn header_values(&self, key: &str) -> Result<Vec<String>> {
        self.execute().await.map(|exchange| {
            exchange
                .head
                .headers
                .get_all(key)
                .iter()
                .filter_map(|value| value.to_str().ok())
                .map(str::to_string)
                .collect()
        })
    }

    /// Values of the response cookies named `name`, possibly empty.
    pub async fn cookies(&self, name: &str) -> Result<Vec<String>> {
        self.execute()
            .await
            .map(|exchange| exchange.head.cookies(name))
    }

    fn decode_error(&self, data: &[u8], target: &'static str, err: serde_json::Error) -> LazyreqError {
        LazyreqError::Decode {
            method: self.method(),
            url: self.full_url(),
            payload: logging::preview(data),
            target,
            source: Arc::new(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ResponseHead;
    use reqwest::header::{HeaderMap, HeaderValue, SET_COOKIE};
    use reqwest::{StatusCode, Version};
    use url::Url;

    #[test]
    fn cookies_returns_matching_values_in_order() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, HeaderValue::from_static("a=1; Path=/"));
        headers.append(SET_COOKIE, HeaderValue::from_static("b=2"));
        headers.append(SET_COOKIE, HeaderValue::from_static("a=3; HttpOnly"));
        let head = ResponseHead {
            status: StatusCode::OK,
            version: Version::HTTP_11,
            headers,
            url: Url::parse("http://example.com/").expect("url"),
        };

        assert_eq!(head.cookies("a"), ["1", "3"]);
        assert!(head.cookies("missing").is_empty());
    }
}
