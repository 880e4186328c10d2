//! Request body encoders

use std::io::Read;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Serialize;

use crate::config::RequestBody;
use crate::error::Result;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<RequestBody> {
    let encoded = serde_json::to_vec(value)?;
    Ok(RequestBody::Bytes(Bytes::from(encoded)))
}

pub fn form_urlencoded<I, K, V>(pairs: I) -> RequestBody
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let encoded = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    RequestBody::Bytes(Bytes::from(encoded))
}

/// Multipart body made of text fields only.
pub fn multipart_fields<I, K, V>(fields: I) -> RequestBody
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let form = fields
        .into_iter()
        .fold(Form::new(), |form, (key, value)| form.text(key.into(), value.into()));
    RequestBody::Multipart(form)
}

/// Multipart upload: one file part followed by auxiliary text fields.
///
/// The reader is drained immediately so the body is fixed at configuration
/// time.
pub fn multipart_file<R, I, K, V>(
    file_field: &str,
    filename: &str,
    mut reader: R,
    fields: I,
) -> Result<RequestBody>
where
    R: Read,
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let mut content = Vec::new();
    reader.read_to_end(&mut content)?;

    let part = Part::bytes(content).file_name(filename.to_string());
    let form = fields
        .into_iter()
        .fold(Form::new().part(file_field.to_string(), part), |form, (key, value)| {
            form.text(key.into(), value.into())
        });
    Ok(RequestBody::Multipart(form))
}

#[cfg(test)]
mod tests {
    use super::{form_urlencoded, json, multipart_file};
    use crate::config::RequestBody;
    use crate::error::LazyreqError;
    use std::io::{self, Read};

    struct BrokenReader;

    impl Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("disk on fire"))
        }
    }

    fn bytes_of(body: RequestBody) -> Vec<u8> {
        match body {
            RequestBody::Bytes(bytes) => bytes.to_vec(),
            RequestBody::Multipart(_) => panic!("expected raw bytes"),
        }
    }

    #[test]
    fn json_encodes_serializable_values() {
        let body = json(&serde_json::json!({"name": "lazyreq"})).expect("json");
        assert_eq!(bytes_of(body), br#"{"name":"lazyreq"}"#);
    }

    #[test]
    fn form_urlencoded_escapes_pairs() {
        let body = form_urlencoded([("a", "1 2"), ("b", "x&y")]);
        assert_eq!(bytes_of(body), b"a=1+2&b=x%26y");
    }

    #[test]
    fn multipart_file_reports_reader_failure() {
        let err = multipart_file("file", "a.txt", BrokenReader, Vec::<(String, String)>::new())
            .expect_err("read failure");
        assert!(matches!(err, LazyreqError::Io(_)));
    }
}
