//! Query-string parameters and the conversion traits that feed them.

use std::collections::{BTreeMap, HashMap};

use url::Url;

/// Multi-valued query parameters, values kept in insertion order per key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    params: BTreeMap<String, Vec<String>>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.entry(key.into()).or_default().push(value.into());
    }

    pub fn extend_key<I>(&mut self, key: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut values = values.into_iter().peekable();
        if values.peek().is_none() {
            return;
        }
        self.params.entry(key.into()).or_default().extend(values);
    }

    pub fn get(&self, key: &str) -> &[String] {
        self.params.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Encode as `application/x-www-form-urlencoded`, keys sorted.
    pub fn encode(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, values) in &self.params {
            for value in values {
                serializer.append_pair(key, value);
            }
        }
        serializer.finish()
    }

    /// Merge into `url`: values already in the URL come first, then ours.
    pub fn apply_to(&self, url: &mut Url) {
        let mut merged = Query::new();
        for (key, value) in url.query_pairs() {
            merged.append(key.into_owned(), value.into_owned());
        }
        for (key, values) in &self.params {
            merged.extend_key(key.clone(), values.iter().cloned());
        }

        if merged.is_empty() {
            url.set_query(None);
        } else {
            url.set_query(Some(&merged.encode()));
        }
    }
}

/// A value that renders as one or more query-string values.
pub trait QueryValue {
    fn query_values(&self) -> Vec<String>;
}

macro_rules! display_query_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl QueryValue for $ty {
                fn query_values(&self) -> Vec<String> {
                    vec![self.to_string()]
                }
            }
        )*
    };
}

display_query_value!(String, &str, bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl<T: QueryValue> QueryValue for Vec<T> {
    fn query_values(&self) -> Vec<String> {
        self.iter().flat_map(QueryValue::query_values).collect()
    }
}

impl<T: QueryValue> QueryValue for [T] {
    fn query_values(&self) -> Vec<String> {
        self.iter().flat_map(QueryValue::query_values).collect()
    }
}

impl<T: QueryValue> QueryValue for Option<T> {
    fn query_values(&self) -> Vec<String> {
        self.as_ref().map(QueryValue::query_values).unwrap_or_default()
    }
}

/// A type that can be flattened into query parameters.
///
/// Implement this for request structs to pass them to
/// [`Request::with_queries`](crate::Request::with_queries).
pub trait ToQuery {
    fn to_query(&self, query: &mut Query);
}

impl<V: QueryValue> ToQuery for HashMap<String, V> {
    fn to_query(&self, query: &mut Query) {
        for (key, value) in self {
            query.extend_key(key.clone(), value.query_values());
        }
    }
}

impl<V: QueryValue> ToQuery for HashMap<&str, V> {
    fn to_query(&self, query: &mut Query) {
        for (key, value) in self {
            query.extend_key(*key, value.query_values());
        }
    }
}

impl<V: QueryValue> ToQuery for BTreeMap<String, V> {
    fn to_query(&self, query: &mut Query) {
        for (key, value) in self {
            query.extend_key(key.clone(), value.query_values());
        }
    }
}

impl<K: AsRef<str>, V: QueryValue> ToQuery for [(K, V)] {
    fn to_query(&self, query: &mut Query) {
        for (key, value) in self {
            query.extend_key(key.as_ref(), value.query_values());
        }
    }
}

impl<K: AsRef<str>, V: QueryValue> ToQuery for Vec<(K, V)> {
    fn to_query(&self, query: &mut Query) {
        self.as_slice().to_query(query)
    }
}

impl<K: AsRef<str>, V: QueryValue, const N: usize> ToQuery for [(K, V); N] {
    fn to_query(&self, query: &mut Query) {
        self.as_slice().to_query(query)
    }
}

impl ToQuery for Query {
    fn to_query(&self, query: &mut Query) {
        for (key, values) in &self.params {
            query.extend_key(key.clone(), values.iter().cloned());
        }
    }
}
