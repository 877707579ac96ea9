//! Query-string decoding and encoding.
//!
//! Keys are percent-decoded before matching; values are kept as they
//! appeared in the URL so they can be handed to the transport untouched.
//! Callers that need the text ask for it with [`QueryValue::decoded`].

use std::borrow::Cow;

/// A single occurrence of a key in a query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    /// The key appeared with no `=value`, e.g. `?all`. Reads as `true`.
    Flag,
    /// The raw, still percent-encoded value.
    Raw(String),
}

impl QueryValue {
    pub fn raw(&self) -> &str {
        match self {
            QueryValue::Flag => "true",
            QueryValue::Raw(s) => s,
        }
    }

    /// Percent-decoded text. `+` is treated as a space, as form encoding does.
    /// Invalid escapes fall back to the raw text.
    pub fn decoded(&self) -> String {
        decode_component(self.raw()).into_owned()
    }

    pub fn is_true(&self) -> bool {
        match self {
            QueryValue::Flag => true,
            QueryValue::Raw(_) => self.decoded().eq_ignore_ascii_case("true"),
        }
    }
}

/// Result of looking a key up.
///
/// Without array coercion a key that occurs exactly once comes back as a
/// `Scalar`; zero or several occurrences always come back as a `List`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Scalar(QueryValue),
    List(Vec<QueryValue>),
}

impl Lookup {
    pub fn is_empty(&self) -> bool {
        matches!(self, Lookup::List(vs) if vs.is_empty())
    }
}

/// A parsed query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryString {
    pairs: Vec<(String, QueryValue)>,
}

impl QueryString {
    /// Parse `query`, with or without its leading `?`. Empty segments are skipped.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs = query
            .split('&')
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.split_once('=') {
                Some((key, value)) => (
                    decode_component(key).into_owned(),
                    QueryValue::Raw(value.to_string()),
                ),
                None => (decode_component(segment).into_owned(), QueryValue::Flag),
            })
            .collect();
        Self { pairs }
    }

    /// Every occurrence of `key` or `key[]`, in URL order.
    pub fn values(&self, key: &str) -> Vec<QueryValue> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key || k.strip_suffix("[]") == Some(key))
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn lookup(&self, key: &str, coerce_array: bool) -> Lookup {
        let mut values = self.values(key);
        if !coerce_array && values.len() == 1 {
            Lookup::Scalar(values.remove(0))
        } else {
            Lookup::List(values)
        }
    }

    /// Decoded text of the first occurrence of `key`. Empty values count as absent.
    pub fn first(&self, key: &str) -> Option<String> {
        self.values(key)
            .into_iter()
            .next()
            .map(|v| v.decoded())
            .filter(|s| !s.is_empty())
    }

    pub fn contains(&self, key: &str) -> bool {
        !self.values(key).is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Look `key` up in `query` directly.
pub fn lookup(query: &str, key: &str, coerce_array: bool) -> Lookup {
    QueryString::parse(query).lookup(key, coerce_array)
}

/// Ordered query-string builder. Absent or empty optional values are
/// dropped rather than written as `key=`.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    parts: Vec<String>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &str, value: impl AsRef<str>) -> &mut Self {
        self.parts.push(format!(
            "{}={}",
            urlencoding::encode(key),
            urlencoding::encode(value.as_ref())
        ));
        self
    }

    pub fn push_opt<V: AsRef<str>>(&mut self, key: &str, value: Option<V>) -> &mut Self {
        if let Some(v) = value.filter(|v| !v.as_ref().is_empty()) {
            self.push(key, v);
        }
        self
    }

    /// A bare key with no value, read back as [`QueryValue::Flag`].
    pub fn push_flag(&mut self, key: &str) -> &mut Self {
        self.parts.push(urlencoding::encode(key).into_owned());
        self
    }

    pub fn extend<'a>(&mut self, pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> &mut Self {
        for (k, v) in pairs {
            self.push(k, v);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn finish(&self) -> String {
        self.parts.join("&")
    }
}

fn decode_component(s: &str) -> Cow<'_, str> {
    if !s.contains('+') && !s.contains('%') {
        return Cow::Borrowed(s);
    }
    let spaced = s.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => Cow::Owned(decoded.into_owned()),
        Err(_) => Cow::Owned(spaced),
    }
}
