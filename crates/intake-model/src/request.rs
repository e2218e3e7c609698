//! The normalized parse result.

use std::collections::BTreeMap;
use std::mem;
use std::path::PathBuf;

use serde::Serialize;

/// One header name's value(s).
///
/// A name seen once keeps its scalar form; a second occurrence promotes the
/// entry to a list accumulating every occurrence in arrival order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum HeaderValues {
    /// The header appeared exactly once.
    Scalar(String),
    /// The header appeared more than once.
    List(Vec<String>),
}

impl HeaderValues {
    /// Create a scalar entry for a first occurrence.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self::Scalar(value.into())
    }

    /// Record a further occurrence, promoting to a list if needed.
    pub fn push(&mut self, value: impl Into<String>) {
        match self {
            Self::Scalar(first) => {
                *self = Self::List(vec![mem::take(first), value.into()]);
            }
            Self::List(values) => values.push(value.into()),
        }
    }

    /// The scalar value, if the header appeared exactly once.
    #[must_use]
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(value) => Some(value),
            Self::List(_) => None,
        }
    }

    /// All occurrences in arrival order.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        match self {
            Self::Scalar(value) => std::slice::from_ref(value).iter(),
            Self::List(values) => values.iter(),
        }
        .map(String::as_str)
    }
}

/// A file recorded in the parse result: where it was written and what the
/// part declared itself to be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedFile {
    /// Absolute destination path the file was streamed to.
    pub path: PathBuf,
    /// The part's declared `Content-Type`.
    pub mimetype: String,
}

/// The decoded body: simple fields and persisted files, in disjoint
/// namespaces so a field name and a file field name never collide.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BodyPayload {
    /// Simple fields. Form decoding produces an object of string values;
    /// JSON decoding stores the parsed document verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<serde_json::Value>,
    /// Files persisted to storage, by field name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<BTreeMap<String, SavedFile>>,
}

impl BodyPayload {
    /// True if neither namespace holds anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_none() && self.files.is_none()
    }
}

/// The normalized view of one inbound request.
///
/// Built once per request and immutable once returned. The all-`None`
/// default is the empty result used when a request is already aborted
/// before parsing begins.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedRequest {
    /// Case-insensitive, multi-value header mapping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, HeaderValues>>,
    /// Parsed query mapping with literal keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<BTreeMap<String, String>>,
    /// The request method, passed through from the transport.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// The request path, passed through from the transport.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// The decoded body, when body decoding was requested and succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<BodyPayload>,
}
