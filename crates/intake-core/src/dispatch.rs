//! Content-type inspection and decoding strategy selection.

use tracing::warn;

/// How a body's bytes should be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeStrategy {
    /// Drive a form tokenizer over the byte stream.
    Form(FormKind),
    /// Buffer the whole body and parse it as JSON.
    Json,
    /// Leave the body undecoded.
    Skip,
}

/// Which form tokenizer to drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormKind {
    /// `application/x-www-form-urlencoded`.
    UrlEncoded,
    /// `multipart/form-data` with the given boundary.
    Multipart {
        /// The boundary string from the content type.
        boundary: String,
    },
}

/// Select the decoding strategy from the request headers.
///
/// An absent content type defaults to urlencoded. JSON is matched exactly;
/// multipart by its `multipart/form-data;` prefix. Anything else skips body
/// decoding, as does a multipart content type with no usable boundary.
pub fn choose_strategy(headers: &http::HeaderMap) -> DecodeStrategy {
    let content_type = headers
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(mime::APPLICATION_WWW_FORM_URLENCODED.as_ref());

    if content_type == mime::APPLICATION_WWW_FORM_URLENCODED.as_ref() {
        return DecodeStrategy::Form(FormKind::UrlEncoded);
    }
    if content_type.starts_with("multipart/form-data;") {
        return match extract_boundary(content_type) {
            Some(boundary) => DecodeStrategy::Form(FormKind::Multipart { boundary }),
            None => {
                warn!(content_type, "multipart content type without boundary");
                DecodeStrategy::Skip
            }
        };
    }
    if content_type == mime::APPLICATION_JSON.as_ref() {
        return DecodeStrategy::Json;
    }
    DecodeStrategy::Skip
}

/// Extract the boundary parameter from a multipart content type.
fn extract_boundary(content_type: &str) -> Option<String> {
    for part in content_type.split(';') {
        let trimmed = part.trim();
        if let Some(value) = trimmed.strip_prefix("boundary=") {
            let boundary = value.trim_matches('"');
            if !boundary.is_empty() {
                return Some(boundary.to_owned());
            }
        }
    }
    None
}
