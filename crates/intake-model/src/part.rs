//! Per-file-part descriptor.

/// Metadata for one file-bearing part of a form body.
///
/// A `FilePart` is created by the tokenizer when a file part's headers have
/// been read, and is passed by reference to every storage policy hook for
/// that part. The part's bytes are not carried here: they are delivered to
/// the decoder separately, after all hooks for the part have resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// The form field name the file was submitted under.
    pub field_name: String,
    /// The client-supplied filename, if any.
    pub filename: Option<String>,
    /// The part's `Content-Transfer-Encoding`.
    pub encoding: String,
    /// The part's declared `Content-Type`.
    pub mime_type: String,
}

impl FilePart {
    /// Create a descriptor with the default encoding and mime type.
    #[must_use]
    pub fn new(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            filename: None,
            encoding: "7bit".to_owned(),
            mime_type: mime::APPLICATION_OCTET_STREAM.as_ref().to_owned(),
        }
    }
}
