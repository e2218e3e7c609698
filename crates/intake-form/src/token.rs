//! The token alphabet shared by both tokenizers.

use bytes::Bytes;
use intake_model::FilePart;

/// One decoded event from a form body.
///
/// File parts arrive as `FileBegin`, zero or more `FileChunk`s, then
/// `FileEnd`, in that order, and the bytes of a part must be consumed before
/// the next token is pulled. `Finish` marks the terminal clean end of the
/// body.
#[derive(Debug, Clone, PartialEq)]
pub enum FormToken {
    /// A complete simple field.
    Field {
        /// The decoded field name.
        name: String,
        /// The decoded field value.
        value: String,
    },
    /// A file part's headers have been read; its bytes follow.
    FileBegin(FilePart),
    /// One chunk of the current file part.
    FileChunk(Bytes),
    /// The current file part is complete.
    FileEnd,
    /// The body has been fully tokenized.
    Finish,
}
