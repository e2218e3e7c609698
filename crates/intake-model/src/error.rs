//! Error taxonomy for the body-decoding engine.
//!
//! Only structural failures of the streaming mechanism itself are
//! caller-visible: size/count limits and upstream stream failures. Per-file
//! storage failures are recovered locally by the decoder and reported on the
//! diagnostics channel instead (see [`crate::PartOutcome`]).

/// Terminal failure of a body decode.
///
/// Each variant corresponds to one distinct rejection the parse call can
/// settle with; everything else degrades to a smaller result.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The whole-buffer decode path exceeded its configured byte ceiling.
    #[error("collected body exceeds the configured ceiling of {max} bytes")]
    MaxSizeExceeded {
        /// The ceiling that was exceeded.
        max: usize,
    },

    /// Upstream byte delivery failed mid-decode.
    #[error("request body stream failed: {0}")]
    Stream(String),

    /// The tokenizer saw more parts than the configured part-count limit.
    #[error("part count limit of {0} exceeded")]
    PartsLimit(usize),

    /// The tokenizer saw more simple fields than the configured field-count limit.
    #[error("field count limit of {0} exceeded")]
    FieldsLimit(usize),

    /// The tokenizer saw more file parts than the configured file-count limit.
    #[error("file count limit of {0} exceeded")]
    FilesLimit(usize),

    /// The tokenizer could not make sense of the body bytes.
    #[error("malformed form body: {0}")]
    Tokenizer(String),
}

/// Convenience result type for decoding operations.
pub type DecodeResult<T> = Result<T, DecodeError>;
