//! Incremental form tokenizers for the Intake body decoder.
//!
//! This crate decodes the raw bytes of a `application/x-www-form-urlencoded`
//! or `multipart/form-data` body into discrete [`FormToken`]s, pulling input
//! from any fallible byte-chunk stream at its own pace. File-part bytes are
//! delivered as a bounded sequence of [`FormToken::FileChunk`]s between
//! [`FormToken::FileBegin`] and [`FormToken::FileEnd`], so a consumer never
//! holds more than one chunk of a file in memory.
//!
//! All size and count limits from [`FormLimits`](intake_model::FormLimits)
//! are enforced here, at the moment of excess: count limits reject the
//! tokenize, size limits truncate.

mod multipart;
mod text;
mod token;
mod urlencoded;

pub use multipart::MultipartTokenizer;
pub use token::FormToken;
pub use urlencoded::UrlEncodedTokenizer;

use bytes::Bytes;
use futures::Stream;
use intake_model::{DecodeResult, FormOptions};

/// A tokenizer for one form body, dispatching on the declared encoding.
#[derive(Debug)]
pub enum FormTokenizer<S> {
    /// `application/x-www-form-urlencoded` bodies.
    UrlEncoded(UrlEncodedTokenizer<S>),
    /// `multipart/form-data` bodies.
    Multipart(MultipartTokenizer<S>),
}

impl<S> FormTokenizer<S>
where
    S: Stream<Item = DecodeResult<Bytes>> + Unpin + Send,
{
    /// Tokenize a urlencoded body.
    pub fn urlencoded(input: S, options: FormOptions) -> Self {
        Self::UrlEncoded(UrlEncodedTokenizer::new(input, options))
    }

    /// Tokenize a multipart body delimited by `boundary`.
    pub fn multipart(input: S, boundary: &str, options: FormOptions) -> Self {
        Self::Multipart(MultipartTokenizer::new(input, boundary, options))
    }

    /// Pull the next token, reading more input as needed.
    ///
    /// After [`FormToken::Finish`] every further call returns `Finish`
    /// again. Errors are terminal.
    pub async fn next_token(&mut self) -> DecodeResult<FormToken> {
        match self {
            Self::UrlEncoded(tokenizer) => tokenizer.next_token().await,
            Self::Multipart(tokenizer) => tokenizer.next_token().await,
        }
    }
}
