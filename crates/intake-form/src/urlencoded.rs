//! Incremental tokenizer for `application/x-www-form-urlencoded` bodies.
//!
//! Pairs are emitted as soon as their terminating `&` arrives; a dangling
//! final pair is completed at end of input, so a body that ends cleanly and
//! one whose connection went away mid-pair tokenize the same way.

use std::fmt;

use bytes::{Buf, BytesMut};
use futures::{Stream, StreamExt};
use intake_model::{DecodeError, DecodeResult, FormOptions};

use crate::FormToken;
use crate::text::truncate_to;

/// Streaming tokenizer for urlencoded bodies.
pub struct UrlEncodedTokenizer<S> {
    input: S,
    options: FormOptions,
    buf: BytesMut,
    eof: bool,
    done: bool,
    fields_seen: usize,
}

impl<S> fmt::Debug for UrlEncodedTokenizer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlEncodedTokenizer")
            .field("buffered", &self.buf.len())
            .field("eof", &self.eof)
            .field("fields_seen", &self.fields_seen)
            .finish()
    }
}

impl<S> UrlEncodedTokenizer<S>
where
    S: Stream<Item = DecodeResult<bytes::Bytes>> + Unpin + Send,
{
    /// Create a tokenizer over `input`.
    pub fn new(input: S, options: FormOptions) -> Self {
        let buf = BytesMut::with_capacity(options.buffer_capacity);
        Self {
            input,
            options,
            buf,
            eof: false,
            done: false,
            fields_seen: 0,
        }
    }

    /// Pull the next token, reading more input as needed.
    pub async fn next_token(&mut self) -> DecodeResult<FormToken> {
        loop {
            if self.done {
                return Ok(FormToken::Finish);
            }

            if let Some(pos) = self.buf.iter().position(|&b| b == b'&') {
                let raw = self.buf.split_to(pos);
                self.buf.advance(1);
                if raw.is_empty() {
                    continue;
                }
                return self.emit_pair(&raw);
            }

            if self.eof {
                self.done = true;
                if self.buf.is_empty() {
                    return Ok(FormToken::Finish);
                }
                let raw = self.buf.split_to(self.buf.len());
                return self.emit_pair(&raw);
            }

            self.fill().await?;
        }
    }

    /// Decode one raw `name=value` pair and emit it, enforcing count limits.
    fn emit_pair(&mut self, raw: &[u8]) -> DecodeResult<FormToken> {
        self.fields_seen += 1;
        if let Some(max) = self.options.limits.max_parts {
            if self.fields_seen > max {
                return Err(DecodeError::PartsLimit(max));
            }
        }
        if let Some(max) = self.options.limits.max_fields {
            if self.fields_seen > max {
                return Err(DecodeError::FieldsLimit(max));
            }
        }

        let (name, value) = form_urlencoded::parse(raw)
            .next()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .unwrap_or_default();

        let name = truncate_to(name, self.options.limits.max_field_name_size);
        let value = match self.options.limits.max_field_size {
            Some(max) => truncate_to(value, max),
            None => value,
        };

        Ok(FormToken::Field { name, value })
    }

    /// Read one more chunk from the input into the rolling buffer.
    async fn fill(&mut self) -> DecodeResult<()> {
        match self.input.next().await {
            Some(Ok(chunk)) => {
                self.buf.extend_from_slice(&chunk);
                Ok(())
            }
            Some(Err(e)) => Err(e),
            None => {
                self.eof = true;
                Ok(())
            }
        }
    }
}
