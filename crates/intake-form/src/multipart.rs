//! Incremental tokenizer for `multipart/form-data` bodies.
//!
//! The tokenizer keeps a rolling window over the input and scans it for the
//! part delimiter (`\r\n--boundary`). Field values accumulate until their
//! delimiter arrives; file bytes are released eagerly, holding back only a
//! tail short enough to still contain a partial delimiter, so a file part of
//! any size passes through in bounded memory.

use std::collections::VecDeque;
use std::fmt;

use bytes::{Buf, Bytes, BytesMut};
use futures::{Stream, StreamExt};
use intake_model::{DecodeError, DecodeResult, FilePart, FormOptions};

use crate::FormToken;
use crate::text::{decode_text, truncate_to};

/// Cap on one part's header block; a block growing past this is malformed.
const MAX_HEADER_BLOCK: usize = 16 * 1024;

/// Where the scanner currently is in the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Before the first boundary.
    Preamble,
    /// Just after a delimiter: expect `--` (close) or CRLF then headers.
    Delimited,
    /// Reading a part's header block.
    Headers,
    /// Accumulating a simple field's value.
    Field,
    /// Releasing a file part's bytes.
    File,
    /// The closing delimiter has been seen.
    Done,
}

/// Streaming tokenizer for multipart bodies.
pub struct MultipartTokenizer<S> {
    input: S,
    options: FormOptions,
    /// The full part delimiter, `\r\n--<boundary>`.
    delimiter: Vec<u8>,
    buf: BytesMut,
    eof: bool,
    state: State,
    /// Tokens decoded ahead of the consumer (at most a chunk and an end).
    pending: VecDeque<FormToken>,
    /// Current field part accumulator (valid in [`State::Field`]).
    field_name: String,
    field_value: Vec<u8>,
    /// Bytes released for the current file part (valid in [`State::File`]).
    file_written: usize,
    parts_seen: usize,
    fields_seen: usize,
    files_seen: usize,
}

impl<S> fmt::Debug for MultipartTokenizer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultipartTokenizer")
            .field("state", &self.state)
            .field("buffered", &self.buf.len())
            .field("parts_seen", &self.parts_seen)
            .finish()
    }
}

impl<S> MultipartTokenizer<S>
where
    S: Stream<Item = DecodeResult<Bytes>> + Unpin + Send,
{
    /// Create a tokenizer over `input` for the given boundary.
    pub fn new(input: S, boundary: &str, options: FormOptions) -> Self {
        let delimiter = format!("\r\n--{boundary}").into_bytes();
        let buf = BytesMut::with_capacity(options.buffer_capacity);
        Self {
            input,
            options,
            delimiter,
            buf,
            eof: false,
            state: State::Preamble,
            pending: VecDeque::new(),
            field_name: String::new(),
            field_value: Vec::new(),
            file_written: 0,
            parts_seen: 0,
            fields_seen: 0,
            files_seen: 0,
        }
    }

    /// Pull the next token, reading more input as needed.
    pub async fn next_token(&mut self) -> DecodeResult<FormToken> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(token);
            }

            match self.state {
                State::Done => return Ok(FormToken::Finish),
                State::Preamble => self.scan_preamble().await?,
                State::Delimited => {
                    if let Some(token) = self.scan_delimited().await? {
                        return Ok(token);
                    }
                }
                State::Headers => self.scan_headers().await?,
                State::Field => {
                    if let Some(token) = self.scan_field().await? {
                        return Ok(token);
                    }
                }
                State::File => {
                    if let Some(token) = self.scan_file().await? {
                        return Ok(token);
                    }
                }
            }
        }
    }

    /// Consume everything up to and including the first boundary line.
    async fn scan_preamble(&mut self) -> DecodeResult<()> {
        // The first boundary has no leading CRLF.
        let needle_len = self.delimiter.len() - 2;
        let found = {
            let needle = &self.delimiter[2..];
            find_bytes(&self.buf, needle)
        };
        if let Some(pos) = found {
            self.buf.advance(pos + needle_len);
            self.state = State::Delimited;
            return Ok(());
        }
        if self.eof {
            return Err(DecodeError::Tokenizer(
                "multipart boundary never found".to_owned(),
            ));
        }
        // Discard preamble bytes that can no longer be part of a match.
        let keep = needle_len.saturating_sub(1);
        if self.buf.len() > keep {
            let drop = self.buf.len() - keep;
            self.buf.advance(drop);
        }
        self.fill().await
    }

    /// Decide between a further part and the closing delimiter.
    async fn scan_delimited(&mut self) -> DecodeResult<Option<FormToken>> {
        // Tolerate transport padding between the boundary and its line end.
        while self
            .buf
            .first()
            .is_some_and(|&b| b == b' ' || b == b'\t')
        {
            self.buf.advance(1);
        }
        if self.buf.len() < 2 {
            if self.eof {
                return Err(unexpected_end());
            }
            self.fill().await?;
            return Ok(None);
        }
        if &self.buf[..2] == b"--" {
            self.state = State::Done;
            return Ok(Some(FormToken::Finish));
        }
        if &self.buf[..2] == b"\r\n" {
            self.buf.advance(2);
            self.state = State::Headers;
            return Ok(None);
        }
        Err(DecodeError::Tokenizer(
            "malformed bytes after boundary delimiter".to_owned(),
        ))
    }

    /// Accumulate and parse one part's header block.
    async fn scan_headers(&mut self) -> DecodeResult<()> {
        if let Some(pos) = find_bytes(&self.buf, b"\r\n\r\n") {
            let block = self.buf.split_to(pos);
            self.buf.advance(4);
            let headers = parse_part_headers(&block);
            return self.begin_part(headers);
        }
        if self.eof {
            return Err(unexpected_end());
        }
        if self.buf.len() > MAX_HEADER_BLOCK {
            return Err(DecodeError::Tokenizer(
                "part header block too large".to_owned(),
            ));
        }
        self.fill().await
    }

    /// Start the part described by `headers`, enforcing count limits.
    fn begin_part(&mut self, headers: PartHeaders) -> DecodeResult<()> {
        self.parts_seen += 1;
        if let Some(max) = self.options.limits.max_parts {
            if self.parts_seen > max {
                return Err(DecodeError::PartsLimit(max));
            }
        }

        let Some(name) = headers.name else {
            return Err(DecodeError::Tokenizer(
                "multipart part missing a field name".to_owned(),
            ));
        };
        let name = truncate_to(name, self.options.limits.max_field_name_size);

        // A filename parameter marks the part as a file.
        if let Some(filename) = headers.filename {
            self.files_seen += 1;
            if let Some(max) = self.options.limits.max_files {
                if self.files_seen > max {
                    return Err(DecodeError::FilesLimit(max));
                }
            }

            let filename = if self.options.preserve_path {
                filename
            } else {
                basename(&filename)
            };
            let mut part = FilePart::new(name);
            part.filename = Some(filename).filter(|f| !f.is_empty());
            if let Some(encoding) = headers.encoding {
                part.encoding = encoding;
            }
            if let Some(mime_type) = headers.content_type {
                part.mime_type = mime_type;
            }

            self.file_written = 0;
            self.state = State::File;
            self.pending.push_back(FormToken::FileBegin(part));
        } else {
            self.fields_seen += 1;
            if let Some(max) = self.options.limits.max_fields {
                if self.fields_seen > max {
                    return Err(DecodeError::FieldsLimit(max));
                }
            }

            self.field_name = name;
            self.field_value.clear();
            self.state = State::Field;
        }
        Ok(())
    }

    /// Accumulate field bytes until the part's delimiter arrives.
    async fn scan_field(&mut self) -> DecodeResult<Option<FormToken>> {
        if let Some(pos) = find_bytes(&self.buf, &self.delimiter) {
            let data = self.buf.split_to(pos);
            self.append_field_bytes(&data);
            self.buf.advance(self.delimiter.len());
            self.state = State::Delimited;

            let name = std::mem::take(&mut self.field_name);
            let value = decode_text(&self.field_value, &self.options.default_charset);
            self.field_value.clear();
            return Ok(Some(FormToken::Field { name, value }));
        }
        if self.eof {
            return Err(unexpected_end());
        }
        // Everything except a possible partial delimiter is settled data.
        let safe = self.buf.len().saturating_sub(self.delimiter.len() - 1);
        if safe > 0 {
            let data = self.buf.split_to(safe);
            self.append_field_bytes(&data);
        }
        self.fill().await?;
        Ok(None)
    }

    /// Release file bytes until the part's delimiter arrives.
    async fn scan_file(&mut self) -> DecodeResult<Option<FormToken>> {
        if let Some(pos) = find_bytes(&self.buf, &self.delimiter) {
            let data = self.buf.split_to(pos).freeze();
            self.buf.advance(self.delimiter.len());
            self.state = State::Delimited;

            let chunk = self.clamp_file_chunk(data);
            if !chunk.is_empty() {
                self.pending.push_back(FormToken::FileChunk(chunk));
            }
            self.pending.push_back(FormToken::FileEnd);
            return Ok(None);
        }
        if self.eof {
            return Err(unexpected_end());
        }
        let safe = self.buf.len().saturating_sub(self.delimiter.len() - 1);
        if safe > 0 {
            let data = self.buf.split_to(safe).freeze();
            let chunk = self.clamp_file_chunk(data);
            if !chunk.is_empty() {
                return Ok(Some(FormToken::FileChunk(chunk)));
            }
        }
        self.fill().await?;
        Ok(None)
    }

    /// Append to the current field value, truncating at the size cap.
    fn append_field_bytes(&mut self, data: &[u8]) {
        let cap = self.options.limits.max_field_size.unwrap_or(usize::MAX);
        let room = cap.saturating_sub(self.field_value.len());
        let take = room.min(data.len());
        if take < data.len() {
            tracing::debug!(
                field = %self.field_name,
                cap,
                "field value truncated at size limit"
            );
        }
        self.field_value.extend_from_slice(&data[..take]);
    }

    /// Clamp a file chunk to the remaining per-file byte allowance.
    fn clamp_file_chunk(&mut self, data: Bytes) -> Bytes {
        let cap = self.options.limits.max_file_size.unwrap_or(usize::MAX);
        let room = cap.saturating_sub(self.file_written);
        let take = room.min(data.len());
        if take < data.len() {
            tracing::debug!(cap, "file part truncated at size limit");
        }
        self.file_written += take;
        data.slice(..take)
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

/// A body ending before its closing delimiter, e.g. a mid-transfer abort.
fn unexpected_end() -> DecodeError {
    DecodeError::Tokenizer("unexpected end of multipart body".to_owned())
}

/// The recognized headers of one part.
#[derive(Debug, Default)]
struct PartHeaders {
    name: Option<String>,
    filename: Option<String>,
    content_type: Option<String>,
    encoding: Option<String>,
}

/// Parse a part's header block (without the terminating blank line).
fn parse_part_headers(block: &[u8]) -> PartHeaders {
    let text = String::from_utf8_lossy(block);
    let mut headers = PartHeaders::default();

    for line in text.split("\r\n") {
        let lower = line.to_ascii_lowercase();
        if lower.starts_with("content-disposition:") {
            if let Some(name) = extract_param(line, "name") {
                headers.name = Some(name);
            }
            if let Some(filename) = extract_param(line, "filename") {
                headers.filename = Some(filename);
            }
        } else if lower.starts_with("content-type:") {
            let value = &line["content-type:".len()..];
            headers.content_type = Some(value.trim().to_owned());
        } else if lower.starts_with("content-transfer-encoding:") {
            let value = &line["content-transfer-encoding:".len()..];
            headers.encoding = Some(value.trim().to_owned());
        }
    }

    headers
}

/// Extract a `param="value"` or `param=value` parameter from a header line.
fn extract_param(header_line: &str, param_name: &str) -> Option<String> {
    let quoted_pattern = format!("{param_name}=\"");
    let unquoted_pattern = format!("{param_name}=");
    let lower_line = header_line.to_ascii_lowercase();

    if let Some(pos) = lower_line.find(&quoted_pattern) {
        let start = pos + quoted_pattern.len();
        let rest = &header_line[start..];
        if let Some(end) = rest.find('"') {
            return Some(rest[..end].to_owned());
        }
    }

    if let Some(pos) = lower_line.find(&unquoted_pattern) {
        let start = pos + unquoted_pattern.len();
        let rest = &header_line[start..];
        let end = rest.find(';').unwrap_or(rest.len());
        let value = rest[..end].trim().to_owned();
        if !value.is_empty() {
            return Some(value);
        }
    }

    None
}

/// The final path component of a client-supplied filename.
fn basename(filename: &str) -> String {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .to_owned()
}

/// Find the position of a needle in a haystack.
fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
