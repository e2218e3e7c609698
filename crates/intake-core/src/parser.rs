//! The parse engine: orchestration, settlement, and graceful degradation.

use std::fmt;
use std::path::PathBuf;

use bytes::Bytes;
use futures::Stream;
use tracing::{debug, warn};

use intake_form::FormTokenizer;
use intake_model::{BodyPayload, DecodeResult, ParsedRequest};

use crate::decoder::FormDecoder;
use crate::dispatch::{self, DecodeStrategy, FormKind};
use crate::options::ParseOptions;
use crate::{collect, metadata};

/// The transport seam: request metadata, the bridged body stream, and
/// whether the connection was already aborted when the transport handed the
/// request over.
pub struct InboundRequest<'a, S> {
    /// Head of the request: method, URI, headers.
    pub parts: &'a http::request::Parts,
    /// The body as a pull-based chunk stream (see [`crate::bridge`]).
    pub body: S,
    /// True if the peer aborted before parsing began.
    pub aborted: bool,
}

impl<'a, S> InboundRequest<'a, S> {
    /// Wrap request parts and a body stream.
    pub fn new(parts: &'a http::request::Parts, body: S) -> Self {
        Self {
            parts,
            body,
            aborted: false,
        }
    }

    /// Mark whether the connection is already aborted.
    #[must_use]
    pub fn with_aborted(mut self, aborted: bool) -> Self {
        self.aborted = aborted;
        self
    }
}

impl<S> fmt::Debug for InboundRequest<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InboundRequest")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("aborted", &self.aborted)
            .finish_non_exhaustive()
    }
}

/// The request normalization engine.
///
/// Holds the one piece of cross-request configuration: the default temp
/// directory for stored files, resolved once at construction.
#[derive(Debug, Clone)]
pub struct BodyParser {
    tmp_dir: PathBuf,
}

impl Default for BodyParser {
    fn default() -> Self {
        Self::new()
    }
}

impl BodyParser {
    /// Create an engine rooted at the process temp directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tmp_dir: std::env::temp_dir(),
        }
    }

    /// Create an engine rooted at a specific default directory.
    #[must_use]
    pub fn with_tmp_dir(tmp_dir: impl Into<PathBuf>) -> Self {
        Self {
            tmp_dir: tmp_dir.into(),
        }
    }

    /// The default root for stored files.
    #[must_use]
    pub fn tmp_dir(&self) -> &std::path::Path {
        &self.tmp_dir
    }

    /// Normalize one request.
    ///
    /// Settles exactly once: `Ok` with the parsed result, or `Err` with one
    /// of the structural rejections ([`DecodeError`](intake_model::DecodeError)).
    /// A request already marked aborted short-circuits to the empty result
    /// without touching the body stream, as does a request whose options do
    /// not ask for the body. Dispatch-stage and JSON failures degrade to a
    /// result without a body rather than erroring.
    pub async fn parse<S>(
        &self,
        request: InboundRequest<'_, S>,
        options: &ParseOptions,
    ) -> DecodeResult<ParsedRequest>
    where
        S: Stream<Item = DecodeResult<Bytes>> + Unpin + Send,
    {
        if request.aborted {
            debug!("request already aborted, settling with empty result");
            return Ok(ParsedRequest::default());
        }

        let parts = request.parts;
        let mut parsed = ParsedRequest::default();
        if options.headers {
            parsed.headers = Some(metadata::extract_headers(&parts.headers));
        }
        if options.query {
            parsed.query = Some(metadata::parse_query(parts.uri.query().unwrap_or_default()));
        }
        if options.method {
            parsed.method = Some(parts.method.to_string());
        }
        if options.path {
            parsed.path = Some(parts.uri.path().to_owned());
        }

        if !options.body {
            return Ok(parsed);
        }

        parsed.body = self.decode_body(parts, request.body, options).await?;
        Ok(parsed)
    }

    /// Pick the decoding strategy and run it.
    async fn decode_body<S>(
        &self,
        parts: &http::request::Parts,
        body: S,
        options: &ParseOptions,
    ) -> DecodeResult<Option<BodyPayload>>
    where
        S: Stream<Item = DecodeResult<Bytes>> + Unpin + Send,
    {
        match dispatch::choose_strategy(&parts.headers) {
            DecodeStrategy::Skip => {
                debug!("no decoding strategy for content type, leaving body absent");
                Ok(None)
            }
            DecodeStrategy::Json => {
                let ceiling = options.form.limits.max_field_size;
                let buffer = collect::collect_limited(body, ceiling).await?;
                match serde_json::from_slice::<serde_json::Value>(&buffer) {
                    Ok(value) => Ok(Some(BodyPayload {
                        fields: Some(value),
                        files: None,
                    })),
                    Err(e) => {
                        warn!(error = %e, "failed to decode JSON body, leaving body absent");
                        Ok(None)
                    }
                }
            }
            DecodeStrategy::Form(kind) => {
                let mut tokenizer = match kind {
                    FormKind::UrlEncoded => {
                        FormTokenizer::urlencoded(body, options.form.clone())
                    }
                    FormKind::Multipart { boundary } => {
                        FormTokenizer::multipart(body, &boundary, options.form.clone())
                    }
                };
                let decoder = FormDecoder {
                    policy: &options.storage,
                    namespace: options.namespace.as_deref(),
                    tmp_dir: &self.tmp_dir,
                    outcomes: options.outcomes.as_ref(),
                };
                let payload = decoder.decode(&mut tokenizer).await?;
                Ok(Some(payload))
            }
        }
    }
}
